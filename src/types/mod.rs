//! 类型模块：请求描述、响应记录与 Cookie。
//!
//! # Types Module
//!
//! Plain data shared by every other module.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RequestDescriptor`] | Outbound request captured when a closure reaches the network boundary |
//! | [`Method`] | HTTP method |
//! | [`Cookie`] | Request cookie or parsed `Set-Cookie` value |
//! | [`ResponseRecord`] | Canonical result: url, body, status, headers, cookies, error, args |
//! | [`ErrorInfo`] | Transport-level error carried inside a record |
//!
//! ## Example
//!
//! ```rust
//! use batch_dispatch::types::{Cookie, RequestDescriptor};
//!
//! let request = RequestDescriptor::post("https://jsonplaceholder.typicode.com/posts")
//!     .form(&[("title", "foo"), ("body", "bar")])
//!     .header("Accept", "application/json")
//!     .cookie(Cookie::new("session", "abc"));
//! assert_eq!(request.header_value("accept"), Some("application/json"));
//! ```

pub mod cookie;
pub mod request;
pub mod response;

pub use cookie::Cookie;
pub use request::{Method, RequestDescriptor};
pub use response::{ErrorInfo, ResponseRecord};
