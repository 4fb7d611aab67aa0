//! # batch-dispatch
//!
//! 以顺序写法编写 HTTP 请求，由调度器在一次网络往返中并发发送。
//!
//! Concurrent request dispatcher: write each request as straight-line code
//! that "calls" the network, hand a list of them to the [`Dispatcher`], and
//! every request that is outstanding at the same moment goes out in a single
//! concurrent transport dispatch.
//!
//! ## Overview
//!
//! Each request closure receives an [`Http`] handle. Awaiting
//! [`Http::send`] suspends the closure at the network boundary; once every
//! unfinished closure is suspended, the batch coordinator dispatches all of
//! their requests at once and resumes each closure with its own
//! [`ResponseRecord`]. Closures may branch, issue follow-up requests, or skip
//! the network altogether.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use batch_dispatch::{Dispatcher, Http, Request};
//!
//! #[tokio::main]
//! async fn main() -> batch_dispatch::Result<()> {
//!     let dispatcher = Dispatcher::new()?;
//!
//!     let statuses = dispatcher
//!         .resolve(vec![
//!             Request::new(|http: Http| async move {
//!                 let todo = http.get("https://jsonplaceholder.typicode.com/todos/1").await?;
//!                 Ok(todo.status)
//!             }),
//!             Request::constant(204),
//!         ])
//!         .await?;
//!
//!     println!("{statuses:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Dispatcher`], its builder and the [`Client`] trait |
//! | [`batch`] | Suspendable units and the batch coordinator |
//! | [`interceptors`] | Request interception, the [`Http`] handle and preemptors |
//! | [`transport`] | Transport trait, raw outcomes and the reqwest transport |
//! | [`types`] | Request descriptors, response records and cookies |
//! | [`error`] | Error type and context |

pub mod batch;
pub mod client;
pub mod interceptors;
pub mod transport;
pub mod types;

pub use batch::Request;
pub use client::{Client, Dispatcher, DispatcherBuilder};
pub use interceptors::{CannedResponses, Http, Preempt};
pub use transport::{HttpConfig, RawOutcome, RawResponse, Transport, TransportError};
pub use types::{Cookie, ErrorInfo, Method, RequestDescriptor, ResponseRecord};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

// Re-export error types
pub mod error;
pub use error::{Error, ErrorContext};
