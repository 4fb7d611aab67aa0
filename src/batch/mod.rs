//! 批处理模块：以同步写法编写请求，一次网络往返并发发送。
//!
//! # Request Batching Module
//!
//! Each request is written as an ordinary closure that "calls" the network and
//! gets its response back inline. Under the hood every closure runs as a
//! suspendable unit: the moment it would block on the network it parks, and
//! once every outstanding unit is parked the coordinator sends all of their
//! requests in one transport dispatch and resumes each unit with its response.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Request`] | Caller closure (or constant) to run inside a batch |
//! | [`Unit`] | Suspendable wrapper around one closure |
//! | [`Coordinator`] | Suspend / dispatch / resume loop for one batch |
//! | [`normalize`] | Raw transport outcome to [`ResponseRecord`](crate::ResponseRecord) |
//!
//! ## Guarantees
//!
//! - Results are index-aligned with the input, whatever order requests complete in.
//! - A batch whose closures all reach the network performs exactly one dispatch.
//! - Closures that never reach the network contribute their value and no dispatch entry.
//! - A transport failure marks only its own record; a closure failure aborts the batch.

mod coordinator;
mod normalizer;
mod unit;

pub use coordinator::Coordinator;
pub use normalizer::normalize;
pub use unit::{Request, Step, Unit, UnitState};
