//! Dispatcher entry point and the `Client` seam that services depend on.
//!
//! Developer-friendly goal: keep the public surface small and predictable.

pub mod builder;
pub mod dispatcher;

pub use builder::DispatcherBuilder;
pub use dispatcher::Dispatcher;

use crate::types::{RequestDescriptor, ResponseRecord};
use crate::Result;
use async_trait::async_trait;

/// Something that can resolve a list of requests into index-aligned records.
#[async_trait]
pub trait Client: Send + Sync {
    async fn fetch_all(&self, requests: Vec<RequestDescriptor>) -> Result<Vec<ResponseRecord>>;
}
