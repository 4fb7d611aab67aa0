use super::Client;
use crate::batch::{Coordinator, Request};
use crate::interceptors::InterceptHook;
use crate::transport::Transport;
use crate::types::{RequestDescriptor, ResponseRecord};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Concurrent request dispatcher.
///
/// Holds no per-batch state, so one dispatcher can serve many `resolve()`
/// calls, including concurrent ones.
#[derive(Clone)]
pub struct Dispatcher {
    pub(crate) transport: Option<Arc<dyn Transport>>,
    pub(crate) hook: Arc<InterceptHook>,
}

impl Dispatcher {
    /// Dispatcher backed by an HTTP transport configured from the environment.
    pub fn new() -> Result<Self> {
        super::DispatcherBuilder::new().build()
    }

    pub fn builder() -> super::DispatcherBuilder {
        super::DispatcherBuilder::new()
    }

    pub fn transport_name(&self) -> Option<&'static str> {
        self.transport.as_ref().map(|t| t.name())
    }

    /// Run `requests` as one batch; see [`Coordinator::resolve`].
    ///
    /// ```rust,no_run
    /// use batch_dispatch::{Dispatcher, Http, Request};
    ///
    /// # async fn run() -> batch_dispatch::Result<()> {
    /// let dispatcher = Dispatcher::new()?;
    /// let records = dispatcher
    ///     .resolve(vec![
    ///         Request::new(|http: Http| async move { http.get("https://jsonplaceholder.typicode.com/todos/1").await }),
    ///         Request::new(|http: Http| async move { http.get("https://jsonplaceholder.typicode.com/todos/2").await }),
    ///     ])
    ///     .await?;
    /// assert_eq!(records.len(), 2);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn resolve<'a, T: Send + 'a>(&self, requests: Vec<Request<'a, T>>) -> Result<Vec<T>> {
        Coordinator::new(self.transport.as_deref(), self.hook.clone())
            .resolve(requests)
            .await
    }

    /// Send plain descriptors as one batch.
    pub async fn fetch_all(&self, requests: Vec<RequestDescriptor>) -> Result<Vec<ResponseRecord>> {
        self.resolve(requests.into_iter().map(Request::fetch).collect())
            .await
    }
}

#[async_trait]
impl Client for Dispatcher {
    async fn fetch_all(&self, requests: Vec<RequestDescriptor>) -> Result<Vec<ResponseRecord>> {
        Dispatcher::fetch_all(self, requests).await
    }
}
