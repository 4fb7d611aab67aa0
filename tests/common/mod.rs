//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use batch_dispatch::{RawOutcome, RawResponse, RequestDescriptor, Transport, TransportError};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// How the stub answers a whole `dispatch_many` call.
#[derive(Debug, Clone, Default)]
pub enum StubMode {
    #[default]
    Normal,
    /// Fail the whole call.
    Fail(TransportError),
    /// Drop the last outcome of every call.
    Truncate,
}

/// Transport stub with canned outcomes per URL that records every dispatch.
#[derive(Default)]
pub struct StubTransport {
    routes: HashMap<String, (RawOutcome, Duration)>,
    mode: StubMode,
    calls: Mutex<Vec<Vec<String>>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(self, url: &str, body: &str) -> Self {
        self.route(url, RawResponse::new(200, body.to_string()))
    }

    pub fn route(mut self, url: &str, outcome: impl Into<RawOutcome>) -> Self {
        self.routes
            .insert(url.to_string(), (outcome.into(), Duration::ZERO));
        self
    }

    /// Delay the outcome for `url` inside the dispatch.
    pub fn delayed(mut self, url: &str, body: &str, delay: Duration) -> Self {
        self.routes.insert(
            url.to_string(),
            (RawResponse::new(200, body.to_string()).into(), delay),
        );
        self
    }

    pub fn mode(mut self, mode: StubMode) -> Self {
        self.mode = mode;
        self
    }

    /// URLs of every `dispatch_many` call, in call order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn answer(&self, request: &RequestDescriptor) -> RawOutcome {
        match self.routes.get(&request.url) {
            Some((outcome, delay)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(*delay).await;
                }
                outcome.clone()
            }
            None => RawResponse::new(404, "not found").into(),
        }
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn dispatch_many(
        &self,
        requests: &[RequestDescriptor],
    ) -> Result<Vec<RawOutcome>, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(requests.iter().map(|r| r.url.clone()).collect());

        if let StubMode::Fail(e) = &self.mode {
            return Err(e.clone());
        }

        let mut outcomes =
            futures::future::join_all(requests.iter().map(|r| self.answer(r))).await;
        if matches!(self.mode, StubMode::Truncate) {
            outcomes.pop();
        }
        Ok(outcomes)
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}
