//! Batch coordinator: drives the units of one `resolve()` call through
//! suspend, dispatch and resume until every one of them has terminated.

use super::normalize;
use super::unit::{Request, Step, Unit, UnitState};
use crate::interceptors::InterceptHook;
use crate::transport::{RawOutcome, Transport, TransportError};
use crate::types::{RequestDescriptor, ResponseRecord};
use crate::{Error, ErrorContext, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// In-flight state of one batch, keyed by the original request index.
struct Batch<'a, T> {
    units: BTreeMap<usize, Unit<'a, T>>,
    queue: BTreeMap<usize, RequestDescriptor>,
    resolved: BTreeMap<usize, ResponseRecord>,
    results: Vec<Option<T>>,
}

impl<'a, T> Batch<'a, T> {
    fn new(requests: Vec<Request<'a, T>>, hook: &Arc<InterceptHook>) -> Self {
        let results = requests.iter().map(|_| None).collect();
        let units = requests
            .into_iter()
            .map(|r| Unit::new(r, hook.clone()))
            .enumerate()
            .collect();
        Self {
            units,
            queue: BTreeMap::new(),
            resolved: BTreeMap::new(),
            results,
        }
    }

    fn is_drained(&self) -> bool {
        self.units.is_empty()
    }

    /// Every outstanding unit is parked at the request boundary.
    fn is_dispatchable(&self) -> bool {
        !self.queue.is_empty() && self.queue.len() == self.units.len()
    }

    /// One pass over the outstanding units.
    ///
    /// Ready once the batch is drained or dispatchable; pending while some
    /// unit waits on a foreign future (its waker is registered with `cx`).
    fn advance(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        let indices: Vec<usize> = self.units.keys().copied().collect();
        for idx in indices {
            let Some(unit) = self.units.get_mut(&idx) else {
                continue;
            };
            let outcome = match unit.state() {
                UnitState::NotStarted => unit.start(cx),
                UnitState::Suspended => match self.resolved.remove(&idx) {
                    Some(record) => unit.resume(Ok(record), cx),
                    None => continue,
                },
                UnitState::Running => unit.poll_blocked(cx),
                UnitState::Terminated => Ok(Step::Terminated),
            };

            match outcome {
                Ok(Step::Suspended(request)) => {
                    debug!(
                        index = idx,
                        method = %request.method,
                        url = request.url.as_str(),
                        "unit suspended"
                    );
                    self.queue.insert(idx, request);
                }
                Ok(Step::Blocked) => {}
                Ok(Step::Terminated) => {
                    if let Some(mut unit) = self.units.remove(&idx) {
                        self.results[idx] = unit.take_result();
                    }
                    self.queue.remove(&idx);
                    self.resolved.remove(&idx);
                    debug!(index = idx, "unit terminated");
                }
                Err(e) => {
                    warn!(index = idx, error = %e, "request closure failed, aborting batch");
                    return Poll::Ready(Err(e.with_index(idx)));
                }
            }
        }

        if self.is_drained() || self.is_dispatchable() {
            return Poll::Ready(Ok(()));
        }
        if self
            .units
            .values()
            .any(|u| u.state() == UnitState::Running)
        {
            return Poll::Pending;
        }
        Poll::Ready(Err(Error::runtime_with_context(
            "batch stalled: units suspended without a pending dispatch",
            ErrorContext::new()
                .with_source("coordinator")
                .with_details(format!(
                    "outstanding={}, queued={}",
                    self.units.len(),
                    self.queue.len()
                )),
        )))
    }

    fn into_results(self) -> Result<Vec<T>> {
        let total = self.results.len();
        self.results
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| {
                slot.ok_or_else(|| {
                    Error::runtime_with_context(
                        format!("no result recorded for request {} of {}", idx, total),
                        ErrorContext::new().with_source("coordinator").with_index(idx),
                    )
                })
            })
            .collect()
    }
}

/// Runs batches against one transport and one interception hook.
pub struct Coordinator<'t> {
    transport: Option<&'t dyn Transport>,
    hook: Arc<InterceptHook>,
}

impl<'t> Coordinator<'t> {
    pub fn new(transport: Option<&'t dyn Transport>, hook: Arc<InterceptHook>) -> Self {
        Self { transport, hook }
    }

    /// Run every request closure to completion, sending all network requests
    /// that are outstanding at the same time in a single transport dispatch.
    ///
    /// Results are index-aligned with `requests`. A closure failure aborts the
    /// whole call; transport failures only mark the affected records.
    pub async fn resolve<'a, T: Send + 'a>(&self, requests: Vec<Request<'a, T>>) -> Result<Vec<T>> {
        let batch_id = Uuid::new_v4();
        let total = requests.len();
        let start = Instant::now();
        let mut batch = Batch::new(requests, &self.hook);
        let mut dispatches = 0usize;

        while !batch.is_drained() {
            std::future::poll_fn(|cx| batch.advance(cx)).await?;
            if batch.is_dispatchable() {
                self.dispatch(&mut batch, batch_id).await?;
                dispatches += 1;
            }
        }

        info!(
            batch_id = %batch_id,
            requests = total,
            dispatches,
            duration_ms = start.elapsed().as_millis(),
            "batch resolved"
        );
        batch.into_results()
    }

    async fn dispatch<T>(&self, batch: &mut Batch<'_, T>, batch_id: Uuid) -> Result<()> {
        let transport = self.transport.ok_or_else(|| {
            Error::transport_unavailable(
                "no transport configured; cannot dispatch requests concurrently",
            )
        })?;

        let queue = std::mem::take(&mut batch.queue);
        let (indices, requests): (Vec<usize>, Vec<RequestDescriptor>) = queue.into_iter().unzip();

        let start = Instant::now();
        let outcomes = match transport.dispatch_many(&requests).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                warn!(batch_id = %batch_id, error = %e, "batch dispatch failed");
                vec![RawOutcome::Exception(e); requests.len()]
            }
        };
        info!(
            batch_id = %batch_id,
            transport = transport.name(),
            requests = requests.len(),
            duration_ms = start.elapsed().as_millis(),
            "batch dispatched"
        );

        let mut outcomes = outcomes.into_iter();
        for (idx, request) in indices.into_iter().zip(requests) {
            let raw = outcomes
                .next()
                .unwrap_or(RawOutcome::Exception(TransportError::MissingResponse));
            let record = normalize(raw, request);
            if let Some(err) = &record.error {
                warn!(
                    batch_id = %batch_id,
                    index = idx,
                    url = record.url.as_str(),
                    code = err.code.as_str(),
                    "request failed"
                );
            }
            batch.resolved.insert(idx, record);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptors::Http;
    use crate::transport::RawResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio_test::{assert_pending, assert_ready, assert_ready_ok, task};

    /// Echoes each URL back as the body and counts dispatches.
    #[derive(Default)]
    struct Echo {
        calls: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl Transport for Echo {
        async fn dispatch_many(
            &self,
            requests: &[RequestDescriptor],
        ) -> std::result::Result<Vec<RawOutcome>, TransportError> {
            self.calls.lock().unwrap().push(requests.len());
            Ok(requests
                .iter()
                .map(|r| RawResponse::new(200, r.url.clone()).into())
                .collect())
        }
    }

    fn body_of(url: &'static str) -> Request<'static, String> {
        Request::new(move |http: Http| async move { Ok(http.get(url).await?.body) })
    }

    #[test]
    fn batch_waits_for_foreign_futures_before_dispatching() {
        let echo = Echo::default();
        let coordinator = Coordinator::new(Some(&echo), Arc::new(InterceptHook::new()));
        let (tx, rx) = futures::channel::oneshot::channel::<()>();

        let requests = vec![
            Request::new(|http: Http| async move {
                rx.await.map_err(|e| anyhow::anyhow!(e))?;
                Ok(http.get("https://x/1").await?.body)
            }),
            body_of("https://x/2"),
        ];
        let mut fut = task::spawn(coordinator.resolve(requests));

        assert_pending!(fut.poll());
        assert!(echo.calls.lock().unwrap().is_empty());

        tx.send(()).unwrap();
        assert!(fut.is_woken());
        let bodies = assert_ready_ok!(fut.poll());
        assert_eq!(bodies, vec!["https://x/1", "https://x/2"]);
        assert_eq!(*echo.calls.lock().unwrap(), vec![2]);
    }

    #[test]
    fn units_that_finish_early_leave_the_dispatch_to_the_rest() {
        let echo = Echo::default();
        let coordinator = Coordinator::new(Some(&echo), Arc::new(InterceptHook::new()));

        let mut fut = task::spawn(coordinator.resolve(vec![
            Request::constant("early".to_string()),
            body_of("https://x/1"),
            Request::constant("also early".to_string()),
        ]));
        let results = assert_ready_ok!(fut.poll());
        assert_eq!(results, vec!["early", "https://x/1", "also early"]);
        assert_eq!(*echo.calls.lock().unwrap(), vec![1]);
    }

    #[test]
    fn missing_transport_fails_only_when_a_dispatch_is_needed() {
        let coordinator = Coordinator::new(None, Arc::new(InterceptHook::new()));

        let mut literal = task::spawn(coordinator.resolve(vec![Request::constant(7u8)]));
        assert_eq!(assert_ready_ok!(literal.poll()), vec![7]);

        let mut network = task::spawn(coordinator.resolve(vec![body_of("https://x/1")]));
        let err = assert_ready!(network.poll()).unwrap_err();
        assert!(matches!(err, Error::TransportUnavailable { .. }));
    }
}
