//! Interception hook: the point where a request call turns into a suspension.
//!
//! Every closure in a batch receives an [`Http`] handle. Awaiting
//! [`Http::send`] is the one place a unit can pause: the hook first offers the
//! descriptor to the registered [`Preempt`] collaborators, and only when none
//! of them answers does it park the descriptor in the unit's exchange slot and
//! yield to the coordinator.
//!
//! Handles are bound to a single unit of a single batch. Once the batch is
//! over the slot is closed and further requests fail fast.

use crate::batch::normalize;
use crate::transport::RawOutcome;
use crate::types::{Method, RequestDescriptor, ResponseRecord};
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tracing::debug;

/// Answers a request inline instead of letting it reach the network.
///
/// Test harnesses use this to pre-seed responses; a request answered here is
/// never suspended and never dispatched.
pub trait Preempt: Send + Sync {
    fn preempt(&self, request: &RequestDescriptor) -> Option<RawOutcome>;
}

impl<F> Preempt for F
where
    F: Fn(&RequestDescriptor) -> Option<RawOutcome> + Send + Sync,
{
    fn preempt(&self, request: &RequestDescriptor) -> Option<RawOutcome> {
        self(request)
    }
}

/// Canned outcomes keyed by method and URL.
#[derive(Debug, Clone, Default)]
pub struct CannedResponses {
    responses: HashMap<(Method, String), RawOutcome>,
}

impl CannedResponses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        method: Method,
        url: impl Into<String>,
        outcome: impl Into<RawOutcome>,
    ) -> Self {
        self.responses.insert((method, url.into()), outcome.into());
        self
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

impl Preempt for CannedResponses {
    fn preempt(&self, request: &RequestDescriptor) -> Option<RawOutcome> {
        self.responses
            .get(&(request.method, request.url.clone()))
            .cloned()
    }
}

/// What the hook decided for one request.
#[derive(Debug)]
pub enum Interception {
    /// A preemptor answered; the caller gets this record inline.
    PassThrough(ResponseRecord),
    /// Nobody answered; the unit must suspend with this descriptor.
    Suspend(RequestDescriptor),
}

/// Ordered set of preemptors consulted before a unit suspends.
#[derive(Clone, Default)]
pub struct InterceptHook {
    preempts: Vec<Arc<dyn Preempt>>,
}

impl InterceptHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<P: Preempt + 'static>(mut self, preempt: P) -> Self {
        self.preempts.push(Arc::new(preempt));
        self
    }

    pub fn push(&mut self, preempt: Arc<dyn Preempt>) {
        self.preempts.push(preempt);
    }

    pub fn len(&self) -> usize {
        self.preempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.preempts.is_empty()
    }

    pub fn intercept(&self, request: RequestDescriptor) -> Interception {
        for p in &self.preempts {
            if let Some(raw) = p.preempt(&request) {
                debug!(
                    method = %request.method,
                    url = request.url.as_str(),
                    "request answered by preemptor"
                );
                return Interception::PassThrough(normalize(raw, request));
            }
        }
        Interception::Suspend(request)
    }
}

/// Slot shared between one unit and the `Http` handle given to its closure.
#[derive(Debug)]
pub(crate) enum Exchange {
    Idle,
    /// Descriptor parked by the hook, not yet picked up by the coordinator.
    Captured(RequestDescriptor),
    /// Picked up; waiting for the batch dispatch.
    Awaiting,
    /// Value to hand back at the suspension point.
    Delivered(Result<ResponseRecord>),
    Closed,
}

pub(crate) type ExchangeSlot = Arc<Mutex<Exchange>>;

pub(crate) fn lock(slot: &ExchangeSlot) -> MutexGuard<'_, Exchange> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Request capability handed to each closure of a batch.
#[derive(Clone)]
pub struct Http {
    exchange: ExchangeSlot,
    hook: Arc<InterceptHook>,
}

impl Http {
    pub(crate) fn new(exchange: ExchangeSlot, hook: Arc<InterceptHook>) -> Self {
        Self { exchange, hook }
    }

    /// Issue `request`. Looks synchronous to the closure; actually a suspension point.
    pub fn send(&self, request: RequestDescriptor) -> Intercepted {
        let state = match request.validate() {
            Ok(()) => InterceptState::Fresh(request),
            Err(e) => InterceptState::Invalid(e),
        };
        Intercepted {
            exchange: self.exchange.clone(),
            hook: self.hook.clone(),
            state,
        }
    }

    pub fn get(&self, url: impl Into<String>) -> Intercepted {
        self.send(RequestDescriptor::get(url))
    }

    pub fn post(&self, url: impl Into<String>, body: impl Into<Bytes>) -> Intercepted {
        self.send(RequestDescriptor::post(url).body(body))
    }
}

enum InterceptState {
    Fresh(RequestDescriptor),
    Invalid(Error),
    Waiting,
    Done,
}

/// Future returned by [`Http::send`].
pub struct Intercepted {
    exchange: ExchangeSlot,
    hook: Arc<InterceptHook>,
    state: InterceptState,
}

impl Future for Intercepted {
    type Output = Result<ResponseRecord>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        match std::mem::replace(&mut this.state, InterceptState::Done) {
            InterceptState::Invalid(e) => Poll::Ready(Err(e)),
            InterceptState::Fresh(request) => {
                let mut slot = lock(&this.exchange);
                match &*slot {
                    Exchange::Idle => {}
                    Exchange::Closed => return Poll::Ready(Err(closed_error(&request))),
                    _ => {
                        return Poll::Ready(Err(Error::runtime_with_context(
                            "unit already has a request in flight",
                            ErrorContext::new()
                                .with_source("interceptor")
                                .with_details(request.url),
                        )))
                    }
                }
                match this.hook.intercept(request) {
                    Interception::PassThrough(record) => Poll::Ready(Ok(record)),
                    Interception::Suspend(request) => {
                        // No waker: the coordinator polls this unit again once the
                        // batch dispatch has delivered a value.
                        *slot = Exchange::Captured(request);
                        this.state = InterceptState::Waiting;
                        Poll::Pending
                    }
                }
            }
            InterceptState::Waiting => {
                let mut slot = lock(&this.exchange);
                match std::mem::replace(&mut *slot, Exchange::Idle) {
                    Exchange::Delivered(value) => Poll::Ready(value),
                    Exchange::Closed => {
                        *slot = Exchange::Closed;
                        Poll::Ready(Err(Error::runtime_with_context(
                            "batch ended before the response was delivered",
                            ErrorContext::new().with_source("interceptor"),
                        )))
                    }
                    other => {
                        *slot = other;
                        this.state = InterceptState::Waiting;
                        Poll::Pending
                    }
                }
            }
            InterceptState::Done => Poll::Ready(Err(Error::runtime(
                "request future polled after completion",
            ))),
        }
    }
}

impl Drop for Intercepted {
    /// A request future abandoned mid-flight (e.g. the losing side of a
    /// `select`) hands the slot back so the closure can issue its next request.
    fn drop(&mut self) {
        if !matches!(self.state, InterceptState::Waiting) {
            return;
        }
        let mut slot = lock(&self.exchange);
        if matches!(
            &*slot,
            Exchange::Captured(_) | Exchange::Awaiting | Exchange::Delivered(_)
        ) {
            *slot = Exchange::Idle;
        }
    }
}

fn closed_error(request: &RequestDescriptor) -> Error {
    Error::runtime_with_context(
        "request issued outside of a running batch",
        ErrorContext::new()
            .with_source("interceptor")
            .with_details(request.url.clone()),
    )
}
