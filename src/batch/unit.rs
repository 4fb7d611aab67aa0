//! Suspendable unit: one caller closure that can park at its request call and
//! be resumed later with a value or an injected failure.

use crate::interceptors::{lock, Exchange, ExchangeSlot, Http, InterceptHook};
use crate::types::{RequestDescriptor, ResponseRecord};
use crate::{Error, ErrorContext, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

type Entry<'a, T> = Box<dyn FnOnce(Http) -> BoxFuture<'a, Result<T>> + Send + 'a>;

/// A caller-supplied, zero-argument request closure.
///
/// The closure receives an [`Http`] handle; awaiting it is how the closure
/// "issues" its request.
pub struct Request<'a, T> {
    entry: Entry<'a, T>,
}

impl<'a, T: Send + 'a> Request<'a, T> {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Http) -> Fut + Send + 'a,
        Fut: Future<Output = Result<T>> + Send + 'a,
    {
        Self {
            entry: Box::new(move |http| f(http).boxed()),
        }
    }

    /// A closure that never reaches the network and returns `value` as is.
    pub fn constant(value: T) -> Self {
        Self::new(move |_| async move { Ok(value) })
    }
}

impl<'a> Request<'a, ResponseRecord> {
    /// A closure that sends `request` and returns its record.
    pub fn fetch(request: RequestDescriptor) -> Self {
        Self::new(move |http| async move { http.send(request).await })
    }
}

impl<'a, T> std::fmt::Debug for Request<'a, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    NotStarted,
    /// Executing, or blocked on something other than the request boundary.
    Running,
    /// Parked at the request boundary.
    Suspended,
    Terminated,
}

/// What a `start`/`resume`/`poll_blocked` call left the unit in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Parked with this freshly captured descriptor.
    Suspended(RequestDescriptor),
    /// Waiting on a foreign future; poll again once woken.
    Blocked,
    Terminated,
}

pub struct Unit<'a, T> {
    state: UnitState,
    entry: Option<Entry<'a, T>>,
    future: Option<BoxFuture<'a, Result<T>>>,
    exchange: ExchangeSlot,
    hook: Arc<InterceptHook>,
    result: Option<T>,
}

impl<'a, T> Unit<'a, T> {
    pub fn new(request: Request<'a, T>, hook: Arc<InterceptHook>) -> Self {
        Self {
            state: UnitState::NotStarted,
            entry: Some(request.entry),
            future: None,
            exchange: Arc::new(Mutex::new(Exchange::Idle)),
            hook,
            result: None,
        }
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == UnitState::Suspended
    }

    pub fn is_terminated(&self) -> bool {
        self.state == UnitState::Terminated
    }

    /// The closure's return value; `None` before termination or once taken.
    pub fn take_result(&mut self) -> Option<T> {
        self.result.take()
    }

    /// Run the closure until it suspends, blocks or finishes.
    ///
    /// A failure raised here happened before the unit ever suspended.
    pub fn start(&mut self, cx: &mut Context<'_>) -> Result<Step> {
        let entry = match (self.state, self.entry.take()) {
            (UnitState::NotStarted, Some(entry)) => entry,
            _ => return Err(self.misuse("start")),
        };
        let http = Http::new(self.exchange.clone(), self.hook.clone());
        self.future = Some(entry(http));
        self.state = UnitState::Running;
        self.poll(cx)
    }

    /// Continue a suspended unit as though its request call returned `value`.
    ///
    /// An `Err` is raised inside the closure at the suspension point.
    pub fn resume(&mut self, value: Result<ResponseRecord>, cx: &mut Context<'_>) -> Result<Step> {
        if self.state != UnitState::Suspended {
            return Err(self.misuse("resume"));
        }
        *lock(&self.exchange) = Exchange::Delivered(value);
        self.state = UnitState::Running;
        self.poll(cx)
    }

    /// Poll a unit that is blocked on a foreign future.
    pub fn poll_blocked(&mut self, cx: &mut Context<'_>) -> Result<Step> {
        if self.state != UnitState::Running {
            return Err(self.misuse("poll"));
        }
        self.poll(cx)
    }

    fn poll(&mut self, cx: &mut Context<'_>) -> Result<Step> {
        let polled = match self.future.as_mut() {
            Some(future) => future.as_mut().poll(cx),
            None => return Err(self.misuse("poll")),
        };
        match polled {
            Poll::Ready(out) => {
                self.future = None;
                self.state = UnitState::Terminated;
                *lock(&self.exchange) = Exchange::Closed;
                let value = out?;
                self.result = Some(value);
                Ok(Step::Terminated)
            }
            Poll::Pending => {
                let mut slot = lock(&self.exchange);
                match std::mem::replace(&mut *slot, Exchange::Awaiting) {
                    Exchange::Captured(request) => {
                        self.state = UnitState::Suspended;
                        Ok(Step::Suspended(request))
                    }
                    other => {
                        *slot = other;
                        Ok(Step::Blocked)
                    }
                }
            }
        }
    }

    fn misuse(&self, op: &str) -> Error {
        Error::runtime_with_context(
            format!("cannot {} a unit in state {:?}", op, self.state),
            ErrorContext::new().with_source("unit"),
        )
    }
}

impl<'a, T> Drop for Unit<'a, T> {
    fn drop(&mut self) {
        *lock(&self.exchange) = Exchange::Closed;
    }
}
