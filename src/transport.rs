//! 传输层：一次调用并发发送多个请求。
//!
//! # Transport Layer
//!
//! The coordinator needs exactly one capability from its environment: a batch
//! primitive that issues many requests in one call and returns one outcome per
//! request, index-aligned with the input. [`Transport`] is that seam;
//! [`HttpTransport`] is the reqwest-backed implementation.

pub mod config;
pub mod http;

pub use config::HttpConfig;
pub use http::HttpTransport;

use crate::types::RequestDescriptor;
use async_trait::async_trait;
use bytes::Bytes;

/// Raw, not yet normalized response as produced by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawResponse {
    /// `None` when the transport could not determine a status.
    pub status: Option<u16>,
    /// Header pairs in wire order; names may repeat (e.g. `set-cookie`).
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status: Some(status),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Structured error object reported by the platform instead of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError {
    pub code: String,
    pub message: String,
}

impl PlatformError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Every way a single request can come back from a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOutcome {
    Response(RawResponse),
    Error(PlatformError),
    Exception(TransportError),
}

impl From<RawResponse> for RawOutcome {
    fn from(r: RawResponse) -> Self {
        RawOutcome::Response(r)
    }
}

impl From<TransportError> for RawOutcome {
    fn from(e: TransportError) -> Self {
        RawOutcome::Exception(e)
    }
}

impl From<PlatformError> for RawOutcome {
    fn from(e: PlatformError) -> Self {
        RawOutcome::Error(e)
    }
}

/// Failure raised by the transport layer.
///
/// `code()` follows the curl error numbering so records look the same whatever
/// backend produced them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("too many redirects: {0}")]
    Redirect(String),

    #[error("failed receiving body: {0}")]
    Body(String),

    #[error("transport returned no response for this request")]
    MissingResponse,

    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn code(&self) -> u16 {
        match self {
            TransportError::InvalidRequest(_) => 3,
            TransportError::Connect(_) => 7,
            TransportError::Timeout(_) => 28,
            TransportError::Redirect(_) => 47,
            TransportError::Body(_) => 56,
            TransportError::MissingResponse | TransportError::Other(_) => 0,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let message = e.to_string();
        if e.is_timeout() {
            TransportError::Timeout(message)
        } else if e.is_connect() {
            TransportError::Connect(message)
        } else if e.is_builder() {
            TransportError::InvalidRequest(message)
        } else if e.is_redirect() {
            TransportError::Redirect(message)
        } else if e.is_body() || e.is_decode() {
            TransportError::Body(message)
        } else {
            TransportError::Other(message)
        }
    }
}

/// Batch primitive: issue every request in one call.
///
/// Implementations must return exactly one outcome per request, in input order.
/// Per-request failures belong in [`RawOutcome::Exception`] or
/// [`RawOutcome::Error`]; an `Err` from `dispatch_many` is applied to every slot.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch_many(
        &self,
        requests: &[RequestDescriptor],
    ) -> Result<Vec<RawOutcome>, TransportError>;

    fn name(&self) -> &'static str {
        "unnamed"
    }
}
