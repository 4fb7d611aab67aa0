use crate::transport::TransportError;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "http.proxy_url", "request.url")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., the offending value)
    pub details: Option<String>,
    /// Source of the error (e.g., "coordinator", "http_config")
    pub source: Option<String>,
    /// Batch slot that produced the error, when there is one
    pub index: Option<usize>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

/// Unified error type for the dispatcher.
///
/// Per-request transport failures never show up here: they are normalized into
/// [`ResponseRecord::error`](crate::ResponseRecord). Only structural failures
/// abort a `resolve()` call.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Transport unavailable: {message}")]
    TransportUnavailable { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if let Some(index) = ctx.index {
        parts.push(format!("index: {}", index));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::runtime_with_context(msg, ErrorContext::new())
    }

    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn transport_unavailable(msg: impl Into<String>) -> Self {
        Error::TransportUnavailable {
            message: msg.into(),
        }
    }

    /// Record the batch slot that raised this error, unless one is already set.
    ///
    /// Only variants that carry an [`ErrorContext`] are changed.
    pub fn with_index(mut self, index: usize) -> Self {
        if let Error::Configuration { context, .. }
        | Error::Validation { context, .. }
        | Error::Runtime { context, .. } = &mut self
        {
            if context.index.is_none() {
                context.index = Some(index);
            }
        }
        self
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. }
            | Error::Validation { context, .. }
            | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_rendered_in_display() {
        let err = Error::validation_with_context(
            "relative URL without a base",
            ErrorContext::new()
                .with_field_path("request.url")
                .with_details("/users")
                .with_index(2),
        );
        assert_eq!(
            err.to_string(),
            "Validation error: relative URL without a base (field: request.url, details: /users, index: 2)"
        );
        assert_eq!(err.context().and_then(|c| c.index), Some(2));
    }

    #[test]
    fn empty_context_renders_nothing() {
        let err = Error::runtime("unit already started");
        assert_eq!(err.to_string(), "Runtime error: unit already started");
        assert!(Error::transport_unavailable("none").context().is_none());
    }

    #[test]
    fn with_index_fills_only_an_empty_slot() {
        let err = Error::runtime("boom").with_index(3);
        assert_eq!(err.context().and_then(|c| c.index), Some(3));
        assert_eq!(err.to_string(), "Runtime error: boom (index: 3)");

        let kept = Error::runtime_with_context("boom", ErrorContext::new().with_index(1)).with_index(3);
        assert_eq!(kept.context().and_then(|c| c.index), Some(1));

        let other: Error = anyhow::anyhow!("opaque").into();
        assert_eq!(other.with_index(3).to_string(), "opaque");
    }

    #[test]
    fn anyhow_errors_pass_through_transparently() {
        let err: Error = anyhow::anyhow!("malformed arguments").into();
        assert_eq!(err.to_string(), "malformed arguments");
    }
}
