//! Canonical response record handed back to callers.

use super::cookie::Cookie;
use super::request::RequestDescriptor;
use crate::transport::TransportError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Error attached to a [`ResponseRecord`] whose request failed at the transport level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Normalized result of one request: success and failure share this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub url: String,
    pub body: String,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub cookies: Vec<Cookie>,
    pub error: Option<ErrorInfo>,
    /// The request exactly as it was captured.
    pub args: RequestDescriptor,
}

impl ResponseRecord {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// No transport error and a 2xx status.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn json<T: DeserializeOwned>(&self) -> crate::Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Turn a transport-error record into `Err`, pass everything else through.
    pub fn error_for_status(self) -> crate::Result<Self> {
        match &self.error {
            None => Ok(self),
            Some(info) => Err(crate::Error::Transport(TransportError::Other(format!(
                "{} ({}): {}",
                self.url, info.code, info.message
            )))),
        }
    }
}
