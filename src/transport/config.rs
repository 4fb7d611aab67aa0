//! HTTP transport configuration: defaults, YAML files and environment knobs.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: Option<u64>,
    pub proxy_url: Option<String>,
    pub user_agent: String,
    pub max_redirects: usize,
    pub default_headers: BTreeMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: None,
            proxy_url: None,
            user_agent: concat!("batch-dispatch/", env!("CARGO_PKG_VERSION")).to_string(),
            max_redirects: 5,
            default_headers: BTreeMap::new(),
        }
    }
}

impl HttpConfig {
    /// Defaults overridden by `DISPATCH_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid HTTP config: {}", e),
                ErrorContext::new().with_source("http_config"),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw).map_err(|e| match e {
            Error::Configuration { message, context } => Error::Configuration {
                message,
                context: context.with_details(path.display().to_string()),
            },
            other => other,
        })
    }

    /// Apply environment overrides on top of this config.
    ///
    /// Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse::<u64>("DISPATCH_HTTP_TIMEOUT_SECS") {
            self.timeout_secs = v;
        }
        if let Some(v) = env_parse::<u64>("DISPATCH_HTTP_CONNECT_TIMEOUT_SECS") {
            self.connect_timeout_secs = Some(v);
        }
        if let Ok(v) = env::var("DISPATCH_PROXY_URL") {
            if !v.trim().is_empty() {
                self.proxy_url = Some(v);
            }
        }
        if let Ok(v) = env::var("DISPATCH_USER_AGENT") {
            if !v.trim().is_empty() {
                self.user_agent = v;
            }
        }
        if let Some(v) = env_parse::<usize>("DISPATCH_HTTP_MAX_REDIRECTS") {
            self.max_redirects = v;
        }
        self
    }

    /// Reject values reqwest would turn into an immediate timeout.
    pub fn validate(&self) -> Result<()> {
        let zero = |field: &str| {
            Error::configuration_with_context(
                "timeout must be at least one second",
                ErrorContext::new()
                    .with_field_path(format!("http.{}", field))
                    .with_source("http_config")
                    .with_details("0"),
            )
        };
        if self.timeout_secs == 0 {
            return Err(zero("timeout_secs"));
        }
        if self.connect_timeout_secs == Some(0) {
            return Err(zero("connect_timeout_secs"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}
