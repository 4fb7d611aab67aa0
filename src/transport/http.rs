use super::{HttpConfig, RawOutcome, RawResponse, Transport, TransportError};
use crate::types::{Cookie, RequestDescriptor};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use reqwest::{redirect, Proxy};
use std::time::Instant;
use tracing::debug;

/// reqwest-backed [`Transport`]. All requests of a batch are in flight at once.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        config.validate()?;
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .redirect(redirect::Policy::limited(config.max_redirects))
            .default_headers(default_headers(config)?);

        if let Some(connect) = config.connect_timeout() {
            builder = builder.connect_timeout(connect);
        }

        if let Some(proxy_url) = &config.proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid proxy: {}", e),
                    ErrorContext::new()
                        .with_field_path("http.proxy_url")
                        .with_details(proxy_url.clone()),
                )
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::from(e)))?;

        Ok(Self { client })
    }

    /// Transport configured from `DISPATCH_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(&HttpConfig::from_env())
    }

    async fn send_one(&self, request: &RequestDescriptor) -> RawOutcome {
        let method = match reqwest::Method::from_bytes(request.method.as_str().as_bytes()) {
            Ok(m) => m,
            Err(e) => return TransportError::InvalidRequest(e.to_string()).into(),
        };

        let mut req = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if !request.cookies.is_empty() && !request.headers.contains_key("cookie") {
            req = req.header(COOKIE, Cookie::header_value(&request.cookies));
        }
        if let Some(body) = &request.body {
            req = req.body(body.clone());
        }
        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        let start = Instant::now();
        let resp = match req.send().await {
            Ok(r) => r,
            Err(e) => return TransportError::from(e).into(),
        };

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();

        match resp.bytes().await {
            Ok(body) => {
                debug!(
                    method = %request.method,
                    url = request.url.as_str(),
                    http_status = status,
                    duration_ms = start.elapsed().as_millis(),
                    "request completed"
                );
                RawOutcome::Response(RawResponse {
                    status: Some(status),
                    headers,
                    body,
                })
            }
            Err(e) => TransportError::from(e).into(),
        }
    }
}

fn default_headers(config: &HttpConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.default_headers {
        let invalid = |details: String| {
            Error::configuration_with_context(
                "invalid default header",
                ErrorContext::new()
                    .with_field_path(format!("http.default_headers.{}", name))
                    .with_details(details),
            )
        };
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn dispatch_many(
        &self,
        requests: &[RequestDescriptor],
    ) -> std::result::Result<Vec<RawOutcome>, TransportError> {
        Ok(futures::future::join_all(requests.iter().map(|r| self.send_one(r))).await)
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_default_header() {
        let mut cfg = HttpConfig::default();
        cfg.default_headers
            .insert("bad header".to_string(), "x".to_string());
        let err = HttpTransport::new(&cfg).err().unwrap();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn rejects_invalid_proxy() {
        let cfg = HttpConfig {
            proxy_url: Some("ftp://proxy.local:21".to_string()),
            ..HttpConfig::default()
        };
        let err = HttpTransport::new(&cfg).err().unwrap();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn rejects_zero_timeout() {
        let cfg = HttpConfig {
            timeout_secs: 0,
            ..HttpConfig::default()
        };
        assert!(matches!(
            HttpTransport::new(&cfg).err(),
            Some(Error::Configuration { .. })
        ));
    }

    #[test]
    fn builds_from_env() {
        let transport = HttpTransport::from_env().unwrap();
        assert_eq!(transport.name(), "reqwest");
    }

    #[test]
    fn builds_from_defaults() {
        let transport = HttpTransport::new(&HttpConfig::default()).unwrap();
        assert_eq!(transport.name(), "reqwest");
    }
}
