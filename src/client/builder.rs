use super::dispatcher::Dispatcher;
use crate::interceptors::{InterceptHook, Preempt};
use crate::transport::{HttpConfig, HttpTransport, Transport};
use crate::Result;
use std::sync::Arc;

/// Builder for creating dispatchers with custom configuration.
///
/// Keep this surface area small and predictable (developer-friendly).
pub struct DispatcherBuilder {
    transport: Option<Arc<dyn Transport>>,
    http_config: Option<HttpConfig>,
    without_transport: bool,
    hook: InterceptHook,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            transport: None,
            http_config: None,
            without_transport: false,
            hook: InterceptHook::new(),
        }
    }

    /// Use a custom transport instead of the reqwest-backed one.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Configure the default HTTP transport.
    ///
    /// Without this, configuration comes from `DISPATCH_*` environment variables.
    pub fn http_config(mut self, config: HttpConfig) -> Self {
        self.http_config = Some(config);
        self
    }

    /// Build without any transport; the first batch dispatch fails with
    /// `TransportUnavailable`. Batches that never reach the network still work.
    pub fn without_transport(mut self) -> Self {
        self.without_transport = true;
        self
    }

    /// Register a preemptor consulted before any request suspends.
    ///
    /// Preemptors are consulted in registration order.
    pub fn preempt<P: Preempt + 'static>(mut self, preempt: P) -> Self {
        self.hook = self.hook.with(preempt);
        self
    }

    pub fn build(self) -> Result<Dispatcher> {
        let transport = match (self.transport, self.without_transport) {
            (Some(t), _) => Some(t),
            (None, true) => None,
            (None, false) => {
                let transport = match &self.http_config {
                    Some(config) => HttpTransport::new(config)?,
                    None => HttpTransport::from_env()?,
                };
                Some(Arc::new(transport) as Arc<dyn Transport>)
            }
        };

        Ok(Dispatcher {
            transport,
            hook: Arc::new(self.hook),
        })
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptors::CannedResponses;

    #[test]
    fn default_build_uses_http_transport() {
        let dispatcher = DispatcherBuilder::new()
            .http_config(HttpConfig::default())
            .build()
            .unwrap();
        assert_eq!(dispatcher.transport_name(), Some("reqwest"));
    }

    #[test]
    fn without_transport_builds() {
        let dispatcher = DispatcherBuilder::new()
            .without_transport()
            .preempt(CannedResponses::new())
            .build()
            .unwrap();
        assert!(dispatcher.transport_name().is_none());
        assert_eq!(dispatcher.hook.len(), 1);
    }

    #[test]
    fn invalid_http_config_fails_build() {
        let mut config = HttpConfig::default();
        config
            .default_headers
            .insert("bad header".to_string(), "x".to_string());
        assert!(DispatcherBuilder::new().http_config(config).build().is_err());
    }
}
