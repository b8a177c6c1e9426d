//! Outbound delivery channel: "send this payload to connection X".
//!
//! - `LocalTransport`: sockets terminated by this process (the `/ws` endpoint)
//! - `HttpTransport`: management API of an external WebSocket gateway
//!   (`POST {endpoint}/@connections/{id}`)

mod http;
mod local;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::TransportConfig;
use crate::error::AppError;

pub use http::HttpTransport;
pub use local::LocalTransport;

/// Outbound payload, shared between all recipients of a fanout
pub type Payload = Arc<str>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The connection id no longer maps to a reachable client
    #[error("Connection is gone")]
    Gone,

    #[error("Delivery throttled")]
    Throttled,

    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    #[error("Payload rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn post_to_connection(
        &self,
        connection_id: &str,
        payload: Payload,
    ) -> Result<(), TransportError>;
}

/// Pick the transport named in configuration.
///
/// The local transport is always constructed by the caller because the
/// WebSocket endpoint needs it to attach sockets; it is only returned here
/// when `backend` is `"local"`.
pub fn create_transport(
    config: &TransportConfig,
    local: Arc<LocalTransport>,
) -> Result<Arc<dyn Transport>, AppError> {
    match config.backend.as_str() {
        "http" => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                AppError::Validation("transport.endpoint is required for the http backend".into())
            })?;
            let transport =
                HttpTransport::new(endpoint, Duration::from_millis(config.send_timeout_ms))?;
            tracing::info!(
                backend = "http",
                endpoint = %endpoint,
                "Using management API transport"
            );
            Ok(Arc::new(transport))
        }
        "local" => {
            tracing::info!(backend = "local", "Using in-process WebSocket transport");
            Ok(local)
        }
        other => Err(AppError::Validation(format!(
            "Unknown transport backend: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_local_transport() {
        let local = Arc::new(LocalTransport::new(4));
        let transport = create_transport(&TransportConfig::default(), local).unwrap();
        assert_eq!(transport.name(), "local");
    }

    #[test]
    fn test_http_transport_requires_endpoint() {
        let config = TransportConfig {
            backend: "http".to_string(),
            ..Default::default()
        };
        let result = create_transport(&config, Arc::new(LocalTransport::new(4)));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_create_http_transport() {
        let config = TransportConfig {
            backend: "http".to_string(),
            endpoint: Some("https://abc.execute-api.example.com/prod".to_string()),
            ..Default::default()
        };
        let transport = create_transport(&config, Arc::new(LocalTransport::new(4))).unwrap();
        assert_eq!(transport.name(), "http");
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let config = TransportConfig {
            backend: "carrier-pigeon".to_string(),
            ..Default::default()
        };
        assert!(create_transport(&config, Arc::new(LocalTransport::new(4))).is_err());
    }
}
