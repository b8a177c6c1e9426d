//! Management API transport for an externally terminated WebSocket gateway

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};

use crate::error::AppError;

use super::{Payload, Transport, TransportError};

/// Posts payloads to `{endpoint}/@connections/{connection_id}`.
///
/// `endpoint` is the gateway's host + stage, e.g.
/// `https://abc123.execute-api.eu-west-1.amazonaws.com/prod`.
pub struct HttpTransport {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, AppError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| AppError::Validation(format!("Invalid transport endpoint: {}", e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(AppError::Validation(format!(
                "Transport endpoint cannot be a base URL: {}",
                endpoint
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { endpoint, client })
    }

    fn connection_url(&self, connection_id: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("@connections")
                .push(connection_id);
        }
        url
    }
}

/// Map a management API response status onto the transport taxonomy
fn classify_status(status: StatusCode) -> Result<(), TransportError> {
    if status.is_success() {
        return Ok(());
    }

    match status {
        StatusCode::GONE | StatusCode::NOT_FOUND => Err(TransportError::Gone),
        StatusCode::TOO_MANY_REQUESTS => Err(TransportError::Throttled),
        StatusCode::BAD_REQUEST | StatusCode::PAYLOAD_TOO_LARGE => {
            Err(TransportError::Rejected(status.to_string()))
        }
        _ => Err(TransportError::Unavailable(status.to_string())),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn post_to_connection(
        &self,
        connection_id: &str,
        payload: Payload,
    ) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.connection_url(connection_id))
            .body(payload.to_string())
            .send()
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;

        classify_status(response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(endpoint: &str) -> HttpTransport {
        HttpTransport::new(endpoint, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_connection_url() {
        let t = transport("https://gw.example.com/prod");
        assert_eq!(
            t.connection_url("abc").as_str(),
            "https://gw.example.com/prod/@connections/abc"
        );

        let t = transport("https://gw.example.com/prod/");
        assert_eq!(
            t.connection_url("abc").as_str(),
            "https://gw.example.com/prod/@connections/abc"
        );
    }

    #[test]
    fn test_connection_id_is_escaped() {
        let t = transport("https://gw.example.com/prod");
        assert_eq!(
            t.connection_url("a/b c").as_str(),
            "https://gw.example.com/prod/@connections/a%2Fb%20c"
        );
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(HttpTransport::new("not a url", Duration::from_secs(1)).is_err());
        assert!(HttpTransport::new("mailto:ops@example.com", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(StatusCode::OK), Ok(()));
        assert_eq!(classify_status(StatusCode::GONE), Err(TransportError::Gone));
        assert_eq!(classify_status(StatusCode::NOT_FOUND), Err(TransportError::Gone));
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            Err(TransportError::Throttled)
        );
        assert!(matches!(
            classify_status(StatusCode::PAYLOAD_TOO_LARGE),
            Err(TransportError::Rejected(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY),
            Err(TransportError::Unavailable(_))
        ));
    }
}
