//! Inbound event routing.
//!
//! Maps connect / disconnect / relay events onto the registry, dispatcher
//! and broadcaster. Requests are validated here, before anything downstream
//! is touched. The router holds no state of its own.

mod types;

use std::sync::Arc;

use serde_json::json;

use crate::broadcast::{BroadcastReport, Broadcaster};
use crate::dispatcher::{Delivered, DispatchError, Dispatcher};
use crate::metrics::InboundMetrics;
use crate::registry::Registry;
use crate::store::StoreError;
use crate::transport::Payload;

pub use types::{
    ConnectionEvent, InboundEvent, RelayRequest, RelayResponse, ResponseStatus,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Payload echoed back to the sender of a direct reply
pub fn echo_payload(message: &str) -> Payload {
    Payload::from(format!("Echo: {}", message))
}

/// Payload fanned out by a broadcast
pub fn broadcast_payload(message: &str) -> Payload {
    Payload::from(json!({ "message": message }).to_string())
}

/// Ids are opaque: a blank id is rejected, any other id passes through untouched.
fn required_id<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, RouterError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(missing(field)),
    }
}

/// Messages are forwarded verbatim; only an absent or empty one is rejected.
fn required_message<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, RouterError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(missing(field)),
    }
}

fn missing(field: &str) -> RouterError {
    RouterError::MalformedRequest(format!("missing required field '{}'", field))
}

#[derive(Clone)]
pub struct InboundRouter {
    registry: Registry,
    dispatcher: Arc<Dispatcher>,
    broadcaster: Arc<Broadcaster>,
    default_message: String,
}

impl InboundRouter {
    pub fn new(
        registry: Registry,
        dispatcher: Arc<Dispatcher>,
        broadcaster: Arc<Broadcaster>,
        default_message: String,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            broadcaster,
            default_message,
        }
    }

    pub async fn on_connect(&self, event: &ConnectionEvent) -> Result<(), RouterError> {
        let connection_id = required_id(event.connection_id.as_deref(), "connectionId")?;
        self.registry.register(connection_id).await?;
        Ok(())
    }

    pub async fn on_disconnect(&self, event: &ConnectionEvent) -> Result<(), RouterError> {
        let connection_id = required_id(event.connection_id.as_deref(), "connectionId")?;
        self.registry.unregister(connection_id).await?;
        Ok(())
    }

    /// Echo `message` back to the sender only. The registry is not consulted
    /// and not modified, whatever the outcome.
    #[tracing::instrument(name = "router.direct_reply", skip(self, request))]
    pub async fn direct_reply(&self, request: &RelayRequest) -> Result<Delivered, RouterError> {
        let connection_id = required_id(request.connection_id.as_deref(), "connectionId")?;
        let message = required_message(request.message.as_deref(), "message")?;

        let delivered = self
            .dispatcher
            .send(connection_id, echo_payload(message))
            .await?;
        Ok(delivered)
    }

    /// Fan a message out to every registered connection, sender included.
    #[tracing::instrument(name = "router.broadcast_all", skip(self, request))]
    pub async fn broadcast_all(
        &self,
        request: &RelayRequest,
    ) -> Result<BroadcastReport, RouterError> {
        let sender = required_id(request.connection_id.as_deref(), "connectionId")?;
        let message = match request.message.as_deref() {
            Some(m) if !m.is_empty() => m,
            _ => self.default_message.as_str(),
        };

        tracing::debug!(sender = %sender, "Relaying broadcast");
        let report = self.broadcaster.broadcast(broadcast_payload(message)).await?;
        Ok(report)
    }

    /// Handle any inbound event and fold the outcome into a status response.
    pub async fn handle(&self, event: InboundEvent) -> RelayResponse {
        let kind = event.kind();
        let result = match &event {
            InboundEvent::Connect(e) => self.on_connect(e).await.map(|_| RelayResponse::ok()),
            InboundEvent::Disconnect(e) => {
                self.on_disconnect(e).await.map(|_| RelayResponse::ok())
            }
            InboundEvent::DirectReply(r) => {
                self.direct_reply(r).await.map(|_| RelayResponse::ok())
            }
            InboundEvent::BroadcastAll(r) => {
                self.broadcast_all(r).await.map(RelayResponse::with_report)
            }
        };

        InboundMetrics::record(kind, result.is_ok());
        match result {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(event = kind, error = %e, "Inbound event failed");
                RelayResponse::error(e.to_string())
            }
        }
    }
}
