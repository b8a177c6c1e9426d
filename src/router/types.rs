//! Inbound event and response shapes

use serde::{Deserialize, Serialize};

use crate::broadcast::BroadcastReport;

/// Connect / disconnect event body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEvent {
    #[serde(default)]
    pub connection_id: Option<String>,
}

impl ConnectionEvent {
    pub fn new(connection_id: impl Into<String>) -> Self {
        Self {
            connection_id: Some(connection_id.into()),
        }
    }
}

/// Relay request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    #[serde(default)]
    pub connection_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RelayRequest {
    pub fn new(connection_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            connection_id: Some(connection_id.into()),
            message: Some(message.into()),
        }
    }
}

/// Everything the router knows how to handle
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Connect(ConnectionEvent),
    Disconnect(ConnectionEvent),
    /// Reply to the sender only
    DirectReply(RelayRequest),
    /// Fan out to every registered connection
    BroadcastAll(RelayRequest),
}

impl InboundEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Connect(_) => "connect",
            InboundEvent::Disconnect(_) => "disconnect",
            InboundEvent::DirectReply(_) => "direct_reply",
            InboundEvent::BroadcastAll(_) => "broadcast_all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// `{ "status": "ok" }` or `{ "status": "error", "detail": "..." }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<BroadcastReport>,
}

impl RelayResponse {
    pub fn ok() -> Self {
        Self {
            status: ResponseStatus::Ok,
            detail: None,
            report: None,
        }
    }

    pub fn with_report(report: BroadcastReport) -> Self {
        Self {
            report: Some(report),
            ..Self::ok()
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            detail: Some(detail.into()),
            report: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }
}
