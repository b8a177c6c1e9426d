use serde::{Deserialize, Serialize};

use crate::transport::Payload;

/// Frames sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Reply to the sender only
    Echo {
        #[serde(default)]
        message: Option<String>,
    },
    /// Fan out to every registered connection
    Broadcast {
        #[serde(default)]
        message: Option<String>,
    },
    Ping,
}

/// Frames sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "connected")]
    Connected {
        #[serde(rename = "connectionId")]
        connection_id: String,
    },
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "heartbeat")]
    Heartbeat,
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

impl ServerMessage {
    pub fn connected(connection_id: impl Into<String>) -> Self {
        Self::Connected {
            connection_id: connection_id.into(),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Serialize once into a shareable outbound payload
    pub fn to_payload(&self) -> Result<Payload, serde_json::Error> {
        Ok(Payload::from(serde_json::to_string(self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_message_parsing() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"action": "echo", "message": "hi"})).unwrap();
        assert!(matches!(msg, ClientMessage::Echo { message: Some(m) } if m == "hi"));

        let msg: ClientMessage = serde_json::from_value(json!({"action": "broadcast"})).unwrap();
        assert!(matches!(msg, ClientMessage::Broadcast { message: None }));

        let msg: ClientMessage = serde_json::from_value(json!({"action": "ping"})).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));

        assert!(serde_json::from_value::<ClientMessage>(json!({"action": "dance"})).is_err());
    }

    #[test]
    fn test_server_message_wire_format() {
        let payload = ServerMessage::connected("abc").to_payload().unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value, json!({"type": "connected", "connectionId": "abc"}));

        let payload = ServerMessage::Heartbeat.to_payload().unwrap();
        assert_eq!(&*payload, r#"{"type":"heartbeat"}"#);

        let value = serde_json::to_value(ServerMessage::error("INVALID_MESSAGE", "bad")).unwrap();
        assert_eq!(
            value,
            json!({"type": "error", "code": "INVALID_MESSAGE", "message": "bad"})
        );
    }
}
