//! The `database-connection` notification channel
//!
//! The backend reports the outcome of every `connect_database` request here,
//! exactly once, instead of through the command's return value.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::engine::types::{SchemaSnapshot, SessionId};

/// Name of the channel, shared with the webview
pub const CONNECTION_EVENT: &str = "database-connection";

/// Events buffered per subscriber. A subscriber that falls further behind
/// loses the oldest events: a lost success leaves its backend session open
/// with no record (still visible through `SessionManager::list_sessions`),
/// and a lost error is never reported. `ConnectionListener` reports the gap
/// as a failed status so the view does not stay in "loading".
pub const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Success,
    Error,
}

/// Payload carried by `database-connection`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEvent {
    pub status: EventStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<SchemaSnapshot>>,
    /// Backend session that served the connection, when it succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

impl ConnectionEvent {
    pub fn success(
        message: impl Into<String>,
        data: Vec<SchemaSnapshot>,
        session_id: Option<SessionId>,
    ) -> Self {
        Self {
            status: EventStatus::Success,
            message: message.into(),
            data: Some(data),
            session_id,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: EventStatus::Error,
            message: message.into(),
            data: None,
            session_id: None,
        }
    }

    /// First schema snapshot, the one the explorer is built from
    pub fn snapshot(&self) -> Option<&SchemaSnapshot> {
        self.data.as_ref().and_then(|data| data.first())
    }
}

/// Broadcast channel every listener subscribes to
#[derive(Clone)]
pub struct EventChannel {
    sender: broadcast::Sender<ConnectionEvent>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event; returns how many subscribers received it.
    pub fn emit(&self, event: ConnectionEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!(channel = CONNECTION_EVENT, "event dropped, no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_synthetic_success_payload() {
        let json = r#"{
            "status": "success",
            "message": "ok",
            "data": [{"schema": "public", "tables": [{"name": "users", "type": "table", "columns": []}], "functions": []}]
        }"#;
        let event: ConnectionEvent = serde_json::from_str(json).expect("should parse");

        assert_eq!(event.status, EventStatus::Success);
        assert_eq!(event.snapshot().map(|s| s.schema.as_str()), Some("public"));
        assert!(event.session_id.is_none());
    }

    #[test]
    fn error_payload_omits_data() {
        let json = serde_json::to_value(ConnectionEvent::error("auth failed")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "status": "error", "message": "auth failed" })
        );
    }

    #[tokio::test]
    async fn emit_without_subscribers_is_harmless() {
        let channel = EventChannel::new();
        assert_eq!(channel.emit(ConnectionEvent::error("nobody listening")), 0);

        let mut rx = channel.subscribe();
        assert_eq!(channel.emit(ConnectionEvent::error("late")), 1);
        assert_eq!(rx.recv().await.unwrap().message, "late");
    }
}
