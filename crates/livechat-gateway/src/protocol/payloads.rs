//! Payload definitions
//!
//! Typed `data` objects for client requests and server notices.

use crate::presence::UserStatus;
use chrono::{DateTime, Utc};
use livechat_core::{
    ChatMessage, ConnectionId, ContextKind, ContextRef, MessageRole, RoomId, SessionId, UserId,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Client -> server
// ============================================================================

/// Payload for `auth`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPayload {
    /// Authentication token (optionally `Bearer `-prefixed)
    pub token: String,

    /// Session to reattach to; a new one is created when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,

    /// Optional client properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientInfo>,
}

/// Client connection properties, kept as connection metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Operating system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,

    /// Browser or client name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,

    /// Device type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

/// Payload for `chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatPayload {
    pub content: String,

    /// Broadcast into a joined room
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomId>,

    /// Deliver directly to a user (queued while they are offline)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<UserId>,
}

/// Payload for `join`, `leave`, `typing_start` and `typing_stop`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomPayload {
    pub room: RoomId,
}

/// Payload for `presence`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceRequest {
    pub status: UserStatus,
}

/// Payload for `context`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextPayload {
    pub kind: ContextKind,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Payload for a `history` request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

// ============================================================================
// Server -> client
// ============================================================================

/// Payload for `system`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemPayload {
    pub event: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_interval_ms: Option<u64>,
}

impl SystemPayload {
    /// Greeting sent as soon as the socket is accepted
    #[must_use]
    pub fn hello(heartbeat_interval_ms: u64) -> Self {
        Self {
            event: "hello".to_string(),
            heartbeat_interval_ms: Some(heartbeat_interval_ms),
            ..Self::default()
        }
    }

    /// Membership change announced to a room
    #[must_use]
    pub fn membership(event: &str, room: RoomId, user_id: UserId) -> Self {
        Self {
            event: event.to_string(),
            room: Some(room),
            user_id: Some(user_id),
            ..Self::default()
        }
    }
}

/// Payload for `document_event` and `quote_event`
///
/// Lifecycle notices about a document or quote, raised by the business layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceEventPayload {
    /// Document or quote id
    pub id: String,
    /// What happened, e.g. `updated` or `accepted`
    pub event: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

/// Payload for `auth_success`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSuccessPayload {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub connection_id: ConnectionId,
    /// True when an existing session was reattached
    pub resumed: bool,
    pub history_len: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextRef>,
}

/// Payload for `message`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub id: String,
    pub role: MessageRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomId>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl MessagePayload {
    /// Build a delivery payload from a history entry
    #[must_use]
    pub fn from_message(message: &ChatMessage, room: Option<RoomId>) -> Self {
        Self {
            id: message.id.clone(),
            role: message.role,
            from: message.author.clone(),
            room,
            content: message.content.clone(),
            created_at: message.created_at,
        }
    }
}

/// Payload for `typing`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingPayload {
    pub room: RoomId,
    pub user_id: UserId,
    pub typing: bool,
}

/// Payload for `presence_update`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresencePayload {
    pub user_id: UserId,
    pub status: UserStatus,
}

/// Payload for `context_updated`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextUpdatedPayload {
    pub context: ContextRef,
    pub notice: String,
}

/// Payload for a `history` reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPayload {
    pub session_id: SessionId,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextRef>,
}

/// Payload for `ack`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckPayload {
    /// Connections the request was delivered to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered: Option<usize>,

    /// Whether the message went to the recipient's offline queue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queued: Option<bool>,

    /// Whether a membership/typing state actually changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed: Option<bool>,
}

impl AckPayload {
    #[must_use]
    pub fn delivered(count: usize) -> Self {
        Self {
            delivered: Some(count),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn queued() -> Self {
        Self {
            delivered: Some(0),
            queued: Some(true),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn changed(changed: bool) -> Self {
        Self {
            changed: Some(changed),
            ..Self::default()
        }
    }
}

/// Payload for `error`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}
