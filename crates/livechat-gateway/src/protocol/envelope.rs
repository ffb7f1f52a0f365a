//! Envelope format
//!
//! Every frame exchanged over a connection is one JSON envelope:
//! `{ "type": ..., "data": {...}, "timestamp": ..., "correlation_id"?, "sender_user_id"?, "session_id"? }`.
//! Envelopes are immutable once built; the `with_*` builders consume and return.

use super::payloads::{
    AckPayload, AuthSuccessPayload, ContextUpdatedPayload, ErrorPayload, HistoryPayload,
    MessagePayload, PresencePayload, ResourceEventPayload, SystemPayload, TypingPayload,
};
use super::EnvelopeKind;
use chrono::{DateTime, Utc};
use livechat_core::{SessionId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Wire envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    kind: EnvelopeKind,

    #[serde(default = "empty_object")]
    data: Value,

    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    sender_user_id: Option<UserId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<SessionId>,
}

impl Envelope {
    /// Create an envelope stamped with the current time
    #[must_use]
    pub fn new(kind: EnvelopeKind, data: Value) -> Self {
        Self {
            kind,
            data,
            timestamp: Utc::now(),
            correlation_id: None,
            sender_user_id: None,
            session_id: None,
        }
    }

    fn with_payload(kind: EnvelopeKind, payload: impl Serialize) -> Self {
        Self::new(kind, serde_json::to_value(payload).unwrap_or_else(|_| empty_object()))
    }

    // === Builders ===

    /// Attach a correlation id
    #[must_use]
    pub fn with_correlation(mut self, correlation_id: Option<String>) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Attach the sending user
    #[must_use]
    pub fn with_sender(mut self, user_id: UserId) -> Self {
        self.sender_user_id = Some(user_id);
        self
    }

    /// Attach the session the envelope belongs to
    #[must_use]
    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    // === Server Messages ===

    /// Create a `system` notice
    #[must_use]
    pub fn system(payload: SystemPayload) -> Self {
        Self::with_payload(EnvelopeKind::System, payload)
    }

    /// Create an `auth_success` reply
    #[must_use]
    pub fn auth_success(payload: AuthSuccessPayload) -> Self {
        Self::with_payload(EnvelopeKind::AuthSuccess, payload)
    }

    /// Create a `message` delivery
    #[must_use]
    pub fn message(payload: MessagePayload) -> Self {
        Self::with_payload(EnvelopeKind::Message, payload)
    }

    /// Create a `typing` indicator change
    #[must_use]
    pub fn typing(payload: TypingPayload) -> Self {
        Self::with_payload(EnvelopeKind::Typing, payload)
    }

    /// Create a `presence_update` notice
    #[must_use]
    pub fn presence_update(payload: PresencePayload) -> Self {
        Self::with_payload(EnvelopeKind::PresenceUpdate, payload)
    }

    /// Create a `context_updated` notice
    #[must_use]
    pub fn context_updated(payload: ContextUpdatedPayload) -> Self {
        Self::with_payload(EnvelopeKind::ContextUpdated, payload)
    }

    /// Create a `history` reply
    #[must_use]
    pub fn history(payload: HistoryPayload) -> Self {
        Self::with_payload(EnvelopeKind::History, payload)
    }

    /// Create a `document_event` notice
    #[must_use]
    pub fn document_event(payload: ResourceEventPayload) -> Self {
        Self::with_payload(EnvelopeKind::DocumentEvent, payload)
    }

    /// Create a `quote_event` notice
    #[must_use]
    pub fn quote_event(payload: ResourceEventPayload) -> Self {
        Self::with_payload(EnvelopeKind::QuoteEvent, payload)
    }

    /// Create an `ack`
    #[must_use]
    pub fn ack(payload: AckPayload) -> Self {
        Self::with_payload(EnvelopeKind::Ack, payload)
    }

    /// Create an `error` reply
    #[must_use]
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::with_payload(
            EnvelopeKind::Error,
            ErrorPayload {
                code: code.to_string(),
                message: message.into(),
            },
        )
    }

    /// Create a `heartbeat`
    #[must_use]
    pub fn heartbeat() -> Self {
        Self::new(EnvelopeKind::Heartbeat, empty_object())
    }

    /// Create a `pong`
    #[must_use]
    pub fn pong() -> Self {
        Self::new(EnvelopeKind::Pong, empty_object())
    }

    // === Accessors ===

    pub fn kind(&self) -> EnvelopeKind {
        self.kind
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn sender_user_id(&self) -> Option<&UserId> {
        self.sender_user_id.as_ref()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Decode the data object into a typed payload
    pub fn decode_data<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }

    // === Utilities ===

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Envelope(type={}", self.kind)?;
        if let Some(correlation_id) = &self.correlation_id {
            write!(f, ", correlation_id={correlation_id}")?;
        }
        write!(f, ")")
    }
}
