//! Envelope kinds
//!
//! The closed set of `type` tags carried by envelopes. Unrecognised tags decode
//! to [`EnvelopeKind::Unknown`] so the dispatcher can answer them instead of
//! failing the whole frame.

use serde::{Deserialize, Serialize};

/// Envelope kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    // === Client -> server ===
    /// Authenticate and bind a session (client only)
    Auth,
    /// Send a chat message (client only)
    Chat,
    /// Start typing in a room (client only)
    TypingStart,
    /// Stop typing in a room (client only)
    TypingStop,
    /// Join a room (client only)
    Join,
    /// Leave a room (client only)
    Leave,
    /// Push an explicit presence status (client only)
    Presence,
    /// Switch the session context (client only)
    Context,
    /// Liveness probe (client only)
    Ping,

    // === Both directions ===
    /// History request (client) / history reply (server)
    History,
    /// Acknowledgement
    Ack,

    // === Server -> client ===
    /// Informational notice
    System,
    /// Authentication accepted
    AuthSuccess,
    /// Chat message delivery
    Message,
    /// Typing indicator change
    Typing,
    /// Presence change of a user
    PresenceUpdate,
    /// Session context changed
    ContextUpdated,
    /// Periodic server heartbeat
    Heartbeat,
    /// Error reply
    Error,
    /// Reply to ping
    Pong,
    /// Document lifecycle notice
    DocumentEvent,
    /// Quote lifecycle notice
    QuoteEvent,

    /// Any tag this server does not know
    #[serde(other)]
    Unknown,
}

impl EnvelopeKind {
    /// Check if this kind can be sent by the client
    #[must_use]
    pub const fn is_client_kind(self) -> bool {
        matches!(
            self,
            Self::Auth
                | Self::Chat
                | Self::TypingStart
                | Self::TypingStop
                | Self::Join
                | Self::Leave
                | Self::Presence
                | Self::Context
                | Self::Ping
                | Self::History
                | Self::Ack
        )
    }

    /// Check if this kind can be sent by the server
    #[must_use]
    pub const fn is_server_kind(self) -> bool {
        !matches!(self, Self::Unknown) && !self.is_client_only()
    }

    const fn is_client_only(self) -> bool {
        matches!(
            self,
            Self::Auth
                | Self::Chat
                | Self::TypingStart
                | Self::TypingStop
                | Self::Join
                | Self::Leave
                | Self::Presence
                | Self::Context
                | Self::Ping
        )
    }

    /// Wire name of this kind
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Chat => "chat",
            Self::TypingStart => "typing_start",
            Self::TypingStop => "typing_stop",
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Presence => "presence",
            Self::Context => "context",
            Self::Ping => "ping",
            Self::History => "history",
            Self::Ack => "ack",
            Self::System => "system",
            Self::AuthSuccess => "auth_success",
            Self::Message => "message",
            Self::Typing => "typing",
            Self::PresenceUpdate => "presence_update",
            Self::ContextUpdated => "context_updated",
            Self::Heartbeat => "heartbeat",
            Self::Error => "error",
            Self::Pong => "pong",
            Self::DocumentEvent => "document_event",
            Self::QuoteEvent => "quote_event",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
