//! Protocol errors
//!
//! Problems with what a client sent. They are answered with an `error`
//! envelope; the connection stays open.

use super::EnvelopeKind;
use thiserror::Error;

/// Protocol error type
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame is not a valid envelope
    #[error("Malformed envelope: {0}")]
    Malformed(String),

    /// `type` tag is not part of the protocol
    #[error("Unknown message type")]
    UnknownKind,

    /// Server-only kind sent by a client
    #[error("Message type '{0}' cannot be sent by clients")]
    UnexpectedKind(EnvelopeKind),

    /// `data` does not match the kind
    #[error("Invalid {kind} payload: {reason}")]
    InvalidPayload { kind: EnvelopeKind, reason: String },

    /// Request before a successful `auth`
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Second `auth` on an authenticated connection
    #[error("Already authenticated")]
    AlreadyAuthenticated,
}

impl ProtocolError {
    /// Error code used in the `error` envelope
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::UnknownKind => "unknown_kind",
            Self::UnexpectedKind(_) => "unexpected_kind",
            Self::InvalidPayload { .. } => "invalid_payload",
            Self::NotAuthenticated => "not_authenticated",
            Self::AlreadyAuthenticated => "already_authenticated",
        }
    }

    pub(crate) fn invalid(kind: EnvelopeKind, reason: impl std::fmt::Display) -> Self {
        Self::InvalidPayload {
            kind,
            reason: reason.to_string(),
        }
    }
}
