//! Handler error types

use crate::protocol::{Envelope, ProtocolError};
use crate::session::SessionError;
use livechat_core::{DomainError, RoomId};
use thiserror::Error;

/// Handler error type
///
/// Every variant is answered with an `error` envelope; none of them closes the
/// connection on its own.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Bad envelope or payload
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Token rejected
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Room operation from a connection that has not joined the room
    #[error("Not a member of room {0}")]
    NotInRoom(RoomId),

    /// Session lookup or ownership problem
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Collaborator or validation failure
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Collaborator did not answer in time
    #[error("{0} timed out")]
    Timeout(&'static str),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Error code used in the `error` envelope
    pub fn code(&self) -> &'static str {
        match self {
            Self::Protocol(e) => e.code(),
            Self::AuthenticationFailed(_) => "auth_failed",
            Self::NotInRoom(_) => "not_in_room",
            Self::Session(e) => e.code(),
            Self::Domain(e) => e.code(),
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal",
        }
    }

    /// Build the `error` envelope answering the request
    pub fn to_envelope(&self, correlation_id: Option<String>) -> Envelope {
        Envelope::error(self.code(), self.to_string()).with_correlation(correlation_id)
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
