//! Domain errors - error types for the domain layer and its collaborators

use thiserror::Error;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Content too long: max {max} characters")]
    ContentTooLong { max: usize },

    // =========================================================================
    // Collaborator Errors
    // =========================================================================
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Responder error: {0}")]
    ResponderError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for error envelopes
    pub fn code(&self) -> &'static str {
        match self {
            Self::DocumentNotFound(_) => "document_not_found",
            Self::SessionNotFound(_) => "session_not_found",
            Self::ValidationError(_) | Self::ContentTooLong { .. } => "invalid_payload",
            Self::StorageError(_) => "storage_failed",
            Self::ResponderError(_) => "responder_failed",
            Self::InternalError(_) => "internal",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DocumentNotFound(_) | Self::SessionNotFound(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_) | Self::ContentTooLong { .. })
    }

    /// Check if this error came from an external collaborator
    pub fn is_collaborator(&self) -> bool {
        matches!(self, Self::StorageError(_) | Self::ResponderError(_))
    }
}
