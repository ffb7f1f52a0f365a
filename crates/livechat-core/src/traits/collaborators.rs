//! Collaborator traits (ports) - the narrow contracts this core consumes
//!
//! Persistence and the language-model responder live outside the realtime
//! core. The gateway only talks to them through these traits, always from a
//! spawned task and always under a timeout.

use async_trait::async_trait;

use crate::entities::{ChatMessage, ContextRef, DocumentSnapshot};
use crate::error::DomainError;
use crate::value_objects::UserId;

/// Result type for collaborator operations
pub type StoreResult<T> = Result<T, DomainError>;

// ============================================================================
// Persistence
// ============================================================================

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Durably record a chat message sent by a user into a room or session
    async fn store_message(&self, user_id: &UserId, room_or_session: &str, text: &str)
        -> StoreResult<()>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document snapshot, `Ok(None)` when it does not exist
    async fn fetch_document(&self, document_id: &str) -> StoreResult<Option<DocumentSnapshot>>;
}

// ============================================================================
// Responder
// ============================================================================

/// Everything the responder gets to see for one generation
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub user_id: UserId,
    pub context: Option<ContextRef>,
    /// Recent history, oldest first, already cut to the replay window
    pub history: Vec<ChatMessage>,
    pub prompt: String,
}

#[async_trait]
pub trait Responder: Send + Sync {
    /// Generate a reply for the prompt
    async fn generate(&self, prompt: PromptContext) -> StoreResult<String>;
}
