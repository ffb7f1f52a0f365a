//! Chat message entity - one entry of a session's conversation history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// Maximum accepted message length in characters
pub const MAX_CONTENT_LEN: usize = 4000;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// Chat message entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<UserId>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    fn new(role: MessageRole, author: Option<UserId>, content: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            author,
            content,
            created_at: Utc::now(),
        }
    }

    /// Create a message written by a user
    pub fn user(author: UserId, content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, Some(author), content.into())
    }

    /// Create a message produced by the responder
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, None, content.into())
    }

    /// Create a system notice
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, None, content.into())
    }

    /// Validate user-supplied content
    pub fn validate_content(content: &str) -> Result<(), crate::DomainError> {
        if content.trim().is_empty() {
            return Err(crate::DomainError::ValidationError(
                "content must not be empty".to_string(),
            ));
        }
        if content.chars().count() > MAX_CONTENT_LEN {
            return Err(crate::DomainError::ContentTooLong {
                max: MAX_CONTENT_LEN,
            });
        }
        Ok(())
    }

    /// Get a truncated preview of the message (for logs and notices)
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.content.char_indices().nth(max_chars) {
            Some((end, _)) => &self.content[..end],
            None => &self.content,
        }
    }
}
