//! # livechat-core
//!
//! Domain layer containing identifiers, conversation entities, collaborator ports, and domain errors.
//! This crate has zero dependencies on infrastructure (transport, web framework, etc.).

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{ChatMessage, ContextKind, ContextRef, DocumentSnapshot, MessageRole};
pub use error::DomainError;
pub use traits::{DocumentStore, MessageStore, PromptContext, Responder, StoreResult};
pub use value_objects::{ConnectionId, IdParseError, RoomId, SessionId, UserId};
