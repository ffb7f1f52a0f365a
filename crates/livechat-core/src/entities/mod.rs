//! Domain entities

mod context;
mod message;

pub use context::{ContextKind, ContextRef, DocumentSnapshot};
pub use message::{ChatMessage, MessageRole};
