//! Collaborator adapters
//!
//! In-process implementations of the persistence and responder ports.

mod memory;

pub use memory::{EchoResponder, InMemoryDocumentStore, InMemoryMessageStore, StoredMessage};

use livechat_core::{DocumentStore, MessageStore, Responder};
use std::sync::Arc;

/// The external collaborators the gateway calls into
#[derive(Clone)]
pub struct Collaborators {
    pub messages: Arc<dyn MessageStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub responder: Arc<dyn Responder>,
}

impl Collaborators {
    pub fn new(
        messages: Arc<dyn MessageStore>,
        documents: Arc<dyn DocumentStore>,
        responder: Arc<dyn Responder>,
    ) -> Self {
        Self {
            messages,
            documents,
            responder,
        }
    }

    /// In-memory stores and the echo responder
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryMessageStore::new()),
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(EchoResponder),
        )
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
