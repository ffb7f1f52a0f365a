//! Collaborator traits (ports)

mod collaborators;

pub use collaborators::{DocumentStore, MessageStore, PromptContext, Responder, StoreResult};
