//! Presence and typing indicators

mod service;
mod status;
mod tracker;

pub use service::{PresenceService, TypingChange};
pub use status::UserStatus;
pub use tracker::PresenceTracker;
