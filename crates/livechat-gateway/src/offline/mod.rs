//! Offline delivery
//!
//! Bounded per-user backlog for users with no live connection.

mod queue;

pub use queue::OfflineQueue;
