//! Conversational sessions
//!
//! Sessions outlive connections: a reconnect that names the same session id
//! reattaches to the existing history and context.

mod store;

pub use store::{Attached, Session, SessionError, SessionStore};
