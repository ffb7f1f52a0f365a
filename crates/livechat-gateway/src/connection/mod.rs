//! Connection management
//!
//! Live connections, the user index, and targeted delivery.

mod connection;
mod registry;

pub use connection::{Connection, DisconnectReason, Outbound};
pub use registry::{ConnectionRegistry, Delivery, Registration};
pub(crate) use registry::{Audience, RegistryState};
