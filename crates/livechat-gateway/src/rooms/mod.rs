//! Rooms
//!
//! Named broadcast groups of connections, created on first join and dropped
//! when the last member leaves.

mod directory;
mod table;

pub use directory::{MembershipChange, RoomDirectory};
pub use table::RoomTable;
