//! Heartbeat broadcaster
//!
//! Unanswered heartbeats are not a reason to evict; only inactivity is.

use super::PeriodicTask;
use crate::protocol::Envelope;
use crate::rooms::RoomDirectory;

#[derive(Debug, Clone)]
pub struct HeartbeatBroadcaster {
    rooms: RoomDirectory,
}

impl HeartbeatBroadcaster {
    pub fn new(rooms: RoomDirectory) -> Self {
        Self { rooms }
    }
}

impl PeriodicTask for HeartbeatBroadcaster {
    fn name(&self) -> &'static str {
        "heartbeat_broadcaster"
    }

    fn run_once(&self) -> usize {
        let delivered = self.rooms.broadcast_all(Envelope::heartbeat(), None);
        tracing::debug!(delivered, "Heartbeat sent");
        delivered
    }
}
