//! Session and offline-backlog sweepers

use super::PeriodicTask;
use crate::offline::OfflineQueue;
use crate::session::SessionStore;
use std::sync::Arc;
use std::time::Duration;

/// Expires sessions idle for longer than the TTL
#[derive(Debug, Clone)]
pub struct SessionSweeper {
    sessions: Arc<SessionStore>,
    ttl: Duration,
}

impl SessionSweeper {
    pub fn new(sessions: Arc<SessionStore>, ttl: Duration) -> Self {
        Self { sessions, ttl }
    }
}

impl PeriodicTask for SessionSweeper {
    fn name(&self) -> &'static str {
        "session_sweeper"
    }

    fn run_once(&self) -> usize {
        self.sessions.expire_older_than(self.ttl)
    }
}

/// Drops offline backlogs of users who have not been sent anything for longer
/// than the TTL
#[derive(Clone)]
pub struct OfflineQueueSweeper {
    offline: Arc<OfflineQueue>,
    ttl: Duration,
}

impl OfflineQueueSweeper {
    pub fn new(offline: Arc<OfflineQueue>, ttl: Duration) -> Self {
        Self { offline, ttl }
    }
}

impl PeriodicTask for OfflineQueueSweeper {
    fn name(&self) -> &'static str {
        "offline_queue_sweeper"
    }

    fn run_once(&self) -> usize {
        self.offline.expire_older_than(self.ttl)
    }
}
