//! Stale-connection reaper

use super::PeriodicTask;
use crate::connection::{ConnectionRegistry, DisconnectReason};
use std::sync::Arc;
use std::time::Duration;

/// Unregisters connections with no inbound activity for longer than `timeout`
#[derive(Debug, Clone)]
pub struct StaleConnectionReaper {
    registry: Arc<ConnectionRegistry>,
    timeout: Duration,
}

impl StaleConnectionReaper {
    pub fn new(registry: Arc<ConnectionRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }
}

impl PeriodicTask for StaleConnectionReaper {
    fn name(&self) -> &'static str {
        "stale_connection_reaper"
    }

    fn run_once(&self) -> usize {
        let stale = self.registry.idle_connections(self.timeout);
        let reaped = stale
            .into_iter()
            .filter(|id| {
                self.registry
                    .unregister_if_idle(*id, self.timeout, DisconnectReason::StaleConnection)
            })
            .count();

        if reaped > 0 {
            tracing::info!(reaped, timeout_secs = self.timeout.as_secs(), "Reaped stale connections");
        }
        reaped
    }
}
