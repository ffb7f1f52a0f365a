//! Maintenance loop
//!
//! Independent periodic activities: stale-connection reaper, heartbeat
//! broadcaster, session sweeper and offline-backlog sweeper. Each tick runs in its own spawned task so a
//! panic in one tick is logged and the loop carries on.

mod heartbeat;
mod reaper;
mod sweeper;

pub use heartbeat::HeartbeatBroadcaster;
pub use reaper::StaleConnectionReaper;
pub use sweeper::{OfflineQueueSweeper, SessionSweeper};

use crate::server::GatewayState;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Shortest accepted period; `tokio::time::interval` rejects zero
const MIN_PERIOD: Duration = Duration::from_millis(10);

/// One periodic activity
pub trait PeriodicTask: Send + Sync + 'static {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Run one iteration, returning how many items it affected
    fn run_once(&self) -> usize;
}

/// Run `task` every `period` until aborted
pub fn spawn_periodic<T: PeriodicTask>(task: Arc<T>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = task.name();
        let period = period.max(MIN_PERIOD);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        tracing::debug!(task = name, period_ms = period.as_millis() as u64, "Maintenance task started");

        loop {
            ticker.tick().await;

            let tick = task.clone();
            match tokio::spawn(async move { tick.run_once() }).await {
                Ok(affected) => {
                    tracing::trace!(task = name, affected, "Maintenance tick finished");
                }
                Err(e) if e.is_panic() => {
                    tracing::error!(task = name, "Maintenance tick panicked");
                }
                Err(e) => {
                    tracing::warn!(task = name, error = %e, "Maintenance tick cancelled");
                }
            }
        }
    })
}

/// Handle to the running maintenance tasks; aborts them when dropped
#[derive(Debug)]
pub struct Maintenance {
    handles: Vec<JoinHandle<()>>,
}

impl Maintenance {
    /// Start every maintenance task
    pub fn spawn(state: &GatewayState) -> Self {
        let realtime = &state.config().realtime;

        let reaper = StaleConnectionReaper::new(
            state.registry().clone(),
            realtime.stale_connection_timeout(),
        );
        let heartbeat = HeartbeatBroadcaster::new(state.rooms().clone());
        let sweeper = SessionSweeper::new(state.sessions().clone(), realtime.session_ttl());
        let offline_sweeper =
            OfflineQueueSweeper::new(state.offline().clone(), realtime.offline_queue_ttl());

        tracing::info!(
            reaper_interval_secs = realtime.reaper_interval_secs,
            heartbeat_interval_secs = realtime.heartbeat_interval_secs,
            session_sweep_interval_secs = realtime.session_sweep_interval_secs,
            "Starting maintenance loop"
        );

        Self {
            handles: vec![
                spawn_periodic(Arc::new(reaper), realtime.reaper_interval()),
                spawn_periodic(Arc::new(heartbeat), realtime.heartbeat_interval()),
                spawn_periodic(Arc::new(sweeper), realtime.session_sweep_interval()),
                spawn_periodic(Arc::new(offline_sweeper), realtime.session_sweep_interval()),
            ],
        }
    }

    /// Stop all tasks
    pub fn shutdown(&self) {
        for handle in &self.handles {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handles.iter().any(|h| !h.is_finished())
    }
}

impl Drop for Maintenance {
    fn drop(&mut self) {
        self.shutdown();
    }
}
