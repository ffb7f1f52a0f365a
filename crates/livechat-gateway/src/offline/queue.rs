//! Offline queue
//!
//! In-memory, best-effort. Each user's backlog is a ring buffer: once it holds
//! `capacity` envelopes, enqueuing evicts the oldest one. Backlogs nobody has
//! written to for a while are dropped by [`OfflineQueue::expire_older_than`].

use crate::protocol::Envelope;
use dashmap::DashMap;
use livechat_core::UserId;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
struct Backlog {
    envelopes: VecDeque<Envelope>,
    updated: Instant,
}

impl Default for Backlog {
    fn default() -> Self {
        Self {
            envelopes: VecDeque::new(),
            updated: Instant::now(),
        }
    }
}

/// Per-user bounded backlog
pub struct OfflineQueue {
    capacity: usize,
    queues: DashMap<UserId, Backlog>,
}

impl OfflineQueue {
    /// Create a queue holding at most `capacity` envelopes per user
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            queues: DashMap::new(),
        }
    }

    /// Append an envelope, returning the evicted oldest entry if the bound was hit
    pub fn enqueue(&self, user_id: &UserId, envelope: Envelope) -> Option<Envelope> {
        let mut backlog = self.queues.entry(user_id.clone()).or_default();
        let evicted = if backlog.envelopes.len() >= self.capacity {
            backlog.envelopes.pop_front()
        } else {
            None
        };
        backlog.envelopes.push_back(envelope);
        backlog.updated = Instant::now();

        if evicted.is_some() {
            tracing::debug!(user_id = %user_id, capacity = self.capacity, "Offline queue full, evicted oldest");
        }
        evicted
    }

    /// Remove and return everything queued for the user, oldest first
    pub fn drain(&self, user_id: &UserId) -> Vec<Envelope> {
        self.queues
            .remove(user_id)
            .map(|(_, backlog)| backlog.envelopes.into_iter().collect())
            .unwrap_or_default()
    }

    /// Number of envelopes queued for one user
    pub fn len(&self, user_id: &UserId) -> usize {
        self.queues.get(user_id).map_or(0, |b| b.envelopes.len())
    }

    /// Whether nothing is queued for the user
    pub fn is_empty(&self, user_id: &UserId) -> bool {
        self.len(user_id) == 0
    }

    /// Number of envelopes queued across all users
    pub fn total(&self) -> usize {
        self.queues.iter().map(|b| b.envelopes.len()).sum()
    }

    /// Number of users with a backlog
    pub fn user_count(&self) -> usize {
        self.queues.len()
    }

    /// Drop backlogs whose last enqueue is more than `ttl` ago, returning how
    /// many users lost theirs
    pub fn expire_older_than(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let before = self.queues.len();
        self.queues
            .retain(|_, backlog| now.saturating_duration_since(backlog.updated) <= ttl);
        let expired = before.saturating_sub(self.queues.len());

        if expired > 0 {
            tracing::info!(expired, ttl_secs = ttl.as_secs(), "Expired offline backlogs");
        }
        expired
    }

    /// Configured per-user bound
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SystemPayload;

    fn numbered(n: usize) -> Envelope {
        Envelope::system(SystemPayload {
            event: format!("m{n}"),
            ..SystemPayload::default()
        })
    }

    fn event(env: &Envelope) -> String {
        env.decode_data::<SystemPayload>().unwrap().event
    }

    fn alice() -> UserId {
        UserId::parse("alice").unwrap()
    }

    #[test]
    fn test_bound_evicts_oldest() {
        let queue = OfflineQueue::new(3);
        for n in 0..3 {
            assert!(queue.enqueue(&alice(), numbered(n)).is_none());
        }

        let evicted = queue.enqueue(&alice(), numbered(3)).unwrap();
        assert_eq!(event(&evicted), "m0");
        assert_eq!(queue.len(&alice()), 3);

        let drained: Vec<_> = queue.drain(&alice()).iter().map(event).collect();
        assert_eq!(drained, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn test_drain_preserves_order_and_clears() {
        let queue = OfflineQueue::new(10);
        for n in 0..5 {
            queue.enqueue(&alice(), numbered(n));
        }

        let drained: Vec<_> = queue.drain(&alice()).iter().map(event).collect();
        assert_eq!(drained, vec!["m0", "m1", "m2", "m3", "m4"]);
        assert!(queue.is_empty(&alice()));
        assert!(queue.drain(&alice()).is_empty());
    }

    #[test]
    fn test_users_are_independent() {
        let queue = OfflineQueue::new(2);
        let bob = UserId::parse("bob").unwrap();
        queue.enqueue(&alice(), numbered(1));
        queue.enqueue(&bob, numbered(2));
        queue.enqueue(&bob, numbered(3));

        assert_eq!(queue.len(&alice()), 1);
        assert_eq!(queue.len(&bob), 2);
        assert_eq!(queue.total(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_backlogs_expire() {
        let queue = OfflineQueue::new(10);
        let bob = UserId::parse("bob").unwrap();
        queue.enqueue(&alice(), numbered(1));
        queue.enqueue(&bob, numbered(2));

        tokio::time::advance(Duration::from_secs(50)).await;
        // A fresh enqueue keeps bob's backlog alive
        queue.enqueue(&bob, numbered(3));
        tokio::time::advance(Duration::from_secs(20)).await;

        assert_eq!(queue.expire_older_than(Duration::from_secs(60)), 1);
        assert!(queue.is_empty(&alice()));
        assert_eq!(queue.len(&bob), 2);
        assert_eq!(queue.user_count(), 1);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let queue = OfflineQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        queue.enqueue(&alice(), numbered(1));
        queue.enqueue(&alice(), numbered(2));
        assert_eq!(queue.len(&alice()), 1);
    }
}
