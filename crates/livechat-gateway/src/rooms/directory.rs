//! Room directory
//!
//! Join/leave and broadcast over the registry's room table. Membership changes
//! take the registry write lock so both sides of the relation move together;
//! broadcasts resolve members and send under the read lock, so a connection
//! that has been unregistered can never be reached.

use crate::connection::{Audience, ConnectionRegistry};
use crate::protocol::{Envelope, TypingPayload};
use livechat_core::{ConnectionId, RoomId, UserId};
use std::collections::HashSet;
use std::sync::Arc;

/// Result of a join or leave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    /// Membership changed
    Changed,
    /// Already joined (join) or not joined (leave)
    Unchanged,
    /// Connection is not registered
    UnknownConnection,
}

impl MembershipChange {
    pub fn is_changed(self) -> bool {
        matches!(self, Self::Changed)
    }
}

/// Room operations over the connection registry
#[derive(Debug, Clone)]
pub struct RoomDirectory {
    registry: Arc<ConnectionRegistry>,
}

impl RoomDirectory {
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Add a connection to a room (idempotent)
    pub fn join(&self, connection_id: ConnectionId, room: &RoomId) -> MembershipChange {
        let mut state = self.registry.write();
        if !state.connections.contains_key(&connection_id) {
            return MembershipChange::UnknownConnection;
        }
        if state.rooms.join(connection_id, room) {
            tracing::debug!(connection_id = %connection_id, room = %room, "Joined room");
            MembershipChange::Changed
        } else {
            MembershipChange::Unchanged
        }
    }

    /// Remove a connection from a room (idempotent)
    ///
    /// If the user has no other connection left in the room, their typing
    /// indicator there is cleared and the stop is announced.
    pub fn leave(&self, connection_id: ConnectionId, room: &RoomId) -> MembershipChange {
        let (change, stopped_typing) = {
            let mut guard = self.registry.write();
            let state = &mut *guard;
            let Some(user_id) = state.user_of(connection_id).cloned() else {
                return MembershipChange::UnknownConnection;
            };
            if !state.rooms.leave(connection_id, room) {
                return MembershipChange::Unchanged;
            }

            let stopped = (!state.user_in_room(&user_id, room)
                && state.presence.stop_typing(room, &user_id))
            .then_some(user_id);
            (MembershipChange::Changed, stopped)
        };

        tracing::debug!(connection_id = %connection_id, room = %room, "Left room");

        if let Some(user_id) = stopped_typing {
            let envelope = Envelope::typing(TypingPayload {
                room: room.clone(),
                user_id: user_id.clone(),
                typing: false,
            })
            .with_sender(user_id.clone());
            self.broadcast(room, envelope, Some(&user_id));
        }
        change
    }

    /// Send to every connection in the room except those owned by `exclude`
    pub fn broadcast(&self, room: &RoomId, envelope: Envelope, exclude: Option<&UserId>) -> usize {
        let delivered = self
            .registry
            .deliver(&Audience::Room(room.clone()), exclude, &envelope);
        tracing::trace!(room = %room, kind = %envelope.kind(), delivered, "Room broadcast");
        delivered
    }

    /// Send to every live connection except those owned by `exclude`
    pub fn broadcast_all(&self, envelope: Envelope, exclude: Option<&UserId>) -> usize {
        self.registry.deliver(&Audience::Everyone, exclude, &envelope)
    }

    /// Users with at least one connection in the room
    pub fn members_of(&self, room: &RoomId) -> HashSet<UserId> {
        let state = self.registry.read();
        state
            .rooms
            .members(room)
            .filter_map(|id| state.user_of(id).cloned())
            .collect()
    }

    /// Rooms a connection has joined
    pub fn rooms_of(&self, connection_id: ConnectionId) -> Vec<RoomId> {
        self.registry
            .read()
            .rooms
            .subscriptions(connection_id)
            .cloned()
            .collect()
    }

    pub fn is_member(&self, connection_id: ConnectionId, room: &RoomId) -> bool {
        self.registry.read().rooms.is_member(connection_id, room)
    }

    pub fn room_count(&self) -> usize {
        self.registry.room_count()
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{DisconnectReason, Outbound, Registration};
    use crate::offline::OfflineQueue;
    use crate::protocol::{ClientInfo, EnvelopeKind, ResourceEventPayload};
    use tokio::sync::mpsc;

    struct Fixture {
        rooms: RoomDirectory,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = ConnectionRegistry::new_shared(Arc::new(OfflineQueue::new(10)));
            Self {
                rooms: RoomDirectory::new(registry),
            }
        }

        fn connect(&self, name: &str) -> (Registration, mpsc::Receiver<Outbound>) {
            let (tx, rx) = mpsc::channel(64);
            let reg = self.rooms.registry().register(
                UserId::parse(name).unwrap(),
                tx,
                ClientInfo::default(),
            );
            (reg, rx)
        }
    }

    fn room(name: &str) -> RoomId {
        RoomId::parse(name).unwrap()
    }

    fn user(name: &str) -> UserId {
        UserId::parse(name).unwrap()
    }

    fn kinds(rx: &mut mpsc::Receiver<Outbound>) -> Vec<EnvelopeKind> {
        std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|out| match out {
                Outbound::Envelope(env) => Some(env.kind()),
                Outbound::Close(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_join_twice_same_as_once() {
        let fx = Fixture::new();
        let (a, _rx) = fx.connect("alice");

        assert_eq!(fx.rooms.join(a.connection_id, &room("r")), MembershipChange::Changed);
        let once = fx.rooms.members_of(&room("r"));
        assert_eq!(fx.rooms.join(a.connection_id, &room("r")), MembershipChange::Unchanged);

        assert_eq!(fx.rooms.members_of(&room("r")), once);
        assert_eq!(fx.rooms.rooms_of(a.connection_id), vec![room("r")]);
        assert!(fx.rooms.registry().read().rooms.is_consistent());
    }

    #[test]
    fn test_unknown_connection() {
        let fx = Fixture::new();
        let ghost = ConnectionId::next();
        assert_eq!(fx.rooms.join(ghost, &room("r")), MembershipChange::UnknownConnection);
        assert_eq!(fx.rooms.leave(ghost, &room("r")), MembershipChange::UnknownConnection);
        assert_eq!(fx.rooms.room_count(), 0);
    }

    #[test]
    fn test_broadcast_excludes_user() {
        let fx = Fixture::new();
        let (a1, mut a1_rx) = fx.connect("a");
        let (a2, mut a2_rx) = fx.connect("a");
        let (b, mut b_rx) = fx.connect("b");
        let (c, mut c_rx) = fx.connect("c");
        for id in [a1.connection_id, a2.connection_id, b.connection_id, c.connection_id] {
            fx.rooms.join(id, &room("R"));
        }
        for rx in [&mut a1_rx, &mut a2_rx, &mut b_rx, &mut c_rx] {
            kinds(rx);
        }

        let delivered = fx.rooms.broadcast(&room("R"), Envelope::heartbeat(), Some(&user("b")));

        // connections(A) + connections(C)
        assert_eq!(delivered, 3);
        assert_eq!(kinds(&mut a1_rx), vec![EnvelopeKind::Heartbeat]);
        assert_eq!(kinds(&mut a2_rx), vec![EnvelopeKind::Heartbeat]);
        assert_eq!(kinds(&mut c_rx), vec![EnvelopeKind::Heartbeat]);
        assert!(kinds(&mut b_rx).is_empty());
    }

    #[test]
    fn test_lifecycle_notices_reach_room() {
        let fx = Fixture::new();
        let (agent, mut agent_rx) = fx.connect("agent");
        let (_outsider, mut outsider_rx) = fx.connect("outsider");
        fx.rooms.join(agent.connection_id, &room("deal-42"));
        kinds(&mut agent_rx);
        kinds(&mut outsider_rx);

        let document = Envelope::document_event(ResourceEventPayload {
            id: "doc-7".to_string(),
            event: "updated".to_string(),
            details: serde_json::json!({"revision": 3}),
        });
        let quote = Envelope::quote_event(ResourceEventPayload {
            id: "Q-2".to_string(),
            event: "accepted".to_string(),
            details: serde_json::Value::Null,
        });
        assert_eq!(fx.rooms.broadcast(&room("deal-42"), document, None), 1);
        assert_eq!(fx.rooms.broadcast(&room("deal-42"), quote, None), 1);

        let received: Vec<Envelope> = std::iter::from_fn(|| agent_rx.try_recv().ok())
            .filter_map(|out| match out {
                Outbound::Envelope(env) => Some(env),
                Outbound::Close(_) => None,
            })
            .collect();
        assert_eq!(received[0].kind(), EnvelopeKind::DocumentEvent);
        let doc: ResourceEventPayload = received[0].decode_data().unwrap();
        assert_eq!(doc.details["revision"], 3);
        assert_eq!(received[1].kind(), EnvelopeKind::QuoteEvent);
        assert!(received[1].data().get("details").is_none());
        assert!(kinds(&mut outsider_rx).is_empty());
    }

    #[test]
    fn test_members_deduplicated_by_user() {
        let fx = Fixture::new();
        let tabs: Vec<_> = (0..3).map(|_| fx.connect("alice")).collect();
        let (bob, _rx) = fx.connect("bob");
        for (reg, _) in &tabs {
            fx.rooms.join(reg.connection_id, &room("r"));
        }
        fx.rooms.join(bob.connection_id, &room("r"));

        let members = fx.rooms.members_of(&room("r"));
        assert_eq!(members.len(), 2);
        assert!(members.contains(&user("alice")));
    }

    #[test]
    fn test_broadcast_skips_failed_connection_only() {
        let fx = Fixture::new();
        let (a, mut a_rx) = fx.connect("a");
        let (b, b_rx) = fx.connect("b");
        fx.rooms.join(a.connection_id, &room("r"));
        fx.rooms.join(b.connection_id, &room("r"));
        drop(b_rx);
        kinds(&mut a_rx);

        assert_eq!(fx.rooms.broadcast(&room("r"), Envelope::heartbeat(), None), 1);
        assert!(!fx.rooms.is_member(b.connection_id, &room("r")));
        assert!(kinds(&mut a_rx).contains(&EnvelopeKind::Heartbeat));
    }

    #[test]
    fn test_unregister_releases_rooms() {
        let fx = Fixture::new();
        let (a, _rx) = fx.connect("a");
        fx.rooms.join(a.connection_id, &room("x"));
        fx.rooms.join(a.connection_id, &room("y"));

        fx.rooms
            .registry()
            .unregister(a.connection_id, DisconnectReason::ClientClosed);

        assert_eq!(fx.rooms.room_count(), 0);
        assert!(fx.rooms.members_of(&room("x")).is_empty());
        assert!(fx.rooms.registry().read().rooms.is_consistent());
    }

    #[test]
    fn test_leave_stops_typing_when_last_tab_leaves() {
        let fx = Fixture::new();
        let (a1, _rx1) = fx.connect("a");
        let (a2, _rx2) = fx.connect("a");
        let (b, mut b_rx) = fx.connect("b");
        for id in [a1.connection_id, a2.connection_id, b.connection_id] {
            fx.rooms.join(id, &room("r"));
        }
        fx.rooms
            .registry()
            .write()
            .presence
            .start_typing(&room("r"), &user("a"));
        kinds(&mut b_rx);

        fx.rooms.leave(a1.connection_id, &room("r"));
        assert!(fx.rooms.registry().read().presence.is_typing(&room("r"), &user("a")));
        assert!(kinds(&mut b_rx).is_empty());

        fx.rooms.leave(a2.connection_id, &room("r"));
        assert!(!fx.rooms.registry().read().presence.is_typing(&room("r"), &user("a")));
        assert_eq!(kinds(&mut b_rx), vec![EnvelopeKind::Typing]);
    }
}
