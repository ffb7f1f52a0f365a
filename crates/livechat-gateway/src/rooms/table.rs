//! Room membership table
//!
//! Both directions of the membership relation live here and are only changed
//! together, so `conn ∈ members[room]` holds exactly when `room ∈ subscriptions[conn]`.
//! The table itself is not synchronized; the registry keeps it under its lock.

use livechat_core::{ConnectionId, RoomId};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct RoomTable {
    members: HashMap<RoomId, HashSet<ConnectionId>>,
    subscriptions: HashMap<ConnectionId, HashSet<RoomId>>,
}

impl RoomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room, creating the room on first join.
    /// Returns `false` if it was already a member.
    pub fn join(&mut self, connection_id: ConnectionId, room: &RoomId) -> bool {
        let added = self
            .members
            .entry(room.clone())
            .or_default()
            .insert(connection_id);
        if added {
            self.subscriptions
                .entry(connection_id)
                .or_default()
                .insert(room.clone());
        }
        added
    }

    /// Remove a connection from a room, dropping the room when it empties.
    /// Returns `false` if it was not a member.
    pub fn leave(&mut self, connection_id: ConnectionId, room: &RoomId) -> bool {
        let Some(members) = self.members.get_mut(room) else {
            return false;
        };
        if !members.remove(&connection_id) {
            return false;
        }
        if members.is_empty() {
            self.members.remove(room);
        }

        if let Some(rooms) = self.subscriptions.get_mut(&connection_id) {
            rooms.remove(room);
            if rooms.is_empty() {
                self.subscriptions.remove(&connection_id);
            }
        }
        true
    }

    /// Remove a connection from every room it joined, returning those rooms
    pub fn remove_connection(&mut self, connection_id: ConnectionId) -> Vec<RoomId> {
        let rooms: Vec<RoomId> = self
            .subscriptions
            .remove(&connection_id)
            .map(|rooms| rooms.into_iter().collect())
            .unwrap_or_default();

        for room in &rooms {
            if let Some(members) = self.members.get_mut(room) {
                members.remove(&connection_id);
                if members.is_empty() {
                    self.members.remove(room);
                }
            }
        }
        rooms
    }

    pub fn members(&self, room: &RoomId) -> impl Iterator<Item = ConnectionId> + '_ {
        self.members.get(room).into_iter().flatten().copied()
    }

    pub fn subscriptions(&self, connection_id: ConnectionId) -> impl Iterator<Item = &RoomId> {
        self.subscriptions.get(&connection_id).into_iter().flatten()
    }

    pub fn is_member(&self, connection_id: ConnectionId, room: &RoomId) -> bool {
        self.members
            .get(room)
            .is_some_and(|members| members.contains(&connection_id))
    }

    /// Number of non-empty rooms
    pub fn room_count(&self) -> usize {
        self.members.len()
    }

    /// Check that both directions agree
    #[cfg(test)]
    pub fn is_consistent(&self) -> bool {
        let forward = self.members.iter().all(|(room, conns)| {
            !conns.is_empty()
                && conns.iter().all(|c| {
                    self.subscriptions
                        .get(c)
                        .is_some_and(|rooms| rooms.contains(room))
                })
        });
        let backward = self.subscriptions.iter().all(|(conn, rooms)| {
            !rooms.is_empty()
                && rooms.iter().all(|r| {
                    self.members
                        .get(r)
                        .is_some_and(|conns| conns.contains(conn))
                })
        });
        forward && backward
    }
}
