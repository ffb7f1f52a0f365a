//! Presence and typing state
//!
//! A plain state holder. Presence here is a projection of the registry: the
//! registry flips users online/offline as their first/last connection comes and
//! goes, always while holding its own lock.

use super::UserStatus;
use livechat_core::{RoomId, UserId};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct PresenceTracker {
    /// Users with at least one connection; absent means offline
    statuses: HashMap<UserId, UserStatus>,
    typing: HashMap<RoomId, HashSet<UserId>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, user_id: &UserId) -> UserStatus {
        self.statuses.get(user_id).copied().unwrap_or_default()
    }

    /// Mark a user online on their first connection
    pub fn set_online(&mut self, user_id: &UserId) {
        self.statuses.insert(user_id.clone(), UserStatus::Online);
    }

    /// Apply an explicit status push from a connected user.
    /// Returns `true` if the status changed.
    pub fn set_status(&mut self, user_id: &UserId, status: UserStatus) -> bool {
        if status == UserStatus::Offline {
            return false;
        }
        match self.statuses.get_mut(user_id) {
            Some(current) if *current != status => {
                *current = status;
                true
            }
            _ => false,
        }
    }

    /// Mark a user offline and clear their typing state everywhere.
    /// Returns the rooms they were typing in.
    pub fn set_offline(&mut self, user_id: &UserId) -> Vec<RoomId> {
        self.statuses.remove(user_id);

        let mut rooms = Vec::new();
        self.typing.retain(|room, users| {
            if users.remove(user_id) {
                rooms.push(room.clone());
            }
            !users.is_empty()
        });
        rooms
    }

    /// Returns `true` if the user was not already typing in the room
    pub fn start_typing(&mut self, room: &RoomId, user_id: &UserId) -> bool {
        self.typing
            .entry(room.clone())
            .or_default()
            .insert(user_id.clone())
    }

    /// Returns `true` if the user was typing in the room
    pub fn stop_typing(&mut self, room: &RoomId, user_id: &UserId) -> bool {
        let Some(users) = self.typing.get_mut(room) else {
            return false;
        };
        let removed = users.remove(user_id);
        if users.is_empty() {
            self.typing.remove(room);
        }
        removed
    }

    pub fn is_typing(&self, room: &RoomId, user_id: &UserId) -> bool {
        self.typing
            .get(room)
            .is_some_and(|users| users.contains(user_id))
    }

    pub fn typing_in(&self, room: &RoomId) -> HashSet<UserId> {
        self.typing.get(room).cloned().unwrap_or_default()
    }

    /// Users currently considered connected
    pub fn connected_users(&self) -> impl Iterator<Item = &UserId> {
        self.statuses.keys()
    }
}
