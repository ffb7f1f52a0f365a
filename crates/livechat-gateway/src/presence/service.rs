//! Presence service
//!
//! Explicit typing and status pushes from connected users. The online/offline
//! transitions themselves are driven by the registry.

use super::UserStatus;
use crate::connection::{Audience, ConnectionRegistry};
use crate::protocol::{Envelope, PresencePayload, TypingPayload};
use livechat_core::{ConnectionId, RoomId, UserId};
use std::collections::HashSet;
use std::sync::Arc;

/// Result of a typing start/stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingChange {
    /// Indicator changed and was announced
    Changed,
    /// Already in the requested state
    Unchanged,
    /// Connection is unknown or has not joined the room
    NotInRoom,
}

#[derive(Debug, Clone)]
pub struct PresenceService {
    registry: Arc<ConnectionRegistry>,
}

impl PresenceService {
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn start_typing(&self, connection_id: ConnectionId, room: &RoomId) -> TypingChange {
        self.set_typing(connection_id, room, true)
    }

    pub fn stop_typing(&self, connection_id: ConnectionId, room: &RoomId) -> TypingChange {
        self.set_typing(connection_id, room, false)
    }

    fn set_typing(&self, connection_id: ConnectionId, room: &RoomId, typing: bool) -> TypingChange {
        let user_id = {
            let mut guard = self.registry.write();
            let state = &mut *guard;
            if !state.rooms.is_member(connection_id, room) {
                return TypingChange::NotInRoom;
            }
            let Some(user_id) = state.user_of(connection_id).cloned() else {
                return TypingChange::NotInRoom;
            };
            let changed = if typing {
                state.presence.start_typing(room, &user_id)
            } else {
                state.presence.stop_typing(room, &user_id)
            };
            if !changed {
                return TypingChange::Unchanged;
            }
            user_id
        };

        let envelope = Envelope::typing(TypingPayload {
            room: room.clone(),
            user_id: user_id.clone(),
            typing,
        })
        .with_sender(user_id.clone());
        self.registry
            .deliver(&Audience::Room(room.clone()), Some(&user_id), &envelope);
        TypingChange::Changed
    }

    /// Apply a status push (`online` or `away`) and announce changes globally.
    /// Returns `true` if the status changed.
    pub fn set_status(&self, connection_id: ConnectionId, status: UserStatus) -> bool {
        let user_id = {
            let mut guard = self.registry.write();
            let state = &mut *guard;
            let Some(user_id) = state.user_of(connection_id).cloned() else {
                return false;
            };
            if !state.presence.set_status(&user_id, status) {
                return false;
            }
            user_id
        };

        tracing::debug!(user_id = %user_id, status = %status, "Presence changed");
        let envelope = Envelope::presence_update(PresencePayload {
            user_id: user_id.clone(),
            status,
        });
        self.registry
            .deliver(&Audience::Everyone, Some(&user_id), &envelope);
        true
    }

    pub fn status_of(&self, user_id: &UserId) -> UserStatus {
        self.registry.status_of(user_id)
    }

    pub fn typing_in(&self, room: &RoomId) -> HashSet<UserId> {
        self.registry.read().presence.typing_in(room)
    }
}
