//! Connection registry
//!
//! Owns every live connection together with the user index, room membership and
//! presence. All four live behind one lock so a registration, a departure or a
//! room change is applied as a single step and readers never see half of it.
//!
//! Lock order is registry state, then offline queue. Nothing in this module
//! sends on a socket while holding the write lock except the offline flush,
//! which only fills the connection's channel.

use super::{Connection, DisconnectReason, Outbound};
use crate::offline::OfflineQueue;
use crate::presence::{PresenceTracker, UserStatus};
use crate::protocol::{ClientInfo, Envelope, PresencePayload, TypingPayload};
use crate::rooms::RoomTable;
use livechat_core::{ConnectionId, RoomId, UserId};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Everything guarded by the registry lock
#[derive(Debug, Default)]
pub(crate) struct RegistryState {
    pub(crate) connections: HashMap<ConnectionId, Connection>,
    pub(crate) user_connections: HashMap<UserId, HashSet<ConnectionId>>,
    pub(crate) rooms: RoomTable,
    pub(crate) presence: PresenceTracker,
}

impl RegistryState {
    pub(crate) fn user_of(&self, connection_id: ConnectionId) -> Option<&UserId> {
        self.connections.get(&connection_id).map(Connection::user_id)
    }

    /// Whether any connection of the user is in the room
    pub(crate) fn user_in_room(&self, user_id: &UserId, room: &RoomId) -> bool {
        self.user_connections
            .get(user_id)
            .is_some_and(|conns| conns.iter().any(|c| self.rooms.is_member(*c, room)))
    }
}

/// Who an envelope is addressed to
#[derive(Debug, Clone)]
pub(crate) enum Audience {
    Connection(ConnectionId),
    User(UserId),
    Room(RoomId),
    Everyone,
}

/// Result of a successful registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub connection_id: ConnectionId,
    /// True when this is the user's only connection
    pub came_online: bool,
    /// Offline envelopes flushed to the new connection
    pub flushed: usize,
}

/// Outcome of a user-addressed delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Sent to this many live connections
    Delivered(usize),
    /// User had no live connection, envelope went to the offline queue
    Queued,
}

/// Notice produced by a departure, delivered after the lock is released
struct Notice {
    audience: Audience,
    exclude: Option<UserId>,
    envelope: Envelope,
}

/// Tracks all live connections
pub struct ConnectionRegistry {
    state: RwLock<RegistryState>,
    offline: Arc<OfflineQueue>,
}

impl ConnectionRegistry {
    /// Create a registry flushing from the given offline queue
    #[must_use]
    pub fn new(offline: Arc<OfflineQueue>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            offline,
        }
    }

    /// Create a registry wrapped in Arc
    #[must_use]
    pub fn new_shared(offline: Arc<OfflineQueue>) -> Arc<Self> {
        Arc::new(Self::new(offline))
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write()
    }

    pub fn offline(&self) -> &Arc<OfflineQueue> {
        &self.offline
    }

    // === Lifecycle ===

    /// Register an authenticated connection
    ///
    /// If this is the user's first connection the user goes online and the
    /// offline queue is flushed, oldest first, into `sender` before any other
    /// traffic can reach it.
    pub fn register(
        &self,
        user_id: UserId,
        sender: mpsc::Sender<Outbound>,
        metadata: ClientInfo,
    ) -> Registration {
        self.register_as(ConnectionId::next(), user_id, sender, metadata)
    }

    /// Register under an id allocated earlier with [`ConnectionId::next`]
    pub fn register_as(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        sender: mpsc::Sender<Outbound>,
        metadata: ClientInfo,
    ) -> Registration {
        let connection = Connection::new(connection_id, user_id.clone(), metadata, sender);

        let (came_online, flushed, flush_failed) = {
            let mut guard = self.state.write();
            let state = &mut *guard;

            let conns = state.user_connections.entry(user_id.clone()).or_default();
            let came_online = conns.is_empty();
            conns.insert(connection_id);

            let mut flushed = 0;
            let mut flush_failed = false;
            if came_online {
                state.presence.set_online(&user_id);

                let mut backlog = VecDeque::from(self.offline.drain(&user_id));
                while let Some(envelope) = backlog.pop_front() {
                    if let Err(envelope) = connection.try_send(envelope) {
                        // Put the unsent tail back; nothing else can enqueue for
                        // this user while the write lock is held.
                        self.offline.enqueue(&user_id, envelope);
                        for envelope in backlog.drain(..) {
                            self.offline.enqueue(&user_id, envelope);
                        }
                        flush_failed = true;
                        break;
                    }
                    flushed += 1;
                }
            }

            state.connections.insert(connection_id, connection);
            (came_online, flushed, flush_failed)
        };

        tracing::info!(
            connection_id = %connection_id,
            user_id = %user_id,
            came_online,
            flushed,
            "Connection registered"
        );

        if came_online {
            self.deliver(
                &Audience::Everyone,
                Some(&user_id),
                &Envelope::presence_update(PresencePayload {
                    user_id: user_id.clone(),
                    status: UserStatus::Online,
                }),
            );
        }

        if flush_failed {
            tracing::warn!(connection_id = %connection_id, "Offline flush overflowed send buffer");
            self.unregister(connection_id, DisconnectReason::SendError);
        }

        Registration {
            connection_id,
            came_online,
            flushed,
        }
    }

    /// Remove a connection from the registry, its rooms and its user
    ///
    /// If it was the user's last connection the user goes offline and stops
    /// typing everywhere; otherwise typing stops only in rooms the user no
    /// longer has a connection in. Returns `false` for unknown ids.
    pub fn unregister(&self, connection_id: ConnectionId, reason: DisconnectReason) -> bool {
        self.unregister_checked(connection_id, reason, None)
    }

    /// Unregister a connection only if it is still idle for longer than `timeout`
    ///
    /// The idle check runs under the write lock, so activity recorded after an
    /// [`idle_connections`](Self::idle_connections) snapshot keeps it alive.
    pub fn unregister_if_idle(
        &self,
        connection_id: ConnectionId,
        timeout: Duration,
        reason: DisconnectReason,
    ) -> bool {
        self.unregister_checked(connection_id, reason, Some(timeout))
    }

    fn unregister_checked(
        &self,
        connection_id: ConnectionId,
        reason: DisconnectReason,
        idle_limit: Option<Duration>,
    ) -> bool {
        let mut pending = VecDeque::from([(connection_id, reason, idle_limit)]);
        let mut removed = false;

        while let Some((id, reason, idle_limit)) = pending.pop_front() {
            let Some(notices) = self.remove(id, reason, idle_limit) else {
                continue;
            };
            removed |= id == connection_id;

            for notice in notices {
                let (_, failed) =
                    self.deliver_inner(&notice.audience, notice.exclude.as_ref(), &notice.envelope);
                pending.extend(
                    failed
                        .into_iter()
                        .map(|id| (id, DisconnectReason::SendError, None)),
                );
            }
        }
        removed
    }

    fn remove(
        &self,
        connection_id: ConnectionId,
        reason: DisconnectReason,
        idle_limit: Option<Duration>,
    ) -> Option<Vec<Notice>> {
        let (connection, rooms, last, typing_stopped) = {
            let mut guard = self.state.write();
            let state = &mut *guard;

            if let Some(timeout) = idle_limit {
                let idle = state.connections.get(&connection_id)?.idle_for(Instant::now());
                if idle <= timeout {
                    return None;
                }
            }
            let connection = state.connections.remove(&connection_id)?;
            let user_id = connection.user_id().clone();
            let rooms = state.rooms.remove_connection(connection_id);

            let last = match state.user_connections.get_mut(&user_id) {
                Some(conns) => {
                    conns.remove(&connection_id);
                    conns.is_empty()
                }
                None => true,
            };

            let typing_stopped = if last {
                state.user_connections.remove(&user_id);
                state.presence.set_offline(&user_id)
            } else {
                let mut stopped = Vec::new();
                for room in &rooms {
                    if !state.user_in_room(&user_id, room) && state.presence.stop_typing(room, &user_id) {
                        stopped.push(room.clone());
                    }
                }
                stopped
            };

            (connection, rooms, last, typing_stopped)
        };

        if let Some(code) = reason.close_code() {
            connection.close(code);
        }

        let user_id = connection.user_id().clone();
        tracing::info!(
            connection_id = %connection_id,
            user_id = %user_id,
            reason = %reason,
            rooms = rooms.len(),
            went_offline = last,
            "Connection unregistered"
        );

        // Dropping the connection drops its sender, which ends the writer
        drop(connection);

        let mut notices: Vec<Notice> = typing_stopped
            .into_iter()
            .map(|room| Notice {
                audience: Audience::Room(room.clone()),
                exclude: Some(user_id.clone()),
                envelope: Envelope::typing(TypingPayload {
                    room,
                    user_id: user_id.clone(),
                    typing: false,
                })
                .with_sender(user_id.clone()),
            })
            .collect();

        if last {
            notices.push(Notice {
                audience: Audience::Everyone,
                exclude: Some(user_id.clone()),
                envelope: Envelope::presence_update(PresencePayload {
                    user_id,
                    status: UserStatus::Offline,
                }),
            });
        }
        Some(notices)
    }

    // === Delivery ===

    /// Send one envelope to a connection
    ///
    /// A failed send unregisters the connection with reason "send error" and
    /// returns `false`. Unknown ids return `false`.
    pub fn send_to(&self, connection_id: ConnectionId, envelope: Envelope) -> bool {
        self.deliver(&Audience::Connection(connection_id), None, &envelope) > 0
    }

    /// Send to every live connection of a user, returning how many succeeded
    pub fn send_to_user(&self, user_id: &UserId, envelope: Envelope) -> usize {
        self.deliver(&Audience::User(user_id.clone()), None, &envelope)
    }

    /// Send to a user's connections, or queue for them if they have none
    pub fn deliver_or_enqueue(&self, user_id: &UserId, envelope: Envelope) -> Delivery {
        let (delivered, failed) = {
            let state = self.state.read();
            match state.user_connections.get(user_id) {
                Some(conns) if !conns.is_empty() => {
                    let mut delivered = 0;
                    let mut failed = Vec::new();
                    for id in conns {
                        if let Some(conn) = state.connections.get(id) {
                            if conn.send(envelope.clone()) {
                                delivered += 1;
                            } else {
                                failed.push(*id);
                            }
                        }
                    }
                    (delivered, failed)
                }
                _ => {
                    // Registration drains under the write lock, so this cannot
                    // slip in between a drain and the new connection's insert.
                    self.offline.enqueue(user_id, envelope);
                    tracing::debug!(user_id = %user_id, "Queued for offline user");
                    return Delivery::Queued;
                }
            }
        };

        let had_failures = !failed.is_empty();
        for id in failed {
            self.unregister(id, DisconnectReason::SendError);
        }
        if delivered == 0 && had_failures {
            // Every connection just failed; the user may be offline now
            return self.deliver_or_enqueue(user_id, envelope);
        }
        Delivery::Delivered(delivered)
    }

    /// Deliver to an audience, unregistering connections whose send fails
    pub(crate) fn deliver(
        &self,
        audience: &Audience,
        exclude: Option<&UserId>,
        envelope: &Envelope,
    ) -> usize {
        let (delivered, failed) = self.deliver_inner(audience, exclude, envelope);
        for id in failed {
            self.unregister(id, DisconnectReason::SendError);
        }
        delivered
    }

    /// Deliver under the read lock; returns successes and failed ids
    fn deliver_inner(
        &self,
        audience: &Audience,
        exclude: Option<&UserId>,
        envelope: &Envelope,
    ) -> (usize, Vec<ConnectionId>) {
        let state = self.state.read();
        let targets: Vec<ConnectionId> = match audience {
            Audience::Connection(id) => vec![*id],
            Audience::User(user_id) => state
                .user_connections
                .get(user_id)
                .map(|conns| conns.iter().copied().collect())
                .unwrap_or_default(),
            Audience::Room(room) => state.rooms.members(room).collect(),
            Audience::Everyone => state.connections.keys().copied().collect(),
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        for id in targets {
            let Some(conn) = state.connections.get(&id) else {
                continue;
            };
            if exclude.is_some_and(|user| conn.user_id() == user) {
                continue;
            }
            if conn.send(envelope.clone()) {
                delivered += 1;
            } else {
                failed.push(id);
            }
        }
        (delivered, failed)
    }

    // === Activity ===

    /// Record inbound activity; `false` for unknown ids
    pub fn touch(&self, connection_id: ConnectionId) -> bool {
        match self.state.read().connections.get(&connection_id) {
            Some(conn) => {
                conn.touch();
                true
            }
            None => false,
        }
    }

    /// Connections idle for longer than `timeout`
    pub fn idle_connections(&self, timeout: Duration) -> Vec<ConnectionId> {
        let now = Instant::now();
        self.state
            .read()
            .connections
            .values()
            .filter(|conn| conn.idle_for(now) > timeout)
            .map(Connection::id)
            .collect()
    }

    // === Queries ===

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.state.read().connections.contains_key(&connection_id)
    }

    pub fn user_of(&self, connection_id: ConnectionId) -> Option<UserId> {
        self.state.read().user_of(connection_id).cloned()
    }

    pub fn connections_of(&self, user_id: &UserId) -> Vec<ConnectionId> {
        self.state
            .read()
            .user_connections
            .get(user_id)
            .map(|conns| conns.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn metadata_of(&self, connection_id: ConnectionId) -> Option<ClientInfo> {
        self.state
            .read()
            .connections
            .get(&connection_id)
            .map(|conn| conn.metadata().clone())
    }

    pub fn status_of(&self, user_id: &UserId) -> UserStatus {
        self.state.read().presence.status(user_id)
    }

    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.state.read().user_connections.contains_key(user_id)
    }

    pub fn connection_count(&self) -> usize {
        self.state.read().connections.len()
    }

    pub fn user_count(&self) -> usize {
        self.state.read().user_connections.len()
    }

    pub fn room_count(&self) -> usize {
        self.state.read().rooms.room_count()
    }

    /// Unregister every connection
    pub fn shutdown(&self) -> usize {
        let ids: Vec<ConnectionId> = self.state.read().connections.keys().copied().collect();
        ids.into_iter()
            .filter(|id| self.unregister(*id, DisconnectReason::Shutdown))
            .count()
    }

    /// Presence matches the user index for every user
    #[cfg(test)]
    pub(crate) fn presence_is_consistent(&self) -> bool {
        let state = self.state.read();
        let online: HashSet<&UserId> = state.user_connections.keys().collect();
        let tracked: HashSet<&UserId> = state.presence.connected_users().collect();
        online == tracked && state.user_connections.values().all(|c| !c.is_empty())
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.connection_count())
            .field("users", &self.user_count())
            .finish_non_exhaustive()
    }
}
