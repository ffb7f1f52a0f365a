//! Gateway state
//!
//! Application state for the gateway server.

use crate::collaborators::Collaborators;
use crate::connection::ConnectionRegistry;
use crate::offline::OfflineQueue;
use crate::presence::PresenceService;
use crate::rooms::RoomDirectory;
use crate::session::SessionStore;
use livechat_common::{AppConfig, JwtService};
use serde::Serialize;
use std::sync::Arc;

/// Gateway application state
///
/// Holds all shared dependencies for the gateway server. Cloning is cheap.
#[derive(Clone)]
pub struct GatewayState {
    registry: Arc<ConnectionRegistry>,
    rooms: RoomDirectory,
    presence: PresenceService,
    sessions: Arc<SessionStore>,
    collaborators: Collaborators,
    jwt: Arc<JwtService>,
    config: Arc<AppConfig>,
}

/// Snapshot served by `/stats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GatewayStats {
    pub connections: usize,
    pub users: usize,
    pub rooms: usize,
    pub sessions: usize,
    pub queued: usize,
}

impl GatewayState {
    /// Create a gateway state with in-memory collaborators
    pub fn new(config: AppConfig) -> Self {
        Self::with_collaborators(config, Collaborators::in_memory())
    }

    /// Create a gateway state with the given collaborators
    pub fn with_collaborators(config: AppConfig, collaborators: Collaborators) -> Self {
        let offline = Arc::new(OfflineQueue::new(config.realtime.offline_queue_capacity));
        let registry = ConnectionRegistry::new_shared(offline);
        let jwt = Arc::new(JwtService::new(&config.jwt.secret, config.jwt.token_expiry));

        Self {
            rooms: RoomDirectory::new(registry.clone()),
            presence: PresenceService::new(registry.clone()),
            registry,
            sessions: Arc::new(SessionStore::new()),
            collaborators,
            jwt,
            config: Arc::new(config),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn rooms(&self) -> &RoomDirectory {
        &self.rooms
    }

    pub fn presence(&self) -> &PresenceService {
        &self.presence
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn offline(&self) -> &Arc<OfflineQueue> {
        self.registry.offline()
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            connections: self.registry.connection_count(),
            users: self.registry.user_count(),
            rooms: self.registry.room_count(),
            sessions: self.sessions.len(),
            queued: self.offline().total(),
        }
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("registry", &self.registry)
            .field("config", &"AppConfig")
            .finish_non_exhaustive()
    }
}
