//! Individual WebSocket connection
//!
//! A connection is owned by the registry. Outbound traffic goes through a
//! bounded channel to the socket writer task; a full buffer is a send failure.

use crate::protocol::{ClientInfo, CloseCode, Envelope};
use livechat_core::{ConnectionId, UserId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Item handed to the socket writer
#[derive(Debug, Clone)]
pub enum Outbound {
    /// Serialize and send as a text frame
    Envelope(Envelope),
    /// Send a close frame and stop writing
    Close(CloseCode),
}

/// Why a connection left the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Client closed the socket
    ClientClosed,
    /// Reading from the socket failed
    TransportError,
    /// Outbound buffer full or writer gone
    SendError,
    /// No inbound activity within the timeout
    StaleConnection,
    /// Too many failed authentication attempts
    AuthenticationFailed,
    /// No authentication within the allowed window
    AuthenticationTimeout,
    /// Frame the protocol cannot decode
    ProtocolViolation,
    /// Server shutting down
    Shutdown,
}

impl DisconnectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientClosed => "client closed",
            Self::TransportError => "transport error",
            Self::SendError => "send error",
            Self::StaleConnection => "stale connection",
            Self::AuthenticationFailed => "authentication failed",
            Self::AuthenticationTimeout => "authentication timeout",
            Self::ProtocolViolation => "protocol violation",
            Self::Shutdown => "shutdown",
        }
    }

    /// Close frame to send, if the socket is still writable
    pub fn close_code(self) -> Option<CloseCode> {
        match self {
            Self::ClientClosed | Self::TransportError => None,
            Self::SendError => Some(CloseCode::SlowConsumer),
            Self::StaleConnection => Some(CloseCode::StaleConnection),
            Self::AuthenticationFailed => Some(CloseCode::AuthenticationFailed),
            Self::AuthenticationTimeout => Some(CloseCode::AuthenticationTimeout),
            Self::ProtocolViolation => Some(CloseCode::DecodeError),
            Self::Shutdown => Some(CloseCode::UnknownError),
        }
    }
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single registered connection
pub struct Connection {
    id: ConnectionId,
    user_id: UserId,
    metadata: ClientInfo,
    sender: mpsc::Sender<Outbound>,
    created_at: Instant,
    /// Milliseconds after `created_at` of the last processed inbound envelope
    last_activity_ms: AtomicU64,
}

impl Connection {
    pub fn new(
        id: ConnectionId,
        user_id: UserId,
        metadata: ClientInfo,
        sender: mpsc::Sender<Outbound>,
    ) -> Self {
        Self {
            id,
            user_id,
            metadata,
            sender,
            created_at: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn metadata(&self) -> &ClientInfo {
        &self.metadata
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Non-blocking send; `false` when the buffer is full or the writer is gone
    pub fn send(&self, envelope: Envelope) -> bool {
        self.sender.try_send(Outbound::Envelope(envelope)).is_ok()
    }

    /// Non-blocking send that hands the envelope back on failure
    pub(crate) fn try_send(&self, envelope: Envelope) -> Result<(), Envelope> {
        match self.sender.try_reserve() {
            Ok(permit) => {
                permit.send(Outbound::Envelope(envelope));
                Ok(())
            }
            Err(_) => Err(envelope),
        }
    }

    /// Ask the writer to close the socket (best effort)
    pub(crate) fn close(&self, code: CloseCode) {
        let _ = self.sender.try_send(Outbound::Close(code));
    }

    /// Record inbound activity
    pub fn touch(&self) {
        let elapsed = self.created_at.elapsed().as_millis() as u64;
        self.last_activity_ms.fetch_max(elapsed, Ordering::Relaxed);
    }

    pub fn last_activity(&self) -> Instant {
        self.created_at + Duration::from_millis(self.last_activity_ms.load(Ordering::Relaxed))
    }

    /// Time since the last inbound activity
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("metadata", &self.metadata)
            .finish()
    }
}
