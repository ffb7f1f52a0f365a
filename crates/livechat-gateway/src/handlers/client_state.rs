//! Per-connection dispatcher state

use crate::connection::Outbound;
use crate::protocol::Envelope;
use livechat_core::{ConnectionId, SessionId, UserId};
use tokio::sync::mpsc;

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Socket accepted, waiting for `auth`
    Connected,
    /// Bound to a user and session, nothing else processed yet
    Authenticated,
    /// Steady state, full handler table
    Active,
    /// Terminal
    Closed,
}

/// User and session a connection is bound to
#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub(crate) user_id: UserId,
    pub(crate) session_id: SessionId,
}

/// State owned by one connection's read loop
#[derive(Debug)]
pub struct ClientState {
    connection_id: ConnectionId,
    phase: ConnectionPhase,
    failed_attempts: u32,
    /// Writer channel until the registry takes ownership of it
    sender: Option<mpsc::Sender<Outbound>>,
    binding: Option<Binding>,
}

impl ClientState {
    /// State for a freshly accepted socket
    pub fn new(sender: mpsc::Sender<Outbound>) -> Self {
        Self {
            connection_id: ConnectionId::next(),
            phase: ConnectionPhase::Connected,
            failed_attempts: 0,
            sender: Some(sender),
            binding: None,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn is_authenticated(&self) -> bool {
        self.binding.is_some()
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.binding.as_ref().map(|b| &b.user_id)
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.binding.as_ref().map(|b| &b.session_id)
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub(crate) fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    /// Count a failed or premature request; returns the new total
    pub(crate) fn record_failure(&mut self) -> u32 {
        self.failed_attempts += 1;
        self.failed_attempts
    }

    /// Hand the writer channel over to the registry
    pub(crate) fn take_sender(&mut self) -> Option<mpsc::Sender<Outbound>> {
        self.sender.take()
    }

    pub(crate) fn bind(&mut self, user_id: UserId, session_id: SessionId) {
        self.binding = Some(Binding {
            user_id,
            session_id,
        });
        self.phase = ConnectionPhase::Authenticated;
    }

    pub(crate) fn activate(&mut self) {
        if self.phase == ConnectionPhase::Authenticated {
            self.phase = ConnectionPhase::Active;
        }
    }

    /// Send before registration; `false` once the registry owns the channel
    pub(crate) fn send_direct(&self, outbound: Outbound) -> bool {
        self.sender
            .as_ref()
            .is_some_and(|tx| tx.try_send(outbound).is_ok())
    }

    pub(crate) fn send_envelope_direct(&self, envelope: Envelope) -> bool {
        self.send_direct(Outbound::Envelope(envelope))
    }

    /// Enter the terminal state and drop any writer channel still held
    pub(crate) fn close(&mut self) {
        self.phase = ConnectionPhase::Closed;
        self.sender = None;
    }
}
