//! Message handlers
//!
//! The per-connection state machine and one handler per client kind.

mod auth;
mod chat;
mod client_state;
mod context;
mod dispatcher;
mod error;
mod history;
mod presence;
mod rooms;
mod typing;

pub use client_state::{ClientState, ConnectionPhase};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::{HandlerError, HandlerResult};

use crate::protocol::Envelope;
use crate::server::GatewayState;
use livechat_core::{ConnectionId, SessionId, UserId};
use std::future::Future;

/// Everything a handler needs about the request it is serving
///
/// Owned so it can move into spawned collaborator calls.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub state: GatewayState,
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub session_id: SessionId,
    pub correlation_id: Option<String>,
}

impl HandlerContext {
    /// Send a reply to the requesting connection, echoing the correlation id
    pub fn reply(&self, envelope: Envelope) -> bool {
        self.state.registry().send_to(
            self.connection_id,
            envelope.with_correlation(self.correlation_id.clone()),
        )
    }

    pub fn reply_error(&self, error: &HandlerError) -> bool {
        self.state
            .registry()
            .send_to(self.connection_id, error.to_envelope(self.correlation_id.clone()))
    }

    /// Run a collaborator call off the read loop, under the collaborator timeout
    ///
    /// The call's envelope (if any) or its error is posted back to the
    /// requesting connection through the registry.
    pub fn spawn_call<F>(&self, operation: &'static str, call: F)
    where
        F: Future<Output = HandlerResult<Option<Envelope>>> + Send + 'static,
    {
        let ctx = self.clone();
        let limit = self.state.config().realtime.collaborator_timeout();

        tokio::spawn(async move {
            let error = match tokio::time::timeout(limit, call).await {
                Ok(Ok(Some(envelope))) => {
                    ctx.reply(envelope);
                    return;
                }
                Ok(Ok(None)) => return,
                Ok(Err(e)) => e,
                Err(_) => HandlerError::Timeout(operation),
            };

            tracing::warn!(
                connection_id = %ctx.connection_id,
                user_id = %ctx.user_id,
                operation,
                error = %error,
                "Collaborator call failed"
            );
            ctx.reply_error(&error);
        });
    }
}
