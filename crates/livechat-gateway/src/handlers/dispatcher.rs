//! Dispatcher
//!
//! Drives one connection through `Connected -> Authenticated -> Active -> Closed`
//! and routes each decoded request to exactly one handler.

use super::client_state::ClientState;
use super::{auth, chat, context, history, presence, rooms, typing};
use super::{ConnectionPhase, HandlerContext, HandlerError, HandlerResult};
use crate::connection::{DisconnectReason, Outbound};
use crate::protocol::{ClientMessage, Envelope, ProtocolError};
use crate::server::GatewayState;

/// What the read loop should do after a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Keep reading
    Continue,
    /// Close the connection for this reason
    Close(DisconnectReason),
}

/// Routes inbound envelopes for every connection
#[derive(Debug, Clone)]
pub struct Dispatcher {
    state: GatewayState,
}

impl Dispatcher {
    #[must_use]
    pub fn new(state: GatewayState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Decode and dispatch one text frame
    pub fn dispatch_text(&self, client: &mut ClientState, text: &str) -> DispatchOutcome {
        match Envelope::from_json(text) {
            Ok(envelope) => self.dispatch(client, &envelope),
            Err(e) => self.fail(client, ProtocolError::Malformed(e.to_string()).into(), None),
        }
    }

    /// Dispatch one envelope
    pub fn dispatch(&self, client: &mut ClientState, envelope: &Envelope) -> DispatchOutcome {
        if client.phase() == ConnectionPhase::Closed {
            return DispatchOutcome::Close(DisconnectReason::ClientClosed);
        }

        let correlation_id = envelope.correlation_id().map(str::to_string);
        let message = ClientMessage::from_envelope(envelope);

        let Some(binding) = client.binding().cloned() else {
            let result = match message {
                Ok(ClientMessage::Auth(payload)) => {
                    auth::handle(&self.state, client, payload, correlation_id.clone())
                }
                Ok(_) => Err(ProtocolError::NotAuthenticated.into()),
                Err(e) => Err(e.into()),
            };
            return match result {
                Ok(()) => DispatchOutcome::Continue,
                Err(e) => self.fail(client, e, correlation_id),
            };
        };

        let message = match message {
            Ok(message) => message,
            Err(e) => return self.fail(client, e.into(), correlation_id),
        };

        client.activate();
        let ctx = HandlerContext {
            state: self.state.clone(),
            connection_id: client.connection_id(),
            user_id: binding.user_id,
            session_id: binding.session_id,
            correlation_id,
        };

        let kind = message.kind();
        match route(&ctx, message) {
            Ok(()) => {
                self.state.registry().touch(ctx.connection_id);
                self.state.sessions().touch(&ctx.session_id);
            }
            Err(e) => {
                tracing::debug!(
                    connection_id = %ctx.connection_id,
                    kind = %kind,
                    error = %e,
                    "Request failed"
                );
                ctx.reply_error(&e);
            }
        }
        DispatchOutcome::Continue
    }

    /// Answer a failed request
    ///
    /// Before authentication every failure counts toward the retry limit and
    /// the connection is closed once it is reached.
    fn fail(
        &self,
        client: &mut ClientState,
        error: HandlerError,
        correlation_id: Option<String>,
    ) -> DispatchOutcome {
        let envelope = error.to_envelope(correlation_id);

        if client.is_authenticated() {
            self.state
                .registry()
                .send_to(client.connection_id(), envelope);
            return DispatchOutcome::Continue;
        }

        let attempts = client.record_failure();
        client.send_envelope_direct(envelope);
        tracing::debug!(
            connection_id = %client.connection_id(),
            attempts,
            error = %error,
            "Unauthenticated request rejected"
        );

        if attempts >= self.state.config().realtime.auth_max_attempts {
            tracing::warn!(
                connection_id = %client.connection_id(),
                attempts,
                "Authentication retry limit reached"
            );
            DispatchOutcome::Close(DisconnectReason::AuthenticationFailed)
        } else {
            DispatchOutcome::Continue
        }
    }

    /// Move the connection to `Closed`
    ///
    /// Registered connections release their session and leave the registry
    /// (rooms, presence, typing); unregistered ones just get their close frame.
    pub fn disconnect(&self, client: &mut ClientState, reason: DisconnectReason) {
        if client.phase() == ConnectionPhase::Closed {
            return;
        }
        if client.is_authenticated() {
            if let Some(session_id) = client.session_id() {
                self.state.sessions().release_connection(session_id);
            }
            self.state
                .registry()
                .unregister(client.connection_id(), reason);
        } else {
            if let Some(code) = reason.close_code() {
                client.send_direct(Outbound::Close(code));
            }
            tracing::info!(
                connection_id = %client.connection_id(),
                reason = %reason,
                "Unauthenticated connection closed"
            );
        }
        client.close();
    }
}

fn route(ctx: &HandlerContext, message: ClientMessage) -> HandlerResult<()> {
    match message {
        ClientMessage::Auth(_) => Err(ProtocolError::AlreadyAuthenticated.into()),
        ClientMessage::Chat(payload) => chat::handle(ctx, payload),
        ClientMessage::TypingStart(payload) => typing::start(ctx, &payload.room),
        ClientMessage::TypingStop(payload) => typing::stop(ctx, &payload.room),
        ClientMessage::Join(payload) => rooms::join(ctx, payload.room),
        ClientMessage::Leave(payload) => rooms::leave(ctx, payload.room),
        ClientMessage::Presence(payload) => presence::handle(ctx, payload.status),
        ClientMessage::Context(payload) => context::handle(ctx, payload),
        ClientMessage::History(request) => history::handle(ctx, &request),
        ClientMessage::Ping => {
            ctx.reply(Envelope::pong());
            Ok(())
        }
        // Heartbeat acknowledgement; only the activity matters
        ClientMessage::Ack => Ok(()),
    }
}
