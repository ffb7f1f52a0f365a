//! Auth handler

use super::client_state::ClientState;
use super::{HandlerError, HandlerResult};
use crate::protocol::{AuthPayload, AuthSuccessPayload, Envelope};
use crate::server::GatewayState;
use livechat_core::SessionId;

/// Validate the token, attach the session and register the connection
///
/// `auth_success` goes out before registration so any offline backlog flushed
/// by the registry arrives after it. The connection stays bound to the session
/// until it disconnects, which keeps the session from expiring.
pub(super) fn handle(
    state: &GatewayState,
    client: &mut ClientState,
    payload: AuthPayload,
    correlation_id: Option<String>,
) -> HandlerResult<()> {
    let user_id = state.jwt().authenticate(&payload.token).map_err(|e| {
        tracing::debug!(connection_id = %client.connection_id(), error = %e, "Token rejected");
        HandlerError::AuthenticationFailed(e.to_string())
    })?;

    let session_id = payload.session_id.unwrap_or_else(SessionId::generate);
    let attached = state.sessions().get_or_create(session_id, &user_id, None)?;
    let session = attached.session;
    let connection_id = client.connection_id();
    state.sessions().bind_connection(&session.id)?;

    let welcome = Envelope::auth_success(AuthSuccessPayload {
        user_id: user_id.clone(),
        session_id: session.id.clone(),
        connection_id,
        resumed: attached.resumed,
        history_len: session.history.len(),
        context: session.context.clone(),
    })
    .with_correlation(correlation_id)
    .with_session(session.id.clone());

    let sender = if client.send_envelope_direct(welcome) {
        client.take_sender()
    } else {
        None
    };
    let Some(sender) = sender else {
        state.sessions().release_connection(&session.id);
        return Err(HandlerError::Internal("connection writer is gone".to_string()));
    };

    let registration = state.registry().register_as(
        connection_id,
        user_id.clone(),
        sender,
        payload.client.unwrap_or_default(),
    );
    client.bind(user_id.clone(), session.id.clone());

    tracing::info!(
        connection_id = %connection_id,
        user_id = %user_id,
        session_id = %session.id,
        resumed = attached.resumed,
        flushed = registration.flushed,
        "Connection authenticated"
    );
    Ok(())
}
