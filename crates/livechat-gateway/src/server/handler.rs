//! WebSocket handler
//!
//! One read loop and one writer task per socket. The read loop owns the
//! `ClientState` and feeds every text frame to the dispatcher; the writer
//! drains the connection's outbound channel into the socket.

use crate::connection::{DisconnectReason, Outbound};
use crate::handlers::{ClientState, DispatchOutcome, Dispatcher};
use crate::protocol::{Envelope, SystemPayload};
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use livechat_core::ConnectionId;
use std::borrow::Cow;
use std::time::Duration;
use tokio::sync::mpsc;

/// How long the read loop waits for the writer to flush a final close frame
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket) {
    let realtime = state.config().realtime.clone();
    let (tx, rx) = mpsc::channel::<Outbound>(realtime.send_buffer_size);

    let mut client = ClientState::new(tx);
    let connection_id = client.connection_id();
    let dispatcher = Dispatcher::new(state);

    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    let (ws_sink, mut ws_stream) = socket.split();

    let heartbeat_ms = realtime.heartbeat_interval().as_millis() as u64;
    client.send_envelope_direct(Envelope::system(SystemPayload::hello(heartbeat_ms)));

    let mut send_task = tokio::spawn(write_loop(ws_sink, rx, connection_id));
    let mut writer_done = false;

    let auth_deadline = tokio::time::sleep(realtime.auth_timeout());
    tokio::pin!(auth_deadline);

    let reason = loop {
        tokio::select! {
            frame = ws_stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let DispatchOutcome::Close(reason) = dispatcher.dispatch_text(&mut client, &text) {
                        break reason;
                    }
                }
                Some(Ok(Message::Binary(_))) => {
                    tracing::debug!(connection_id = %connection_id, "Binary messages not supported");
                    break DisconnectReason::ProtocolViolation;
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                    // Pong replies are handled by axum
                    if let Some(session_id) = client.session_id() {
                        dispatcher.state().registry().touch(connection_id);
                        dispatcher.state().sessions().touch(session_id);
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!(connection_id = %connection_id, "Client closed connection");
                    break DisconnectReason::ClientClosed;
                }
                Some(Err(e)) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "WebSocket error");
                    break DisconnectReason::TransportError;
                }
            },
            () = &mut auth_deadline, if !client.is_authenticated() => {
                tracing::info!(connection_id = %connection_id, "Authentication timed out");
                break DisconnectReason::AuthenticationTimeout;
            }
            _ = &mut send_task => {
                // The registry dropped the channel or the socket stopped accepting writes
                writer_done = true;
                tracing::debug!(connection_id = %connection_id, "Send task ended");
                break DisconnectReason::TransportError;
            }
        }
    };

    tracing::info!(connection_id = %connection_id, reason = %reason, "Closing connection");
    dispatcher.disconnect(&mut client, reason);

    if !writer_done && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut send_task).await.is_err() {
        send_task.abort();
    }
}

/// Forward outbound envelopes to the socket until the channel closes or a
/// close frame is written
async fn write_loop(
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Outbound>,
    connection_id: ConnectionId,
) {
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Envelope(envelope) => {
                let json = match envelope.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!(connection_id = %connection_id, error = %e, "Failed to encode envelope");
                        continue;
                    }
                };
                if ws_sink.send(Message::Text(json)).await.is_err() {
                    tracing::warn!(connection_id = %connection_id, "Failed to send message to WebSocket");
                    return;
                }
            }
            Outbound::Close(code) => {
                let frame = CloseFrame {
                    code: code.as_u16(),
                    reason: Cow::Borrowed(code.description()),
                };
                if let Err(e) = ws_sink.send(Message::Close(Some(frame))).await {
                    tracing::debug!(connection_id = %connection_id, error = %e, "Failed to send close frame");
                }
                return;
            }
        }
    }

    let _ = ws_sink.close().await;
}
