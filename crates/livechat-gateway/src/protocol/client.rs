//! Typed client requests
//!
//! Every client envelope is turned into one [`ClientMessage`] variant before
//! routing, so the dispatcher matches exhaustively over a closed set.

use super::payloads::{
    AuthPayload, ChatPayload, ContextPayload, HistoryRequest, PresenceRequest, RoomPayload,
};
use super::{Envelope, EnvelopeKind, ProtocolError};
use crate::presence::UserStatus;
use livechat_core::ChatMessage;
use serde::de::DeserializeOwned;

/// A decoded client request
#[derive(Debug, Clone)]
pub enum ClientMessage {
    Auth(AuthPayload),
    Chat(ChatPayload),
    TypingStart(RoomPayload),
    TypingStop(RoomPayload),
    Join(RoomPayload),
    Leave(RoomPayload),
    Presence(PresenceRequest),
    Context(ContextPayload),
    History(HistoryRequest),
    Ping,
    /// Acknowledgement of a server heartbeat
    Ack,
}

fn decode<T: DeserializeOwned>(envelope: &Envelope) -> Result<T, ProtocolError> {
    envelope
        .decode_data()
        .map_err(|e| ProtocolError::invalid(envelope.kind(), e))
}

impl ClientMessage {
    /// Decode and validate a client envelope
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, ProtocolError> {
        let kind = envelope.kind();
        let message = match kind {
            EnvelopeKind::Auth => Self::Auth(decode(envelope)?),
            EnvelopeKind::Chat => {
                let payload: ChatPayload = decode(envelope)?;
                ChatMessage::validate_content(&payload.content)
                    .map_err(|e| ProtocolError::invalid(kind, e))?;
                if payload.room.is_some() && payload.to.is_some() {
                    return Err(ProtocolError::invalid(
                        kind,
                        "`room` and `to` are mutually exclusive",
                    ));
                }
                Self::Chat(payload)
            }
            EnvelopeKind::TypingStart => Self::TypingStart(decode(envelope)?),
            EnvelopeKind::TypingStop => Self::TypingStop(decode(envelope)?),
            EnvelopeKind::Join => Self::Join(decode(envelope)?),
            EnvelopeKind::Leave => Self::Leave(decode(envelope)?),
            EnvelopeKind::Presence => {
                let payload: PresenceRequest = decode(envelope)?;
                if payload.status == UserStatus::Offline {
                    return Err(ProtocolError::invalid(
                        kind,
                        "offline is derived from connections and cannot be set",
                    ));
                }
                Self::Presence(payload)
            }
            EnvelopeKind::Context => {
                let payload: ContextPayload = decode(envelope)?;
                if payload.id.trim().is_empty() {
                    return Err(ProtocolError::invalid(kind, "`id` must not be empty"));
                }
                Self::Context(payload)
            }
            EnvelopeKind::History => {
                // `data` may be omitted entirely
                if envelope.data().is_null() {
                    Self::History(HistoryRequest::default())
                } else {
                    Self::History(decode(envelope)?)
                }
            }
            EnvelopeKind::Ping => Self::Ping,
            EnvelopeKind::Ack => Self::Ack,
            EnvelopeKind::Unknown => return Err(ProtocolError::UnknownKind),
            EnvelopeKind::System
            | EnvelopeKind::AuthSuccess
            | EnvelopeKind::Message
            | EnvelopeKind::Typing
            | EnvelopeKind::PresenceUpdate
            | EnvelopeKind::ContextUpdated
            | EnvelopeKind::Heartbeat
            | EnvelopeKind::Error
            | EnvelopeKind::Pong
            | EnvelopeKind::DocumentEvent
            | EnvelopeKind::QuoteEvent => return Err(ProtocolError::UnexpectedKind(kind)),
        };
        Ok(message)
    }

    /// Kind this request was decoded from
    #[must_use]
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Self::Auth(_) => EnvelopeKind::Auth,
            Self::Chat(_) => EnvelopeKind::Chat,
            Self::TypingStart(_) => EnvelopeKind::TypingStart,
            Self::TypingStop(_) => EnvelopeKind::TypingStop,
            Self::Join(_) => EnvelopeKind::Join,
            Self::Leave(_) => EnvelopeKind::Leave,
            Self::Presence(_) => EnvelopeKind::Presence,
            Self::Context(_) => EnvelopeKind::Context,
            Self::History(_) => EnvelopeKind::History,
            Self::Ping => EnvelopeKind::Ping,
            Self::Ack => EnvelopeKind::Ack,
        }
    }
}
