//! Gateway protocol definitions
//!
//! Defines the wire envelope, its closed kind set, typed payloads, and close codes.

mod client;
mod close_codes;
mod envelope;
mod error;
mod kinds;
mod payloads;

pub use client::ClientMessage;
pub use close_codes::CloseCode;
pub use envelope::Envelope;
pub use error::ProtocolError;
pub use kinds::EnvelopeKind;
pub use payloads::{
    AckPayload, AuthPayload, AuthSuccessPayload, ChatPayload, ClientInfo, ContextPayload,
    ContextUpdatedPayload, ErrorPayload, HistoryPayload, HistoryRequest, MessagePayload,
    PresencePayload, PresenceRequest, ResourceEventPayload, RoomPayload, SystemPayload,
    TypingPayload,
};
