//! WebSocket close codes
//!
//! Gateway-specific close codes sent when the server ends a connection.

use serde::{Deserialize, Serialize};

/// Gateway WebSocket close codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    /// Unknown error occurred
    UnknownError = 4000,
    /// Frame could not be decoded (binary frames)
    DecodeError = 4002,
    /// Too many failed or premature requests before authentication
    AuthenticationFailed = 4004,
    /// No successful `auth` within the allowed window
    AuthenticationTimeout = 4005,
    /// Outbound buffer overflowed
    SlowConsumer = 4008,
    /// No inbound activity for too long
    StaleConnection = 4009,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4000 => Some(Self::UnknownError),
            4002 => Some(Self::DecodeError),
            4004 => Some(Self::AuthenticationFailed),
            4005 => Some(Self::AuthenticationTimeout),
            4008 => Some(Self::SlowConsumer),
            4009 => Some(Self::StaleConnection),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Check if the client should attempt to reconnect after this close code
    #[must_use]
    pub const fn should_reconnect(self) -> bool {
        !matches!(self, Self::AuthenticationFailed)
    }

    /// Get the description for this close code
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown error occurred",
            Self::DecodeError => "Invalid payload encoding",
            Self::AuthenticationFailed => "Authentication failed",
            Self::AuthenticationTimeout => "Authentication timed out",
            Self::SlowConsumer => "Outbound buffer full",
            Self::StaleConnection => "Connection inactive",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_u16())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}
