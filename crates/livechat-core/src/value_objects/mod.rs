//! Value objects - identifiers shared across layers

mod ids;

pub use ids::{ConnectionId, IdParseError, RoomId, SessionId, UserId};
