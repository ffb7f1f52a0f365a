//! # livechat-gateway
//!
//! WebSocket gateway for the realtime chat core: connection registry, rooms,
//! presence and typing, offline queues, conversational sessions, the per-connection
//! dispatcher and the maintenance loop.

pub mod collaborators;
pub mod connection;
pub mod handlers;
pub mod maintenance;
pub mod offline;
pub mod presence;
pub mod protocol;
pub mod rooms;
pub mod server;
pub mod session;

#[cfg(test)]
mod testing;

pub use server::{create_app, create_router, run, run_server, serve, GatewayState, GatewayStats};
