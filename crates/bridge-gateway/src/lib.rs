//! # bridge-gateway
//!
//! Relay between game-server WebSocket clients and authenticated operators.
//! Game telemetry fans out to every operator; operator commands fan out to
//! every game client.

pub mod auth;
pub mod broadcast;
pub mod connection;
pub mod listener;
pub mod protocol;
pub mod server;
pub mod web;

pub use auth::{OperatorAuthorizer, SessionAuthorizer, OAUTH_STATE_COOKIE, SESSION_COOKIE};
pub use broadcast::{FanoutReport, RelayHub};
pub use connection::{ConnectionKind, ConnectionRegistry};
pub use server::{create_app, run, shutdown_signal, GatewayState, RelayServer};
