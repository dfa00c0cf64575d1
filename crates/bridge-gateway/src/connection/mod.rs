//! Connection management
//!
//! Tracks live game and operator connections.

mod connection;
mod registry;

pub use connection::{Connection, ConnectionId, ConnectionKind, ConnectionState};
pub use registry::ConnectionRegistry;
