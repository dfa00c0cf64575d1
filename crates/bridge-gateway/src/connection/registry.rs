//! Connection registry
//!
//! Two independent membership sets, one per population, using DashMap for
//! thread-safe access. Fan-out reads a copied snapshot and never holds a set
//! lock while dispatching.

use super::{Connection, ConnectionId, ConnectionKind};
use dashmap::DashMap;
use std::sync::Arc;

/// Live game and operator connections
pub struct ConnectionRegistry {
    /// Open game-client connections
    games: DashMap<ConnectionId, Arc<Connection>>,

    /// Open operator connections
    operators: DashMap<ConnectionId, Arc<Connection>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            games: DashMap::new(),
            operators: DashMap::new(),
        }
    }

    /// Create an empty registry wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn set(&self, kind: ConnectionKind) -> &DashMap<ConnectionId, Arc<Connection>> {
        match kind {
            ConnectionKind::Game => &self.games,
            ConnectionKind::Operator => &self.operators,
        }
    }

    /// Add a connection to the set named by its kind
    ///
    /// Closed connections are never admitted. Returns `true` if the
    /// connection is a member after the call.
    pub fn register(&self, connection: Arc<Connection>) -> bool {
        let id = connection.id();
        let kind = connection.kind();

        if connection.is_closed() {
            tracing::debug!(connection_id = %id, kind = %kind, "Refusing to register closed connection");
            return false;
        }

        self.set(kind).insert(id, connection.clone());

        // A close that raced the insert must not leave a dangling entry
        if connection.is_closed() {
            self.set(kind).remove(&id);
            return false;
        }

        tracing::debug!(connection_id = %id, kind = %kind, "Connection registered");
        true
    }

    /// Remove a connection and mark it closed
    ///
    /// Idempotent: removing an absent connection is a no-op returning `None`.
    pub fn unregister(&self, kind: ConnectionKind, id: ConnectionId) -> Option<Arc<Connection>> {
        let (_, connection) = self.set(kind).remove(&id)?;
        connection.mark_closed();

        tracing::debug!(connection_id = %id, kind = %kind, "Connection unregistered");

        Some(connection)
    }

    /// Copy of the current members of a set
    ///
    /// Order is unspecified.
    pub fn snapshot(&self, kind: ConnectionKind) -> Vec<Arc<Connection>> {
        self.set(kind)
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Check if a connection is currently registered
    pub fn contains(&self, kind: ConnectionKind, id: ConnectionId) -> bool {
        self.set(kind).contains_key(&id)
    }

    /// Number of members in a set
    pub fn count(&self, kind: ConnectionKind) -> usize {
        self.set(kind).len()
    }

    /// Get the number of open game connections
    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    /// Get the number of open operator connections
    pub fn operator_count(&self) -> usize {
        self.operators.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("games", &self.games.len())
            .field("operators", &self.operators.len())
            .finish()
    }
}
