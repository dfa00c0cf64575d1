//! Individual relay connection
//!
//! Represents a single live session, game or operator, and its lifecycle state.

use crate::protocol::Frame;
use bridge_common::OperatorPrincipal;
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique connection identity, assigned at accept time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a new random id
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Which population a connection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    /// Game-server client on the raw WebSocket listener
    Game,
    /// Authenticated operator on the event channel
    Operator,
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Game => f.write_str("game"),
            Self::Operator => f.write_str("operator"),
        }
    }
}

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Accepted, handshake not yet complete
    Pending,
    /// Ready to send and receive
    Open,
    /// Teardown started
    Closing,
    /// Terminal
    Closed,
}

impl ConnectionState {
    fn can_transition_to(self, next: Self) -> bool {
        use ConnectionState::{Closed, Closing, Open, Pending};

        matches!(
            (self, next),
            (Pending, Open | Closing | Closed) | (Open, Closing | Closed) | (Closing, Closed)
        )
    }
}

/// A single relay connection
pub struct Connection {
    /// Unique connection ID
    id: ConnectionId,

    /// Population this connection belongs to
    kind: ConnectionKind,

    /// Operator identity, fixed at connect time (operators only)
    operator: Option<OperatorPrincipal>,

    /// Current lifecycle state
    state: RwLock<ConnectionState>,

    /// Outbound queue drained by the connection's writer task
    sender: mpsc::Sender<Frame>,

    /// Connection creation time
    created_at: Instant,
}

impl Connection {
    fn new(
        kind: ConnectionKind,
        operator: Option<OperatorPrincipal>,
        sender: mpsc::Sender<Frame>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: ConnectionId::generate(),
            kind,
            operator,
            state: RwLock::new(ConnectionState::Pending),
            sender,
            created_at: Instant::now(),
        })
    }

    /// Create a pending game connection
    pub fn game(sender: mpsc::Sender<Frame>) -> Arc<Self> {
        Self::new(ConnectionKind::Game, None, sender)
    }

    /// Create a pending operator connection for an authorized principal
    pub fn operator(principal: OperatorPrincipal, sender: mpsc::Sender<Frame>) -> Arc<Self> {
        Self::new(ConnectionKind::Operator, Some(principal), sender)
    }

    /// Get the connection ID
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Get the connection kind
    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    /// Get the operator principal (operator connections only)
    pub fn operator_principal(&self) -> Option<&OperatorPrincipal> {
        self.operator.as_ref()
    }

    /// Get the current state
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Check if the connection accepts outbound frames
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Check if the connection reached its terminal state
    pub fn is_closed(&self) -> bool {
        self.state() == ConnectionState::Closed
    }

    /// Move to `next` if the lifecycle allows it
    ///
    /// Returns `true` if the state changed.
    pub fn transition(&self, next: ConnectionState) -> bool {
        let mut state = self.state.write();
        if state.can_transition_to(next) {
            *state = next;
            true
        } else {
            false
        }
    }

    /// Handshake complete
    pub fn mark_open(&self) -> bool {
        self.transition(ConnectionState::Open)
    }

    /// Teardown started
    pub fn mark_closing(&self) -> bool {
        self.transition(ConnectionState::Closing)
    }

    /// Enter the terminal state
    pub fn mark_closed(&self) -> bool {
        self.transition(ConnectionState::Closed)
    }

    /// Get connection age
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Enqueue a frame without waiting
    pub fn try_send(&self, frame: Frame) -> Result<(), mpsc::error::TrySendError<Frame>> {
        self.sender.try_send(frame)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .field("created_at", &self.created_at)
            .finish()
    }
}
