//! Dispatch layer
//!
//! Best-effort, non-blocking delivery onto each connection's bounded outbound
//! queue. A slow peer loses frames instead of stalling the fan-out; a peer
//! whose writer has gone away is unregistered.

use crate::connection::{Connection, ConnectionRegistry};
use crate::protocol::Frame;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;

/// Result of a single delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Queued for the peer's writer
    Delivered,
    /// Target not open, nothing attempted
    Skipped,
    /// Target's queue was full, frame discarded
    Dropped,
    /// Target unreachable, connection unregistered
    Failed,
}

/// Per-outcome counts for one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub targets: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub dropped: usize,
    pub failed: usize,
}

impl FanoutReport {
    fn record(&mut self, outcome: DispatchOutcome) {
        self.targets += 1;
        match outcome {
            DispatchOutcome::Delivered => self.delivered += 1,
            DispatchOutcome::Skipped => self.skipped += 1,
            DispatchOutcome::Dropped => self.dropped += 1,
            DispatchOutcome::Failed => self.failed += 1,
        }
    }
}

/// Per-connection send primitive
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
}

impl Dispatcher {
    /// Create a dispatcher that unregisters failed peers from `registry`
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Attempt one delivery to `connection`
    pub fn send(&self, connection: &Connection, frame: Frame) -> DispatchOutcome {
        if !connection.is_open() {
            tracing::debug!(
                connection_id = %connection.id(),
                state = ?connection.state(),
                "Skipping send to connection that is not open"
            );
            return DispatchOutcome::Skipped;
        }

        match connection.try_send(frame) {
            Ok(()) => DispatchOutcome::Delivered,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    connection_id = %connection.id(),
                    kind = %connection.kind(),
                    "Outbound queue full, dropping frame"
                );
                DispatchOutcome::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(
                    connection_id = %connection.id(),
                    kind = %connection.kind(),
                    "Peer unreachable, unregistering connection"
                );
                self.registry.unregister(connection.kind(), connection.id());
                DispatchOutcome::Failed
            }
        }
    }

    /// Deliver `frame` to every target, isolating failures per target
    pub fn fan_out(&self, targets: &[Arc<Connection>], frame: &Frame) -> FanoutReport {
        let mut report = FanoutReport::default();

        for target in targets {
            report.record(self.send(target, frame.clone()));
        }

        report
    }
}
