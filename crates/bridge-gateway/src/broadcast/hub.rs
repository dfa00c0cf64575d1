//! Relay hub
//!
//! Game telemetry fans out to every operator; operator commands fan out to
//! every game client. Each call takes one registry snapshot up front, so
//! connections that join mid-fan-out miss that message.

use super::{Dispatcher, FanoutReport};
use crate::connection::{Connection, ConnectionKind, ConnectionRegistry};
use crate::protocol::{CommandEnvelope, GamePayload, OperatorNotification};
use serde_json::Value;
use std::sync::Arc;

/// Coordination point between the two populations
#[derive(Debug, Clone)]
pub struct RelayHub {
    registry: Arc<ConnectionRegistry>,
    dispatcher: Dispatcher,
}

impl RelayHub {
    /// Create a hub over `registry`
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        let dispatcher = Dispatcher::new(registry.clone());
        Self {
            registry,
            dispatcher,
        }
    }

    /// Get the connection registry
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Get the dispatcher
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Forward a game message to every operator
    ///
    /// `from` is used for logging only.
    pub fn on_game_message(&self, from: &Connection, payload: GamePayload) -> FanoutReport {
        let targets = self.registry.snapshot(ConnectionKind::Operator);

        let frame = match OperatorNotification::mc_event(&payload).to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(connection_id = %from.id(), error = %e, "Failed to encode game message");
                return FanoutReport::default();
            }
        };

        let report = self.dispatcher.fan_out(&targets, &frame);

        tracing::debug!(
            connection_id = %from.id(),
            bytes = payload.len(),
            delivered = report.delivered,
            dropped = report.dropped,
            failed = report.failed,
            "Relayed game message to operators"
        );

        report
    }

    /// Wrap an operator command and forward it to every game client
    pub fn on_operator_command(&self, from: &Connection, command: Value) -> FanoutReport {
        let targets = self.registry.snapshot(ConnectionKind::Game);

        let frame = match CommandEnvelope::new(command).to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(connection_id = %from.id(), error = %e, "Failed to encode command");
                return FanoutReport::default();
            }
        };

        let report = self.dispatcher.fan_out(&targets, &frame);

        tracing::info!(
            connection_id = %from.id(),
            operator = from.operator_principal().map_or("-", |p| p.username.as_str()),
            delivered = report.delivered,
            dropped = report.dropped,
            failed = report.failed,
            "Relayed operator command to game clients"
        );

        report
    }
}
