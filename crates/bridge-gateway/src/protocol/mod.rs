//! Relay wire formats
//!
//! Transport-neutral frames plus the JSON shapes exchanged with each population.

mod frame;
mod messages;

pub use frame::Frame;
pub use messages::{CommandEnvelope, GamePayload, OperatorEvent, OperatorNotification};
