//! Relay fan-out
//!
//! The relay hub decides which population receives a message; the dispatcher
//! delivers it to each target with per-connection failure isolation.

mod dispatcher;
mod hub;

pub use dispatcher::{DispatchOutcome, Dispatcher, FanoutReport};
pub use hub::RelayHub;
