//! Relay message formats
//!
//! Game payloads are opaque. Operators exchange named JSON events:
//! `{"event": "command", "data": ...}` inbound and
//! `{"event": "mc-event", "data": ...}` outbound.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Frame;

/// Inbound message from a game client, carried verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GamePayload {
    Text(String),
    Binary(Vec<u8>),
}

impl GamePayload {
    /// Payload size in bytes
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Command relayed to game clients: `{"command": <value>}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub command: Value,
}

impl CommandEnvelope {
    pub fn new(command: Value) -> Self {
        Self { command }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Encode as an outbound text frame
    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        self.to_json().map(Frame::text)
    }
}

/// Events an operator can send over the event channel
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum OperatorEvent {
    /// Broadcast a command to every game client
    #[serde(rename = "command")]
    Command(Value),
}

impl OperatorEvent {
    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Game telemetry delivered to operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorNotification {
    pub event: &'static str,
    pub data: String,
    /// Set when `data` is base64 of a binary payload
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub binary: bool,
}

impl OperatorNotification {
    /// Event name for relayed game messages
    pub const MC_EVENT: &'static str = "mc-event";

    /// Wrap a game payload
    pub fn mc_event(payload: &GamePayload) -> Self {
        match payload {
            GamePayload::Text(text) => Self {
                event: Self::MC_EVENT,
                data: text.clone(),
                binary: false,
            },
            GamePayload::Binary(bytes) => Self {
                event: Self::MC_EVENT,
                data: STANDARD.encode(bytes),
                binary: true,
            },
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Encode as an outbound text frame
    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        self.to_json().map(Frame::text)
    }
}
