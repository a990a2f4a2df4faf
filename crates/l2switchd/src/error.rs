//! Error types for l2switchd

use sdn_types::{ParseError, SwitchId};
use thiserror::Error;

/// Errors that can occur in the controller and its boundary layer
#[derive(Debug, Error)]
pub enum ControllerError {
    /// An event that cannot be acted upon (no ingress port, truncated
    /// Ethernet header, reserved ingress port, ...). Dropped, never fatal.
    #[error("Malformed event from switch {switch}: {reason}")]
    MalformedEvent { switch: SwitchId, reason: String },

    /// A raw identifier on the wire could not be decoded
    #[error("Invalid identifier: {0}")]
    Parse(#[from] ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An inbound line is not a valid wire message
    #[error("Undecodable wire message: {0}")]
    Decode(serde_json::Error),

    /// A command could not be encoded for the outbound stream
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ControllerError {
    pub fn malformed(switch: SwitchId, reason: impl Into<String>) -> Self {
        ControllerError::MalformedEvent {
            switch,
            reason: reason.into(),
        }
    }

    /// Returns true for errors that only affect the event that raised them.
    pub fn is_event_local(&self) -> bool {
        matches!(
            self,
            ControllerError::MalformedEvent { .. } | ControllerError::Parse(_)
        )
    }
}

/// Result type alias for l2switchd operations
pub type Result<T> = std::result::Result<T, ControllerError>;
