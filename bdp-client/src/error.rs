//! Error types for the player transport

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while exchanging a request with a player
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection refused, host down or no route
    #[error("Device unreachable: {0}")]
    Unreachable(String),

    /// No response arrived within the per-call bound
    #[error("No response within {0:?}")]
    Timeout(Duration),

    /// The HTTP exchange completed but was not usable
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Whether the device could not be reached at all (as opposed to answering badly)
    pub fn is_connectivity(&self) -> bool {
        matches!(self, TransportError::Unreachable(_) | TransportError::Timeout(_))
    }
}
