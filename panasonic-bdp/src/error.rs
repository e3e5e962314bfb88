use bdp_api::{ApiError, Command, DetectionError};
use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`crate::Player::dispatch`] and the convenience controls
///
/// Every variant raised after transmission started carries `completed`,
/// the number of key presses the player acknowledged before the failure.
/// Those presses are not rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Token not in the command catalog; nothing was sent
    #[error("Unknown command token: {0:?}")]
    InvalidToken(String),

    /// UHD player and no player key configured
    #[error("Player requires a player key before it accepts commands")]
    AuthRequired { completed: usize },

    /// The player kept refusing after one re-authentication and retry
    #[error("Authentication with the player failed after {completed} commands: {reason}")]
    AuthFailed { completed: usize, reason: String },

    /// The player could not be reached or detected
    #[error("Player unreachable after {completed} commands: {source}")]
    TransportFailure {
        completed: usize,
        #[source]
        source: ApiError,
    },

    /// A BD player refused a key press
    #[error("Player rejected {command} with code {code} after {completed} commands")]
    CommandRejected {
        completed: usize,
        command: Command,
        code: String,
    },

    /// An earlier dispatch held the queue for too long
    #[error("Timed out after {0:?} waiting for earlier commands")]
    QueueTimeout(Duration),
}

impl DispatchError {
    /// Key presses that were acknowledged before the failure
    pub fn completed(&self) -> usize {
        match self {
            DispatchError::InvalidToken(_) | DispatchError::QueueTimeout(_) => 0,
            DispatchError::AuthRequired { completed }
            | DispatchError::AuthFailed { completed, .. }
            | DispatchError::TransportFailure { completed, .. }
            | DispatchError::CommandRejected { completed, .. } => *completed,
        }
    }
}

/// Why a poll cycle produced no status
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error("Status request failed: {0}")]
    Status(#[from] ApiError),
}

/// Invalid [`crate::PlayerConfig`] values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("failure_threshold must be at least 1")]
    ZeroThreshold,

    #[error("max_poll_interval ({max:?}) is shorter than poll_interval ({base:?})")]
    BackoffBelowInterval { base: Duration, max: Duration },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Transport error: {0}")]
    Transport(#[from] bdp_client::TransportError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LoggingError),
}
