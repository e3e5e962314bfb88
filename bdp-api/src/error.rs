use bdp_client::{Endpoint, TransportError};
use thiserror::Error;

/// High-level API errors for player operations
///
/// Abstracts the transport and the reply codec so callers can tell a
/// silent player from one that answered with something unusable, or one
/// that answered with a refusal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced a response body
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The player answered but the reply could not be understood
    ///
    /// Covers empty bodies, a missing reply header, broken gzip, and data
    /// lines missing a field (or carrying a non-numeric one) the operation
    /// needs.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The player answered with a non-success reply code
    ///
    /// `FE` is the generic refusal, also sent by UHD players for requests
    /// lacking a valid session.
    #[error("Player rejected {action} with code {code}")]
    Rejected { action: String, code: String },

    /// Command token not in the catalog
    #[error("Unknown command token: {0:?}")]
    InvalidCommand(String),

    /// Invalid parameter value (for example a malformed player key)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ApiError {
    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Whether the player answered at all
    ///
    /// A rejection is a well-formed answer; transport failures are not.
    pub fn is_reply(&self) -> bool {
        matches!(self, ApiError::Rejected { .. } | ApiError::Decode(_))
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

/// Failure to classify a player into a dialect
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectionError {
    /// Neither probe produced a recognizable answer
    #[error("Could not identify the player at {endpoint}: {cause}")]
    DetectionFailed {
        endpoint: Endpoint,
        /// Failure of the last probe attempted
        #[source]
        cause: ApiError,
    },
}

/// Errors from the UHD challenge exchange
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No player key is configured, so no challenge can be answered
    #[error("No player key configured")]
    NoSecretConfigured,

    /// The player refused the nonce request or the challenge answer
    #[error("Player rejected the authentication challenge: {0}")]
    DeviceRejectedChallenge(String),

    /// The exchange itself failed
    #[error("Authentication exchange failed: {0}")]
    TransportFailure(#[source] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    #[test]
    fn test_transport_error_conversion() {
        let api_error: ApiError = TransportError::Timeout(Duration::from_secs(5)).into();
        assert!(matches!(api_error, ApiError::Transport(TransportError::Timeout(_))));
        assert!(!api_error.is_reply());
    }

    #[test]
    fn test_rejection_counts_as_reply() {
        let rejected = ApiError::Rejected {
            action: "PST".into(),
            code: "FE".into(),
        };
        assert!(rejected.is_reply());
        assert_eq!(format!("{}", rejected), "Player rejected PST with code FE");
    }

    #[test]
    fn test_error_display() {
        let decode = ApiError::decode("empty reply");
        assert_eq!(format!("{}", decode), "Decode error: empty reply");

        let invalid = ApiError::InvalidCommand("play".into());
        assert_eq!(format!("{}", invalid), "Unknown command token: \"play\"");

        let detection = DetectionError::DetectionFailed {
            endpoint: Endpoint::new(Ipv4Addr::new(192, 168, 1, 9)),
            cause: ApiError::Transport(TransportError::Unreachable("refused".into())),
        };
        assert!(format!("{}", detection).starts_with("Could not identify the player at 192.168.1.9"));
    }
}
