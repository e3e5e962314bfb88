use crate::codec::Reply;
use crate::operation::PlayerOperation;
use crate::{ApiError, Result};
use bdp_client::{Endpoint, HttpTransport, Transport, TransportError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A client for executing player operations against actual devices
///
/// Bridges the stateless operation definitions and a [`Transport`]. The
/// client is cheap to clone and holds no per-player state, so one instance
/// can serve any number of endpoints.
#[derive(Clone)]
pub struct PlayerClient {
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl PlayerClient {
    /// Per-request bound used by [`PlayerClient::http`]
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Client over a fresh [`HttpTransport`] with the default timeout
    pub fn http() -> Result<Self> {
        Ok(Self::new(
            Arc::new(HttpTransport::new()?),
            Self::DEFAULT_TIMEOUT,
        ))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute an operation against a player
    ///
    /// The whole exchange is bounded by the client's timeout even if the
    /// transport ignores the bound it is given. Non-success reply codes come
    /// back as [`ApiError::Rejected`] without reaching `parse_response`.
    pub async fn execute<Op>(&self, endpoint: &Endpoint, op: &Op) -> Result<Op::Response>
    where
        Op: PlayerOperation + Sync,
    {
        let action = op.action();
        let payload = op.build_payload();
        debug!(%endpoint, action = %action, "sending request");

        let body = tokio::time::timeout(
            self.timeout,
            self.transport.invoke(endpoint, &payload, self.timeout),
        )
        .await
        .map_err(|_| TransportError::Timeout(self.timeout))??;

        let reply = Reply::from_bytes(&body)?;
        if !reply.is_success() {
            debug!(%endpoint, action = %action, code = reply.code(), "request rejected");
            return Err(ApiError::Rejected {
                action: action.into_owned(),
                code: reply.code().to_string(),
            });
        }
        op.parse_response(&reply)
    }
}

impl fmt::Debug for PlayerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
