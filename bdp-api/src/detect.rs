//! Dialect detection
//!
//! A BD player answers the extended `GET_STATUS` query with a data line.
//! UHD players answer it too, but with a refusal or without usable data.
//! They do answer `PST`, refusing it with `FE` until authenticated, so a
//! well-formed `PST` answer after an unusable `GET_STATUS` answer means UHD.
//!
//! A `GET_STATUS` request that never got an answer says nothing about the
//! dialect. Detection then fails outright and is retried on the next cycle.

use crate::client::PlayerClient;
use crate::operations::{ExtendedStatus, PlayStatus};
use crate::{ApiError, DetectionError, Dialect};
use bdp_client::Endpoint;
use tracing::{debug, info};

/// Probe `endpoint` and classify the dialect it speaks
pub async fn detect(client: &PlayerClient, endpoint: &Endpoint) -> Result<Dialect, DetectionError> {
    match client.execute(endpoint, &ExtendedStatus).await {
        Ok(_) => {
            info!(%endpoint, dialect = %Dialect::Bd, "detected player dialect");
            return Ok(Dialect::Bd);
        }
        Err(e) if e.is_reply() => {
            debug!(%endpoint, error = %e, "extended status not understood")
        }
        Err(cause) => {
            debug!(%endpoint, error = %cause, "extended status request failed");
            return Err(DetectionError::DetectionFailed {
                endpoint: *endpoint,
                cause,
            });
        }
    }

    let cause = match client.execute(endpoint, &PlayStatus).await {
        Ok(_) => None,
        Err(e @ ApiError::Rejected { .. }) => {
            debug!(%endpoint, error = %e, "play status refused, assuming authentication is required");
            None
        }
        Err(e) => Some(e),
    };

    match cause {
        None => {
            info!(%endpoint, dialect = %Dialect::Uhd, "detected player dialect");
            Ok(Dialect::Uhd)
        }
        Some(cause) => Err(DetectionError::DetectionFailed {
            endpoint: *endpoint,
            cause,
        }),
    }
}
