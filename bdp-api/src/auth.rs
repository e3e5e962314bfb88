//! UHD challenge authentication
//!
//! UHD players refuse key presses that do not carry a session credential.
//! The credential comes from a two-step exchange: the player hands out a
//! nonce, and we answer with `HEX_UPPER(HMAC-SHA256(player key, nonce))`.

use crate::client::PlayerClient;
use crate::operations::{GetNonce, SubmitAnswer};
use crate::{ApiError, AuthError, Result};
use bdp_client::Endpoint;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Deserializer};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

type HmacSha256 = Hmac<Sha256>;

/// The long-lived per-player secret (32 hex characters)
#[derive(Clone, PartialEq, Eq)]
pub struct PlayerKey([u8; 16]);

impl PlayerKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for PlayerKey {
    type Err = ApiError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 32 {
            return Err(ApiError::InvalidParameter(format!(
                "player key must be 32 hex characters, got {}",
                s.len()
            )));
        }
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| {
            ApiError::InvalidParameter(format!("player key is not hexadecimal: {}", e))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PlayerKey(<redacted>)")
    }
}

impl<'de> Deserialize<'de> for PlayerKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Session credential attached to authenticated key presses
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, for putting on the wire
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Compute the challenge answer for `nonce`
pub fn challenge_answer(key: &PlayerKey, nonce: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| ApiError::InvalidParameter(e.to_string()))?;
    mac.update(nonce.as_bytes());
    Ok(hex::encode_upper(mac.finalize().into_bytes()))
}

/// Owns the player key and the current session credential
#[derive(Debug, Default)]
pub struct Authenticator {
    key: Option<PlayerKey>,
    credential: Option<Credential>,
}

impl Authenticator {
    pub fn new(key: Option<PlayerKey>) -> Self {
        Self {
            key,
            credential: None,
        }
    }

    /// Whether authentication is possible at all
    pub fn has_secret(&self) -> bool {
        self.key.is_some()
    }

    pub fn cached(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Return the cached credential, or run the challenge exchange for a new one
    pub async fn ensure_authenticated(
        &mut self,
        client: &PlayerClient,
        endpoint: &Endpoint,
    ) -> std::result::Result<Credential, AuthError> {
        if let Some(credential) = &self.credential {
            return Ok(credential.clone());
        }
        let key = self.key.as_ref().ok_or(AuthError::NoSecretConfigured)?;

        debug!(%endpoint, "requesting authentication nonce");
        let nonce = client
            .execute(endpoint, &GetNonce)
            .await
            .map_err(|e| challenge_failure("GET_NONCE", e))?;

        let answer = challenge_answer(key, &nonce).map_err(AuthError::TransportFailure)?;
        let session = client
            .execute(endpoint, &SubmitAnswer::new(answer.clone()))
            .await
            .map_err(|e| challenge_failure("AUTH", e))?;

        let credential = Credential::new(session.unwrap_or(answer));
        self.credential = Some(credential.clone());
        info!(%endpoint, "authenticated with player");
        Ok(credential)
    }

    /// Discard the credential; the next `ensure_authenticated` re-runs the exchange
    pub fn invalidate(&mut self) {
        if self.credential.take().is_some() {
            debug!("session credential invalidated");
        }
    }
}

fn challenge_failure(step: &str, error: ApiError) -> AuthError {
    match error {
        ApiError::Rejected { code, .. } => {
            AuthError::DeviceRejectedChallenge(format!("{} refused with code {}", step, code))
        }
        ApiError::Decode(msg) => AuthError::DeviceRejectedChallenge(format!("{}: {}", step, msg)),
        other => AuthError::TransportFailure(other),
    }
}
