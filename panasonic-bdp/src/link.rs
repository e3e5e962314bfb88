//! Per-player connection state shared by the poller and the dispatcher
//!
//! Players cannot serve two requests at once. Everything that talks to a
//! player goes through its [`DeviceLink`], which owns the request slot (one
//! logical exchange at a time), the detected dialect and the authenticator.
//! A second lock queues whole dispatch sequences so they never interleave.

use crate::error::PollError;
use crate::model::StatusReport;
use bdp_api::operations::{ExtendedStatus, PlayStatus, SendKey};
use bdp_api::{
    detect, ApiError, AuthError, Authenticator, Command, DetectionError, Dialect, PlayerClient,
    PlayerKey,
};
use bdp_client::Endpoint;
use parking_lot::RwLock;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// State guarded by the request slot
#[derive(Debug)]
pub(crate) struct LinkState {
    dialect: Option<Dialect>,
    auth: Authenticator,
}

/// Why a single key press failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TransmitError {
    Detection(DetectionError),
    AuthRequired,
    AuthFailed(String),
    Rejected { code: String },
    Transport(ApiError),
}

pub(crate) struct DeviceLink {
    endpoint: Endpoint,
    client: PlayerClient,
    slot: Mutex<LinkState>,
    queue: Mutex<()>,
    /// Mirror of the slot's dialect, readable without waiting for the slot
    dialect_hint: RwLock<Option<Dialect>>,
}

impl DeviceLink {
    pub fn new(endpoint: Endpoint, client: PlayerClient, key: Option<PlayerKey>) -> Self {
        Self {
            endpoint,
            client,
            slot: Mutex::new(LinkState {
                dialect: None,
                auth: Authenticator::new(key),
            }),
            queue: Mutex::new(()),
            dialect_hint: RwLock::new(None),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn dialect(&self) -> Option<Dialect> {
        *self.dialect_hint.read()
    }

    /// Wait for the dispatch queue
    pub async fn queue(&self) -> MutexGuard<'_, ()> {
        self.queue.lock().await
    }

    /// Forget the dialect and credential so the next exchange re-detects
    pub async fn forget_dialect(&self) {
        let mut state = self.slot.lock().await;
        state.dialect = None;
        state.auth.invalidate();
        *self.dialect_hint.write() = None;
    }

    async fn ensure_dialect(&self, state: &mut LinkState) -> Result<Dialect, DetectionError> {
        if let Some(dialect) = state.dialect {
            return Ok(dialect);
        }
        let dialect = detect(&self.client, &self.endpoint).await?;
        state.dialect = Some(dialect);
        *self.dialect_hint.write() = Some(dialect);
        Ok(dialect)
    }

    /// Fetch one status reading, detecting the dialect first if needed
    ///
    /// `None` means the player answered but withheld its status: a UHD
    /// player with no key configured, or one still refusing after a fresh
    /// authentication.
    pub async fn fetch_status(&self) -> Result<Option<StatusReport>, PollError> {
        let mut state = self.slot.lock().await;
        let dialect = self.ensure_dialect(&mut state).await?;

        match dialect {
            Dialect::Bd => {
                let play = self.client.execute(&self.endpoint, &PlayStatus).await?;
                let extended = self.client.execute(&self.endpoint, &ExtendedStatus).await?;
                Ok(Some(StatusReport::from_bd(&play, &extended)))
            }
            Dialect::Uhd if !state.auth.has_secret() => {
                match self.client.execute(&self.endpoint, &PlayStatus).await {
                    Ok(play) => Ok(Some(StatusReport::from_uhd(&play))),
                    Err(e @ ApiError::Rejected { .. }) => {
                        debug!(endpoint = %self.endpoint, error = %e, "status withheld, no player key configured");
                        Ok(None)
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Dialect::Uhd => self.fetch_authenticated_status(&mut state).await,
        }
    }

    /// UHD status with the session credential attached
    ///
    /// A refusal invalidates the credential, re-authenticates once and
    /// retries once.
    async fn fetch_authenticated_status(
        &self,
        state: &mut LinkState,
    ) -> Result<Option<StatusReport>, PollError> {
        let mut retried = false;
        loop {
            let credential = match state
                .auth
                .ensure_authenticated(&self.client, &self.endpoint)
                .await
            {
                Ok(credential) => credential,
                Err(AuthError::TransportFailure(e)) => return Err(e.into()),
                Err(e) => {
                    warn!(endpoint = %self.endpoint, error = %e, "could not authenticate for status");
                    return Ok(None);
                }
            };

            let op = PlayStatus::authenticated(credential);
            match self.client.execute(&self.endpoint, &op).await {
                Ok(play) => return Ok(Some(StatusReport::from_uhd(&play))),
                Err(ApiError::Rejected { code, .. }) => {
                    state.auth.invalidate();
                    if retried {
                        warn!(endpoint = %self.endpoint, %code, "player withheld status after re-authentication");
                        return Ok(None);
                    }
                    debug!(endpoint = %self.endpoint, %code, "status refused, re-authenticating");
                    retried = true;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Send one key press
    ///
    /// On UHD a refused press invalidates the credential, re-authenticates
    /// once and retries once.
    pub async fn transmit(&self, command: Command) -> Result<(), TransmitError> {
        let mut state = self.slot.lock().await;
        let dialect = self
            .ensure_dialect(&mut state)
            .await
            .map_err(TransmitError::Detection)?;

        match dialect {
            Dialect::Bd => match self.client.execute(&self.endpoint, &SendKey::new(command)).await {
                Ok(()) => Ok(()),
                Err(ApiError::Rejected { code, .. }) => Err(TransmitError::Rejected { code }),
                Err(e) => Err(TransmitError::Transport(e)),
            },
            Dialect::Uhd => self.transmit_authenticated(&mut state, command).await,
        }
    }

    async fn transmit_authenticated(
        &self,
        state: &mut LinkState,
        command: Command,
    ) -> Result<(), TransmitError> {
        if !state.auth.has_secret() {
            return Err(TransmitError::AuthRequired);
        }

        let mut retried = false;
        loop {
            let credential = state
                .auth
                .ensure_authenticated(&self.client, &self.endpoint)
                .await
                .map_err(auth_failure)?;

            let op = SendKey::authenticated(command, credential);
            match self.client.execute(&self.endpoint, &op).await {
                Ok(()) => return Ok(()),
                Err(ApiError::Rejected { code, .. }) => {
                    state.auth.invalidate();
                    if retried {
                        warn!(endpoint = %self.endpoint, %command, "player refused command after re-authentication");
                        return Err(TransmitError::AuthFailed(format!(
                            "{} refused with code {} after re-authentication",
                            command, code
                        )));
                    }
                    debug!(endpoint = %self.endpoint, %command, "command refused, re-authenticating");
                    retried = true;
                }
                Err(e) => return Err(TransmitError::Transport(e)),
            }
        }
    }
}

fn auth_failure(error: AuthError) -> TransmitError {
    match error {
        AuthError::NoSecretConfigured => TransmitError::AuthRequired,
        AuthError::DeviceRejectedChallenge(reason) => TransmitError::AuthFailed(reason),
        AuthError::TransportFailure(e) => TransmitError::Transport(e),
    }
}
