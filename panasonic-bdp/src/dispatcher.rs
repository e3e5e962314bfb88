//! Serialized command dispatch
//!
//! A dispatch validates every token up front, waits its turn in the
//! player's queue, then transmits each token `repeats` times with a fixed
//! delay between transmissions. The queue stays held for the whole sequence,
//! so two dispatches never interleave; polls can still slip in between
//! individual key presses.

use crate::error::DispatchError;
use crate::link::{DeviceLink, TransmitError};
use bdp_api::{Command, DetectionError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, info_span, Instrument};

/// Outcome of a successful dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    /// Key presses the player acknowledged
    pub transmissions: usize,
}

pub(crate) struct Dispatcher {
    link: Arc<DeviceLink>,
    queue_timeout: Duration,
    refresh: Arc<Notify>,
}

impl Dispatcher {
    pub fn new(link: Arc<DeviceLink>, queue_timeout: Duration, refresh: Arc<Notify>) -> Self {
        Self {
            link,
            queue_timeout,
            refresh,
        }
    }

    pub async fn send<S: AsRef<str>>(
        &self,
        tokens: &[S],
        delay: Duration,
        repeats: usize,
    ) -> Result<DispatchReport, DispatchError> {
        let commands = tokens
            .iter()
            .map(|token| {
                token
                    .as_ref()
                    .parse::<Command>()
                    .map_err(|_| DispatchError::InvalidToken(token.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if commands.is_empty() || repeats == 0 {
            return Ok(DispatchReport::default());
        }

        let span = info_span!("dispatch", endpoint = %self.link.endpoint());
        self.run(&commands, delay, repeats).instrument(span).await
    }

    async fn run(
        &self,
        commands: &[Command],
        delay: Duration,
        repeats: usize,
    ) -> Result<DispatchReport, DispatchError> {
        let _queued = tokio::time::timeout(self.queue_timeout, self.link.queue())
            .await
            .map_err(|_| DispatchError::QueueTimeout(self.queue_timeout))?;

        let sequence = commands
            .iter()
            .flat_map(|command| std::iter::repeat(*command).take(repeats));

        let mut completed = 0;
        for command in sequence {
            if completed > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            debug!(%command, "sending key");
            self.link
                .transmit(command)
                .await
                .map_err(|e| dispatch_failure(e, command, completed))?;
            completed += 1;
        }

        info!(transmissions = completed, "dispatch complete");
        self.refresh.notify_one();
        Ok(DispatchReport {
            transmissions: completed,
        })
    }
}

fn dispatch_failure(error: TransmitError, command: Command, completed: usize) -> DispatchError {
    match error {
        TransmitError::Detection(DetectionError::DetectionFailed { cause, .. }) => {
            DispatchError::TransportFailure {
                completed,
                source: cause,
            }
        }
        TransmitError::AuthRequired => DispatchError::AuthRequired { completed },
        TransmitError::AuthFailed(reason) => DispatchError::AuthFailed { completed, reason },
        TransmitError::Rejected { code } => DispatchError::CommandRejected {
            completed,
            command,
            code,
        },
        TransmitError::Transport(source) => DispatchError::TransportFailure { completed, source },
    }
}
