//! Recurring status polling with hysteresis
//!
//! [`StatusPoller::poll_once`] runs one cycle: re-detect if the player has
//! been degraded too long, fetch status through the link, update the
//! availability tracker and publish a [`PlayerSnapshot`]. [`PollingTask`]
//! drives cycles on a timer until stopped.

use crate::availability::{AvailabilityTracker, PollPhase, Transition};
use crate::error::PollError;
use crate::link::DeviceLink;
use crate::model::NormalizedState;
use bdp_api::Dialect;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// What hosts see of a player after each poll cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub available: bool,
    /// Last known state; kept while the player is unreachable, cleared
    /// while it answers but withholds its status
    pub state: Option<NormalizedState>,
    pub dialect: Option<Dialect>,
    pub phase: PollPhase,
    pub consecutive_failures: u32,
    #[serde(skip)]
    pub last_success: Option<Instant>,
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self {
            available: false,
            state: None,
            dialect: None,
            phase: PollPhase::Detecting,
            consecutive_failures: 0,
            last_success: None,
        }
    }
}

pub(crate) struct StatusPoller {
    link: Arc<DeviceLink>,
    name: String,
    tracker: Mutex<AvailabilityTracker>,
    snapshot: watch::Sender<PlayerSnapshot>,
    poll_interval: Duration,
    max_poll_interval: Duration,
    redetect_after: Duration,
}

impl StatusPoller {
    pub fn new(
        link: Arc<DeviceLink>,
        name: impl Into<String>,
        failure_threshold: u32,
        poll_interval: Duration,
        max_poll_interval: Duration,
        redetect_after: Duration,
    ) -> Self {
        let (snapshot, _) = watch::channel(PlayerSnapshot::default());
        Self {
            link,
            name: name.into(),
            tracker: Mutex::new(AvailabilityTracker::new(failure_threshold)),
            snapshot,
            poll_interval,
            max_poll_interval,
            redetect_after,
        }
    }

    pub fn current(&self) -> PlayerSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.snapshot.subscribe()
    }

    /// Run one poll cycle and publish its snapshot
    ///
    /// Failures never escape: they are counted, logged and reflected in the
    /// snapshot's availability.
    pub async fn poll_once(&self) -> PlayerSnapshot {
        let span = info_span!("poll", player = %self.name, endpoint = %self.link.endpoint());
        self.cycle().instrument(span).await
    }

    async fn cycle(&self) -> PlayerSnapshot {
        // Held for the whole cycle so forced and scheduled polls never overlap
        let mut tracker = self.tracker.lock().await;

        if tracker.redetect_due(Instant::now(), self.redetect_after) {
            info!(
                after = ?self.redetect_after,
                "player degraded for too long, detecting dialect again"
            );
            self.link.forget_dialect().await;
            tracker.restart_detection();
        }

        let outcome = self.link.fetch_status().await;
        let now = Instant::now();
        let last_state = self.snapshot.borrow().state.clone();

        let state = match outcome {
            Ok(report) => {
                let failures = tracker.consecutive_failures();
                let raw = report.as_ref().map(|r| r.raw);
                match tracker.record_success(now) {
                    Transition::BecameAvailable if failures > 0 => {
                        info!(failures, "player reachable again")
                    }
                    Transition::BecameAvailable => info!(?raw, "player available"),
                    _ if failures > 0 => debug!(failures, "poll recovered"),
                    _ => {}
                }
                // Reachable but withholding status: the state is unknown
                report.map(|r| r.normalize())
            }
            Err(e) => {
                let detected = self.link.dialect().is_some();
                let transition = tracker.record_failure(detected, now);
                self.log_failure(&tracker, &e);
                if transition == Transition::BecameUnavailable {
                    warn!(
                        failures = tracker.consecutive_failures(),
                        "player marked unavailable"
                    );
                }
                last_state
            }
        };

        let snapshot = PlayerSnapshot {
            available: tracker.is_available(),
            state,
            dialect: self.link.dialect(),
            phase: tracker.phase(),
            consecutive_failures: tracker.consecutive_failures(),
            last_success: tracker.last_success(),
        };
        self.snapshot.send_replace(snapshot.clone());
        snapshot
    }

    fn log_failure(&self, tracker: &AvailabilityTracker, error: &PollError) {
        let failures = tracker.consecutive_failures();
        let threshold = tracker.threshold();
        if failures <= threshold {
            warn!(failures, %error, "poll failed");
        } else if failures == threshold + 1 {
            error!(
                failures,
                %error,
                "player still not responding, suppressing further warnings"
            );
        } else {
            debug!(failures, %error, "poll failed");
        }
    }

    /// Delay before the next scheduled cycle
    pub async fn next_interval(&self) -> Duration {
        self.tracker
            .lock()
            .await
            .next_interval(self.poll_interval, self.max_poll_interval)
    }
}

/// Background loop polling one player
///
/// The first cycle runs immediately. `wake` cuts the current wait short,
/// which is how a finished dispatch gets its effect shown quickly.
#[derive(Debug)]
pub(crate) struct PollingTask {
    task_handle: JoinHandle<()>,
    shutdown_signal: Arc<AtomicBool>,
}

impl PollingTask {
    /// Spawn the loop on the current tokio runtime
    pub fn start(poller: Arc<StatusPoller>, wake: Arc<Notify>) -> Self {
        let shutdown_signal = Arc::new(AtomicBool::new(false));
        let task_shutdown_signal = Arc::clone(&shutdown_signal);

        let task_handle = tokio::spawn(async move {
            Self::polling_loop(poller, wake, task_shutdown_signal).await;
        });

        Self {
            task_handle,
            shutdown_signal,
        }
    }

    async fn polling_loop(
        poller: Arc<StatusPoller>,
        wake: Arc<Notify>,
        shutdown_signal: Arc<AtomicBool>,
    ) {
        debug!(player = %poller.name, "polling task started");

        while !shutdown_signal.load(Ordering::Relaxed) {
            poller.poll_once().await;

            let interval = poller.next_interval().await;
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = wake.notified() => {
                    debug!(player = %poller.name, "poll woken early");
                }
            }
        }

        debug!(player = %poller.name, "polling task ended");
    }

    pub fn is_running(&self) -> bool {
        !self.task_handle.is_finished()
    }

    pub fn stop(&self) {
        self.shutdown_signal.store(true, Ordering::Relaxed);
        self.task_handle.abort();
    }
}

impl Drop for PollingTask {
    fn drop(&mut self) {
        self.stop();
    }
}
