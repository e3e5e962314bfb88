//! Availability tracking with hysteresis
//!
//! A player is flaky over HTTP: single requests time out routinely. The
//! tracker only flips a player to unavailable after `threshold` consecutive
//! failures, and back to available on the first success.

use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Phase of the per-player poll state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollPhase {
    /// Dialect unknown; each cycle starts with detection
    Detecting,
    /// Dialect known, player answering
    Polling,
    /// Dialect known, failure threshold reached
    Degraded,
}

/// What a recorded outcome changed, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    BecameAvailable,
    BecameUnavailable,
}

#[derive(Debug, Clone)]
pub struct AvailabilityTracker {
    threshold: u32,
    phase: PollPhase,
    available: bool,
    consecutive_failures: u32,
    degraded_since: Option<Instant>,
    last_success: Option<Instant>,
}

impl AvailabilityTracker {
    /// `threshold` is clamped to at least 1
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            phase: PollPhase::Detecting,
            available: false,
            consecutive_failures: 0,
            degraded_since: None,
            last_success: None,
        }
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn last_success(&self) -> Option<Instant> {
        self.last_success
    }

    pub fn record_success(&mut self, now: Instant) -> Transition {
        let was_available = self.available;
        self.phase = PollPhase::Polling;
        self.available = true;
        self.consecutive_failures = 0;
        self.degraded_since = None;
        self.last_success = Some(now);

        if was_available {
            Transition::Unchanged
        } else {
            Transition::BecameAvailable
        }
    }

    /// Record a failed cycle; `detected` says whether the dialect is known
    pub fn record_failure(&mut self, detected: bool, now: Instant) -> Transition {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        if detected && self.phase == PollPhase::Detecting {
            self.phase = PollPhase::Polling;
        }
        if !detected {
            self.phase = PollPhase::Detecting;
        }

        if self.consecutive_failures < self.threshold {
            return Transition::Unchanged;
        }

        if self.phase == PollPhase::Polling {
            self.phase = PollPhase::Degraded;
            self.degraded_since = Some(now);
        }
        if self.available {
            self.available = false;
            Transition::BecameUnavailable
        } else {
            Transition::Unchanged
        }
    }

    /// Degraded for at least `after` without a success
    pub fn redetect_due(&self, now: Instant, after: Duration) -> bool {
        match (self.phase, self.degraded_since) {
            (PollPhase::Degraded, Some(since)) => now.saturating_duration_since(since) >= after,
            _ => false,
        }
    }

    /// Drop back to detection, keeping the failure count and availability
    pub fn restart_detection(&mut self) {
        self.phase = PollPhase::Detecting;
        self.degraded_since = None;
    }

    /// Delay before the next cycle
    ///
    /// Doubles per failure past the threshold, capped at `max`.
    pub fn next_interval(&self, base: Duration, max: Duration) -> Duration {
        if self.consecutive_failures < self.threshold {
            return base;
        }
        let excess = self.consecutive_failures - self.threshold + 1;
        let factor = 1u32.checked_shl(excess.min(31)).unwrap_or(u32::MAX);
        base.saturating_mul(factor).min(max.max(base))
    }
}
