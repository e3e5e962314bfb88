//! Player status as reported and as published
//!
//! [`StatusReport`] is what the player said, combined from one or two
//! replies. [`NormalizedState`] is what hosts see. The mapping between them
//! is a fixed table with no dependency on history.

use bdp_api::operations::{ExtendedStatusInfo, PlayState, PlayStatusInfo, PowerIndicator};
use bdp_api::Dialect;
use serde::Serialize;
use std::time::SystemTime;

/// The player's literal status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RawStatus {
    PowerOff,
    TrayOpen,
    Stopped,
    Playing,
    Paused,
}

impl RawStatus {
    pub const ALL: [RawStatus; 5] = [
        RawStatus::PowerOff,
        RawStatus::TrayOpen,
        RawStatus::Stopped,
        RawStatus::Playing,
        RawStatus::Paused,
    ];

    /// Diagnostic label, in the wording of the player's own status display
    pub fn label(&self) -> &'static str {
        match self {
            RawStatus::PowerOff => "Power Off",
            RawStatus::TrayOpen => "Tray Open",
            RawStatus::Stopped => "Stopped",
            RawStatus::Playing => "Playback",
            RawStatus::Paused => "Pause Playback",
        }
    }
}

impl From<PlayState> for RawStatus {
    fn from(state: PlayState) -> Self {
        match state {
            PlayState::Stopped => RawStatus::Stopped,
            PlayState::Playing => RawStatus::Playing,
            PlayState::Paused => RawStatus::Paused,
        }
    }
}

/// Normalized playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    Off,
    Idle,
    Playing,
    Paused,
}

impl From<RawStatus> for PlayerState {
    fn from(raw: RawStatus) -> Self {
        match raw {
            RawStatus::PowerOff => PlayerState::Off,
            RawStatus::TrayOpen | RawStatus::Stopped => PlayerState::Idle,
            RawStatus::Playing => PlayerState::Playing,
            RawStatus::Paused => PlayerState::Paused,
        }
    }
}

/// One status reading, before normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub dialect: Dialect,
    pub raw: RawStatus,
    pub elapsed: Option<u32>,
    pub total: Option<u32>,
    pub chapter: Option<u32>,
    pub chapters: Option<u32>,
}

impl StatusReport {
    /// Combine the BD `PST` and `GET_STATUS` replies
    ///
    /// With quick start enabled a BD player in standby still answers and
    /// reports an extended indicator of 0 with play state 0.
    pub fn from_bd(play: &PlayStatusInfo, extended: &ExtendedStatusInfo) -> Self {
        let raw = match (extended.indicator, play.state) {
            (PowerIndicator::Standby, PlayState::Stopped) => RawStatus::PowerOff,
            (PowerIndicator::TrayOpen, _) => RawStatus::TrayOpen,
            (_, state) => state.into(),
        };
        Self {
            dialect: Dialect::Bd,
            raw,
            elapsed: play.elapsed.or(extended.elapsed),
            total: extended.total,
            chapter: extended.chapter,
            chapters: extended.chapters,
        }
    }

    /// UHD players only report `PST`
    pub fn from_uhd(play: &PlayStatusInfo) -> Self {
        Self {
            dialect: Dialect::Uhd,
            raw: play.state.into(),
            elapsed: play.elapsed,
            total: None,
            chapter: None,
            chapters: None,
        }
    }

    pub fn normalize(&self) -> NormalizedState {
        // UHD firmware never reports these; keep them absent rather than zero
        let bd_only = |value: Option<u32>| match self.dialect {
            Dialect::Bd => value,
            Dialect::Uhd => None,
        };
        NormalizedState {
            state: self.raw.into(),
            status_label: self.raw.label(),
            position: self.elapsed,
            duration: bd_only(self.total),
            chapter: bd_only(self.chapter),
            chapters: bd_only(self.chapters),
            position_updated_at: SystemTime::now(),
        }
    }
}

/// The state surfaced to hosts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedState {
    pub state: PlayerState,
    pub status_label: &'static str,
    /// Elapsed seconds
    pub position: Option<u32>,
    /// Title length in seconds (BD only)
    pub duration: Option<u32>,
    pub chapter: Option<u32>,
    pub chapters: Option<u32>,
    /// When `position` was read
    pub position_updated_at: SystemTime,
}
