//! Configuration for one player
//!
//! Hosts either build a [`PlayerConfig`] in code or load it from JSON; both
//! paths end in [`PlayerConfig::validate`]. Durations in JSON are seconds as
//! floats (`"command_delay": 0.4`).

use crate::error::ConfigError;
use bdp_api::PlayerKey;
use bdp_client::Endpoint;
use serde::{Deserialize, Deserializer};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Settings for a single player
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlayerConfig {
    /// Player address
    pub host: Ipv4Addr,

    /// Control port
    /// Default: 80
    #[serde(default = "defaults::port")]
    pub port: u16,

    /// Display name, used in log fields
    /// Default: "Panasonic Blu-ray"
    #[serde(default = "defaults::name")]
    pub name: String,

    /// Secret unlocking key presses on UHD players
    /// Default: none
    #[serde(default)]
    pub player_key: Option<PlayerKey>,

    /// Bound on each request
    /// Default: 5 seconds
    #[serde(default = "defaults::request_timeout", deserialize_with = "secs")]
    pub request_timeout: Duration,

    /// Delay between status polls
    /// Default: 10 seconds
    #[serde(default = "defaults::poll_interval", deserialize_with = "secs")]
    pub poll_interval: Duration,

    /// Cap for the backed-off poll interval while degraded
    /// Default: 60 seconds
    #[serde(default = "defaults::max_poll_interval", deserialize_with = "secs")]
    pub max_poll_interval: Duration,

    /// Consecutive failed polls before the player is reported unavailable
    /// Default: 3
    #[serde(default = "defaults::failure_threshold")]
    pub failure_threshold: u32,

    /// Continuous degradation after which the dialect is detected again
    /// Default: 5 minutes
    #[serde(default = "defaults::redetect_after", deserialize_with = "secs")]
    pub redetect_after: Duration,

    /// Longest wait behind an earlier dispatch
    /// Default: 30 seconds
    #[serde(default = "defaults::queue_timeout", deserialize_with = "secs")]
    pub queue_timeout: Duration,

    /// Delay between key presses for the convenience controls
    /// Default: 0.4 seconds
    #[serde(default = "defaults::command_delay", deserialize_with = "secs")]
    pub command_delay: Duration,

    /// Minimum spacing of forced refreshes
    /// Default: 1 second
    #[serde(default = "defaults::min_forced_refresh", deserialize_with = "secs")]
    pub min_forced_refresh: Duration,
}

mod defaults {
    use std::time::Duration;

    pub fn port() -> u16 {
        bdp_client::Endpoint::DEFAULT_PORT
    }
    pub fn name() -> String {
        "Panasonic Blu-ray".to_string()
    }
    pub fn request_timeout() -> Duration {
        Duration::from_secs(5)
    }
    pub fn poll_interval() -> Duration {
        Duration::from_secs(10)
    }
    pub fn max_poll_interval() -> Duration {
        Duration::from_secs(60)
    }
    pub fn failure_threshold() -> u32 {
        3
    }
    pub fn redetect_after() -> Duration {
        Duration::from_secs(300)
    }
    pub fn queue_timeout() -> Duration {
        Duration::from_secs(30)
    }
    pub fn command_delay() -> Duration {
        Duration::from_millis(400)
    }
    pub fn min_forced_refresh() -> Duration {
        Duration::from_secs(1)
    }
}

fn secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let value = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(value).map_err(serde::de::Error::custom)
}

impl PlayerConfig {
    /// Defaults for the player at `host`
    pub fn new(host: Ipv4Addr) -> Self {
        Self {
            host,
            port: defaults::port(),
            name: defaults::name(),
            player_key: None,
            request_timeout: defaults::request_timeout(),
            poll_interval: defaults::poll_interval(),
            max_poll_interval: defaults::max_poll_interval(),
            failure_threshold: defaults::failure_threshold(),
            redetect_after: defaults::redetect_after(),
            queue_timeout: defaults::queue_timeout(),
            command_delay: defaults::command_delay(),
            min_forced_refresh: defaults::min_forced_refresh(),
        }
    }

    /// Parse and validate a JSON object
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host).with_port(self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("request_timeout", self.request_timeout),
            ("poll_interval", self.poll_interval),
            ("max_poll_interval", self.max_poll_interval),
            ("redetect_after", self.redetect_after),
            ("queue_timeout", self.queue_timeout),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, d)| d.is_zero()) {
            return Err(ConfigError::ZeroDuration(*name));
        }

        if self.failure_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }

        if self.max_poll_interval < self.poll_interval {
            return Err(ConfigError::BackoffBelowInterval {
                base: self.poll_interval,
                max: self.max_poll_interval,
            });
        }

        if self.port == 0 {
            return Err(ConfigError::Invalid("port must not be 0".to_string()));
        }

        Ok(())
    }

    // Builder methods

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_player_key(mut self, key: PlayerKey) -> Self {
        self.player_key = Some(key);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, base: Duration, max: Duration) -> Self {
        self.poll_interval = base;
        self.max_poll_interval = max;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_redetect_after(mut self, after: Duration) -> Self {
        self.redetect_after = after;
        self
    }

    pub fn with_queue_timeout(mut self, timeout: Duration) -> Self {
        self.queue_timeout = timeout;
        self
    }

    pub fn with_command_delay(mut self, delay: Duration) -> Self {
        self.command_delay = delay;
        self
    }

    pub fn with_min_forced_refresh(mut self, spacing: Duration) -> Self {
        self.min_forced_refresh = spacing;
        self
    }
}
