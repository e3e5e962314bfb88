//! Player - the host-facing handle for one Panasonic player

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bdp_api::{Command, Dialect, PlayerClient};
use bdp_client::{Endpoint, HttpTransport, Transport};
use parking_lot::Mutex;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;
use tracing::debug;

use crate::dispatcher::{DispatchReport, Dispatcher};
use crate::link::DeviceLink;
use crate::model::{NormalizedState, PlayerState};
use crate::poller::{PlayerSnapshot, PollingTask, StatusPoller};
use crate::{DispatchError, PlayerConfig, SdkError};

/// Handle to one player
///
/// Cloning is cheap; clones share the same connection, poll loop and
/// command queue.
///
/// # Example
///
/// ```rust,no_run
/// use panasonic_bdp::{Player, PlayerConfig};
/// use std::time::Duration;
///
/// # async fn run() -> Result<(), panasonic_bdp::SdkError> {
/// let player = Player::new(PlayerConfig::new("192.168.1.40".parse().unwrap()))?;
/// player.start();
///
/// let mut updates = player.subscribe();
/// updates.changed().await.ok();
/// println!("{:?}", player.get_normalized_state());
///
/// player.dispatch(&["SKIPFWD"], Duration::from_millis(400), 2).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Player {
    inner: Arc<PlayerInner>,
}

struct PlayerInner {
    config: PlayerConfig,
    link: Arc<DeviceLink>,
    poller: Arc<StatusPoller>,
    dispatcher: Dispatcher,
    wake: Arc<Notify>,
    task: Mutex<Option<PollingTask>>,
    last_forced: Mutex<Option<Instant>>,
}

impl Player {
    /// Create a player talking HTTP to `config.host`
    ///
    /// Nothing is sent until [`start`](Self::start), a poll or a command.
    pub fn new(config: PlayerConfig) -> Result<Self, SdkError> {
        config.validate()?;
        let transport = HttpTransport::new()?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a player on a custom transport
    pub fn with_transport(
        config: PlayerConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, SdkError> {
        config.validate()?;

        let client = PlayerClient::new(transport, config.request_timeout);
        let link = Arc::new(DeviceLink::new(
            config.endpoint(),
            client,
            config.player_key.clone(),
        ));
        let wake = Arc::new(Notify::new());
        let poller = Arc::new(StatusPoller::new(
            Arc::clone(&link),
            config.name.clone(),
            config.failure_threshold,
            config.poll_interval,
            config.max_poll_interval,
            config.redetect_after,
        ));
        let dispatcher = Dispatcher::new(Arc::clone(&link), config.queue_timeout, Arc::clone(&wake));

        Ok(Self {
            inner: Arc::new(PlayerInner {
                config,
                link,
                poller,
                dispatcher,
                wake,
                task: Mutex::new(None),
                last_forced: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.inner.config
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.inner.link.endpoint()
    }

    /// Spawn the background poll loop; a no-op when it is already running
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut task = self.inner.task.lock();
        if task.as_ref().is_some_and(PollingTask::is_running) {
            return;
        }
        debug!(player = %self.inner.config.name, "starting poll loop");
        *task = Some(PollingTask::start(
            Arc::clone(&self.inner.poller),
            Arc::clone(&self.inner.wake),
        ));
    }

    /// Stop the background poll loop
    pub fn stop(&self) {
        if let Some(task) = self.inner.task.lock().take() {
            debug!(player = %self.inner.config.name, "stopping poll loop");
            task.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .task
            .lock()
            .as_ref()
            .is_some_and(PollingTask::is_running)
    }

    /// Availability and the last known state
    ///
    /// The state survives outages: an unreachable player reports `false`
    /// together with whatever it last showed.
    pub fn get_normalized_state(&self) -> (bool, Option<NormalizedState>) {
        let snapshot = self.inner.poller.current();
        (snapshot.available, snapshot.state)
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.inner.poller.current()
    }

    /// Receive every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.inner.poller.subscribe()
    }

    /// Detected dialect, `None` until detection succeeds
    pub fn device_class(&self) -> Option<Dialect> {
        self.inner.link.dialect()
    }

    /// Run one poll cycle now
    pub async fn poll_once(&self) -> PlayerSnapshot {
        self.inner.poller.poll_once().await
    }

    /// Run one poll cycle now, at most once per `min_forced_refresh`
    ///
    /// Calls arriving sooner return the current snapshot without polling.
    pub async fn refresh(&self) -> PlayerSnapshot {
        let now = Instant::now();
        {
            let mut last = self.inner.last_forced.lock();
            if let Some(previous) = *last {
                if now.saturating_duration_since(previous) < self.inner.config.min_forced_refresh {
                    debug!(player = %self.inner.config.name, "forced refresh rate limited");
                    return self.snapshot();
                }
            }
            *last = Some(now);
        }
        self.poll_once().await
    }

    /// Send `tokens` in order, each repeated `repeats` times, waiting
    /// `delay` between every transmission
    ///
    /// Waits behind any dispatch already running for this player. Unknown
    /// tokens fail the whole call before anything is sent.
    pub async fn dispatch<S: AsRef<str>>(
        &self,
        tokens: &[S],
        delay: Duration,
        repeats: usize,
    ) -> Result<DispatchReport, DispatchError> {
        self.inner.dispatcher.send(tokens, delay, repeats).await
    }

    /// Send a single token once
    pub async fn send_command(&self, token: &str) -> Result<DispatchReport, DispatchError> {
        self.dispatch(&[token], Duration::ZERO, 1).await
    }

    /// Commands worth offering for this player
    ///
    /// The full catalog until the dialect is known.
    pub fn available_commands(&self) -> Vec<Command> {
        let all = Command::all();
        match self.device_class() {
            Some(dialect) => all
                .into_iter()
                .filter(|c| c.is_supported_by(dialect))
                .collect(),
            None => all,
        }
    }

    // Media controls

    /// Press POWER unless the player is known to be on
    pub async fn turn_on(&self) -> Result<DispatchReport, DispatchError> {
        match self.last_state() {
            None | Some(PlayerState::Off) => self.press(Command::Power).await,
            Some(_) => Ok(DispatchReport::default()),
        }
    }

    /// Press POWER unless the player is known to be off
    pub async fn turn_off(&self) -> Result<DispatchReport, DispatchError> {
        match self.last_state() {
            Some(PlayerState::Off) => Ok(DispatchReport::default()),
            _ => self.press(Command::Power).await,
        }
    }

    pub async fn play(&self) -> Result<DispatchReport, DispatchError> {
        self.press(Command::Playback).await
    }

    pub async fn pause(&self) -> Result<DispatchReport, DispatchError> {
        self.press(Command::Pause).await
    }

    /// Press STOP (see [`stop`](Self::stop) for ending the poll loop)
    pub async fn stop_playback(&self) -> Result<DispatchReport, DispatchError> {
        self.press(Command::Stop).await
    }

    pub async fn next_chapter(&self) -> Result<DispatchReport, DispatchError> {
        self.press(Command::SkipForward).await
    }

    pub async fn previous_chapter(&self) -> Result<DispatchReport, DispatchError> {
        self.press(Command::SkipReverse).await
    }

    async fn press(&self, command: Command) -> Result<DispatchReport, DispatchError> {
        self.dispatch(&[command.token()], self.inner.config.command_delay, 1)
            .await
    }

    fn last_state(&self) -> Option<PlayerState> {
        self.inner.poller.current().state.map(|s| s.state)
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("name", &self.inner.config.name)
            .field("endpoint", self.inner.link.endpoint())
            .field("dialect", &self.device_class())
            .finish()
    }
}
