//! # Panasonic BDP - status and control for Panasonic Blu-ray players
//!
//! Polls a Panasonic Blu-ray (BD) or Ultra HD (UHD) player over its HTTP
//! remote-control interface and sends it remote keys:
//!
//! ```rust,no_run
//! use panasonic_bdp::{Player, PlayerConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), panasonic_bdp::SdkError> {
//!     let config = PlayerConfig::new("192.168.1.40".parse().unwrap())
//!         .with_player_key("0123456789abcdef0123456789abcdef".parse()?);
//!     let player = Player::new(config)?;
//!
//!     let snapshot = player.poll_once().await;          // One status cycle
//!     println!("{:?} {:?}", snapshot.dialect, snapshot.state);
//!
//!     player.start();                                   // Background polling
//!     player.play().await?;                             // Single key press
//!     player.dispatch(&["SKIPFWD"], Duration::from_millis(400), 3).await?;
//!
//!     let mut updates = player.subscribe();
//!     updates.changed().await.ok();
//!     println!("{:?}", player.get_normalized_state());
//!     Ok(())
//! }
//! ```
//!
//! ## Key Features
//!
//! - **Dialect detection**: BD and UHD players are told apart on first contact
//! - **Serialized access**: polls and key presses never overlap on one player
//! - **Hysteresis**: a player is only reported unavailable after repeated failures
//! - **UHD authentication**: challenge exchange with automatic re-authentication
//! - **Watchable state**: every poll publishes a [`PlayerSnapshot`]
//!
//! ## Architecture
//!
//! ```text
//! panasonic-bdp (Player, poller, dispatcher)
//!     ↓
//! bdp-api (operations, detection, authentication)
//!     ↓
//! bdp-client (HTTP transport)
//! ```

// Main exports
pub use config::PlayerConfig;
pub use dispatcher::DispatchReport;
pub use error::{ConfigError, DispatchError, PollError, SdkError};
pub use player::Player;
pub use poller::PlayerSnapshot;

pub use availability::PollPhase;
pub use model::{NormalizedState, PlayerState, RawStatus, StatusReport};

// Re-export commonly used types from the lower layers
pub use bdp_api::{Command, Dialect, PlayerKey};
pub use bdp_client::Endpoint;

pub mod availability;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

// Internal modules
mod dispatcher;
mod link;
mod player;
mod poller;
