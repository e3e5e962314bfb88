//! Type-safe control API for Panasonic Blu-ray and UHD players
//!
//! This crate knows what the player's control CGI means: which actions
//! exist per [`Dialect`], how replies are encoded, how to tell the two
//! generations apart, and how UHD players authenticate. It uses the private
//! `bdp-client` crate for the HTTP exchange itself.
//!
//! ```rust,no_run
//! use bdp_api::{detect, operations::PlayStatus, PlayerClient};
//! use bdp_client::Endpoint;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PlayerClient::http()?;
//! let endpoint = Endpoint::new("192.168.1.40".parse()?);
//!
//! let dialect = detect(&client, &endpoint).await?;
//! let status = client.execute(&endpoint, &PlayStatus).await?;
//! println!("{} player is {:?}", dialect, status.state);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod codec;
pub mod command;
pub mod detect;
pub mod dialect;
pub mod error;
pub mod operation;
pub mod operations;

pub use auth::{challenge_answer, Authenticator, Credential, PlayerKey};
pub use client::PlayerClient;
pub use command::Command;
pub use detect::detect;
pub use dialect::Dialect;
pub use error::{ApiError, AuthError, DetectionError, Result};
pub use operation::PlayerOperation;
