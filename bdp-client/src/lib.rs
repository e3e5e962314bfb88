//! Private HTTP transport for Panasonic Blu-ray player communication
//!
//! Every control request a player understands is a form-encoded POST to a
//! single CGI path. This crate owns that exchange: addressing a player
//! ([`Endpoint`]), the [`Transport`] seam the rest of the workspace talks to,
//! and the reqwest-backed [`HttpTransport`] used in production. Nothing here
//! knows what the request body means.
//!
//! With the `test-support` feature a scripted [`mock::MockTransport`] is
//! available for exercising callers without a device.

mod error;
mod http;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;

pub use error::TransportError;
pub use http::HttpTransport;

use async_trait::async_trait;
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Network address of one physical player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: Ipv4Addr,
    port: u16,
}

impl Endpoint {
    /// Port every player listens on
    pub const DEFAULT_PORT: u16 = 80;

    /// Path of the control CGI on the player
    pub const CONTROL_PATH: &'static str = "/WAN/dvdr/dvdr_ctrl.cgi";

    pub fn new(host: Ipv4Addr) -> Self {
        Self {
            host,
            port: Self::DEFAULT_PORT,
        }
    }

    /// Override the port, mostly useful against a local test server
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn host(&self) -> Ipv4Addr {
        self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Full URL of the control CGI
    pub fn control_url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, Self::CONTROL_PATH)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.port == Self::DEFAULT_PORT {
            write!(f, "{}", self.host)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// One request/response exchange with a player
///
/// Implementations perform exactly one attempt per call. Retrying, pacing
/// and serialization are the caller's business.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` (an already encoded form body) and return the raw
    /// response body, failing if nothing usable arrives within `timeout`.
    async fn invoke(
        &self,
        endpoint: &Endpoint,
        request: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;
}
