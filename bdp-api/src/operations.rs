//! Concrete player operations
//!
//! | operation | action | dialect |
//! |---|---|---|
//! | [`PlayStatus`] | `PST` | both |
//! | [`AuthenticatedPlayStatus`] | `PST` | UHD |
//! | [`ExtendedStatus`] | `GET_STATUS` | BD |
//! | [`SendKey`] | `RC_<TOKEN>` | both (UHD adds auth fields) |
//! | [`GetNonce`] | `GET_NONCE` | UHD |
//! | [`SubmitAnswer`] | `AUTH` | UHD |

use crate::auth::Credential;
use crate::codec::Reply;
use crate::operation::PlayerOperation;
use crate::{ApiError, Command, Result};
use serde::Serialize;
use std::borrow::Cow;

/// `cAUTH_FORM` value the UHD firmware expects
const AUTH_FORM: &str = "C4";

/// Transport state reported by `PST`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayState {
    Stopped,
    Playing,
    Paused,
}

impl PlayState {
    fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(PlayState::Stopped),
            1 => Ok(PlayState::Playing),
            2 => Ok(PlayState::Paused),
            other => Err(ApiError::decode(format!("Unknown play state code {}", other))),
        }
    }
}

/// Decoded `PST` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayStatusInfo {
    pub state: PlayState,
    /// Elapsed seconds; absent when the player reports a negative position (no disc)
    pub elapsed: Option<u32>,
}

/// Power or tray indicator of the BD `GET_STATUS` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerIndicator {
    /// Network standby: the player answers but is off
    Standby,
    TrayOpen,
    On,
}

/// Decoded BD `GET_STATUS` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedStatusInfo {
    pub indicator: PowerIndicator,
    pub elapsed: Option<u32>,
    /// Title length in seconds; the player reports 0 when unknown
    pub total: Option<u32>,
    pub chapter: Option<u32>,
    pub chapters: Option<u32>,
}

/// Basic play status, understood by both generations
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayStatus;

impl PlayStatus {
    /// Play status carrying a UHD session credential
    pub fn authenticated(credential: Credential) -> AuthenticatedPlayStatus {
        AuthenticatedPlayStatus { credential }
    }
}

impl PlayerOperation for PlayStatus {
    type Response = PlayStatusInfo;

    fn action(&self) -> Cow<'static, str> {
        Cow::Borrowed("PST")
    }

    fn parse_response(&self, reply: &Reply) -> Result<Self::Response> {
        parse_play_status(reply)
    }
}

/// `PST` as sent to an authenticated UHD player
#[derive(Debug, Clone)]
pub struct AuthenticatedPlayStatus {
    credential: Credential,
}

impl PlayerOperation for AuthenticatedPlayStatus {
    type Response = PlayStatusInfo;

    fn action(&self) -> Cow<'static, str> {
        Cow::Borrowed("PST")
    }

    fn form_fields(&self) -> Vec<(&'static str, String)> {
        auth_fields(self.credential.expose())
    }

    fn parse_response(&self, reply: &Reply) -> Result<Self::Response> {
        parse_play_status(reply)
    }
}

fn parse_play_status(reply: &Reply) -> Result<PlayStatusInfo> {
    reply.require_data("PST")?;
    let state = PlayState::from_code(reply.number(0, "state")?)?;
    let elapsed = reply.optional_number(1, "position")?.and_then(seconds);
    Ok(PlayStatusInfo { state, elapsed })
}

/// Extended status with tray, duration and chapters (BD only)
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtendedStatus;

impl ExtendedStatus {
    const MIN_FIELDS: usize = 5;
}

impl PlayerOperation for ExtendedStatus {
    type Response = ExtendedStatusInfo;

    fn action(&self) -> Cow<'static, str> {
        Cow::Borrowed("GET_STATUS")
    }

    fn parse_response(&self, reply: &Reply) -> Result<Self::Response> {
        let data = reply.require_data("GET_STATUS")?;
        if data.len() < Self::MIN_FIELDS {
            return Err(ApiError::decode(format!(
                "GET_STATUS reply has {} fields, expected at least {}",
                data.len(),
                Self::MIN_FIELDS
            )));
        }

        // Any code past the two special ones means powered on
        let indicator = match reply.number(0, "power")? {
            0 => PowerIndicator::Standby,
            1 => PowerIndicator::TrayOpen,
            _ => PowerIndicator::On,
        };

        Ok(ExtendedStatusInfo {
            indicator,
            elapsed: seconds(reply.number(3, "elapsed")?),
            total: seconds(reply.number(4, "total")?).filter(|&t| t > 0),
            chapter: reply.optional_number(5, "chapter")?.and_then(seconds),
            chapters: reply.optional_number(6, "chapters")?.and_then(seconds),
        })
    }
}

/// A remote-control key press
#[derive(Debug, Clone)]
pub struct SendKey {
    command: Command,
    credential: Option<Credential>,
}

impl SendKey {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            credential: None,
        }
    }

    /// Key press carrying a UHD session credential
    pub fn authenticated(command: Command, credential: Credential) -> Self {
        Self {
            command,
            credential: Some(credential),
        }
    }

    pub fn command(&self) -> Command {
        self.command
    }
}

impl PlayerOperation for SendKey {
    type Response = ();

    fn action(&self) -> Cow<'static, str> {
        Cow::Owned(format!("RC_{}", self.command.token()))
    }

    fn form_fields(&self) -> Vec<(&'static str, String)> {
        match &self.credential {
            Some(credential) => auth_fields(credential.expose()),
            None => Vec::new(),
        }
    }

    fn parse_response(&self, _reply: &Reply) -> Result<Self::Response> {
        Ok(())
    }
}

/// Request a challenge nonce (UHD)
#[derive(Debug, Clone, Copy, Default)]
pub struct GetNonce;

impl PlayerOperation for GetNonce {
    type Response = String;

    fn action(&self) -> Cow<'static, str> {
        Cow::Borrowed("GET_NONCE")
    }

    fn parse_response(&self, reply: &Reply) -> Result<Self::Response> {
        match reply.field(0) {
            Some(nonce) if !nonce.is_empty() => Ok(nonce.to_string()),
            _ => Err(ApiError::decode("GET_NONCE reply carries no nonce")),
        }
    }
}

/// Submit the challenge answer (UHD)
///
/// Responds with the session id when the player issues one.
#[derive(Debug, Clone)]
pub struct SubmitAnswer {
    answer: String,
}

impl SubmitAnswer {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
        }
    }
}

impl PlayerOperation for SubmitAnswer {
    type Response = Option<String>;

    fn action(&self) -> Cow<'static, str> {
        Cow::Borrowed("AUTH")
    }

    fn form_fields(&self) -> Vec<(&'static str, String)> {
        auth_fields(&self.answer)
    }

    fn parse_response(&self, reply: &Reply) -> Result<Self::Response> {
        Ok(reply
            .field(0)
            .filter(|session| !session.is_empty())
            .map(str::to_string))
    }
}

fn auth_fields(value: &str) -> Vec<(&'static str, String)> {
    vec![
        ("cAUTH_FORM", AUTH_FORM.to_string()),
        ("cAUTH_VALUE", value.to_string()),
    ]
}

/// Negative values mean "not applicable" on the wire
fn seconds(value: i64) -> Option<u32> {
    u32::try_from(value).ok()
}
