//! Remote-control key catalog
//!
//! Every key the players accept is a variant of [`Command`]. Tokens are the
//! suffix of the `cCMD_RC_<TOKEN>` action and are matched case-insensitively.

use crate::{ApiError, Dialect};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Generates the [`Command`] enum with its token and description tables
///
/// Keys listed under `uhd` only exist on UHD remotes.
macro_rules! define_commands {
    (
        bd: { $($bd:ident => $bd_token:literal, $bd_desc:literal;)* }
        uhd: { $($uhd:ident => $uhd_token:literal, $uhd_desc:literal;)* }
    ) => {
        /// A remote-control key
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Command {
            $(#[doc = $bd_desc] $bd,)*
            $(#[doc = $uhd_desc] $uhd,)*
        }

        impl Command {
            const CATALOG: &'static [Command] = &[
                $(Command::$bd,)*
                $(Command::$uhd,)*
            ];

            /// Wire token, as in `cCMD_RC_<token>`
            pub fn token(&self) -> &'static str {
                match self {
                    $(Command::$bd => $bd_token,)*
                    $(Command::$uhd => $uhd_token,)*
                }
            }

            pub fn description(&self) -> &'static str {
                match self {
                    $(Command::$bd => $bd_desc,)*
                    $(Command::$uhd => $uhd_desc,)*
                }
            }

            /// Key only present on UHD remotes
            pub fn is_uhd_only(&self) -> bool {
                match self {
                    $(Command::$uhd => true,)*
                    _ => false,
                }
            }
        }
    };
}

define_commands! {
    bd: {
        Power => "POWER", "Toggle power (on/standby)";
        PowerOn => "POWERON", "Power on only";
        PowerOff => "POWEROFF", "Power off (standby) only";
        OpenClose => "OP_CL", "Open/Close disc tray";
        Playback => "PLAYBACK", "Play";
        Pause => "PAUSE", "Pause";
        Stop => "STOP", "Stop";
        Cue => "CUE", "Fast forward";
        Rev => "REV", "Rewind";
        SkipForward => "SKIPFWD", "Skip forward (next chapter)";
        SkipReverse => "SKIPREV", "Skip back (previous chapter)";
        ShuttleForward1 => "SHFWD1", "Shuttle forward speed 1";
        ShuttleForward2 => "SHFWD2", "Shuttle forward speed 2";
        ShuttleForward3 => "SHFWD3", "Shuttle forward speed 3";
        ShuttleForward4 => "SHFWD4", "Shuttle forward speed 4";
        ShuttleForward5 => "SHFWD5", "Shuttle forward speed 5";
        ShuttleReverse1 => "SHREV1", "Shuttle reverse speed 1";
        ShuttleReverse2 => "SHREV2", "Shuttle reverse speed 2";
        ShuttleReverse3 => "SHREV3", "Shuttle reverse speed 3";
        ShuttleReverse4 => "SHREV4", "Shuttle reverse speed 4";
        ShuttleReverse5 => "SHREV5", "Shuttle reverse speed 5";
        JogLeft => "JLEFT", "Jog left (frame back)";
        JogRight => "JRIGHT", "Jog right (frame forward)";
        Up => "UP", "Navigate up";
        Down => "DOWN", "Navigate down";
        Left => "LEFT", "Navigate left";
        Right => "RIGHT", "Navigate right";
        Select => "SELECT", "OK / Select";
        Return => "RETURN", "Return / Back";
        Exit => "EXIT", "Exit menu";
        HomeMenu => "MLTNAVI", "Home menu";
        DisplayStatus => "DSPSEL", "Display / Status";
        Title => "TITLE", "Top menu / Title menu";
        Menu => "MENU", "Disc menu";
        PopupMenu => "PUPMENU", "Pop-up menu";
        Setup => "SETUP", "Setup menu";
        Digit0 => "D0", "Number 0";
        Digit1 => "D1", "Number 1";
        Digit2 => "D2", "Number 2";
        Digit3 => "D3", "Number 3";
        Digit4 => "D4", "Number 4";
        Digit5 => "D5", "Number 5";
        Digit6 => "D6", "Number 6";
        Digit7 => "D7", "Number 7";
        Digit8 => "D8", "Number 8";
        Digit9 => "D9", "Number 9";
        Digit12 => "D12", "Number 12";
        Sharp => "SHARP", "# key";
        Clear => "CLEAR", "* / Cancel";
        Red => "RED", "Red button";
        Green => "GREEN", "Green button";
        Blue => "BLUE", "Blue button";
        Yellow => "YELLOW", "Yellow button";
        Netflix => "NETFLIX", "Netflix";
        Skype => "SKYPE", "Skype";
        VieraCast => "V_CAST", "VIERA Cast";
        Network => "NETWORK", "Network menu";
        AudioSelect => "AUDIOSEL", "Audio selection";
        ThreeD => "3D", "3D mode toggle";
        OsdToggle => "OSDONOFF", "On-screen display toggle";
        PictureInPicture => "P_IN_P", "Picture-in-picture";
        Pip => "PIP", "Picture-in-picture (alternate)";
        PictureMode => "PICTMD", "Picture mode";
        Secondary => "2NDARY", "Secondary audio/video";
        Chroma => "CHROMA", "Chroma settings";
        Keys => "KEYS", "Key lock";
        Detail => "DETAIL", "Detail settings";
        Resolution => "RESOLUTN", "Resolution settings";
    }
    uhd: {
        ManualSkip => "MNSKIP", "Manual skip +60 seconds";
        ManualBack => "MNBACK", "Manual skip -10 seconds";
        SubtitleToggle => "TITLEONOFF", "Subtitle toggle";
        ClosedCaption => "CLOSED_CAPTION", "Closed captions";
        HdrPictureMode => "HDR_PICTUREMODE", "HDR picture mode";
        PictureSettings => "PICTURESETTINGS", "Picture settings";
        SoundEffect => "SOUNDEFFECT", "Sound effects";
        HighClarity => "HIGHCLARITY", "High clarity sound";
        PlaybackInfo => "PLAYBACKINFO", "Playback information";
        Miracast => "MIRACAST", "Screen mirroring";
        SkipTheTrailer => "SKIP_THE_TRAILER", "Skip trailer";
    }
}

impl Command {
    /// The whole catalog, sorted by token
    pub fn all() -> Vec<Command> {
        let mut commands = Self::CATALOG.to_vec();
        commands.sort_by_key(|c| c.token());
        commands
    }

    /// Whether a player speaking `dialect` has this key
    pub fn is_supported_by(&self, dialect: Dialect) -> bool {
        match dialect {
            Dialect::Uhd => true,
            Dialect::Bd => !self.is_uhd_only(),
        }
    }
}

impl FromStr for Command {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::CATALOG
            .iter()
            .copied()
            .find(|c| c.token().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ApiError::InvalidCommand(s.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.token())
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(serde::de::Error::custom)
    }
}
