//! Logical actions a receiver can be asked to perform.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of actions.
///
/// The first six are user-facing.  The rest are control actions of the
/// serial hub protocol and are never accepted from a command source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Led,
    Beep,
    Vib,
    Zap,
    /// Beep, then after a settle delay, zap.
    BeepZap,
    /// Zero-intensity pulse that keeps a receiver out of sleep mode.
    KeepAwake,

    Boot,
    Booted,
    Add,
    Acknowledge,
    Ping,
    Pong,
    Debug,
    Error,
    Crash,
}

impl Action {
    pub const USER: [Action; 6] = [
        Action::Led,
        Action::Beep,
        Action::Vib,
        Action::Zap,
        Action::BeepZap,
        Action::KeepAwake,
    ];

    /// Whether the action may be requested from outside the transport layer.
    pub fn is_user_action(self) -> bool {
        Self::USER.contains(&self)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Led => "LED",
            Self::Beep => "BEEP",
            Self::Vib => "VIB",
            Self::Zap => "ZAP",
            Self::BeepZap => "BEEPZAP",
            Self::KeepAwake => "KEEPAWAKE",
            Self::Boot => "BOOT",
            Self::Booted => "BOOTED",
            Self::Add => "ADD",
            Self::Acknowledge => "ACKNOWLEDGE",
            Self::Ping => "PING",
            Self::Pong => "PONG",
            Self::Debug => "DEBUG",
            Self::Error => "ERROR",
            Self::Crash => "CRASH",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse error for [`Action::from_str`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown action \"{}\", expected one of LED, BEEP, VIB, ZAP, BEEPZAP, KEEPAWAKE",
            self.0
        )
    }
}

impl std::error::Error for UnknownAction {}

impl FromStr for Action {
    type Err = UnknownAction;

    /// Only user actions parse; control actions are internal to the hub protocol.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::USER
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}
