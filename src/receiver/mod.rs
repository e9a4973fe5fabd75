//! Receivers: one configured collar each.
//!
//! A [`Receiver`] is a closed set of variants.  Radio receivers encode
//! their frames with the codec engine and hand them to the
//! [`RfTransmitter`]; wired receivers are registered on the hub behind the
//! [`SerialManager`].  Both are built from a config section, then bound to
//! their transport exactly once by [`Receiver::boot`].

pub mod pac;
pub mod wired;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::app::action::Action;
use crate::app::ports::RfTransmitter;
use crate::config::{GlobalConfig, ReceiverSection};
use crate::error::{Error, Result};
use crate::serial::SerialManager;

pub use pac::PacReceiver;
pub use wired::{WiredKind, WiredReceiver};

/// Receiver `type` values accepted in the configuration.
pub const SUPPORTED_TYPES: [&str; 4] = [
    pac::TYPE_NAME,
    wired::PETRAINER_TYPE_NAME,
    wired::OPTOCOUPLER_TYPE_NAME,
    wired::BEEP_MODIFIER_TYPE_NAME,
];

/// Identity and duration tuning of one receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiverProperties {
    /// Family tag, the configured `type`.
    #[serde(rename = "type")]
    pub family: String,
    pub name: String,
    pub color: String,
    /// Durations are rounded to a multiple of this.
    pub duration_increment_ms: u32,
    /// Floor applied after rounding.
    pub duration_min_ms: u32,
    /// Sleep timer of the collar; 0 disables keep-alive pulses.
    pub awake_time_s: u32,
}

impl ReceiverProperties {
    /// Properties from a section, with per-family defaults for anything
    /// the section leaves out.
    pub fn from_section(
        family: &str,
        section: &ReceiverSection,
        default_increment_ms: u32,
        default_min_ms: u32,
    ) -> Self {
        Self {
            family: family.to_string(),
            name: section.name.clone(),
            color: section.color.clone(),
            duration_increment_ms: section.duration_increment_ms.unwrap_or(default_increment_ms),
            duration_min_ms: section.duration_min_ms.unwrap_or(default_min_ms),
            awake_time_s: section.awake_time_s.unwrap_or(0),
        }
    }

    /// Round to the increment, then apply the floor.
    ///
    /// Halfway cases round to the even multiple.
    pub fn normalize_duration(&self, duration_ms: u32) -> u32 {
        let increment = self.duration_increment_ms.max(1);
        let steps = (f64::from(duration_ms) / f64::from(increment)).round_ties_even();
        let rounded = (steps * f64::from(increment)).min(f64::from(u32::MAX)) as u32;
        rounded.max(self.duration_min_ms)
    }

    /// Interval between keep-alive pulses, `None` when disabled.
    pub fn keep_alive_interval(&self) -> Option<Duration> {
        if self.awake_time_s == 0 {
            return None;
        }
        let secs = (f64::from(self.awake_time_s) / 2.0 - 5.0).max(1.0);
        Some(Duration::from_secs_f64(secs))
    }
}

/// Transports available at boot.  A receiver takes the one it needs.
#[derive(Clone, Default)]
pub struct Transports {
    pub rf: Option<Arc<dyn RfTransmitter>>,
    pub serial: Option<Arc<SerialManager>>,
}

/// A configured receiver.
#[derive(Debug)]
pub enum Receiver {
    Pac(PacReceiver),
    Wired(WiredReceiver),
}

impl Receiver {
    /// Build and validate a receiver from its config section.
    pub fn from_section(
        section_name: &str,
        section: &ReceiverSection,
        global: &GlobalConfig,
    ) -> Result<Self> {
        let family = section.receiver_type.trim().to_ascii_lowercase();
        let receiver = match family.as_str() {
            pac::TYPE_NAME => Self::Pac(PacReceiver::from_section(section_name, section, global)?),
            wired::PETRAINER_TYPE_NAME
            | wired::OPTOCOUPLER_TYPE_NAME
            | wired::BEEP_MODIFIER_TYPE_NAME => Self::Wired(WiredReceiver::from_section(
                section_name,
                &family,
                section,
                global,
            )?),
            _ => {
                return Err(Error::config(
                    section_name,
                    format!(
                        "unknown receiver type \"{}\", supported types: {}",
                        section.receiver_type,
                        SUPPORTED_TYPES.join(", ")
                    ),
                ));
            }
        };
        receiver.validate_config(section_name)?;
        Ok(receiver)
    }

    pub fn properties(&self) -> &ReceiverProperties {
        match self {
            Self::Pac(r) => &r.properties,
            Self::Wired(r) => &r.properties,
        }
    }

    /// Check addressing and tuning values.
    pub fn validate_config(&self, section_name: &str) -> Result<()> {
        let props = self.properties();
        if props.duration_increment_ms == 0 {
            return Err(Error::config(section_name, "duration_increment_ms must be > 0"));
        }
        match self {
            Self::Pac(r) => r.validate_config(section_name),
            Self::Wired(_) => Ok(()),
        }
    }

    pub fn is_rf_required(&self) -> bool {
        matches!(self, Self::Pac(_))
    }

    pub fn is_serial_required(&self) -> bool {
        matches!(self, Self::Wired(_))
    }

    /// Bind to the transport this receiver uses.
    pub fn boot(&mut self, transports: &Transports) -> Result<()> {
        match self {
            Self::Pac(r) => r.boot(transports.rf.clone()),
            Self::Wired(r) => r.boot(transports.serial.clone()),
        }
    }

    /// Execute one already-validated, normalized command.
    pub fn command(&self, action: Action, power: u8, duration_ms: u32) -> Result<()> {
        match self {
            Self::Pac(r) => r.command(action, power, duration_ms),
            Self::Wired(r) => r.command(action, power, duration_ms),
        }
    }
}

fn not_booted(properties: &ReceiverProperties) -> Error {
    Error::hardware(properties.family.clone(), format!("receiver \"{}\" is not booted", properties.name))
}
