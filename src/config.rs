//! Configuration surface.
//!
//! One JSON document with three top-level objects:
//!
//! - `global`: SDR selector, serial port, timeouts
//! - `receivers`: ordered map of `receiverN` sections, one per collar
//! - `applications`: opaque to the core, handed to front ends verbatim
//!
//! Receiver sections are deserialized one at a time so a broken section
//! produces an error naming that section and the rest still load.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Prefix that marks a key of `receivers` as a receiver section.
pub const RECEIVER_SECTION_PREFIX: &str = "receiver";

/// SDR devices `urh_cli` is known to drive.
pub const SUPPORTED_SDRS: [&str; 2] = ["HackRF", "LimeSDR"];

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// SDR device selector; required only when an RF receiver exists.
    pub sdr: Option<String>,
    /// Serial device of the receiver hub.
    pub serial_port: String,
    pub baud_rate: u32,
    /// Bound on waiting for a hub acknowledge.
    pub ack_timeout_ms: u64,
    /// Bound on one external transmitter invocation.
    pub transmit_timeout_ms: u64,
    /// Pause between the beep and the zap of a BEEPZAP.
    pub beepzap_delay_ms: u64,
    /// Transmit IF gain passed to the signal generator.
    pub if_gain: u32,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            sdr: None,
            serial_port: "/dev/ttyACM0".into(),
            baud_rate: 9600,
            ack_timeout_ms: 5000,
            transmit_timeout_ms: 30_000,
            beepzap_delay_ms: 1000,
            if_gain: 47,
        }
    }
}

impl GlobalConfig {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn transmit_timeout(&self) -> Duration {
        Duration::from_millis(self.transmit_timeout_ms)
    }

    pub fn beepzap_delay(&self) -> Duration {
        Duration::from_millis(self.beepzap_delay_ms)
    }

    /// Device name handed to `urh_cli --device`.
    ///
    /// Fails when no `sdr` is configured; the message lists the supported
    /// devices so the operator can fix the file.
    pub fn sdr_device(&self) -> Result<String> {
        let Some(sdr) = self.sdr.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return Err(Error::config(
                "global",
                format!(
                    "SDR hardware is required to send radio signals; add \"sdr\" to the global \
                     section, supported devices are: {}",
                    SUPPORTED_SDRS.join(", ")
                ),
            ));
        };

        Ok(match sdr.to_ascii_lowercase().as_str() {
            "hackrf" | "hackrfcli" => "HackRF".to_string(),
            "limesdr" => "LimeSDR".to_string(),
            _ => sdr.to_string(),
        })
    }
}

/// The whole configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub global: GlobalConfig,
    /// Raw receiver sections in file order.
    pub receivers: Map<String, Value>,
    pub applications: Map<String, Value>,
}

impl AppConfig {
    /// Parse a configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::config("file", format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Every receiver section in file order, each parsed on its own.
    pub fn receiver_sections(&self) -> Vec<(String, Result<ReceiverSection>)> {
        self.receivers
            .iter()
            .filter(|(name, _)| name.starts_with(RECEIVER_SECTION_PREFIX))
            .map(|(name, value)| (name.clone(), ReceiverSection::parse(name, value)))
            .collect()
    }
}

/// One receiver section as written in the file.
///
/// Which keys are required depends on `type`; that check happens when the
/// receiver is built.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReceiverSection {
    #[serde(rename = "type")]
    pub receiver_type: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    /// Bit template for RF receivers, 16-bit number for wired Petrainer.
    #[serde(default)]
    pub transmitter_code: Option<Value>,
    #[serde(default)]
    pub channel: Option<u8>,
    /// Optocoupler pin assignment.
    #[serde(default)]
    pub pins: Option<Vec<u8>>,
    #[serde(default)]
    pub duration_increment_ms: Option<u32>,
    #[serde(default)]
    pub duration_min_ms: Option<u32>,
    #[serde(default)]
    pub awake_time_s: Option<u32>,
    /// Legacy spelling of `channel`.
    #[serde(default)]
    button: Option<Value>,
}

impl ReceiverSection {
    pub fn parse(section: &str, value: &Value) -> Result<Self> {
        let parsed: Self = serde_json::from_value(value.clone())
            .map_err(|e| Error::config(section, e.to_string()))?;
        if parsed.channel.is_none() && parsed.button.is_some() {
            return Err(Error::config(
                section,
                "please rename parameter \"button\" to \"channel\"",
            ));
        }
        Ok(parsed)
    }

    /// `transmitter_code` as a string, for bit-template receivers.
    pub fn code_string(&self, section: &str) -> Result<String> {
        match &self.transmitter_code {
            Some(Value::String(s)) => Ok(s.trim().to_string()),
            Some(other) => Err(Error::config(
                section,
                format!("transmitter_code must be a string of 0 and 1, got {other}"),
            )),
            None => Err(missing(section, "transmitter_code")),
        }
    }

    /// `transmitter_code` as a 16-bit number, decimal or `0x` hex.
    pub fn code_u16(&self, section: &str) -> Result<u16> {
        let invalid = |raw: &dyn std::fmt::Display| {
            Error::config(
                section,
                format!("transmitter_code must be a 16-bit number, got {raw}"),
            )
        };

        match &self.transmitter_code {
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|v| u16::try_from(v).ok())
                .ok_or_else(|| invalid(n)),
            Some(Value::String(s)) => {
                let s = s.trim();
                let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                    Some(hex) => u16::from_str_radix(hex, 16),
                    None => s.parse::<u16>(),
                };
                parsed.map_err(|_| invalid(&s))
            }
            Some(other) => Err(invalid(other)),
            None => Err(missing(section, "transmitter_code")),
        }
    }

    pub fn require_channel(&self, section: &str) -> Result<u8> {
        self.channel.ok_or_else(|| missing(section, "channel"))
    }

    /// Exactly `count` pins.
    pub fn require_pins(&self, section: &str, count: usize) -> Result<&[u8]> {
        match &self.pins {
            Some(pins) if pins.len() == count => Ok(pins),
            Some(pins) => Err(Error::config(
                section,
                format!("pins must list {count} pin numbers, got {}", pins.len()),
            )),
            None => Err(missing(section, "pins")),
        }
    }
}

fn missing(section: &str, key: &str) -> Error {
    Error::config(section, format!("missing required key \"{key}\""))
}
