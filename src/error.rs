//! Unified error types for collarctl.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! dispatcher can log any failure with one uniform shape.  The variants
//! follow the operational taxonomy: configuration problems are scoped to
//! one receiver section, validation problems never reach hardware, and
//! hardware problems carry the device they came from.

use core::fmt;
use std::time::Duration;

use crate::app::action::Action;
use crate::serial::protocol::Opcode;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug)]
pub enum Error {
    /// A configuration key is missing or malformed.  `section` names the
    /// receiver section (or `global`) the problem belongs to.
    Config { section: String, reason: String },
    /// An inbound command was rejected before dispatch.
    Validation(ValidationError),
    /// The external transmitter or the serial port failed.
    HardwareIo { device: String, detail: String },
    /// The receiver hub never answered with the expected opcode.
    ProtocolTimeout { awaiting: Opcode, waited: Duration },
    /// Configuration produced no usable receiver.
    NoReceivers,
}

impl Error {
    pub fn config(section: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            section: section.into(),
            reason: reason.into(),
        }
    }

    pub fn hardware(device: impl Into<String>, detail: impl fmt::Display) -> Self {
        Self::HardwareIo {
            device: device.into(),
            detail: detail.to_string(),
        }
    }

    /// Fatal at boot: the process cannot continue without the device.
    pub fn is_hardware(&self) -> bool {
        matches!(self, Self::HardwareIo { .. } | Self::ProtocolTimeout { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { section, reason } => write!(f, "config [{section}]: {reason}"),
            Self::Validation(e) => write!(f, "validation: {e}"),
            Self::HardwareIo { device, detail } => write!(f, "hardware {device}: {detail}"),
            Self::ProtocolTimeout { awaiting, waited } => write!(
                f,
                "protocol timeout: no {awaiting} after {}ms",
                waited.as_millis()
            ),
            Self::NoReceivers => write!(f, "no valid receivers configured"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Receiver numbers are 1-based and bounded by the configured count.
    ReceiverOutOfRange { receiver: usize, count: usize },
    /// Power is a percentage.
    PowerOutOfRange { power: i32 },
    /// Hub control actions never come from a command source.
    NotUserAction { action: Action },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReceiverOutOfRange { receiver, count } => write!(
                f,
                "receiver number {receiver} is out of range, expected 1 to {count}"
            ),
            Self::PowerOutOfRange { power } => {
                write!(f, "power level {power} is out of range, expected 0 to 100")
            }
            Self::NotUserAction { action } => {
                write!(f, "action {action} is reserved for the receiver hub")
            }
        }
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

// ---------------------------------------------------------------------------
// Foreign conversions
// ---------------------------------------------------------------------------

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::hardware("io", e)
    }
}

impl From<serialport::Error> for Error {
    fn from(e: serialport::Error) -> Self {
        Self::hardware("serial", e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::config("file", e.to_string())
    }
}

pub type Result<T> = core::result::Result<T, Error>;
