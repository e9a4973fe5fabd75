//! Outbound application events.
//!
//! The dispatcher and coordinator emit these through the
//! [`EventSink`](super::ports::EventSink) port.  The default adapter turns
//! each one into a single structured log line; tests record them.

use super::commands::Command;
use crate::error::ValidationError;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Boot finished with this many usable receivers.
    Booted { receivers: usize },

    /// A receiver section was skipped at boot.
    ReceiverSkipped { section: String, reason: String },

    /// A command was handed to its receiver.
    CommandSent { command: Command, duration_ms: u32 },

    /// A command failed validation and never reached hardware.
    CommandRejected {
        command: Command,
        reason: ValidationError,
    },

    /// The receiver's transport failed while executing a command.
    CommandFailed {
        command: Command,
        duration_ms: u32,
        error: String,
    },
}
