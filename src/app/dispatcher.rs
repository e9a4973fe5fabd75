//! Command dispatch: the single gate every command passes through.
//!
//! ```text
//!   command(receiver, action, power, duration)
//!     │
//!     ├─ receiver ∉ 1..=N, power ∉ 0..=100,
//!     │  or a hub control action ─────────────▶ Rejected   (no I/O)
//!     ├─ duration == 0 ───────────────────────▶ Ignored    (no I/O)
//!     ├─ normalize duration per receiver
//!     └─ lock ──▶ Receiver::command ──▶ unlock ──▶ Sent / Failed
//! ```
//!
//! The lock is process-wide and spans the whole receiver call, so the
//! order in which callers win the lock is the order hardware sees.

use std::sync::{Arc, Mutex, PoisonError};

use super::commands::{Command, CommandOutcome};
use super::events::AppEvent;
use super::ports::{CommandPort, EventSink};
use crate::error::{Error, ValidationError};
use crate::receiver::{Receiver, ReceiverProperties};

pub struct Dispatcher {
    receivers: Vec<Receiver>,
    gate: Mutex<()>,
    sink: Arc<dyn EventSink>,
}

impl Dispatcher {
    /// Receivers must already be booted.  Their position is their
    /// 0-based index; commands address them 1-based.
    pub fn new(receivers: Vec<Receiver>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            receivers,
            gate: Mutex::new(()),
            sink,
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.receivers.len()
    }

    pub fn properties(&self) -> impl Iterator<Item = &ReceiverProperties> {
        self.receivers.iter().map(Receiver::properties)
    }

    /// Resolve a 1-based receiver number, then check the action and the
    /// power range.
    pub fn validate(&self, command: &Command) -> Result<&Receiver, ValidationError> {
        let receiver = command
            .receiver
            .checked_sub(1)
            .and_then(|i| self.receivers.get(i))
            .ok_or(ValidationError::ReceiverOutOfRange {
                receiver: command.receiver,
                count: self.receivers.len(),
            })?;

        if !command.action.is_user_action() {
            return Err(ValidationError::NotUserAction {
                action: command.action,
            });
        }
        if !(0..=100).contains(&command.power) {
            return Err(ValidationError::PowerOutOfRange {
                power: command.power,
            });
        }
        Ok(receiver)
    }
}

impl CommandPort for Dispatcher {
    fn command(&self, command: Command) -> CommandOutcome {
        let receiver = match self.validate(&command) {
            Ok(r) => r,
            Err(reason) => {
                self.sink.emit(&AppEvent::CommandRejected { command, reason });
                return CommandOutcome::Rejected(Error::Validation(reason));
            }
        };

        if command.duration_ms == 0 {
            return CommandOutcome::Ignored;
        }

        let duration_ms = receiver.properties().normalize_duration(command.duration_ms);
        // validate() bounds power to 0..=100
        let power = command.power as u8;

        let result = {
            let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
            receiver.command(command.action, power, duration_ms)
        };

        match result {
            Ok(()) => {
                self.sink.emit(&AppEvent::CommandSent {
                    command,
                    duration_ms,
                });
                CommandOutcome::Sent { duration_ms }
            }
            Err(e) => {
                self.sink.emit(&AppEvent::CommandFailed {
                    command,
                    duration_ms,
                    error: e.to_string(),
                });
                CommandOutcome::Failed(e)
            }
        }
    }
}
