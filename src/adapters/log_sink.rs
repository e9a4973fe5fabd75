//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one structured line per
//! application event through the `log` facade.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &AppEvent) {
        match event {
            AppEvent::Booted { receivers } => {
                info!("BOOT | receivers={}", receivers);
            }
            AppEvent::ReceiverSkipped { section, reason } => {
                warn!("CONFIG | skipped section={} reason={}", section, reason);
            }
            AppEvent::CommandSent {
                command,
                duration_ms,
            } => {
                info!(
                    "CMD | receiver={} action={} power={}% duration={}ms",
                    command.receiver, command.action, command.power, duration_ms
                );
            }
            AppEvent::CommandRejected { command, reason } => {
                error!(
                    "CMD REJECTED | receiver={} action={} power={}% duration={}ms | {}",
                    command.receiver, command.action, command.power, command.duration_ms, reason
                );
            }
            AppEvent::CommandFailed {
                command,
                duration_ms,
                error,
            } => {
                error!(
                    "CMD FAILED | receiver={} action={} power={}% duration={}ms | {}",
                    command.receiver, command.action, command.power, duration_ms, error
                );
            }
        }
    }
}
