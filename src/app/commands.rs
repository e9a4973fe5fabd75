//! Inbound command requests and their outcomes.
//!
//! A [`Command`] is what the outside world (UI thread, CLI, scheduler)
//! asks the [`Dispatcher`](super::dispatcher::Dispatcher) to do.  The
//! dispatcher answers every request with a [`CommandOutcome`] instead of
//! an error, so long-running callers keep running whatever happens.

use serde::{Deserialize, Serialize};

use super::action::Action;
use crate::error::Error;

/// A command addressed to a receiver by its 1-based number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub receiver: usize,
    pub action: Action,
    /// Percentage, 0-100.  Signed so out-of-range requests can be reported.
    pub power: i32,
    pub duration_ms: u32,
}

impl Command {
    pub fn new(receiver: usize, action: Action, power: i32, duration_ms: u32) -> Self {
        Self {
            receiver,
            action,
            power,
            duration_ms,
        }
    }

    /// The keep-alive pulse scheduled for receivers with a sleep timer.
    pub fn keep_awake(receiver: usize) -> Self {
        Self::new(receiver, Action::KeepAwake, 0, 250)
    }
}

/// What happened to a command.
#[derive(Debug)]
pub enum CommandOutcome {
    /// Delivered to the receiver with the normalized duration.
    Sent { duration_ms: u32 },
    /// Zero duration: a "stop" request that never reaches hardware.
    Ignored,
    /// Failed validation; no transport was touched.
    Rejected(Error),
    /// The receiver's transport reported an error.
    Failed(Error),
}

impl CommandOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}
