//! Port traits: the boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Dispatcher / Coordinator (domain)
//! ```
//!
//! Driven adapters (radio, serial hub, event sinks) implement these
//! traits.  The domain holds them as trait objects, so every test can
//! swap in a recording double without touching real hardware.

use std::sync::Arc;

use super::action::Action;
use super::commands::{Command, CommandOutcome};
use super::events::AppEvent;
use crate::codec::RfParams;
use crate::config::GlobalConfig;
use crate::error::Result;
use crate::serial::transport::SerialLink;

// ───────────────────────────────────────────────────────────────
// RF transmitter port (domain → radio)
// ───────────────────────────────────────────────────────────────

/// Emits a line-coded frame string over the SDR.
///
/// Implementations serialize their own access: the radio cannot
/// multiplex, so concurrent callers queue and never interleave.
pub trait RfTransmitter: Send + Sync {
    /// Transmit `message` (one or more frames, space separated, with
    /// optional pause directives) and block until the radio is done.
    fn send(&self, params: &RfParams, message: &str) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Command port (scheduler / front ends → domain)
// ───────────────────────────────────────────────────────────────

/// Entry point the scheduler and any front end use to issue commands.
pub trait CommandPort: Send + Sync {
    fn command(&self, command: Command) -> CommandOutcome;

    /// Convenience wrapper matching the positional call shape.
    fn command_parts(
        &self,
        receiver: usize,
        action: Action,
        power: i32,
        duration_ms: u32,
    ) -> CommandOutcome {
        self.command(Command::new(receiver, action, power, duration_ms))
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Hardware provider (boot-time factory)
// ───────────────────────────────────────────────────────────────

/// Opens the physical transports during boot.
///
/// Called at most once per transport, and only when a configured
/// receiver needs it.
pub trait HardwareProvider {
    /// Open the serial link to the receiver hub.
    fn open_serial(&self, global: &GlobalConfig) -> Result<Box<dyn SerialLink>>;

    /// Create the RF transmitter for the configured SDR.
    fn rf_transmitter(&self, global: &GlobalConfig) -> Result<Arc<dyn RfTransmitter>>;
}
