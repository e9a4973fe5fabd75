//! Transmitter that logs instead of transmitting.

use std::sync::{Mutex, PoisonError};

use log::info;

use crate::app::ports::RfTransmitter;
use crate::codec::RfParams;
use crate::error::Result;

/// Logs every transmission and keeps a count.  Used by `--dry-run`.
#[derive(Debug, Default)]
pub struct DryRunTransmitter {
    sent: Mutex<usize>,
}

impl DryRunTransmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transmissions so far.
    pub fn sent(&self) -> usize {
        *self.sent.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RfTransmitter for DryRunTransmitter {
    fn send(&self, params: &RfParams, message: &str) -> Result<()> {
        let mut sent = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
        *sent += 1;
        info!(
            "RF DRY-RUN | freq={}Hz mod={} sps={} frames={} chars={}",
            params.frequency_hz,
            params.modulation.as_str(),
            params.samples_per_symbol,
            message.split(' ').count(),
            message.len()
        );
        Ok(())
    }
}
