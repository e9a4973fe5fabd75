//! PAC radio collars.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::debug;

use super::{ReceiverProperties, not_booted};
use crate::app::action::Action;
use crate::app::ports::RfTransmitter;
use crate::codec::pac::{FRAME_MS, PAC, frame_count, intensity_for_power};
use crate::config::{GlobalConfig, ReceiverSection};
use crate::error::{Error, Result};

pub const TYPE_NAME: &str = "pac";

pub struct PacReceiver {
    pub(super) properties: ReceiverProperties,
    code: String,
    channel: u8,
    beepzap_delay: Duration,
    rf: Option<Arc<dyn RfTransmitter>>,
}

impl fmt::Debug for PacReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacReceiver")
            .field("properties", &self.properties)
            .field("code", &self.code)
            .field("channel", &self.channel)
            .field("booted", &self.rf.is_some())
            .finish()
    }
}

impl PacReceiver {
    pub fn new(properties: ReceiverProperties, code: impl Into<String>, channel: u8) -> Self {
        Self {
            properties,
            code: code.into(),
            channel,
            beepzap_delay: Duration::from_secs(1),
            rf: None,
        }
    }

    pub fn with_beepzap_delay(mut self, delay: Duration) -> Self {
        self.beepzap_delay = delay;
        self
    }

    pub(super) fn from_section(
        section_name: &str,
        section: &ReceiverSection,
        global: &GlobalConfig,
    ) -> Result<Self> {
        let properties = ReceiverProperties::from_section(TYPE_NAME, section, FRAME_MS, FRAME_MS);
        let code = section.code_string(section_name)?;
        let channel = section.require_channel(section_name)?;
        Ok(Self::new(properties, code, channel).with_beepzap_delay(global.beepzap_delay()))
    }

    pub(super) fn validate_config(&self, section_name: &str) -> Result<()> {
        PAC.validate(&self.code, self.channel)
            .map_err(|e| Error::config(section_name, e.to_string()))
    }

    pub(super) fn boot(&mut self, rf: Option<Arc<dyn RfTransmitter>>) -> Result<()> {
        match rf {
            Some(rf) => {
                self.rf = Some(rf);
                Ok(())
            }
            None => Err(Error::hardware(
                "sdr",
                format!("receiver \"{}\" needs an RF transmitter", self.properties.name),
            )),
        }
    }

    /// The complete `--messages` argument for one command.
    ///
    /// One frame per 250 ms of duration, space separated.  A BEEPZAP leads
    /// with a silent beep frame and a pause directive so beep and zap go
    /// out in a single transmission.
    pub fn message(&self, action: Action, power: u8, duration_ms: u32) -> Result<String> {
        let beep = !matches!(action, Action::Zap | Action::BeepZap);
        let frame = self.frame(intensity_for_power(power), beep)?;

        let count = frame_count(duration_ms) as usize;
        let mut parts = Vec::with_capacity(count + 1);
        if action == Action::BeepZap {
            parts.push(format!("{}{}", self.frame(0, true)?, pause_directive(self.beepzap_delay)));
        }
        parts.extend(std::iter::repeat_n(frame, count));
        Ok(parts.join(" "))
    }

    fn frame(&self, intensity: u8, beep: bool) -> Result<String> {
        PAC.frame(&self.code, intensity, self.channel, beep)
            .map_err(|e| Error::config(self.properties.name.clone(), e.to_string()))
    }

    pub(super) fn command(&self, action: Action, power: u8, duration_ms: u32) -> Result<()> {
        let rf = self.rf.as_ref().ok_or_else(|| not_booted(&self.properties))?;
        let message = self.message(action, power, duration_ms)?;
        debug!(
            "PAC | receiver=\"{}\" action={} frames={}",
            self.properties.name,
            action,
            frame_count(duration_ms)
        );
        rf.send(&PAC.rf, &message)
    }
}

/// `/1s` for whole seconds, `/<n>ms` otherwise.
fn pause_directive(delay: Duration) -> String {
    let ms = delay.as_millis();
    if ms > 0 && ms % 1000 == 0 {
        format!("/{}s", ms / 1000)
    } else {
        format!("/{ms}ms")
    }
}
