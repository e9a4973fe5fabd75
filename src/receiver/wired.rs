//! Receivers wired to the microcontroller hub.
//!
//! | type | hub code | ADD args                              |
//! |------|----------|---------------------------------------|
//! | `arduino_petrainer` | 0 | code high byte, code low byte, channel |
//! | `arduino_optocoupler` | 1 | beep pin, vib pin, zap pin |
//! | `arduino_optocoupler_beep_modifier` | 2 | modifier pin, 0, button pin |

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::{ReceiverProperties, not_booted};
use crate::app::action::Action;
use crate::config::{GlobalConfig, ReceiverSection};
use crate::error::{Error, Result};
use crate::serial::SerialManager;

pub const PETRAINER_TYPE_NAME: &str = "arduino_petrainer";
pub const OPTOCOUPLER_TYPE_NAME: &str = "arduino_optocoupler";
pub const BEEP_MODIFIER_TYPE_NAME: &str = "arduino_optocoupler_beep_modifier";

/// Wiring scheme of a hub-attached receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WiredKind {
    /// Petrainer transmitter driven by the hub's own radio.
    Petrainer { code: u16, channel: u8 },
    /// Remote whose buttons are bridged by optocouplers.
    Optocoupler { beep: u8, vib: u8, zap: u8 },
    /// Single-button remote; a second pin turns the button into a beep.
    BeepModifier { modifier: u8, button: u8 },
}

impl WiredKind {
    /// Hub receiver type code.
    pub fn type_code(self) -> u8 {
        match self {
            Self::Petrainer { .. } => 0,
            Self::Optocoupler { .. } => 1,
            Self::BeepModifier { .. } => 2,
        }
    }

    /// The three `ADD` arguments.
    pub fn args(self) -> [u8; 3] {
        match self {
            Self::Petrainer { code, channel } => {
                let [hi, lo] = code.to_be_bytes();
                [hi, lo, channel]
            }
            Self::Optocoupler { beep, vib, zap } => [beep, vib, zap],
            Self::BeepModifier { modifier, button } => [modifier, 0, button],
        }
    }
}

pub struct WiredReceiver {
    pub(super) properties: ReceiverProperties,
    kind: WiredKind,
    beepzap_delay: Duration,
    binding: Option<(Arc<SerialManager>, u8)>,
}

impl fmt::Debug for WiredReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WiredReceiver")
            .field("properties", &self.properties)
            .field("kind", &self.kind)
            .field("index", &self.index())
            .finish()
    }
}

impl WiredReceiver {
    pub fn new(properties: ReceiverProperties, kind: WiredKind) -> Self {
        Self {
            properties,
            kind,
            beepzap_delay: Duration::from_secs(1),
            binding: None,
        }
    }

    pub fn with_beepzap_delay(mut self, delay: Duration) -> Self {
        self.beepzap_delay = delay;
        self
    }

    pub(super) fn from_section(
        section_name: &str,
        family: &str,
        section: &ReceiverSection,
        global: &GlobalConfig,
    ) -> Result<Self> {
        let kind = match family {
            PETRAINER_TYPE_NAME => WiredKind::Petrainer {
                code: section.code_u16(section_name)?,
                channel: section.require_channel(section_name)?,
            },
            OPTOCOUPLER_TYPE_NAME => {
                let pins = section.require_pins(section_name, 3)?;
                WiredKind::Optocoupler {
                    beep: pins[0],
                    vib: pins[1],
                    zap: pins[2],
                }
            }
            _ => {
                let pins = section.require_pins(section_name, 2)?;
                WiredKind::BeepModifier {
                    modifier: pins[0],
                    button: pins[1],
                }
            }
        };
        let properties = ReceiverProperties::from_section(family, section, 1, 1);
        Ok(Self::new(properties, kind).with_beepzap_delay(global.beepzap_delay()))
    }

    pub fn kind(&self) -> WiredKind {
        self.kind
    }

    /// Hub index assigned at registration.
    pub fn index(&self) -> Option<u8> {
        self.binding.as_ref().map(|(_, index)| *index)
    }

    pub(super) fn boot(&mut self, serial: Option<Arc<SerialManager>>) -> Result<()> {
        let serial = serial.ok_or_else(|| {
            Error::hardware(
                "serial",
                format!("receiver \"{}\" needs the receiver hub", self.properties.name),
            )
        })?;
        let [a1, a2, a3] = self.kind.args();
        let index = serial.register_receiver(self.kind.type_code(), a1, a2, a3)?;
        self.binding = Some((serial, index));
        Ok(())
    }

    /// BEEPZAP is two acknowledged frames: a bare beep, the delay, then
    /// the zap.
    pub(super) fn command(&self, action: Action, power: u8, duration_ms: u32) -> Result<()> {
        let (serial, index) = self.binding.as_ref().ok_or_else(|| not_booted(&self.properties))?;

        if action == Action::BeepZap {
            serial.command(Action::Beep, *index, 0, 0)?;
            thread::sleep(self.beepzap_delay);
            return serial.command(Action::Zap, *index, power, duration_ms);
        }
        serial.command(action, *index, power, duration_ms)
    }
}
