//! Hardware providers: the boot-time factories for physical transports.
//!
//! [`SystemHardware`] opens the real serial hub and drives `urh_cli`.
//! [`DryRunHardware`] answers like healthy hardware without touching
//! any device, for trying a configuration.

use std::sync::Arc;

use log::info;

use super::dry_run::DryRunTransmitter;
use super::serial_port::SerialPortLink;
use super::urh_cli::UrhCliTransmitter;
use crate::app::ports::{HardwareProvider, RfTransmitter};
use crate::config::GlobalConfig;
use crate::error::Result;
use crate::serial::SerialLink;
use crate::serial::transport::LoopbackLink;

#[derive(Debug, Default)]
pub struct SystemHardware;

impl HardwareProvider for SystemHardware {
    fn open_serial(&self, global: &GlobalConfig) -> Result<Box<dyn SerialLink>> {
        Ok(Box::new(SerialPortLink::open(&global.serial_port, global.baud_rate)?))
    }

    fn rf_transmitter(&self, global: &GlobalConfig) -> Result<Arc<dyn RfTransmitter>> {
        let device = global.sdr_device()?;
        info!("RF | using {} via urh_cli", device);
        Ok(Arc::new(UrhCliTransmitter::new(
            device,
            global.if_gain,
            global.transmit_timeout(),
        )))
    }
}

#[derive(Debug, Default)]
pub struct DryRunHardware;

impl HardwareProvider for DryRunHardware {
    fn open_serial(&self, global: &GlobalConfig) -> Result<Box<dyn SerialLink>> {
        info!("SERIAL DRY-RUN | {} not opened", global.serial_port);
        Ok(Box::new(LoopbackLink::new()))
    }

    /// Still requires `sdr`, so a dry run catches the same config errors.
    fn rf_transmitter(&self, global: &GlobalConfig) -> Result<Arc<dyn RfTransmitter>> {
        global.sdr_device()?;
        Ok(Arc::new(DryRunTransmitter::new()))
    }
}
