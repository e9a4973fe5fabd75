//! Boot sequence and the long-lived top-level object.
//!
//! ```text
//!  AppConfig ──▶ build receivers (skip broken sections)
//!            ──▶ open serial hub + boot      (only if a wired receiver exists)
//!            ──▶ create RF transmitter       (only if a radio receiver exists)
//!            ──▶ bind every receiver to its transport
//!            ──▶ Dispatcher + Scheduler + keep-alive tasks
//! ```
//!
//! Transport failures during boot are fatal; a broken receiver section is
//! not.

use std::sync::Arc;

use log::{error, info};
use serde_json::{Map, Value, json};

use super::commands::{Command, CommandOutcome};
use super::dispatcher::Dispatcher;
use super::events::AppEvent;
use super::ports::{CommandPort, EventSink, HardwareProvider};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::receiver::{Receiver, ReceiverProperties, Transports};
use crate::scheduler::{Scheduler, Task, TaskId};
use crate::serial::SerialManager;
use crate::serial::manager::DEFAULT_BOOT_SETTLE;

pub struct Coordinator {
    dispatcher: Arc<Dispatcher>,
    scheduler: Scheduler,
    keep_alive: Vec<TaskId>,
    applications: Map<String, Value>,
}

/// Receivers built from config, before any transport is touched.
pub fn build_receivers(config: &AppConfig, sink: &dyn EventSink) -> Result<Vec<Receiver>> {
    let mut receivers = Vec::new();
    for (section, parsed) in config.receiver_sections() {
        let built = parsed.and_then(|s| Receiver::from_section(&section, &s, &config.global));
        match built {
            Ok(r) => receivers.push(r),
            Err(e) => {
                error!("CONFIG | skipping section {}: {}", section, e);
                sink.emit(&AppEvent::ReceiverSkipped {
                    section,
                    reason: e.to_string(),
                });
            }
        }
    }
    if receivers.is_empty() {
        return Err(Error::NoReceivers);
    }
    Ok(receivers)
}

impl Coordinator {
    /// Boot with the default hub settle delay.
    pub fn boot(
        config: &AppConfig,
        hardware: &dyn HardwareProvider,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        Self::boot_with_settle(config, hardware, sink, DEFAULT_BOOT_SETTLE)
    }

    /// Full boot.  `hub_settle` is how long to wait after opening the
    /// serial port before talking to the hub.
    pub fn boot_with_settle(
        config: &AppConfig,
        hardware: &dyn HardwareProvider,
        sink: Arc<dyn EventSink>,
        hub_settle: std::time::Duration,
    ) -> Result<Self> {
        let mut receivers = build_receivers(config, sink.as_ref())?;
        let global = &config.global;

        let mut transports = Transports::default();
        if receivers.iter().any(Receiver::is_serial_required) {
            let link = hardware.open_serial(global)?;
            let hub = SerialManager::new(link, global.ack_timeout()).with_boot_settle(hub_settle);
            hub.boot()?;
            transports.serial = Some(Arc::new(hub));
        }
        if receivers.iter().any(Receiver::is_rf_required) {
            transports.rf = Some(hardware.rf_transmitter(global)?);
        }

        for receiver in &mut receivers {
            receiver.boot(&transports)?;
        }

        let count = receivers.len();
        let intervals: Vec<_> = receivers
            .iter()
            .map(|r| r.properties().keep_alive_interval())
            .collect();

        let dispatcher = Arc::new(Dispatcher::new(receivers, sink.clone()));
        let scheduler = Scheduler::start(dispatcher.clone())?;

        let mut keep_alive = Vec::new();
        for (i, interval) in intervals.into_iter().enumerate() {
            let Some(interval) = interval else { continue };
            let number = i + 1;
            let task = Task::Periodic {
                command: Command::keep_awake(number),
                interval,
            };
            keep_alive.push(scheduler.schedule_after(task, interval));
            info!(
                "KEEPALIVE | receiver={} every={}s",
                number,
                interval.as_secs_f64()
            );
        }

        sink.emit(&AppEvent::Booted { receivers: count });
        Ok(Self {
            dispatcher,
            scheduler,
            keep_alive,
            applications: config.applications.clone(),
        })
    }

    /// Validate, normalize and dispatch one command.  Never fails; the
    /// outcome says what happened.
    pub fn command(&self, command: Command) -> CommandOutcome {
        self.dispatcher.command(command)
    }

    /// The dispatcher as a shareable command port for other callers.
    pub fn command_port(&self) -> Arc<dyn CommandPort> {
        self.dispatcher.clone()
    }

    pub fn receiver_count(&self) -> usize {
        self.dispatcher.receiver_count()
    }

    pub fn receiver_properties(&self) -> Vec<ReceiverProperties> {
        self.dispatcher.properties().cloned().collect()
    }

    /// Scheduled keep-alive tasks, in receiver order.
    pub fn keep_alive_tasks(&self) -> &[TaskId] {
        &self.keep_alive
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// What a front end needs: the opaque `applications` object and
    /// every receiver's properties.
    pub fn config_summary(&self) -> Value {
        json!({
            "applications": self.applications,
            "receivers": self.receiver_properties(),
        })
    }

    /// Stop the scheduler.  Commands may still be issued afterwards.
    pub fn shutdown(&mut self) {
        self.scheduler.shutdown();
    }
}

/// Summary without booting any hardware.
pub fn config_summary(config: &AppConfig, sink: &dyn EventSink) -> Result<Value> {
    let receivers = build_receivers(config, sink)?;
    let props: Vec<_> = receivers.iter().map(|r| r.properties().clone()).collect();
    Ok(json!({
        "applications": config.applications,
        "receivers": props,
    }))
}
