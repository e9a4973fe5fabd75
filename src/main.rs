//! collarctl: command-line front end.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SystemHardware / DryRunHardware        LogEventSink           │
//! │  (SerialPortLink, UrhCliTransmitter)    (EventSink)            │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │        Coordinator → Dispatcher → Receivers            │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler (keep-alive pulses, own thread)                     │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{info, warn};
use tracing_subscriber::EnvFilter;

use collarctl::adapters::{DryRunHardware, LogEventSink, SystemHardware};
use collarctl::app::action::Action;
use collarctl::app::commands::{Command, CommandOutcome};
use collarctl::app::coordinator::{self, Coordinator};
use collarctl::app::ports::{EventSink, HardwareProvider};
use collarctl::config::AppConfig;

#[derive(Parser)]
#[command(name = "collarctl", version, about = "Drive remote training collars over SDR and a serial hub")]
struct Cli {
    /// Configuration file (JSON).
    #[arg(long, short, env = "COLLARCTL_CONFIG", default_value = "collarctl.json")]
    config: PathBuf,

    /// Log transmissions and answer for the hub instead of touching hardware.
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Boot, then read `receiver action power duration` lines from stdin
    /// until EOF.  Keep-alive pulses run in the background.
    Run,
    /// Boot and send a single command.
    Send {
        /// 1-based receiver number.
        receiver: usize,
        action: Action,
        /// Power in percent.
        power: i32,
        /// Duration in milliseconds.
        duration_ms: u32,
    },
    /// Print receivers and applications as JSON without touching hardware.
    Show,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let sink: Arc<dyn EventSink> = Arc::new(LogEventSink::new());

    if let Cmd::Show = cli.command {
        let summary = coordinator::config_summary(&config, sink.as_ref())
            .context("reading receiver configuration")?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    info!("collarctl v{} starting", env!("CARGO_PKG_VERSION"));
    let hardware: Box<dyn HardwareProvider> = if cli.dry_run {
        Box::new(DryRunHardware)
    } else {
        Box::new(SystemHardware)
    };
    let mut coordinator =
        Coordinator::boot(&config, hardware.as_ref(), sink).context("booting receivers and transports")?;

    match cli.command {
        Cmd::Send {
            receiver,
            action,
            power,
            duration_ms,
        } => {
            let outcome = coordinator.command(Command::new(receiver, action, power, duration_ms));
            coordinator.shutdown();
            match outcome {
                CommandOutcome::Sent { .. } | CommandOutcome::Ignored => Ok(()),
                CommandOutcome::Rejected(e) | CommandOutcome::Failed(e) => bail!(e),
            }
        }
        Cmd::Run => {
            run_stdin(&coordinator)?;
            coordinator.shutdown();
            Ok(())
        }
        Cmd::Show => Ok(()),
    }
}

/// Dispatch commands read from stdin, one per line.
fn run_stdin(coordinator: &Coordinator) -> Result<()> {
    info!(
        "ready: {} receivers; enter `receiver action power duration_ms`, EOF to quit",
        coordinator.receiver_count()
    );
    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_line(line) {
            Ok(command) => {
                coordinator.command(command);
            }
            Err(e) => warn!("INPUT | {}: {:#}", line, e),
        }
    }
    Ok(())
}

fn parse_line(line: &str) -> Result<Command> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [receiver, action, power, duration] = fields[..] else {
        bail!("expected 4 fields, got {}", fields.len());
    };
    Ok(Command::new(
        receiver.parse().context("receiver")?,
        action.parse()?,
        power.parse().context("power")?,
        duration.parse().context("duration")?,
    ))
}
