//! RF transmitter backed by the `urh_cli` signal generator.
//!
//! Every transmission is one child process.  The radio cannot multiplex,
//! so a lock is held from spawn until the child has exited or been
//! killed.

use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::app::ports::RfTransmitter;
use crate::codec::RfParams;
use crate::error::{Error, Result};

const DEVICE: &str = "sdr";

/// Keep at most this much of the child's stderr in an error.
const MAX_STDERR: usize = 2 * 1024;

pub struct UrhCliTransmitter {
    program: String,
    device: String,
    if_gain: u32,
    timeout: Duration,
    lock: Mutex<()>,
}

impl UrhCliTransmitter {
    pub fn new(device: impl Into<String>, if_gain: u32, timeout: Duration) -> Self {
        Self {
            program: "urh_cli".into(),
            device: device.into(),
            if_gain,
            timeout,
            lock: Mutex::new(()),
        }
    }

    /// Run a different executable with the same arguments.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Argument vector for one transmission.
    pub fn args(&self, params: &RfParams, message: &str) -> Vec<String> {
        vec![
            "--transmit".into(),
            "--device".into(),
            self.device.clone(),
            "--frequency".into(),
            params.frequency_hz.to_string(),
            "--sample-rate".into(),
            params.sample_rate_hz.to_string(),
            "--carrier-frequency".into(),
            params.carrier_frequency_hz.to_string(),
            "--modulation-type".into(),
            params.modulation.as_str().into(),
            "--samples-per-symbol".into(),
            params.samples_per_symbol.to_string(),
            "--parameters".into(),
            params.low_frequency_hz.to_string(),
            params.high_frequency_hz.to_string(),
            "--pause".into(),
            params.pause_samples.to_string(),
            "--if-gain".into(),
            self.if_gain.to_string(),
            "--messages".into(),
            message.into(),
        ]
    }
}

impl RfTransmitter for UrhCliTransmitter {
    fn send(&self, params: &RfParams, message: &str) -> Result<()> {
        let _radio = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let args = self.args(params, message);
        debug!("RF | {} {}", self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::hardware(DEVICE, format!("failed to spawn {}: {e}", self.program)))?;

        let pid = child.id();
        let stderr = child.stderr.take();
        let stderr_thread = thread::spawn(move || {
            let mut buf = String::new();
            if let Some(mut r) = stderr {
                let _ = r.read_to_string(&mut buf);
            }
            buf
        });

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(child.wait());
        });

        let status = match rx.recv_timeout(self.timeout) {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(Error::hardware(DEVICE, format!("wait failed: {e}"))),
            Err(_) => {
                kill_process(pid);
                warn!("RF | {} killed after {}ms", self.program, self.timeout.as_millis());
                return Err(Error::hardware(
                    DEVICE,
                    format!("{} timed out after {}ms", self.program, self.timeout.as_millis()),
                ));
            }
        };

        let stderr = stderr_thread.join().unwrap_or_default();
        if !status.success() {
            return Err(Error::hardware(
                DEVICE,
                format!("{} exited with {status}: {}", self.program, tail(&stderr)),
            ));
        }

        info!("RF | transmitted {} bytes on {}", message.len(), self.device);
        Ok(())
    }
}

fn tail(s: &str) -> &str {
    let s = s.trim();
    if s.len() <= MAX_STDERR {
        return s;
    }
    let mut start = s.len() - MAX_STDERR;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

/// SIGKILL by pid; the waiter thread owns the `Child`.
fn kill_process(pid: u32) {
    let _ = Command::new("kill")
        .arg("-9")
        .arg(pid.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}
