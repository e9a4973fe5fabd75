//! Mock hardware for integration tests.
//!
//! Records every serial write and every RF transmission so tests can
//! assert on the full history without a hub or a radio attached.  Both
//! mocks report into one shared [`Activity`] so overlap between the two
//! transports is observable too.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use collarctl::app::events::AppEvent;
use collarctl::app::ports::{EventSink, HardwareProvider, RfTransmitter};
use collarctl::codec::RfParams;
use collarctl::config::GlobalConfig;
use collarctl::error::{Error, Result};
use collarctl::serial::SerialLink;
use collarctl::serial::protocol::{Opcode, request};

// ── Shared activity tracking ──────────────────────────────────

/// One hardware invocation as seen by the mocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwCall {
    /// A serial write; `level` is the fourth byte of the frame.
    Serial { opcode: u8, level: u8 },
    Rf,
}

impl HwCall {
    fn is_session_setup(self) -> bool {
        matches!(self, Self::Serial { opcode, .. } if opcode == Opcode::Boot as u8 || opcode == Opcode::Add as u8)
    }
}

/// Counts hardware operations in flight across all mocks and keeps one
/// log of every invocation in the order the hardware saw them.
#[derive(Default)]
pub struct Activity {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<HwCall>>,
}

#[allow(dead_code)]
impl Activity {
    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn record(&self, call: HwCall) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Every invocation after the hub's BOOT/ADD setup, in order.
    pub fn command_calls(&self) -> Vec<HwCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .copied()
            .filter(|c| !c.is_session_setup())
            .collect()
    }
}

// ── Scripted serial link ──────────────────────────────────────

#[derive(Default)]
pub struct LinkState {
    /// Bytes the "hub" has queued for the host.
    pending: VecDeque<u8>,
    /// Every `write_all`, in order.
    pub writes: Vec<Vec<u8>>,
    /// Frames injected ahead of the next acknowledge.
    pub diagnostics: Vec<Vec<u8>>,
    /// Stop answering entirely.
    pub silent: bool,
    /// Hand out at most this many bytes per read (0 = unlimited).
    pub chunk: usize,
    /// A request was written before the previous answer was read.
    pub pipelined: usize,
    awaiting: bool,
}

/// Hub double answering like the firmware, with knobs for misbehaving.
#[derive(Clone)]
pub struct ScriptedLink {
    pub state: Arc<Mutex<LinkState>>,
    activity: Arc<Activity>,
}

#[allow(dead_code)]
impl ScriptedLink {
    pub fn new(activity: Arc<Activity>) -> Self {
        Self {
            state: Arc::new(Mutex::new(LinkState::default())),
            activity,
        }
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().writes.clone()
    }

    /// Writes other than `BOOT` and `ADD`.
    pub fn command_frames(&self) -> Vec<Vec<u8>> {
        self.writes()
            .into_iter()
            .filter(|w| w[0] != Opcode::Boot as u8 && w[0] != Opcode::Add as u8)
            .collect()
    }

    pub fn set_silent(&self, silent: bool) {
        self.state.lock().unwrap().silent = silent;
    }
}

impl SerialLink for ScriptedLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut s = self.state.lock().unwrap();
        if s.pending.is_empty() {
            drop(s);
            // emulate the port's read timeout
            thread::sleep(Duration::from_millis(1));
            return Ok(0);
        }
        let limit = if s.chunk == 0 { buf.len() } else { s.chunk.min(buf.len()) };
        let n = limit.min(s.pending.len());
        for (slot, byte) in buf.iter_mut().zip(s.pending.drain(..n)) {
            *slot = byte;
        }
        if s.pending.is_empty() && s.awaiting {
            s.awaiting = false;
            self.activity.leave();
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let mut s = self.state.lock().unwrap();
        if s.awaiting {
            s.pipelined += 1;
        }
        s.writes.push(data.to_vec());
        self.activity.record(HwCall::Serial {
            opcode: data[0],
            level: data.get(3).copied().unwrap_or(0),
        });
        if s.silent {
            return Ok(());
        }

        let diagnostics = std::mem::take(&mut s.diagnostics);
        for frame in diagnostics {
            s.pending.extend(frame);
        }
        let answers: &[Opcode] = match Opcode::from_u8(data[0]) {
            Some(Opcode::Boot) => &[Opcode::Booted, Opcode::Acknowledge],
            Some(Opcode::Ping) => &[Opcode::Pong],
            _ => &[Opcode::Acknowledge],
        };
        for op in answers {
            s.pending.extend(request(*op, &[]));
        }
        s.awaiting = true;
        self.activity.enter();
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn clear_input(&mut self) -> io::Result<()> {
        let mut s = self.state.lock().unwrap();
        s.pending.clear();
        if s.awaiting {
            s.awaiting = false;
            self.activity.leave();
        }
        Ok(())
    }
}

// ── Recording RF transmitter ──────────────────────────────────

pub struct RecordingTransmitter {
    pub messages: Mutex<Vec<String>>,
    pub delay: Duration,
    pub fail: bool,
    /// When set, every send blocks until a unit arrives on the channel.
    pub hold: Option<Mutex<Receiver<()>>>,
    pub entered: AtomicUsize,
    pub activity: Arc<Activity>,
}

#[allow(dead_code)]
impl RecordingTransmitter {
    pub fn new(activity: Arc<Activity>) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            fail: false,
            hold: None,
            entered: AtomicUsize::new(0),
            activity,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }
}

impl RfTransmitter for RecordingTransmitter {
    fn send(&self, _params: &RfParams, message: &str) -> Result<()> {
        self.activity.enter();
        self.activity.record(HwCall::Rf);
        self.entered.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.hold {
            // a dropped sender releases too
            let _ = hold.lock().unwrap().recv();
        }
        thread::sleep(self.delay);
        self.messages.lock().unwrap().push(message.to_string());
        self.activity.leave();
        if self.fail {
            return Err(Error::hardware("sdr", "mock transmitter failure"));
        }
        Ok(())
    }
}

// ── Recording event sink ──────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<AppEvent>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn events(&self) -> Vec<AppEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &AppEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ── MockHardware provider ─────────────────────────────────────

pub struct MockHardware {
    pub activity: Arc<Activity>,
    pub link: ScriptedLink,
    pub rf: Arc<RecordingTransmitter>,
    pub serial_opens: AtomicUsize,
    pub rf_opens: AtomicUsize,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self::with_transmitter(|tx| tx)
    }

    /// Build with a customised transmitter (delay, failure).
    pub fn with_transmitter(f: impl FnOnce(RecordingTransmitter) -> RecordingTransmitter) -> Self {
        let activity = Arc::new(Activity::default());
        Self {
            link: ScriptedLink::new(activity.clone()),
            rf: Arc::new(f(RecordingTransmitter::new(activity.clone()))),
            activity,
            serial_opens: AtomicUsize::new(0),
            rf_opens: AtomicUsize::new(0),
        }
    }
}

impl HardwareProvider for MockHardware {
    fn open_serial(&self, _global: &GlobalConfig) -> Result<Box<dyn SerialLink>> {
        self.serial_opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.link.clone()))
    }

    fn rf_transmitter(&self, global: &GlobalConfig) -> Result<Arc<dyn RfTransmitter>> {
        global.sdr_device()?;
        self.rf_opens.fetch_add(1, Ordering::SeqCst);
        Ok(self.rf.clone())
    }
}
