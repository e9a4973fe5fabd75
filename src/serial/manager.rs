//! Request/acknowledge session with the receiver hub.
//!
//! ```text
//!   Idle ──boot()──▶ Booting ──BOOTED, ACK──▶ Ready
//!                                              │ ▲
//!              register_receiver() / command() │ │ ACKNOWLEDGE
//!                                              ▼ │
//!                                          Awaiting ack
//! ```
//!
//! Every request holds the connection lock for its write *and* the whole
//! response drain.  Responses are untagged, so at most one request may be
//! in flight per link.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::protocol::{Opcode, Response, ResponseDecoder, add_frame, command_frame, request};
use super::transport::SerialLink;
use crate::app::action::Action;
use crate::error::{Error, Result};

/// Default bound on waiting for a sentinel opcode.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// The hub resets when the port opens; give it time before talking.
pub const DEFAULT_BOOT_SETTLE: Duration = Duration::from_secs(1);

const READ_CHUNK: usize = 64;

struct Connection {
    link: Box<dyn SerialLink>,
    decoder: ResponseDecoder,
    registered: u8,
}

/// Owns the serial link to the hub and serializes every exchange on it.
pub struct SerialManager {
    conn: Mutex<Connection>,
    ack_timeout: Duration,
    boot_settle: Duration,
}

impl SerialManager {
    pub fn new(link: Box<dyn SerialLink>, ack_timeout: Duration) -> Self {
        Self {
            conn: Mutex::new(Connection {
                link,
                decoder: ResponseDecoder::new(),
                registered: 0,
            }),
            ack_timeout,
            boot_settle: DEFAULT_BOOT_SETTLE,
        }
    }

    /// Override the post-open settle delay (tests use zero).
    pub fn with_boot_settle(mut self, settle: Duration) -> Self {
        self.boot_settle = settle;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Handshake ─────────────────────────────────────────────

    /// Flush stale input, send `BOOT`, wait for `BOOTED`, then drain the
    /// acknowledge cycle that follows it.
    pub fn boot(&self) -> Result<()> {
        let mut conn = self.lock();

        thread::sleep(self.boot_settle);
        conn.link.clear_input().map_err(serial_io)?;
        conn.decoder.reset();

        write(&mut conn, &request(Opcode::Boot, &[]))?;
        self.drain_until(&mut conn, Opcode::Booted, self.ack_timeout)?;
        self.drain_until(&mut conn, Opcode::Acknowledge, self.ack_timeout)?;

        conn.registered = 0;
        info!("HUB | booted");
        Ok(())
    }

    /// Register one receiver on the hub and return its 0-based index.
    ///
    /// Indices are handed out in call order; a failed registration does
    /// not consume one.
    pub fn register_receiver(&self, receiver_type: u8, arg1: u8, arg2: u8, arg3: u8) -> Result<u8> {
        let mut conn = self.lock();

        write(&mut conn, &add_frame(receiver_type, [arg1, arg2, arg3]))?;
        self.drain_until(&mut conn, Opcode::Acknowledge, self.ack_timeout)?;

        let index = conn.registered;
        conn.registered = conn.registered.wrapping_add(1);
        info!(
            "HUB | registered type={} args=[{}, {}, {}] index={}",
            receiver_type, arg1, arg2, arg3, index
        );
        Ok(index)
    }

    // ── Requests ──────────────────────────────────────────────

    /// Send a command frame and wait for its acknowledge.
    ///
    /// Durations beyond the 16-bit wire field are clamped.  The hub
    /// acknowledges once the output has run, so the wait is extended by
    /// the duration.
    pub fn command(&self, action: Action, receiver_index: u8, level: u8, duration_ms: u32) -> Result<()> {
        let duration = u16::try_from(duration_ms).unwrap_or(u16::MAX);
        let frame = command_frame(Opcode::for_action(action), receiver_index, level, duration);
        debug!(
            "HUB | {} index={} level={} duration={}ms",
            action, receiver_index, level, duration
        );
        self.exchange(&frame, self.ack_timeout + Duration::from_millis(u64::from(duration)))
    }

    /// Write a raw request and wait for `ACKNOWLEDGE`.
    pub fn send(&self, data: &[u8]) -> Result<()> {
        self.exchange(data, self.ack_timeout)
    }

    fn exchange(&self, data: &[u8], timeout: Duration) -> Result<()> {
        let mut conn = self.lock();
        write(&mut conn, data)?;
        self.drain_until(&mut conn, Opcode::Acknowledge, timeout).map(|_| ())
    }

    /// Liveness probe: `PING` answered by `PONG`.
    pub fn ping(&self) -> Result<()> {
        let mut conn = self.lock();
        write(&mut conn, &request(Opcode::Ping, &[]))?;
        self.drain_until(&mut conn, Opcode::Pong, self.ack_timeout).map(|_| ())
    }

    /// Number of receivers registered since the last boot.
    pub fn registered(&self) -> u8 {
        self.lock().registered
    }

    // ── Response draining ─────────────────────────────────────

    /// Read frames until `sentinel` arrives, reporting everything else.
    ///
    /// On timeout the buffered input is discarded so the next request
    /// starts from a clean stream.
    fn drain_until(&self, conn: &mut Connection, sentinel: Opcode, timeout: Duration) -> Result<Response> {
        let started = Instant::now();
        let mut buf = [0u8; READ_CHUNK];

        loop {
            while let Some(response) = conn.decoder.next_response() {
                if response.is(sentinel) {
                    return Ok(response);
                }
                report(&response);
            }

            if started.elapsed() >= timeout {
                conn.decoder.reset();
                if let Err(e) = conn.link.clear_input() {
                    warn!("HUB | could not clear input after timeout: {}", e);
                }
                return Err(Error::ProtocolTimeout {
                    awaiting: sentinel,
                    waited: timeout,
                });
            }

            match conn.link.read(&mut buf) {
                Ok(0) => {}
                Ok(n) => conn.decoder.feed(&buf[..n]),
                Err(e) if is_transient(&e) => {}
                Err(e) => return Err(serial_io(e)),
            }
        }
    }
}

fn write(conn: &mut Connection, data: &[u8]) -> Result<()> {
    conn.link.write_all(data).map_err(serial_io)?;
    conn.link.flush().map_err(serial_io)
}

/// Surface an asynchronous hub frame in the log.
fn report(response: &Response) {
    match response.opcode() {
        Some(Opcode::Debug) => debug!("HUB DEBUG | {}", response.describe()),
        Some(Opcode::Error) => warn!("HUB ERROR | {}", response.describe()),
        Some(Opcode::Crash) => warn!("HUB CRASH | {}", response.describe()),
        _ => warn!(
            "HUB | unexpected opcode {} payload {}",
            response.opcode,
            response.describe()
        ),
    }
}

fn is_transient(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted
    )
}

fn serial_io(e: std::io::Error) -> Error {
    Error::hardware("serial", e)
}
