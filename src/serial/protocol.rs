//! Receiver hub wire protocol.
//!
//! Wire format, both directions:
//! ```text
//! ┌──────────┬───────────┬───────────────────┐
//! │ Opcode   │ Length    │ Payload (Length B)│
//! │ u8       │ u8        │                   │
//! └──────────┴───────────┴───────────────────┘
//! ```
//!
//! Responses carry no request id; they are correlated with requests by
//! strict ordering, one request in flight per link.
//!
//! [`ResponseDecoder`] accumulates incoming bytes and yields complete
//! frames.  A single link read may return part of a header, part of a
//! payload, or several frames back to back.

use core::fmt;
use std::collections::VecDeque;

use crate::app::action::Action;

/// Frame header size: opcode + payload length.
pub const HEADER_SIZE: usize = 2;

/// Payload of every command and `ADD` request.
pub const COMMAND_PAYLOAD_LEN: u8 = 4;

/// Protocol opcodes.  Values are fixed by the hub firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Led = 10,
    Beep = 11,
    Vib = 12,
    Zap = 13,
    BeepZap = 99,

    Boot = 100,
    Booted = 101,
    Add = 102,

    Acknowledge = 200,
    Ping = 201,
    Pong = 202,

    Debug = 253,
    Error = 254,
    Crash = 255,
}

impl Opcode {
    /// Decode a wire value; `None` for values outside the protocol.
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            10 => Self::Led,
            11 => Self::Beep,
            12 => Self::Vib,
            13 => Self::Zap,
            99 => Self::BeepZap,
            100 => Self::Boot,
            101 => Self::Booted,
            102 => Self::Add,
            200 => Self::Acknowledge,
            201 => Self::Ping,
            202 => Self::Pong,
            253 => Self::Debug,
            254 => Self::Error,
            255 => Self::Crash,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Led => "LED",
            Self::Beep => "BEEP",
            Self::Vib => "VIB",
            Self::Zap => "ZAP",
            Self::BeepZap => "BEEPZAP",
            Self::Boot => "BOOT",
            Self::Booted => "BOOTED",
            Self::Add => "ADD",
            Self::Acknowledge => "ACKNOWLEDGE",
            Self::Ping => "PING",
            Self::Pong => "PONG",
            Self::Debug => "DEBUG",
            Self::Error => "ERROR",
            Self::Crash => "CRASH",
        }
    }

    /// Opcode that carries `action` on the wire.
    ///
    /// The hub has no keep-awake opcode; a keep-alive is a beep.
    pub fn for_action(action: Action) -> Self {
        match action {
            Action::Led => Self::Led,
            Action::Beep | Action::KeepAwake => Self::Beep,
            Action::Vib => Self::Vib,
            Action::Zap => Self::Zap,
            Action::BeepZap => Self::BeepZap,
            Action::Boot => Self::Boot,
            Action::Booted => Self::Booted,
            Action::Add => Self::Add,
            Action::Acknowledge => Self::Acknowledge,
            Action::Ping => Self::Ping,
            Action::Pong => Self::Pong,
            Action::Debug => Self::Debug,
            Action::Error => Self::Error,
            Action::Crash => Self::Crash,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Encode a request: `[opcode, len, payload...]`.
///
/// Payloads are at most 255 bytes by construction of the length byte.
pub fn request(opcode: Opcode, payload: &[u8]) -> Vec<u8> {
    debug_assert!(payload.len() <= usize::from(u8::MAX));
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.push(opcode as u8);
    frame.push(payload.len() as u8);
    frame.extend_from_slice(payload);
    frame
}

/// Encode a receiver command: `[opcode, 4, index, level, dur_hi, dur_lo]`.
pub fn command_frame(opcode: Opcode, receiver_index: u8, level: u8, duration_ms: u16) -> [u8; 6] {
    let [hi, lo] = duration_ms.to_be_bytes();
    [
        opcode as u8,
        COMMAND_PAYLOAD_LEN,
        receiver_index,
        level,
        hi,
        lo,
    ]
}

/// Encode an `ADD` registration: `[102, 4, type, arg1, arg2, arg3]`.
pub fn add_frame(receiver_type: u8, args: [u8; 3]) -> [u8; 6] {
    [
        Opcode::Add as u8,
        COMMAND_PAYLOAD_LEN,
        receiver_type,
        args[0],
        args[1],
        args[2],
    ]
}

/// One decoded hub frame.  The opcode is kept raw so unknown values can
/// still be reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub opcode: u8,
    pub payload: Vec<u8>,
}

impl Response {
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_u8(self.opcode)
    }

    pub fn is(&self, opcode: Opcode) -> bool {
        self.opcode == opcode as u8
    }

    /// Payload rendered for logs: printable text plus hex.
    pub fn describe(&self) -> String {
        let text = String::from_utf8_lossy(&self.payload);
        let hex: Vec<String> = self.payload.iter().map(|b| format!("{b:02x}")).collect();
        format!("\"{}\" [{}]", text.trim_end(), hex.join(" "))
    }
}

/// Decoder state machine.
#[derive(Debug, Clone, Copy)]
enum DecoderState {
    /// Waiting for the opcode byte.
    ReadingOpcode,
    /// Opcode received, waiting for the length byte.
    ReadingLength { opcode: u8 },
    /// Header received, reading payload.
    ReadingPayload { opcode: u8, expected: usize },
}

/// Streaming response decoder.
#[derive(Debug)]
pub struct ResponseDecoder {
    state: DecoderState,
    payload_buf: Vec<u8>,
    ready: VecDeque<Response>,
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::ReadingOpcode,
            payload_buf: Vec::with_capacity(usize::from(u8::MAX)),
            ready: VecDeque::new(),
        }
    }

    /// Feed bytes into the decoder.  Every byte is consumed; completed
    /// frames queue up for [`next_response`](Self::next_response).
    pub fn feed(&mut self, data: &[u8]) {
        for &byte in data {
            self.state = match self.state {
                DecoderState::ReadingOpcode => DecoderState::ReadingLength { opcode: byte },
                DecoderState::ReadingLength { opcode } if byte == 0 => {
                    self.ready.push_back(Response {
                        opcode,
                        payload: Vec::new(),
                    });
                    DecoderState::ReadingOpcode
                }
                DecoderState::ReadingLength { opcode } => {
                    self.payload_buf.clear();
                    DecoderState::ReadingPayload {
                        opcode,
                        expected: usize::from(byte),
                    }
                }
                DecoderState::ReadingPayload { opcode, expected } => {
                    self.payload_buf.push(byte);
                    if self.payload_buf.len() == expected {
                        self.ready.push_back(Response {
                            opcode,
                            payload: core::mem::take(&mut self.payload_buf),
                        });
                        DecoderState::ReadingOpcode
                    } else {
                        DecoderState::ReadingPayload { opcode, expected }
                    }
                }
            };
        }
    }

    /// Next complete frame, oldest first.
    pub fn next_response(&mut self) -> Option<Response> {
        self.ready.pop_front()
    }

    /// Whether a partial frame is buffered.
    pub fn is_mid_frame(&self) -> bool {
        !matches!(self.state, DecoderState::ReadingOpcode)
    }

    /// Drop partial and queued frames (after a timeout or reconnect).
    pub fn reset(&mut self) {
        self.state = DecoderState::ReadingOpcode;
        self.payload_buf.clear();
        self.ready.clear();
    }
}
