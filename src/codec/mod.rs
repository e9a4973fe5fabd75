//! Protocol codec engine for RF collar receivers.
//!
//! Pure functions, no I/O, no state.  A vendor protocol is described by
//! data only ([`RfProtocol`]): the transmitter-code template split, the
//! channel lookup table, and the parity-check matrix of the checksum.
//! [`generate`] and [`encode`] are shared by every vendor.
//!
//! Bit layout produced by [`generate`]:
//!
//! ```text
//! ┌────────┬───────────┬─────┬────────┬──────────┬──────┬─────┬─────┐
//! │ code   │ intensity │ ch0 │ code   │ checksum │ beep │ ch1 │ ch2 │
//! │ prefix │ 6 bits LE │     │ suffix │ 5 bits   │      │     │     │
//! └────────┴───────────┴─────┴────────┴──────────┴──────┴─────┴─────┘
//! ```
//!
//! The checksum bits are parities over positions of the same string with
//! `CCCCC` standing in for the checksum itself.

pub mod pac;

use core::fmt;

use serde::Serialize;

/// Number of intensity bits; intensity is clamped to `0..=MAX_INTENSITY`.
pub const INTENSITY_BITS: usize = 6;
pub const MAX_INTENSITY: u8 = (1 << INTENSITY_BITS) - 1;

/// Number of checksum bits.
pub const CHECKSUM_BITS: usize = 5;

/// Entries in a channel table.  The last slot exists but is unused.
pub const CHANNEL_SLOTS: usize = 8;

/// Line-coding preamble emitted before every frame.
pub const PREAMBLE: &str = "0101010101010101111";

/// Filler emitted after the preamble and after every data bit.
pub const FILLER: &str = "10";

const CHECKSUM_PLACEHOLDER: &str = "CCCCC";

// ═══════════════════════════════════════════════════════════════
//  Vendor description
// ═══════════════════════════════════════════════════════════════

/// Modulation passed to the signal generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Modulation {
    Fsk,
}

impl Modulation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fsk => "FSK",
        }
    }
}

/// Radio parameters of one vendor protocol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RfParams {
    pub frequency_hz: f64,
    pub sample_rate_hz: f64,
    pub carrier_frequency_hz: f64,
    pub modulation: Modulation,
    pub samples_per_symbol: u32,
    /// FSK frequency pair.
    pub low_frequency_hz: f64,
    pub high_frequency_hz: f64,
    /// Silence between repeated messages, in samples.
    pub pause_samples: u64,
}

/// Everything vendor-specific about an RF bit protocol.
#[derive(Debug, Clone, Copy)]
pub struct RfProtocol {
    pub name: &'static str,
    /// Exact length of the transmitter code template.
    pub code_len: usize,
    /// Template characters placed before the intensity field.
    pub prefix_len: usize,
    /// Channel bits keyed by channel index.  Bit 0 follows the intensity
    /// field, bits 1 and 2 trail the beep flag.
    pub channel_table: [[u8; 3]; CHANNEL_SLOTS],
    /// Highest usable channel index.
    pub max_channel: u8,
    /// Checksum bit *n* is the parity of the input positions in entry *n*.
    pub parity_checks: [&'static [usize]; CHECKSUM_BITS],
    pub rf: RfParams,
}

// ═══════════════════════════════════════════════════════════════
//  Errors
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Code is not `code_len` characters long.
    CodeLength { expected: usize, actual: usize },
    /// Code contains something other than `0`/`1`.
    CodeNotBinary,
    /// Channel index outside the vendor table.
    Channel { channel: u8, max: u8 },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CodeLength { expected, actual } => write!(
                f,
                "transmitter code must have {expected} bits, got {actual}"
            ),
            Self::CodeNotBinary => write!(f, "transmitter code may only contain 0 and 1"),
            Self::Channel { channel, max } => {
                write!(f, "channel {channel} is out of range, expected 0 to {max}")
            }
        }
    }
}

impl std::error::Error for CodecError {}

// ═══════════════════════════════════════════════════════════════
//  Generate
// ═══════════════════════════════════════════════════════════════

impl RfProtocol {
    /// Check a transmitter code and channel against this protocol.
    pub fn validate(&self, code: &str, channel: u8) -> Result<(), CodecError> {
        if code.len() != self.code_len {
            return Err(CodecError::CodeLength {
                expected: self.code_len,
                actual: code.len(),
            });
        }
        if !code.bytes().all(|b| b == b'0' || b == b'1') {
            return Err(CodecError::CodeNotBinary);
        }
        if channel > self.max_channel {
            return Err(CodecError::Channel {
                channel,
                max: self.max_channel,
            });
        }
        Ok(())
    }

    /// Build the bitstring for one transmission.
    ///
    /// `intensity` is clamped to [`MAX_INTENSITY`].
    pub fn generate(
        &self,
        code: &str,
        intensity: u8,
        channel: u8,
        beep: bool,
    ) -> Result<String, CodecError> {
        self.validate(code, channel)?;

        let bits = self.channel_table[channel as usize];
        let (prefix, suffix) = code.split_at(self.prefix_len);

        let mut pre_checksum = String::with_capacity(code.len() + INTENSITY_BITS + 1);
        pre_checksum.push_str(prefix);
        pre_checksum.push_str(&intensity_field(intensity));
        pre_checksum.push(bit_char(bits[0]));
        pre_checksum.push_str(suffix);

        let post_checksum: String = [u8::from(beep), bits[1], bits[2]]
            .into_iter()
            .map(bit_char)
            .collect();

        let input = format!("{pre_checksum}{CHECKSUM_PLACEHOLDER}{post_checksum}");
        let checksum = checksum(&input, &self.parity_checks);

        Ok(pre_checksum + &checksum + &post_checksum)
    }

    /// [`generate`](Self::generate) followed by [`encode`].
    pub fn frame(
        &self,
        code: &str,
        intensity: u8,
        channel: u8,
        beep: bool,
    ) -> Result<String, CodecError> {
        self.generate(code, intensity, channel, beep)
            .map(|bits| encode(&bits))
    }
}

/// Six intensity bits, least-significant first.
pub fn intensity_field(intensity: u8) -> String {
    let intensity = intensity.min(MAX_INTENSITY);
    (0..INTENSITY_BITS)
        .map(|i| bit_char((intensity >> i) & 1))
        .collect()
}

/// Parity bits over `input`, one per entry of `checks`.
///
/// Positions holding anything but `1` count as zero, so the placeholder
/// never contributes even if a matrix referenced it.
pub fn checksum(input: &str, checks: &[&[usize]]) -> String {
    let bytes = input.as_bytes();
    checks
        .iter()
        .map(|positions| {
            let ones = positions
                .iter()
                .filter(|&&p| bytes.get(p) == Some(&b'1'))
                .count();
            bit_char((ones % 2) as u8)
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════
//  Encode
// ═══════════════════════════════════════════════════════════════

/// Line-code a bitstring: preamble, filler, then every bit followed by
/// the filler.
pub fn encode(bits: &str) -> String {
    let mut out =
        String::with_capacity(PREAMBLE.len() + FILLER.len() * (bits.len() + 1) + bits.len());
    out.push_str(PREAMBLE);
    out.push_str(FILLER);
    for bit in bits.chars() {
        out.push(bit);
        out.push_str(FILLER);
    }
    out
}

fn bit_char(bit: u8) -> char {
    if bit & 1 == 1 { '1' } else { '0' }
}
