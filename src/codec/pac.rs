//! PAC 27 MHz collar protocol.

use super::{Modulation, RfParams, RfProtocol};

/// Channel bits (template positions 8, 22, 23) per remote button.
const CHANNELS: [[u8; 3]; 8] = [
    [0, 0, 0], // E/P left
    [0, 1, 1], // B1 right 1
    [0, 1, 0], // B2 right 2, E/P right
    [1, 1, 0], // B3 right 3
    [1, 0, 0], // B4 left 1
    [0, 0, 1], // B5 left 2
    [1, 0, 1], // B6 left 3
    [1, 1, 1], // unused
];

pub const PAC: RfProtocol = RfProtocol {
    name: "pac",
    code_len: 9,
    prefix_len: 2,
    channel_table: CHANNELS,
    max_channel: 6,
    parity_checks: [&[0, 8], &[1, 9, 21], &[2, 10, 22], &[3, 11, 23], &[4, 12]],
    rf: RfParams {
        frequency_hz: 27.1e6,
        sample_rate_hz: 2e6,
        carrier_frequency_hz: 27.1e6,
        modulation: Modulation::Fsk,
        samples_per_symbol: 3100,
        low_frequency_hz: 92e3,
        high_frequency_hz: 95e3,
        pause_samples: 262_924,
    },
};

/// One PAC frame covers this much stimulation time.
pub const FRAME_MS: u32 = 250;

/// Longest stimulation a single transmission carries, matching the
/// 16-bit duration field of the serial hub.
pub const MAX_DURATION_MS: u32 = u16::MAX as u32;

/// Frames needed for `duration_ms`, never fewer than one.  Durations
/// above [`MAX_DURATION_MS`] are clamped.
pub fn frame_count(duration_ms: u32) -> u32 {
    (duration_ms.clamp(FRAME_MS, MAX_DURATION_MS) + 5) / FRAME_MS
}

/// Map a 0-100 power percentage onto the 6-bit intensity range.
pub fn intensity_for_power(power: u8) -> u8 {
    (u32::from(power.min(100)) * 63 / 100) as u8
}
