//! DX7 patch data structures and the packed bulk-dump decoder

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::constants::NUM_OPERATORS;
use crate::error::DecodeError;

/// Size of one packed patch record in a bulk dump
pub const PACKED_SIZE: usize = 128;

/// Size of an unpacked patch (155 voice parameters + operator on/off mask)
pub const UNPACKED_SIZE: usize = 156;

/// Bytes preceding the first record in a 32-voice sysex dump (F0 43 0n 09 20 00)
pub const SYSEX_HEADER_SIZE: usize = 6;

/// Packed bytes per operator
const PACKED_OP_SIZE: usize = 17;

/// Unpacked bytes per operator
const UNPACKED_OP_SIZE: usize = 21;

/// Offset of the patch name inside a packed record
const NAME_OFFSET: usize = 118;

/// Number of name characters kept from the record
pub const NAME_LENGTH: usize = 9;

/// Per-field maxima of the unpacked layout. Operators are stored OP6 first.
#[rustfmt::skip]
const FIELD_MAXIMA: [u8; UNPACKED_SIZE] = [
    99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, // op6
    3, 3, 7, 3, 7, 99, 1, 31, 99, 14,
    99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, // op5
    3, 3, 7, 3, 7, 99, 1, 31, 99, 14,
    99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, // op4
    3, 3, 7, 3, 7, 99, 1, 31, 99, 14,
    99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, // op3
    3, 3, 7, 3, 7, 99, 1, 31, 99, 14,
    99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, // op2
    3, 3, 7, 3, 7, 99, 1, 31, 99, 14,
    99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, // op1
    3, 3, 7, 3, 7, 99, 1, 31, 99, 14,
    99, 99, 99, 99, 99, 99, 99, 99,             // pitch eg rates & levels
    31, 7, 1, 99, 99, 99, 99, 1, 5, 7, 48,      // algorithm .. transpose
    126, 126, 126, 126, 126, 126, 126, 126, 126, 126, // name
    127,                                        // operator on/off
];

/// Four-stage envelope parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Rate for each of the 4 envelope stages (0-99)
    pub rates: [u8; 4],
    /// Level for each of the 4 envelope stages (0-99)
    pub levels: [u8; 4],
}

/// Keyboard level scaling parameters. Decoded but not applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardScaling {
    /// Break point key (0-99)
    pub break_point: u8,
    /// Depth of scaling on the left side of break point
    pub left_depth: u8,
    /// Depth of scaling on the right side of break point
    pub right_depth: u8,
    /// Curve type for left side (0-3)
    pub left_curve: u8,
    /// Curve type for right side (0-3)
    pub right_curve: u8,
}

/// One FM operator of a patch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    /// Amplitude envelope
    pub envelope: Envelope,
    /// Keyboard scaling settings
    pub keyboard_scaling: KeyboardScaling,
    /// Keyboard rate scaling (0-7). Decoded but not applied.
    pub rate_scaling: u8,
    /// Amplitude modulation sensitivity (0-3)
    pub amp_mod_sensitivity: u8,
    /// Key velocity sensitivity (0-7)
    pub velocity_sensitivity: u8,
    /// Output level (0-99)
    pub output_level: u8,
    /// Oscillator mode bit: fixed frequency instead of ratio
    pub fixed_frequency: bool,
    /// Coarse frequency (0-31)
    pub coarse: u8,
    /// Fine frequency (0-99)
    pub fine: u8,
    /// Detune (0-14, 7 is centre). Decoded but not applied.
    pub detune: u8,
    /// Frequency multiplier relative to the played pitch, transpose included
    pub frequency_ratio: f64,
}

impl Default for Operator {
    fn default() -> Self {
        Self {
            envelope: Envelope::default(),
            keyboard_scaling: KeyboardScaling::default(),
            rate_scaling: 0,
            amp_mod_sensitivity: 0,
            velocity_sensitivity: 0,
            output_level: 0,
            fixed_frequency: false,
            coarse: 0,
            fine: 0,
            detune: 7,
            frequency_ratio: 0.5,
        }
    }
}

/// LFO parameters. Decoded but not applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LfoParameters {
    /// LFO speed (0-99)
    pub speed: u8,
    /// LFO delay (0-99)
    pub delay: u8,
    /// Pitch modulation depth (0-99)
    pub pitch_mod_depth: u8,
    /// Amplitude modulation depth (0-99)
    pub amp_mod_depth: u8,
    /// Restart the LFO on key-down
    pub sync: bool,
    /// Waveform (0-5)
    pub waveform: u8,
    /// Pitch modulation sensitivity (0-7)
    pub pitch_mod_sensitivity: u8,
}

/// A decoded patch. Operators are in canonical order: index 0 is OP1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    /// Patch name, always [`NAME_LENGTH`] printable ASCII characters
    pub name: String,
    /// Algorithm id (0-31)
    pub algorithm: u8,
    /// Feedback amount (0-7). Decoded but not applied.
    pub feedback: u8,
    /// Oscillator key sync
    pub osc_key_sync: bool,
    /// Transpose (0-48, 24 is no shift)
    pub transpose: u8,
    /// Pitch envelope. Decoded but not applied.
    pub pitch_envelope: Envelope,
    /// LFO settings
    pub lfo: LfoParameters,
    /// The six operators
    pub operators: [Operator; NUM_OPERATORS],
}

impl Default for Patch {
    fn default() -> Self {
        Self {
            name: " ".repeat(NAME_LENGTH),
            algorithm: 0,
            feedback: 0,
            osc_key_sync: false,
            transpose: 24,
            pitch_envelope: Envelope::default(),
            lfo: LfoParameters::default(),
            operators: [Operator::default(); NUM_OPERATORS],
        }
    }
}

impl Patch {
    /// Name with trailing blanks removed
    pub fn display_name(&self) -> &str {
        self.name.trim_end()
    }

    /// Frequency ratios of all operators, OP1 first
    pub fn frequency_ratios(&self) -> [f64; NUM_OPERATORS] {
        let mut ratios = [0.0; NUM_OPERATORS];
        for (ratio, op) in ratios.iter_mut().zip(self.operators.iter()) {
            *ratio = op.frequency_ratio;
        }
        ratios
    }

    /// Build a patch from one packed 128-byte record.
    pub fn from_packed(record: &[u8; PACKED_SIZE]) -> Self {
        let unpacked = unpack_packed_patch(record);
        let transpose = unpacked[144];
        let transpose_factor = 2.0_f64.powf((transpose as f64 - 24.0) / 12.0);

        let mut name = String::with_capacity(NAME_LENGTH);
        for &byte in &record[NAME_OFFSET..NAME_OFFSET + NAME_LENGTH] {
            name.push(if (0x20..0x7f).contains(&byte) {
                char::from(byte)
            } else {
                ' '
            });
        }

        let mut operators = [Operator::default(); NUM_OPERATORS];
        for stored in 0..NUM_OPERATORS {
            let o = &unpacked[stored * UNPACKED_OP_SIZE..(stored + 1) * UNPACKED_OP_SIZE];
            // OP6 comes first in the stream.
            let op_index = NUM_OPERATORS - 1 - stored;

            let mut envelope = Envelope::default();
            envelope.rates.copy_from_slice(&o[0..4]);
            envelope.levels.copy_from_slice(&o[4..8]);

            let fixed_frequency = o[17] != 0;
            if fixed_frequency {
                warn!(
                    "OP{} in '{}' is in fixed frequency mode; rendering it as a ratio",
                    op_index + 1,
                    name.trim_end()
                );
            }

            operators[op_index] = Operator {
                envelope,
                keyboard_scaling: KeyboardScaling {
                    break_point: o[8],
                    left_depth: o[9],
                    right_depth: o[10],
                    left_curve: o[11],
                    right_curve: o[12],
                },
                rate_scaling: o[13],
                amp_mod_sensitivity: o[14],
                velocity_sensitivity: o[15],
                output_level: o[16],
                fixed_frequency,
                coarse: o[18],
                fine: o[19],
                detune: o[20],
                frequency_ratio: frequency_ratio(o[18], o[19], o[20]) * transpose_factor,
            };
        }

        let mut pitch_envelope = Envelope::default();
        pitch_envelope.rates.copy_from_slice(&unpacked[126..130]);
        pitch_envelope.levels.copy_from_slice(&unpacked[130..134]);

        Self {
            name,
            algorithm: unpacked[134],
            feedback: unpacked[135],
            osc_key_sync: unpacked[136] != 0,
            transpose,
            pitch_envelope,
            lfo: LfoParameters {
                speed: unpacked[137],
                delay: unpacked[138],
                pitch_mod_depth: unpacked[139],
                amp_mod_depth: unpacked[140],
                sync: unpacked[141] != 0,
                waveform: unpacked[142],
                pitch_mod_sensitivity: unpacked[143],
            },
            operators,
        }
    }
}

/// Frequency ratio from coarse and fine settings.
///
/// Detune is accepted but intentionally ignored.
pub fn frequency_ratio(coarse: u8, fine: u8, _detune: u8) -> f64 {
    let mut f = if coarse == 0 { 0.5 } else { coarse as f64 };
    f += (f / 100.0) * fine as f64;
    f
}

/// Unpack a 128-byte bulk record into the 156-byte single voice layout,
/// clamping every field to its documented maximum.
pub fn unpack_packed_patch(p: &[u8; PACKED_SIZE]) -> [u8; UNPACKED_SIZE] {
    let mut o = [0u8; UNPACKED_SIZE];

    for op in 0..NUM_OPERATORS {
        let src = op * PACKED_OP_SIZE;
        let dst = op * UNPACKED_OP_SIZE;

        o[dst..dst + 11].copy_from_slice(&p[src..src + 11]);

        let left_right_curves = p[src + 11];
        o[dst + 11] = left_right_curves & 3;
        o[dst + 12] = (left_right_curves >> 2) & 3;

        let detune_rs = p[src + 12];
        o[dst + 13] = detune_rs & 7;
        o[dst + 20] = detune_rs >> 3;

        let kvs_ams = p[src + 13];
        o[dst + 14] = kvs_ams & 3;
        o[dst + 15] = kvs_ams >> 2;

        o[dst + 16] = p[src + 14];

        let fcoarse_mode = p[src + 15];
        o[dst + 17] = fcoarse_mode & 1;
        o[dst + 18] = fcoarse_mode >> 1;

        o[dst + 19] = p[src + 16];
    }

    o[126..135].copy_from_slice(&p[102..111]);

    let oks_fb = p[111];
    o[135] = oks_fb & 7;
    o[136] = oks_fb >> 3;

    o[137..141].copy_from_slice(&p[112..116]);

    let lpms_lfw_lks = p[116];
    o[141] = lpms_lfw_lks & 1;
    o[142] = (lpms_lfw_lks >> 1) & 7;
    o[143] = lpms_lfw_lks >> 4;

    o[144..155].copy_from_slice(&p[117..128]);
    o[155] = 0x3f;

    for (value, &max) in o.iter_mut().zip(FIELD_MAXIMA.iter()) {
        *value = (*value).min(max);
    }

    o
}

fn header_size(header_present: bool) -> usize {
    if header_present {
        SYSEX_HEADER_SIZE
    } else {
        0
    }
}

/// Byte range of record `index`, `None` when it lies beyond `usize`
fn record_range(index: usize, header_present: bool) -> Option<(usize, usize)> {
    let start = index
        .checked_mul(PACKED_SIZE)?
        .checked_add(header_size(header_present))?;
    let end = start.checked_add(PACKED_SIZE)?;
    Some((start, end))
}

/// Decode the patch at `index` from a buffer of packed records.
///
/// When `header_present` is set the records start after the 6-byte sysex
/// header. Fails only when the buffer is too short for the requested record.
pub fn decode(bytes: &[u8], index: usize, header_present: bool) -> Result<Patch, DecodeError> {
    let (start, required) = match record_range(index, header_present) {
        Some(range) if range.1 <= bytes.len() => range,
        range => {
            return Err(DecodeError::Truncated {
                index,
                required: range.map_or(usize::MAX, |(_, end)| end),
                available: bytes.len(),
            })
        }
    };

    let mut record = [0u8; PACKED_SIZE];
    record.copy_from_slice(&bytes[start..required]);

    let patch = Patch::from_packed(&record);
    debug!(
        "PATCH: decoded #{} '{}', algorithm {}, transpose {}",
        index,
        patch.display_name(),
        patch.algorithm as usize + 1,
        patch.transpose
    );
    Ok(patch)
}

/// Number of whole records in the buffer
pub fn record_count(bytes: &[u8], header_present: bool) -> usize {
    bytes
        .len()
        .saturating_sub(header_size(header_present))
        / PACKED_SIZE
}

/// Decode every whole record in the buffer
pub fn decode_bank(bytes: &[u8], header_present: bool) -> Vec<Patch> {
    (0..record_count(bytes, header_present))
        .filter_map(|index| decode(bytes, index, header_present).ok())
        .collect()
}
