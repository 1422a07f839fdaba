#![allow(dead_code)]

use dx7render::fm::patch::{PACKED_SIZE, SYSEX_HEADER_SIZE};

/// Packed operator settings used to build test records
#[derive(Clone, Copy)]
pub struct OpSpec {
    pub rates: [u8; 4],
    pub levels: [u8; 4],
    pub output_level: u8,
    pub velocity_sensitivity: u8,
    pub coarse: u8,
    pub fine: u8,
    pub detune: u8,
}

impl Default for OpSpec {
    fn default() -> Self {
        Self {
            rates: [99, 99, 99, 50],
            levels: [99, 99, 99, 0],
            output_level: 99,
            velocity_sensitivity: 0,
            coarse: 1,
            fine: 0,
            detune: 7,
        }
    }
}

/// Build one packed 128-byte record. `ops[0]` is OP1.
pub fn packed_patch(name: &[u8], algorithm: u8, transpose: u8, ops: [OpSpec; 6]) -> Vec<u8> {
    let mut p = vec![0u8; PACKED_SIZE];
    for (op_index, op) in ops.iter().enumerate() {
        // stored OP6 first
        let base = (5 - op_index) * 17;
        p[base..base + 4].copy_from_slice(&op.rates);
        p[base + 4..base + 8].copy_from_slice(&op.levels);
        p[base + 12] = (op.detune << 3) & 0x78;
        p[base + 13] = op.velocity_sensitivity << 2;
        p[base + 14] = op.output_level;
        p[base + 15] = op.coarse << 1;
        p[base + 16] = op.fine;
    }
    for i in 102..106 {
        p[i] = 99;
    }
    for i in 106..110 {
        p[i] = 50;
    }
    p[110] = algorithm;
    p[117] = transpose;
    for (i, &c) in name.iter().take(10).enumerate() {
        p[118 + i] = c;
    }
    p
}

/// A bank of records behind the 6-byte sysex header
pub fn sysex_bank(records: &[Vec<u8>]) -> Vec<u8> {
    let mut bank = vec![0xF0, 0x43, 0x00, 0x09, 0x20, 0x00];
    assert_eq!(bank.len(), SYSEX_HEADER_SIZE);
    for record in records {
        bank.extend_from_slice(record);
    }
    bank
}

/// Deterministic byte noise for property checks
pub fn noise_bytes(seed: u32, len: usize) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2654435761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

/// Peak absolute value of each window
pub fn window_peaks(samples: &[f64], window: usize) -> Vec<f64> {
    samples
        .chunks(window)
        .map(|w| w.iter().map(|s| s.abs()).fold(0.0, f64::max))
        .collect()
}
