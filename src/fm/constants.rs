//! Core constants for the FM synthesis engine

/// Log base 2 of the envelope subsampling block (64 samples).
///
/// Folded into every envelope increment.
pub const LG_N: i32 = 6;

/// Number of operators per patch
pub const NUM_OPERATORS: usize = 6;

/// Number of factory algorithms
pub const NUM_ALGORITHMS: usize = 32;

/// One doubling in the Q24 log2 envelope domain
pub const Q24_ONE: i32 = 1 << 24;

/// Upper bound of the envelope level (17 doublings)
pub const LEVEL_CEILING: i32 = 17 << 24;

/// Reserved MIDI note used for silence frames
pub const SILENCE_NOTE: u8 = 0;

/// Convert a MIDI note number to frequency in Hz
#[inline]
pub fn midi_note_to_frequency(note: f64) -> f64 {
    440.0 * 2.0_f64.powf((note - 69.0) / 12.0)
}
