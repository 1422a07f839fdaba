//! DX7 patch renderer.
//!
//! Decodes packed DX7 bulk-dump patches and renders them offline with the
//! hardware's fixed-point, log-domain envelope arithmetic and the 32 factory
//! operator routings.
//!
//! Detune, keyboard rate scaling, operator feedback, the LFO and the pitch
//! envelope are decoded but not rendered.
//!
//! ```no_run
//! use dx7render::{decode, render, NoteEvent};
//!
//! let bank = std::fs::read("rom1a.syx").unwrap();
//! let patch = decode(&bank, 0, true).unwrap();
//! let audio = render(&patch, &[NoteEvent::note(69, 100, 100, 50)], 44100.0, 64).unwrap();
//! assert_eq!(audio.len(), 150 * 64);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod fm;
pub mod synth;

pub use error::{DecodeError, RenderError};
pub use fm::algorithms::{Topology, ALGORITHMS};
pub use fm::patch::{decode, decode_bank, record_count, Operator, Patch};
pub use fm::sequencer::NoteEvent;
pub use synth::{Dx7Synth, RenderSettings};

/// Render a note timeline with `patch`.
///
/// `block_factor` is the number of audio samples per envelope frame. The
/// result holds `block_factor` samples for every frame of the timeline.
pub fn render(
    patch: &Patch,
    events: &[NoteEvent],
    sample_rate: f64,
    block_factor: usize,
) -> Result<Vec<f64>, RenderError> {
    let settings = RenderSettings {
        sample_rate,
        block_factor,
    };
    Dx7Synth::new(patch.clone(), settings)?.render_sequence(events)
}
