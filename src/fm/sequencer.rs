//! Note timeline to per-operator gain and pitch contours
//!
//! Envelopes run at frame rate (one sample per block of audio). The
//! sequencer stitches every note and silence of a timeline into one
//! continuous contour per operator, then the contours are upsampled to the
//! audio rate by linear interpolation.

use log::trace;
use serde::{Deserialize, Serialize};

use super::constants::{midi_note_to_frequency, NUM_OPERATORS, SILENCE_NOTE};
use super::env::{level_to_gain, output_level_bias, EnvelopeGenerator};
use super::patch::{Operator, Patch};
use crate::error::RenderError;

/// One entry of a performance timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteEvent {
    /// A played note
    Note {
        /// MIDI note number (1-127)
        pitch: u8,
        /// MIDI velocity (0-127)
        velocity: u8,
        /// Frames with the key held
        on_frames: usize,
        /// Frames after the key is released
        off_frames: usize,
    },
    /// A gap with all operators silent
    Silence {
        /// Length in frames
        frames: usize,
    },
}

impl NoteEvent {
    /// Creates a note event
    pub fn note(pitch: u8, velocity: u8, on_frames: usize, off_frames: usize) -> Self {
        NoteEvent::Note {
            pitch,
            velocity,
            on_frames,
            off_frames,
        }
    }

    /// Creates a silence event
    pub fn silence(frames: usize) -> Self {
        NoteEvent::Silence { frames }
    }

    /// Length of the event in frames, `None` if it does not fit a `usize`
    pub fn frames(&self) -> Option<usize> {
        match *self {
            NoteEvent::Note {
                on_frames,
                off_frames,
                ..
            } => on_frames.checked_add(off_frames),
            NoteEvent::Silence { frames } => Some(frames),
        }
    }
}

/// Frame-rate control signals of a timeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contours {
    /// Fundamental frequency per frame, in Hz
    pub pitch: Vec<f64>,
    /// Linear gain per frame and operator
    pub gains: Vec<[f64; NUM_OPERATORS]>,
    /// Raw Q24 envelope level per frame and operator (0 during silence)
    pub levels: Vec<[i32; NUM_OPERATORS]>,
}

impl Contours {
    /// Number of frames
    pub fn len(&self) -> usize {
        self.pitch.len()
    }

    /// Whether the timeline is empty
    pub fn is_empty(&self) -> bool {
        self.pitch.is_empty()
    }
}

/// Run one operator's envelope for a note.
///
/// The key is released right after frame `on_frames` has been sampled.
/// Returns the raw Q24 level of every frame. `on_frames + off_frames` must
/// fit a `usize`; [`NoteSequencer::validate`] checks this for whole timelines.
pub fn render_envelope(
    operator: &Operator,
    velocity: u8,
    on_frames: usize,
    off_frames: usize,
) -> Vec<i32> {
    let bias = output_level_bias(
        operator.output_level as i32,
        velocity as i32,
        operator.velocity_sensitivity as i32,
    );
    let mut env =
        EnvelopeGenerator::new(operator.envelope.rates, operator.envelope.levels, bias);
    env.keydown(true);

    let n_frames = on_frames + off_frames;
    let mut levels = Vec::with_capacity(n_frames);
    for i in 0..n_frames {
        levels.push(env.get_sample());
        if i == on_frames {
            env.keydown(false);
        }
    }
    levels
}

/// Builds gain and pitch contours for a patch
#[derive(Debug, Clone)]
pub struct NoteSequencer<'a> {
    operators: &'a [Operator; NUM_OPERATORS],
    level_ratios: [f64; NUM_OPERATORS],
}

impl<'a> NoteSequencer<'a> {
    /// Creates a sequencer for the operators of `patch`
    pub fn new(patch: &'a Patch) -> Self {
        Self {
            operators: &patch.operators,
            level_ratios: [1.0; NUM_OPERATORS],
        }
    }

    /// Scale each operator's log level before gain conversion (default 1.0)
    pub fn with_level_ratios(mut self, level_ratios: [f64; NUM_OPERATORS]) -> Self {
        self.level_ratios = level_ratios;
        self
    }

    /// Checks every event before any envelope runs and returns the total
    /// number of frames in the timeline
    pub fn validate(events: &[NoteEvent]) -> Result<usize, RenderError> {
        let mut total: usize = 0;
        for (event, entry) in events.iter().enumerate() {
            if let NoteEvent::Note { pitch, .. } = *entry {
                if pitch == SILENCE_NOTE || pitch > 127 {
                    return Err(RenderError::ReservedPitch { event, pitch });
                }
            }
            total = entry
                .frames()
                .and_then(|frames| total.checked_add(frames))
                .ok_or(RenderError::TimelineTooLong { event })?;
        }
        Ok(total)
    }

    /// Concatenate all events into frame-rate contours
    pub fn contours(&self, events: &[NoteEvent]) -> Result<Contours, RenderError> {
        let total = Self::validate(events)?;
        let mut contours = Contours {
            pitch: Vec::with_capacity(total),
            gains: Vec::with_capacity(total),
            levels: Vec::with_capacity(total),
        };

        for entry in events {
            match *entry {
                NoteEvent::Note {
                    pitch,
                    velocity,
                    on_frames,
                    off_frames,
                } => {
                    trace!(
                        "SEQ: note {} vel {} on {} off {}",
                        pitch,
                        velocity,
                        on_frames,
                        off_frames
                    );
                    let start = contours.levels.len();
                    let n_frames = on_frames + off_frames;
                    contours
                        .levels
                        .resize(start + n_frames, [0; NUM_OPERATORS]);
                    contours
                        .gains
                        .resize(start + n_frames, [0.0; NUM_OPERATORS]);

                    for (op, operator) in self.operators.iter().enumerate() {
                        let ratio = self.level_ratios[op];
                        let levels = render_envelope(operator, velocity, on_frames, off_frames);
                        for (frame, level) in levels.into_iter().enumerate() {
                            contours.levels[start + frame][op] = level;
                            contours.gains[start + frame][op] =
                                level_to_gain(level as f64 * ratio);
                        }
                    }

                    let frequency = midi_note_to_frequency(pitch as f64);
                    contours
                        .pitch
                        .extend(std::iter::repeat(frequency).take(n_frames));
                }
                NoteEvent::Silence { frames } => {
                    trace!("SEQ: silence {}", frames);
                    let frequency = midi_note_to_frequency(SILENCE_NOTE as f64);
                    contours
                        .pitch
                        .extend(std::iter::repeat(frequency).take(frames));
                    contours
                        .gains
                        .extend(std::iter::repeat([0.0; NUM_OPERATORS]).take(frames));
                    contours
                        .levels
                        .extend(std::iter::repeat([0; NUM_OPERATORS]).take(frames));
                }
            }
        }

        Ok(contours)
    }
}

/// Position of output sample `k` on the frame axis. `n` frames are spread
/// evenly over `total` output samples, first and last samples aligned.
#[inline]
fn frame_position(k: usize, n: usize, total: usize) -> (usize, f64) {
    if total <= 1 || n <= 1 {
        return (0, 0.0);
    }
    let step = (n - 1) as f64 / (total - 1) as f64;
    let x = if k == total - 1 {
        (n - 1) as f64
    } else {
        k as f64 * step
    };
    let i = (x.floor() as usize).min(n - 2);
    (i, x - i as f64)
}

/// Linearly upsample a frame-rate signal by `factor`.
///
/// Output length is `signal.len() * factor`.
pub fn upsample(signal: &[f64], factor: usize) -> Vec<f64> {
    let n = signal.len();
    let total = n * factor;
    if n == 1 {
        return vec![signal[0]; total];
    }
    (0..total)
        .map(|k| {
            let (i, frac) = frame_position(k, n, total);
            signal[i] + (signal[i + 1] - signal[i]) * frac
        })
        .collect()
}

/// Linearly upsample per-operator frames by `factor`.
pub fn upsample_frames(
    frames: &[[f64; NUM_OPERATORS]],
    factor: usize,
) -> Vec<[f64; NUM_OPERATORS]> {
    let n = frames.len();
    let total = n * factor;
    if n == 1 {
        return vec![frames[0]; total];
    }
    (0..total)
        .map(|k| {
            let (i, frac) = frame_position(k, n, total);
            let (a, b) = (&frames[i], &frames[i + 1]);
            let mut out = [0.0; NUM_OPERATORS];
            for op in 0..NUM_OPERATORS {
                out[op] = a[op] + (b[op] - a[op]) * frac;
            }
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sustained_operator() -> Operator {
        let mut op = Operator::default();
        op.envelope.rates = [99, 99, 99, 50];
        op.envelope.levels = [99, 99, 99, 0];
        op.output_level = 99;
        op.frequency_ratio = 1.0;
        op
    }

    #[test]
    fn test_render_envelope_length_and_release() {
        let levels = render_envelope(&sustained_operator(), 100, 10, 20);
        assert_eq!(levels.len(), 30);
        // key held through frame 10, then falling
        assert_eq!(levels[0], levels[10]);
        for pair in levels[10..].windows(2) {
            assert!(pair[1] < pair[0]);
        }
    }

    #[test]
    fn test_contours_concatenate() {
        let mut patch = Patch::default();
        patch.operators[0] = sustained_operator();
        let events = [
            NoteEvent::note(69, 100, 4, 2),
            NoteEvent::silence(3),
            NoteEvent::note(81, 100, 1, 1),
        ];
        let contours = NoteSequencer::new(&patch).contours(&events).unwrap();
        assert_eq!(contours.len(), 11);
        assert_eq!(contours.gains.len(), 11);
        assert_eq!(contours.levels.len(), 11);
        assert!((contours.pitch[0] - 440.0).abs() < 1e-9);
        assert!((contours.pitch[10] - 880.0).abs() < 1e-9);
        for frame in 6..9 {
            assert_eq!(contours.gains[frame], [0.0; NUM_OPERATORS]);
            assert!((contours.pitch[frame] - midi_note_to_frequency(0.0)).abs() < 1e-12);
        }
        assert!(contours.gains[0][0] > 0.0);
    }

    #[test]
    fn test_level_ratio_scales_log_level() {
        let mut patch = Patch::default();
        patch.operators[0] = sustained_operator();
        let events = [NoteEvent::note(69, 100, 2, 0)];
        let half = NoteSequencer::new(&patch)
            .with_level_ratios([0.5; NUM_OPERATORS])
            .contours(&events)
            .unwrap();
        let level = half.levels[0][0] as f64;
        assert!((half.gains[0][0] - level_to_gain(level * 0.5)).abs() < 1e-15);
    }

    #[test]
    fn test_reserved_pitch_rejected() {
        let patch = Patch::default();
        let events = [NoteEvent::silence(2), NoteEvent::note(0, 100, 1, 1)];
        assert_eq!(
            NoteSequencer::new(&patch).contours(&events),
            Err(RenderError::ReservedPitch { event: 1, pitch: 0 })
        );
    }

    #[test]
    fn test_oversized_timeline_rejected() {
        let held = NoteEvent::note(60, 100, usize::MAX, 1);
        assert_eq!(held.frames(), None);
        assert_eq!(
            NoteSequencer::validate(&[NoteEvent::silence(3), held]),
            Err(RenderError::TimelineTooLong { event: 1 })
        );

        let events = [NoteEvent::silence(usize::MAX - 1), NoteEvent::silence(2)];
        assert_eq!(
            NoteSequencer::validate(&events),
            Err(RenderError::TimelineTooLong { event: 1 })
        );

        let events = [NoteEvent::note(60, 100, 4, 2), NoteEvent::silence(3)];
        assert_eq!(NoteSequencer::validate(&events), Ok(9));
    }

    #[test]
    fn test_upsample_endpoints_and_length() {
        let up = upsample(&[0.0, 1.0, 3.0], 4);
        assert_eq!(up.len(), 12);
        assert_eq!(up[0], 0.0);
        assert!((up[11] - 3.0).abs() < 1e-12);
        for pair in up.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
    }

    #[test]
    fn test_upsample_constant_and_degenerate() {
        assert!(upsample(&[], 64).is_empty());
        assert_eq!(upsample(&[2.0], 3), vec![2.0; 3]);
        let up = upsample(&[5.0; 10], 64);
        assert!(up.iter().all(|&v| (v - 5.0).abs() < 1e-12));
    }

    #[test]
    fn test_upsample_frames_matches_scalar() {
        let frames: Vec<[f64; NUM_OPERATORS]> =
            (0..5).map(|i| [i as f64 * 0.5; NUM_OPERATORS]).collect();
        let scalar: Vec<f64> = frames.iter().map(|f| f[3]).collect();
        let up = upsample_frames(&frames, 7);
        let up_scalar = upsample(&scalar, 7);
        assert_eq!(up.len(), 35);
        for (a, b) in up.iter().zip(up_scalar.iter()) {
            assert_eq!(a[3], *b);
        }
    }

    #[test]
    fn test_event_serde() {
        let json = r#"[{"note":{"pitch":60,"velocity":90,"on_frames":10,"off_frames":5}},{"silence":{"frames":4}}]"#;
        let events: Vec<NoteEvent> = serde_json::from_str(json).unwrap();
        assert_eq!(events[0], NoteEvent::note(60, 90, 10, 5));
        assert_eq!(events[1], NoteEvent::silence(4));
    }
}
