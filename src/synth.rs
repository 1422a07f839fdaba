use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::fm::algorithms::Topology;
use crate::fm::constants::NUM_OPERATORS;
use crate::fm::patch::Patch;
use crate::fm::renderer::FmRenderer;
use crate::fm::sequencer::{upsample, upsample_frames, NoteEvent, NoteSequencer};

/// Default audio sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: f64 = 44100.0;

/// Default number of audio samples per envelope frame
pub const DEFAULT_BLOCK_FACTOR: usize = 64;

/// Rendering configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Audio sample rate in Hz
    pub sample_rate: f64,
    /// Audio samples per envelope frame
    pub block_factor: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_factor: DEFAULT_BLOCK_FACTOR,
        }
    }
}

impl RenderSettings {
    /// Checks the settings before any rendering starts
    pub fn validate(&self) -> Result<(), RenderError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(RenderError::InvalidSampleRate(self.sample_rate));
        }
        if self.block_factor == 0 {
            return Err(RenderError::InvalidBlockFactor);
        }
        Ok(())
    }
}

/// DX7 synthesizer for offline rendering of one patch
pub struct Dx7Synth {
    patch: Patch,
    topology: &'static Topology,
    settings: RenderSettings,
    level_ratios: [f64; NUM_OPERATORS],
}

impl Dx7Synth {
    /// Create a synthesizer for `patch`.
    ///
    /// Fails if the patch's algorithm is not one of the 32 factory
    /// algorithms or the settings are invalid.
    pub fn new(patch: Patch, settings: RenderSettings) -> Result<Self, RenderError> {
        settings.validate()?;
        let topology =
            Topology::get(patch.algorithm).ok_or(RenderError::InvalidAlgorithm(patch.algorithm))?;

        debug!(
            "SYNTH: loading patch '{}', algorithm {}, {} carriers",
            patch.display_name(),
            patch.algorithm as usize + 1,
            topology.carrier_count()
        );

        Ok(Self {
            patch,
            topology,
            settings,
            level_ratios: [1.0; NUM_OPERATORS],
        })
    }

    /// Scale each operator's log envelope level before gain conversion
    pub fn with_level_ratios(mut self, level_ratios: [f64; NUM_OPERATORS]) -> Self {
        self.level_ratios = level_ratios;
        self
    }

    /// The loaded patch
    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    /// The routing of the loaded patch
    pub fn topology(&self) -> &'static Topology {
        self.topology
    }

    /// Rendering configuration
    pub fn settings(&self) -> RenderSettings {
        self.settings
    }

    /// Render a timeline of notes and silences.
    ///
    /// Output length is the total number of frames times the block factor.
    pub fn render_sequence(&self, events: &[NoteEvent]) -> Result<Vec<f64>, RenderError> {
        let frames = NoteSequencer::validate(events)?;
        let block_factor = self.settings.block_factor;
        if frames.checked_mul(block_factor).is_none() {
            return Err(RenderError::SampleCountOverflow {
                frames,
                block_factor,
            });
        }

        let contours = NoteSequencer::new(&self.patch)
            .with_level_ratios(self.level_ratios)
            .contours(events)?;
        debug!(
            "SYNTH: {} events, {} frames",
            events.len(),
            contours.len()
        );
        self.render_from_contours(&contours.pitch, &contours.gains)
    }

    /// Render from frame-rate contours: fundamental frequency per frame and
    /// linear gain per frame and operator.
    pub fn render_from_contours(
        &self,
        f0: &[f64],
        gains: &[[f64; NUM_OPERATORS]],
    ) -> Result<Vec<f64>, RenderError> {
        let block_factor = self.settings.block_factor;
        let samples = f0
            .len()
            .checked_mul(block_factor)
            .ok_or(RenderError::SampleCountOverflow {
                frames: f0.len(),
                block_factor,
            })?;
        if f0.len() != gains.len() {
            return Err(RenderError::ContourLength {
                pitch: f0.len(),
                gains: gains.len(),
                output: samples,
            });
        }

        let pitch_up = upsample(f0, block_factor);
        let gains_up = upsample_frames(gains, block_factor);
        let mut out = vec![0.0; pitch_up.len()];

        let mut renderer = FmRenderer::new(
            self.patch.frequency_ratios(),
            self.topology,
            self.settings.sample_rate,
        )?;
        renderer.render(&pitch_up, &gains_up, &mut out)?;

        debug!(
            "SYNTH: rendered {} samples at {} Hz",
            out.len(),
            self.settings.sample_rate
        );
        Ok(out)
    }
}
