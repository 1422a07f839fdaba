//! Sample-accurate phase modulation renderer
//!
//! One free-running phase accumulator per operator. Each sample the
//! accumulated phases are copied into a working buffer and modulators are
//! folded into their carriers from OP6 down to OP1, so a chain such as
//! 6 -> 5 -> 4 resolves in a single pass.

use std::f64::consts::{PI, TAU};

use super::algorithms::Topology;
use super::constants::NUM_OPERATORS;
use crate::error::RenderError;

/// Phase modulation index applied to a modulator's output
pub const MODULATION_SCALE: f64 = 2.0 * PI;

/// FM renderer state
#[derive(Debug, Clone)]
pub struct FmRenderer<'a> {
    ratios: [f64; NUM_OPERATORS],
    topology: &'a Topology,
    sample_rate: f64,
    phases: [f64; NUM_OPERATORS],
    normalization: f64,
}

impl<'a> FmRenderer<'a> {
    /// Creates a renderer with all phases at zero
    pub fn new(
        ratios: [f64; NUM_OPERATORS],
        topology: &'a Topology,
        sample_rate: f64,
    ) -> Result<Self, RenderError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(RenderError::InvalidSampleRate(sample_rate));
        }
        let carriers = topology.carrier_count();
        Ok(Self {
            ratios,
            topology,
            sample_rate,
            phases: [0.0; NUM_OPERATORS],
            // No carriers means no output; avoid dividing by zero.
            normalization: if carriers > 0 {
                4.0 * carriers as f64
            } else {
                1.0
            },
        })
    }

    /// Current phase of every operator, in `[0, 2π)`
    pub fn phases(&self) -> [f64; NUM_OPERATORS] {
        self.phases
    }

    /// Seed the accumulators, e.g. with the ending phases of a previous block
    pub fn set_phases(&mut self, phases: [f64; NUM_OPERATORS]) {
        self.phases = phases;
    }

    /// Reset all phases to zero
    pub fn reset(&mut self) {
        self.phases = [0.0; NUM_OPERATORS];
    }

    /// Render `out.len()` samples.
    ///
    /// `pitch` holds the fundamental in Hz and `gains` the linear gain of
    /// every operator, both at audio rate. Phases carry over to the next
    /// call. Nothing is allocated.
    pub fn render(
        &mut self,
        pitch: &[f64],
        gains: &[[f64; NUM_OPERATORS]],
        out: &mut [f64],
    ) -> Result<(), RenderError> {
        if pitch.len() != out.len() || gains.len() != out.len() {
            return Err(RenderError::ContourLength {
                pitch: pitch.len(),
                gains: gains.len(),
                output: out.len(),
            });
        }

        let tstep = 1.0 / self.sample_rate;
        let topology = self.topology;
        let ratios = &self.ratios;
        let phases = &mut self.phases;

        for ((sample, &f0), ol) in out.iter_mut().zip(pitch).zip(gains) {
            for op in (0..NUM_OPERATORS).rev() {
                phases[op] += tstep * 2.0 * PI * f0 * ratios[op];
                if phases[op] >= TAU {
                    phases[op] %= TAU;
                }
            }

            let mut modphases = *phases;
            for modulator in (0..NUM_OPERATORS).rev() {
                for carrier in 0..NUM_OPERATORS {
                    if topology.modulates(carrier, modulator) {
                        modphases[carrier] +=
                            modphases[modulator].sin() * ol[modulator] * MODULATION_SCALE;
                    }
                }
            }

            let mut sum = 0.0;
            for op in 0..NUM_OPERATORS {
                if topology.is_carrier(op) {
                    sum += ol[op] * modphases[op].sin();
                }
            }
            *sample = sum / self.normalization;
        }

        Ok(())
    }
}
