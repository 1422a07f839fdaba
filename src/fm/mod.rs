//! FM synthesis core: patch decoding, routing, envelopes, sequencing and
//! the phase modulation renderer.

pub mod algorithms;
pub mod constants;
pub mod env;
pub mod patch;
pub mod renderer;
pub mod sequencer;
