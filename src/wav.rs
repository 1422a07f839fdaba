use std::path::Path;

use anyhow::{Context, Result};
use hound::{WavSpec, WavWriter};

/// Writes a mono 32-bit float WAV file.
///
/// When `normalize` is set the buffer is scaled so its peak sits at 0.8,
/// leaving headroom; quieter buffers are written unchanged.
pub fn write_wav(path: &Path, samples: &[f64], sample_rate: u32, normalize: bool) -> Result<()> {
    let peak = samples.iter().map(|s| s.abs()).fold(0.0f64, f64::max);
    let normalize_factor = if normalize && peak > 0.8 { 0.8 / peak } else { 1.0 };

    let wav_spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut wav_writer = WavWriter::create(path, wav_spec)
        .with_context(|| format!("unable to create wav file '{}'", path.display()))?;

    for sample in samples {
        wav_writer
            .write_sample((sample * normalize_factor) as f32)
            .context("failed to write wav sample")?;
    }

    wav_writer.finalize().context("failed to finalize wav file")?;
    Ok(())
}
