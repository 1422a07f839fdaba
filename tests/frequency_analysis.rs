use std::f64::consts::PI;

use dx7render::{decode, render, NoteEvent};
use rustfft::{num_complex::Complex, FftPlanner};

mod common;
use common::{packed_patch, OpSpec};

/// Perform FFT analysis on audio samples to find dominant frequency
fn analyze_frequency(samples: &[f64], sample_rate: f64) -> f64 {
    let fft_size = 8192.min(samples.len());
    let mut fft_input: Vec<Complex<f64>> = samples[..fft_size]
        .iter()
        .map(|&s| Complex::new(s, 0.0))
        .collect();

    // Apply Hamming window to reduce spectral leakage
    for (i, sample) in fft_input.iter_mut().enumerate() {
        let window = 0.54 - 0.46 * (2.0 * PI * i as f64 / (fft_size - 1) as f64).cos();
        *sample *= window;
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    fft.process(&mut fft_input);

    let mut max_magnitude = 0.0;
    let mut peak_bin = 0;
    for (i, complex) in fft_input.iter().enumerate().skip(1).take(fft_size / 2) {
        let magnitude = complex.norm();
        if magnitude > max_magnitude {
            max_magnitude = magnitude;
            peak_bin = i;
        }
    }

    (peak_bin as f64 * sample_rate) / fft_size as f64
}

fn sine_patch(transpose: u8, coarse: u8) -> dx7render::Patch {
    let mut ops = [OpSpec::default(); 6];
    for (i, op) in ops.iter_mut().enumerate() {
        op.output_level = if i == 0 { 99 } else { 0 };
        op.coarse = coarse;
    }
    // algorithm 32, every operator a carrier
    decode(&packed_patch(b"SINE TEST", 31, transpose, ops), 0, false).unwrap()
}

#[test]
fn test_midi_pitch_tracks_note_number() {
    let _ = env_logger::try_init();
    let sample_rate = 44100.0;
    let resolution = sample_rate / 8192.0;

    for (note, expected) in [(57u8, 220.0), (69, 440.0), (81, 880.0), (93, 1760.0)] {
        let out = render(
            &sine_patch(24, 1),
            &[NoteEvent::note(note, 100, 200, 0)],
            sample_rate,
            64,
        )
        .unwrap();
        let freq = analyze_frequency(&out, sample_rate);
        assert!(
            (freq - expected).abs() <= resolution,
            "note {}: expected {} Hz, got {} Hz",
            note,
            expected,
            freq
        );
    }
}

#[test]
fn test_ratio_and_transpose_shift_pitch() {
    let sample_rate = 44100.0;
    let resolution = sample_rate / 8192.0;
    let event = [NoteEvent::note(69, 100, 200, 0)];

    let cases = [
        (24u8, 0u8, 220.0), // coarse 0 is half ratio
        (24, 2, 880.0),
        (36, 1, 880.0), // one octave up
        (12, 1, 220.0), // one octave down
    ];
    for (transpose, coarse, expected) in cases {
        let out = render(&sine_patch(transpose, coarse), &event, sample_rate, 64).unwrap();
        let freq = analyze_frequency(&out, sample_rate);
        assert!(
            (freq - expected).abs() <= resolution,
            "transpose {} coarse {}: expected {} Hz, got {} Hz",
            transpose,
            coarse,
            expected,
            freq
        );
    }
}
