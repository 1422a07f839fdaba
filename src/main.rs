use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use dx7render::{decode, decode_bank, Dx7Synth, NoteEvent, RenderSettings};
use log::info;

mod wav;

/// Render DX7 bulk-dump patches to WAV files
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all patches in a bank file
    List {
        /// Path to the bank file
        bank_file: PathBuf,

        /// The file starts with the 6-byte sysex header
        #[arg(long)]
        sysex: bool,
    },
    /// Print a decoded patch as JSON
    Inspect {
        /// Path to the bank file
        bank_file: PathBuf,

        /// Patch number (0-indexed)
        patch_number: usize,

        /// The file starts with the 6-byte sysex header
        #[arg(long)]
        sysex: bool,
    },
    /// Render a patch to a WAV file
    Render {
        /// Path to the bank file
        bank_file: PathBuf,

        /// Patch number (0-indexed)
        patch_number: usize,

        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,

        /// The file starts with the 6-byte sysex header
        #[arg(long)]
        sysex: bool,

        /// MIDI note of the single rendered note
        #[arg(long, default_value_t = 69)]
        note: u8,

        /// MIDI velocity of the single rendered note
        #[arg(long, default_value_t = 100)]
        velocity: u8,

        /// Frames with the key held
        #[arg(long, default_value_t = 100)]
        on_frames: usize,

        /// Frames after key release
        #[arg(long, default_value_t = 50)]
        off_frames: usize,

        /// JSON file with a list of note events, replacing the single note
        #[arg(long)]
        sequence: Option<PathBuf>,

        /// Sample rate in Hz
        #[arg(long, default_value_t = 44100)]
        sample_rate: u32,

        /// Audio samples per envelope frame
        #[arg(long, default_value_t = 64)]
        block_factor: usize,

        /// Scale the output so its peak is at most 0.8
        #[arg(long)]
        normalize: bool,
    },
}

fn read_bank(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("error reading bank file '{}'", path.display()))
}

fn read_sequence(path: &Path) -> Result<Vec<NoteEvent>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("error reading sequence file '{}'", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid note sequence in '{}'", path.display()))
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::List { bank_file, sysex } => {
            let bytes = read_bank(&bank_file)?;
            for (i, patch) in decode_bank(&bytes, sysex).iter().enumerate() {
                println!("{}: {}", i, patch.display_name());
            }
        }
        Commands::Inspect {
            bank_file,
            patch_number,
            sysex,
        } => {
            let bytes = read_bank(&bank_file)?;
            let patch = decode(&bytes, patch_number, sysex)?;
            println!("{}", serde_json::to_string_pretty(&patch)?);
        }
        Commands::Render {
            bank_file,
            patch_number,
            output,
            sysex,
            note,
            velocity,
            on_frames,
            off_frames,
            sequence,
            sample_rate,
            block_factor,
            normalize,
        } => {
            if note > 127 || velocity > 127 {
                return Err(anyhow!(
                    "note and velocity must be <= 127 (got {} and {})",
                    note,
                    velocity
                ));
            }

            let bytes = read_bank(&bank_file)?;
            let patch = decode(&bytes, patch_number, sysex)?;

            let events = match sequence {
                Some(path) => read_sequence(&path)?,
                None => vec![NoteEvent::note(note, velocity, on_frames, off_frames)],
            };

            let settings = RenderSettings {
                sample_rate: sample_rate as f64,
                block_factor,
            };
            let synth = Dx7Synth::new(patch, settings)?;
            let samples = synth.render_sequence(&events)?;

            wav::write_wav(&output, &samples, sample_rate, normalize)?;
            info!(
                "wrote {} samples of '{}' to {}",
                samples.len(),
                synth.patch().display_name(),
                output.display()
            );
        }
    }

    Ok(())
}
