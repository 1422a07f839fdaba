//! Error types for patch decoding and rendering

/// Errors produced while decoding packed patch data.
///
/// Out-of-range field values are never reported here: they clamp silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The byte source does not hold a full record at the requested index.
    Truncated {
        /// Requested patch index
        index: usize,
        /// Number of bytes needed to cover the record
        required: usize,
        /// Number of bytes available
        available: usize,
    },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Truncated {
                index,
                required,
                available,
            } => write!(
                f,
                "patch {} needs {} bytes but only {} are available",
                index, required, available
            ),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Errors produced while validating a render request.
///
/// All of these are raised before the sample loop starts.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Algorithm id outside 0-31
    InvalidAlgorithm(u8),
    /// Sample rate is not a positive finite number
    InvalidSampleRate(f64),
    /// Block factor must be at least 1
    InvalidBlockFactor,
    /// A note event uses a pitch that cannot be played
    ReservedPitch {
        /// Position of the offending event in the sequence
        event: usize,
        /// The rejected MIDI note
        pitch: u8,
    },
    /// The timeline length in frames does not fit a `usize`
    TimelineTooLong {
        /// Position of the event at which the length overflowed
        event: usize,
    },
    /// Frames times block factor does not fit a `usize`
    SampleCountOverflow {
        /// Number of frames
        frames: usize,
        /// Audio samples per frame
        block_factor: usize,
    },
    /// Pitch, gain and output buffers disagree in length
    ContourLength {
        /// Number of pitch samples
        pitch: usize,
        /// Number of gain frames
        gains: usize,
        /// Number of output samples
        output: usize,
    },
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::InvalidAlgorithm(id) => {
                write!(f, "algorithm {} is out of range (expected 0-31)", id)
            }
            RenderError::InvalidSampleRate(rate) => {
                write!(f, "sample rate {} must be positive", rate)
            }
            RenderError::InvalidBlockFactor => write!(f, "block factor must be at least 1"),
            RenderError::ReservedPitch { event, pitch } => write!(
                f,
                "note event {} uses pitch {}, which is not playable (valid: 1-127)",
                event, pitch
            ),
            RenderError::TimelineTooLong { event } => write!(
                f,
                "timeline length overflows at event {}",
                event
            ),
            RenderError::SampleCountOverflow {
                frames,
                block_factor,
            } => write!(
                f,
                "{} frames at {} samples per frame overflow the sample count",
                frames, block_factor
            ),
            RenderError::ContourLength {
                pitch,
                gains,
                output,
            } => write!(
                f,
                "contour lengths differ: pitch {}, gains {}, output {}",
                pitch, gains, output
            ),
        }
    }
}

impl std::error::Error for RenderError {}
