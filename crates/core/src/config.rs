//! Chunker configuration and the frame sizes derived from it.

use crate::constants::{
    DEFAULT_CHUNK_DURATION_MS, DEFAULT_GAIN, DEFAULT_TARGET_SAMPLE_RATE, MAX_CHUNK_FRAMES,
};
use crate::error::{ChunkerError, ChunkerResult};
use crate::resample::ResampleMode;

/// Static startup parameters for a [`StreamChunker`](crate::StreamChunker).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkerConfig {
    /// Native rate of the capture host in Hz
    pub input_sample_rate: u32,
    /// Rate of the emitted chunks in Hz
    pub target_sample_rate: u32,
    /// Duration of one emitted chunk
    pub chunk_duration_ms: f64,
    /// Linear gain applied before clamping
    pub gain: f32,
}

impl ChunkerConfig {
    /// Creates a config for the given capture rate with defaults for everything else.
    pub fn new(input_sample_rate: u32) -> Self {
        Self {
            input_sample_rate,
            target_sample_rate: DEFAULT_TARGET_SAMPLE_RATE,
            chunk_duration_ms: DEFAULT_CHUNK_DURATION_MS,
            gain: DEFAULT_GAIN,
        }
    }

    pub fn with_target_sample_rate(mut self, rate: u32) -> Self {
        self.target_sample_rate = rate;
        self
    }

    pub fn with_chunk_duration_ms(mut self, ms: f64) -> Self {
        self.chunk_duration_ms = ms;
        self
    }

    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    /// Checks every field, returning the first offending one.
    pub fn validate(&self) -> ChunkerResult<()> {
        if self.input_sample_rate == 0 {
            return Err(ChunkerError::invalid("input_sample_rate", "must be positive"));
        }
        if self.target_sample_rate == 0 {
            return Err(ChunkerError::invalid("target_sample_rate", "must be positive"));
        }
        // NaN fails both checks
        if !(self.chunk_duration_ms.is_finite() && self.chunk_duration_ms > 0.0) {
            return Err(ChunkerError::invalid(
                "chunk_duration_ms",
                "must be a positive finite number",
            ));
        }
        let fastest = self.input_sample_rate.max(self.target_sample_rate);
        if raw_frames(fastest, self.chunk_duration_ms) > MAX_CHUNK_FRAMES as f64 {
            return Err(ChunkerError::invalid(
                "chunk_duration_ms",
                "yields more frames per chunk than supported",
            ));
        }
        if !(self.gain.is_finite() && self.gain >= 0.0) {
            return Err(ChunkerError::invalid("gain", "must be a non-negative finite number"));
        }
        Ok(())
    }

    /// Derives the per-chunk frame counts. Call [`validate`](Self::validate) first.
    pub fn layout(&self) -> ChunkLayout {
        ChunkLayout {
            input_frames_per_chunk: frames_for(self.input_sample_rate, self.chunk_duration_ms),
            output_frames_per_chunk: frames_for(self.target_sample_rate, self.chunk_duration_ms),
        }
    }
}

/// Frame counts derived once from a [`ChunkerConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    pub input_frames_per_chunk: usize,
    pub output_frames_per_chunk: usize,
}

impl ChunkLayout {
    /// How each input chunk maps onto an output chunk.
    pub fn resample_mode(&self) -> ResampleMode {
        ResampleMode::select(self.input_frames_per_chunk, self.output_frames_per_chunk)
    }
}

fn raw_frames(rate: u32, duration_ms: f64) -> f64 {
    (f64::from(rate) * duration_ms / 1000.0).round()
}

/// `max(1, round(rate * ms / 1000))`
fn frames_for(rate: u32, duration_ms: f64) -> usize {
    // `as` saturates for out-of-range values
    (raw_frames(rate, duration_ms) as usize).max(1)
}
