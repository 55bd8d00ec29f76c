//! Shared constants for pcmstream chunking.

/// Default output sample rate (24kHz, what realtime voice APIs expect)
pub const DEFAULT_TARGET_SAMPLE_RATE: u32 = 24000;

/// Default chunk duration in milliseconds
pub const DEFAULT_CHUNK_DURATION_MS: f64 = 20.0;

/// Default linear gain (unity)
pub const DEFAULT_GAIN: f32 = 1.0;

/// Frames per host callback for render-quantum style hosts
pub const DEFAULT_BURST_FRAMES: usize = 128;

/// Largest chunk, in frames, at either rate (about 350s at 48kHz)
pub const MAX_CHUNK_FRAMES: usize = 1 << 24;

/// Scale for negative samples (magnitude of `i16::MIN`)
pub const NEGATIVE_SCALE: f64 = 32768.0;

/// Scale for non-negative samples (`i16::MAX`)
pub const POSITIVE_SCALE: f64 = 32767.0;
