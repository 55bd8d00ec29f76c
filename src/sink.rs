//! Chunk destinations: raw little-endian PCM or a mono 16-bit WAV dump.

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use pcmstream_core::OutputChunk;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Where emitted chunks end up.
pub enum ChunkSink {
    /// Flat int16 little-endian samples, no header
    Raw(Box<dyn Write + Send>),
    /// Mono 16-bit WAV at the target rate, for checking a capture by ear
    Wav(WavWriter<BufWriter<File>>),
}

impl ChunkSink {
    /// Picks a sink from the output path: `-` is stdout, `.wav` is a WAV file, anything else raw.
    pub fn open(path: &Path, sample_rate: u32) -> Result<Self> {
        if path.as_os_str() == "-" {
            return Ok(Self::Raw(Box::new(BufWriter::new(io::stdout()))));
        }

        let is_wav = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));

        if is_wav {
            let spec = WavSpec {
                channels: 1,
                sample_rate,
                bits_per_sample: 16,
                sample_format: SampleFormat::Int,
            };
            let writer = WavWriter::create(path, spec)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Ok(Self::Wav(writer))
        } else {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Ok(Self::Raw(Box::new(BufWriter::new(file))))
        }
    }

    pub fn write_chunk(&mut self, chunk: &OutputChunk) -> Result<()> {
        match self {
            Self::Raw(out) => out.write_all(&chunk.to_le_bytes())?,
            Self::Wav(writer) => {
                for &sample in chunk.samples() {
                    writer.write_sample(sample)?;
                }
            }
        }
        Ok(())
    }

    /// Flushes buffered output and patches the WAV header.
    pub fn finish(self) -> Result<()> {
        match self {
            Self::Raw(mut out) => out.flush()?,
            Self::Wav(writer) => writer.finalize()?,
        }
        Ok(())
    }
}

/// Counters for one streaming session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub chunks_written: u64,
    pub chunks_dropped: u64,
    pub samples_written: u64,
}

impl SessionStats {
    pub fn record(&mut self, chunk: &OutputChunk) {
        self.chunks_written += 1;
        self.samples_written += chunk.len() as u64;
    }

    /// Seconds of audio written at `sample_rate`.
    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.samples_written as f64 / f64::from(sample_rate)
    }
}
