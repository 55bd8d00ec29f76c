//! Offline driver: replays a WAV file through the chunker in host-sized bursts.

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader};
use log::{debug, info};
use pcmstream_core::StreamChunker;
use std::path::Path;

use crate::config::AppConfig;
use crate::sink::{ChunkSink, SessionStats};

/// Interleaved float samples decoded from a WAV file.
pub struct DecodedWav {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: usize,
}

/// Decodes any PCM WAV into interleaved f32 in [-1, 1].
pub fn read_wav(path: &Path) -> Result<DecodedWav> {
    let mut reader =
        WavReader::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let spec = reader.spec();
    debug!(
        "{}: {} Hz, {} ch, {} bit {:?}",
        path.display(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        spec.sample_format
    );

    let samples = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                bail!("Unsupported bit depth: {}", spec.bits_per_sample);
            }
            let full_scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok(DecodedWav {
        samples,
        sample_rate: spec.sample_rate,
        channels: usize::from(spec.channels),
    })
}

/// Outcome of one file conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertReport {
    pub stats: SessionStats,
    /// Input samples left short of a full chunk at end of file
    pub leftover_samples: usize,
}

/// Feeds `wav` to a fresh chunker `burst_frames` frames at a time, writing every chunk to `sink`.
pub fn stream_wav(
    wav: &DecodedWav,
    app: &AppConfig,
    sink: &mut ChunkSink,
) -> Result<ConvertReport> {
    let config = app.chunker_config(wav.sample_rate)?;
    let mut chunker = StreamChunker::new(config)?;
    let burst_len = app.burst_frames.max(1) * wav.channels.max(1);

    let mut stats = SessionStats::default();
    let mut write_error: Option<anyhow::Error> = None;
    for burst in wav.samples.chunks(burst_len) {
        chunker.process_interleaved_with(burst, wav.channels, |chunk| {
            if write_error.is_some() {
                return;
            }
            match sink.write_chunk(&chunk) {
                Ok(()) => stats.record(&chunk),
                Err(e) => write_error = Some(e),
            }
        });
        if let Some(e) = write_error.take() {
            return Err(e.context("Failed to write chunk"));
        }
    }

    Ok(ConvertReport {
        stats,
        leftover_samples: chunker.buffered(),
    })
}

/// Converts `input` into `output` and logs a summary.
pub fn convert_file(input: &Path, output: &Path, app: &AppConfig) -> Result<ConvertReport> {
    let wav = read_wav(input)?;
    let mut sink = ChunkSink::open(output, app.target_sample_rate)?;
    let report = stream_wav(&wav, app, &mut sink)?;
    sink.finish()?;

    info!(
        "Wrote {} chunks ({:.2}s at {} Hz) to {}",
        report.stats.chunks_written,
        report.stats.duration_secs(app.target_sample_rate),
        app.target_sample_rate,
        output.display()
    );
    if report.leftover_samples > 0 {
        info!(
            "{} trailing input samples did not fill a chunk and were not emitted",
            report.leftover_samples
        );
    }
    Ok(report)
}
