//! Stream chunker bridging variable-size capture bursts to fixed-duration int16 chunks.
//!
//! Sits in the real-time capture path: each burst is appended to a linear buffer and every
//! complete input chunk is resampled, quantized and emitted before the call returns.

use crate::config::{ChunkLayout, ChunkerConfig};
use crate::error::{ChunkerError, ChunkerResult};
use crate::quantize::quantize_into;
use crate::resample::{resample_into, ResampleMode};
use log::debug;

/// One fixed-length chunk of int16 samples at the target rate.
///
/// Owned by whoever receives it; the chunker keeps no reference after emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk(Vec<i16>);

impl OutputChunk {
    pub fn samples(&self) -> &[i16] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flat little-endian wire layout, no header.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}

/// Accumulates mono float bursts and emits `output_frames_per_chunk`-long int16 chunks.
///
/// Each emitted chunk corresponds to exactly `input_frames_per_chunk` consecutive input
/// samples; nothing is skipped or consumed twice across calls.
#[derive(Debug)]
pub struct StreamChunker {
    config: ChunkerConfig,
    layout: ChunkLayout,
    mode: ResampleMode,
    buffer: Vec<f32>,
    fill: usize,
    // Reused per chunk so only the emitted Vec<i16> is allocated
    scratch: Vec<f32>,
}

impl StreamChunker {
    /// Validates `config` and sizes the buffer for two input chunks.
    pub fn new(config: ChunkerConfig) -> ChunkerResult<Self> {
        config.validate()?;
        let layout = config.layout();
        let mode = layout.resample_mode();
        let capacity = layout
            .input_frames_per_chunk
            .checked_mul(2)
            .ok_or_else(|| ChunkerError::invalid("chunk_duration_ms", "buffer size overflows"))?;
        debug!(
            "Chunker: {} Hz -> {} Hz, {} ms chunks ({} -> {} frames, {:?})",
            config.input_sample_rate,
            config.target_sample_rate,
            config.chunk_duration_ms,
            layout.input_frames_per_chunk,
            layout.output_frames_per_chunk,
            mode
        );

        Ok(Self {
            config,
            layout,
            mode,
            buffer: vec![0.0; capacity],
            fill: 0,
            scratch: vec![0.0; layout.output_frames_per_chunk],
        })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    pub fn layout(&self) -> ChunkLayout {
        self.layout
    }

    /// Samples waiting for the next chunk boundary.
    pub fn buffered(&self) -> usize {
        self.fill
    }

    /// Current accumulation buffer capacity in samples.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Processes one burst and collects every chunk it completes, in emission order.
    pub fn process_burst(&mut self, input: &[f32]) -> Vec<OutputChunk> {
        let mut chunks = Vec::new();
        self.process_burst_with(input, |chunk| chunks.push(chunk));
        chunks
    }

    /// Processes one burst, handing each completed chunk to `emit` as soon as it is ready.
    ///
    /// Returns the number of chunks emitted. An empty burst is a no-op.
    pub fn process_burst_with<F>(&mut self, input: &[f32], mut emit: F) -> usize
    where
        F: FnMut(OutputChunk),
    {
        if input.is_empty() {
            return 0;
        }

        self.append(input);

        let in_frames = self.layout.input_frames_per_chunk;
        let mut emitted = 0;
        while self.fill >= in_frames {
            emit(self.emit_front());
            emitted += 1;

            let remaining = self.fill - in_frames;
            if remaining > 0 {
                self.buffer.copy_within(in_frames..self.fill, 0);
            }
            self.fill = remaining;
        }
        emitted
    }

    /// Like [`process_burst`](Self::process_burst) for interleaved multi-channel frames.
    ///
    /// Only channel 0 is consumed. Zero channels is treated as an empty burst.
    pub fn process_interleaved(
        &mut self,
        interleaved: &[f32],
        channels: usize,
    ) -> Vec<OutputChunk> {
        let mut chunks = Vec::new();
        self.process_interleaved_with(interleaved, channels, |chunk| chunks.push(chunk));
        chunks
    }

    /// Channel 0 of `interleaved` through [`process_burst_with`](Self::process_burst_with).
    pub fn process_interleaved_with<F>(
        &mut self,
        interleaved: &[f32],
        channels: usize,
        mut emit: F,
    ) -> usize
    where
        F: FnMut(OutputChunk),
    {
        match channels {
            0 => return 0,
            1 => return self.process_burst_with(interleaved, emit),
            _ => {}
        }

        let mut mono = [0.0f32; 256];
        // Whole frames only; a trailing partial frame is ignored
        let frames = interleaved.len() / channels;
        let mut frame = 0;
        let mut emitted = 0;
        while frame < frames {
            let n = (frames - frame).min(mono.len());
            for (j, slot) in mono[..n].iter_mut().enumerate() {
                *slot = interleaved[(frame + j) * channels];
            }
            emitted += self.process_burst_with(&mono[..n], &mut emit);
            frame += n;
        }
        emitted
    }

    fn append(&mut self, input: &[f32]) {
        let needed = self.fill + input.len();
        if needed > self.buffer.len() {
            // Rare: only when a burst exceeds the headroom of two chunks
            let new_len = needed * 2;
            debug!(
                "Chunker buffer grow: {} -> {} samples",
                self.buffer.len(),
                new_len
            );
            // Vec::resize keeps the live prefix in place
            self.buffer.resize(new_len, 0.0);
        }
        self.buffer[self.fill..needed].copy_from_slice(input);
        self.fill = needed;
    }

    fn emit_front(&mut self) -> OutputChunk {
        let in_chunk = &self.buffer[..self.layout.input_frames_per_chunk];
        let mut samples = vec![0i16; self.layout.output_frames_per_chunk];

        match self.mode {
            // Quantize straight from the buffer; the output Vec never aliases it
            ResampleMode::Identity => quantize_into(in_chunk, self.config.gain, &mut samples),
            _ => {
                resample_into(in_chunk, &mut self.scratch);
                quantize_into(&self.scratch, self.config.gain, &mut samples);
            }
        }
        OutputChunk(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(input_rate: u32, target_rate: u32, chunk_ms: f64) -> StreamChunker {
        StreamChunker::new(
            ChunkerConfig::new(input_rate)
                .with_target_sample_rate(target_rate)
                .with_chunk_duration_ms(chunk_ms),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(StreamChunker::new(ChunkerConfig::new(0)).is_err());
        assert!(StreamChunker::new(ChunkerConfig::new(48000).with_gain(-1.0)).is_err());
    }

    #[test]
    fn test_initial_capacity_is_two_chunks() {
        let c = chunker(48000, 24000, 20.0);
        assert_eq!(c.capacity(), 960 * 2);
        assert_eq!(c.buffered(), 0);
    }

    #[test]
    fn test_empty_burst_is_noop() {
        let mut c = chunker(48000, 24000, 20.0);
        c.process_burst(&[0.1; 100]);
        for _ in 0..10 {
            assert!(c.process_burst(&[]).is_empty());
        }
        assert_eq!(c.buffered(), 100);
    }

    #[test]
    fn test_partial_chunk_does_not_emit() {
        let mut c = chunker(48000, 24000, 20.0);
        assert!(c.process_burst(&[0.5; 959]).is_empty());
        assert_eq!(c.buffered(), 959);

        let chunks = c.process_burst(&[0.5; 1]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 480);
        assert_eq!(c.buffered(), 0);
    }

    #[test]
    fn test_render_quantum_bursts() {
        // 128-frame bursts at 48kHz: 7.5 bursts per 20ms chunk
        let mut c = chunker(48000, 24000, 20.0);
        let mut total = 0;
        for _ in 0..15 {
            total += c.process_burst(&[0.25; 128]).len();
        }
        assert_eq!(total, 2);
        assert_eq!(c.buffered(), 15 * 128 - 2 * 960);
    }

    #[test]
    fn test_identity_rate_passes_values() {
        let mut c = chunker(24000, 24000, 1.0);
        assert_eq!(c.layout().input_frames_per_chunk, 24);
        let input: Vec<f32> = (0..24).map(|i| i as f32 / 24.0).collect();
        let chunks = c.process_burst(&input);
        assert_eq!(chunks.len(), 1);
        let expected: Vec<i16> = input.iter().map(|&s| (s as f64 * 32767.0) as i16).collect();
        assert_eq!(chunks[0].samples(), expected.as_slice());
    }

    #[test]
    fn test_decimation_chunk() {
        // 4 input frames -> 2 output frames per chunk
        let mut c = chunker(4000, 2000, 1.0);
        assert_eq!(c.layout().input_frames_per_chunk, 4);
        assert_eq!(c.layout().output_frames_per_chunk, 2);
        let chunks = c.process_burst(&[1.0, 1.0, 0.0, 0.0]);
        assert_eq!(chunks[0].samples(), &[32767, 0]);
    }

    #[test]
    fn test_upsampling_chunk() {
        // 3 input frames -> 5 output frames per chunk
        let mut c = chunker(3000, 5000, 1.0);
        let chunks = c.process_burst(&[0.0, 1.0, 0.0]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].samples(), &[0, 16383, 32767, 16383, 0]);
    }

    #[test]
    fn test_gain_applied() {
        let mut c = StreamChunker::new(
            ChunkerConfig::new(1000)
                .with_target_sample_rate(1000)
                .with_chunk_duration_ms(2.0)
                .with_gain(2.0),
        )
        .unwrap();
        let chunks = c.process_burst(&[0.25, -0.75]);
        assert_eq!(chunks[0].samples(), &[16383, -32768]);
    }

    #[test]
    fn test_large_burst_grows_and_keeps_order() {
        let mut c = chunker(1000, 1000, 4.0);
        assert_eq!(c.capacity(), 8);
        c.process_burst(&[0.0, 0.001]);

        let burst: Vec<f32> = (2..40).map(|i| i as f32 * 0.001).collect();
        let chunks = c.process_burst(&burst);
        assert!(c.capacity() >= 40);
        assert_eq!(chunks.len(), 10);
        assert_eq!(c.buffered(), 0);

        let flat: Vec<i16> = chunks.iter().flat_map(|ch| ch.samples().to_vec()).collect();
        let expected: Vec<i16> = (0..40)
            .map(|i| ((i as f32 * 0.001) as f64 * 32767.0) as i16)
            .collect();
        assert_eq!(flat, expected);
    }

    #[test]
    fn test_growth_doubles_requested_size() {
        let mut c = chunker(1000, 1000, 4.0);
        c.process_burst(&[0.0; 3]);
        c.process_burst(&[0.0; 10]);
        // grown to 2 * (3 + 10) before draining
        assert_eq!(c.capacity(), 26);
        assert_eq!(c.buffered(), 1);
    }

    #[test]
    fn test_process_burst_with_counts() {
        let mut c = chunker(48000, 24000, 20.0);
        let mut received = Vec::new();
        let n = c.process_burst_with(&[0.0; 960 * 3 + 10], |chunk| received.push(chunk));
        assert_eq!(n, 3);
        assert_eq!(received.len(), 3);
        assert_eq!(c.buffered(), 10);
    }

    #[test]
    fn test_interleaved_takes_first_channel() {
        let mut c = chunker(1000, 1000, 2.0);
        let chunks = c.process_interleaved(&[1.0, -1.0, 0.5, -1.0], 2);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].samples(), &[32767, 16383]);
        assert!(c.process_interleaved(&[1.0, 1.0], 0).is_empty());
        assert_eq!(c.buffered(), 0);
    }

    #[test]
    fn test_oversized_duration_fails_without_panic() {
        let err = StreamChunker::new(ChunkerConfig::new(48000).with_chunk_duration_ms(1e300))
            .unwrap_err();
        assert!(matches!(
            err,
            ChunkerError::InvalidConfiguration { field: "chunk_duration_ms", .. }
        ));
    }

    #[test]
    fn test_le_bytes_layout() {
        let mut c = chunker(1000, 1000, 2.0);
        let chunks = c.process_burst(&[1.0, -1.0]);
        assert_eq!(chunks[0].to_le_bytes(), vec![0xff, 0x7f, 0x00, 0x80]);
    }
}
