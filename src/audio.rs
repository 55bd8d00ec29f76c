use anyhow::{bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use log::{info, warn};
use pcmstream_core::{ChunkerConfig, OutputChunk, StreamChunker};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::AppConfig;

/// Chunks buffered between the audio thread and the writer (~1s at 20ms).
const CHUNK_QUEUE_LEN: usize = 50;

/// Resolves an input device by name, `"default"` meaning the host default.
pub fn find_input_device(host: &cpal::Host, name: &str) -> Result<cpal::Device> {
    if name == "default" || name.is_empty() {
        host.default_input_device()
            .context("No default input found")
    } else {
        host.input_devices()?
            .find(|d| d.name().ok().as_deref() == Some(name))
            .context("Input device not found")
    }
}

/// Live capture session: device callback → ring buffer → chunker thread → chunk channel.
///
/// The device callback only copies channel 0 into a lock-free ring buffer. A dedicated
/// thread drains it in bursts, runs the [`StreamChunker`] and hands each chunk to a
/// bounded channel without blocking; a full channel drops the chunk.
pub struct CaptureEngine {
    _input_stream: cpal::Stream,
    is_running: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
    pub chunker_config: ChunkerConfig,
    pub chunks: Receiver<OutputChunk>,
    pub chunks_dropped: Arc<AtomicU64>,
    pub samples_overrun: Arc<AtomicU64>,
}

impl CaptureEngine {
    /// Starts capturing from `input_device_name` at the device's native rate.
    pub fn start(input_device_name: &str, app: &AppConfig) -> Result<Self> {
        let host = cpal::default_host();
        info!("Audio host: {}", host.id().name());

        let device = find_input_device(&host, input_device_name)?;
        info!("Using input device: {}", device.name().unwrap_or_default());

        let supported = device
            .default_input_config()
            .context("Input device has no default config")?;
        let channels = usize::from(supported.channels());
        let sample_format = supported.sample_format();
        let stream_config: cpal::StreamConfig = supported.into();
        let input_rate = stream_config.sample_rate.0;
        info!(
            "Capture format: {} Hz, {} channel(s), {:?}",
            input_rate, channels, sample_format
        );

        let chunker_config = app.chunker_config(input_rate)?;
        let mut chunker = StreamChunker::new(chunker_config)?;
        let layout = chunker.layout();
        info!(
            "Chunking {} -> {} frames per {} ms",
            layout.input_frames_per_chunk,
            layout.output_frames_per_chunk,
            chunker_config.chunk_duration_ms
        );

        // Latency management (~200ms of mono input, at least four chunks)
        let buffer_size = (input_rate as usize / 5).max(layout.input_frames_per_chunk * 4);
        let rb = HeapRb::<f32>::new(buffer_size);
        let (prod, mut cons) = rb.split();

        let samples_overrun = Arc::new(AtomicU64::new(0));
        let overrun = samples_overrun.clone();
        let (device, cfg) = (&device, &stream_config);
        let input_stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(device, cfg, channels, prod, overrun)?,
            SampleFormat::I16 => build_stream::<i16>(device, cfg, channels, prod, overrun)?,
            SampleFormat::U16 => build_stream::<u16>(device, cfg, channels, prod, overrun)?,
            SampleFormat::I32 => build_stream::<i32>(device, cfg, channels, prod, overrun)?,
            other => bail!("Unsupported input sample format: {:?}", other),
        };

        let (chunk_tx, chunk_rx) = crossbeam_channel::bounded(CHUNK_QUEUE_LEN);
        let chunks_dropped = Arc::new(AtomicU64::new(0));
        let dropped = chunks_dropped.clone();

        let is_running = Arc::new(AtomicBool::new(true));
        let run_flag = is_running.clone();
        let burst_frames = app.burst_frames.max(1);

        let worker = thread::Builder::new()
            .name("pcmstream-audio".into())
            .spawn(move || {
                let mut burst = vec![0.0f32; burst_frames];
                while run_flag.load(Ordering::Relaxed) {
                    if cons.occupied_len() == 0 {
                        thread::sleep(Duration::from_micros(500));
                        continue;
                    }
                    let n = cons.pop_slice(&mut burst);
                    chunker.process_burst_with(&burst[..n], |chunk| {
                        hand_off(&chunk_tx, chunk, &dropped);
                    });
                }
            })
            .context("Failed to spawn audio processing thread")?;

        input_stream.play()?;

        Ok(Self {
            _input_stream: input_stream,
            is_running,
            worker: Some(worker),
            chunker_config,
            chunks: chunk_rx,
            chunks_dropped,
            samples_overrun,
        })
    }

    /// Stops the chunker thread. Chunks already queued stay readable.
    pub fn stop(&mut self) {
        self.is_running.store(false, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Audio processing thread panicked");
            }
        }
    }
}

impl Drop for CaptureEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Non-blocking hand-off; a full queue drops the chunk and counts it.
pub fn hand_off(tx: &Sender<OutputChunk>, chunk: OutputChunk, dropped: &AtomicU64) {
    match tx.try_send(chunk) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
            dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Pushes channel 0 of each interleaved frame as f32. Returns frames that did not fit.
fn push_first_channel<T, P>(prod: &mut P, data: &[T], channels: usize) -> usize
where
    T: SizedSample,
    f32: FromSample<T>,
    P: Producer<Item = f32>,
{
    let channels = channels.max(1);
    let frames = data.len().div_ceil(channels);
    let pushed = prod.push_iter(data.iter().step_by(channels).map(|&s| f32::from_sample(s)));
    frames - pushed
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    mut prod: HeapProd<f32>,
    overrun: Arc<AtomicU64>,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _| {
            let dropped = push_first_channel(&mut prod, data, channels);
            if dropped > 0 {
                overrun.fetch_add(dropped as u64, Ordering::Relaxed);
            }
        },
        |err| warn!("Input error: {}", err),
        None,
    )?;
    Ok(stream)
}
