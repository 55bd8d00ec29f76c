use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use cpal::traits::{DeviceTrait, HostTrait};
use crossbeam_channel::RecvTimeoutError;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod audio;
mod config;
mod convert;
mod sink;

use config::{AppConfig, Overrides};
use sink::{ChunkSink, SessionStats};

#[derive(Parser)]
#[command(name = "pcmstream")]
#[command(about = "Stream audio as fixed-duration 16-bit PCM chunks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available input devices
    List,
    /// Capture from an input device until Ctrl+C
    Capture {
        #[arg(short, long)]
        input: Option<String>,
        /// Output path: `-` for raw stdout, `*.wav` for a WAV dump, anything else raw PCM
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
        /// Remember the input device and chunk settings for next time
        #[arg(long)]
        save: bool,
        #[command(flatten)]
        chunking: ChunkingArgs,
    },
    /// Replay a WAV file through the chunker
    Convert {
        input: PathBuf,
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
        /// Frames per simulated host callback
        #[arg(long)]
        burst_frames: Option<usize>,
        #[command(flatten)]
        chunking: ChunkingArgs,
    },
    /// Show or reset the saved configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    Reset,
}

#[derive(Args, Clone, Copy)]
struct ChunkingArgs {
    /// Output sample rate in Hz
    #[arg(long)]
    target_rate: Option<u32>,
    /// Chunk duration in milliseconds
    #[arg(long)]
    chunk_ms: Option<f64>,
    /// Linear gain applied before quantization
    #[arg(long)]
    gain: Option<f32>,
}

impl From<ChunkingArgs> for Overrides {
    fn from(args: ChunkingArgs) -> Self {
        Self {
            target_sample_rate: args.target_rate,
            chunk_duration_ms: args.chunk_ms,
            gain: args.gain,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut app = AppConfig::load();

    match cli.command {
        Commands::List => {
            list_devices()?;
        }
        Commands::Capture {
            input,
            output,
            save,
            chunking,
        } => {
            app.apply(chunking.into());
            if let Some(name) = input {
                app.last_input = name;
            }
            if save {
                app.save()?;
            }
            run_capture(&app, &output)?;
        }
        Commands::Convert {
            input,
            output,
            burst_frames,
            chunking,
        } => {
            app.apply(chunking.into());
            if let Some(frames) = burst_frames {
                app.burst_frames = frames;
            }
            convert::convert_file(&input, &output, &app)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                if let Some(path) = config::config_path() {
                    eprintln!("# {}", path.display());
                }
                println!("{}", serde_json::to_string_pretty(&app)?);
            }
            ConfigAction::Reset => {
                AppConfig::default().save()?;
                eprintln!("Configuration reset to defaults.");
            }
        },
    }

    Ok(())
}

fn run_capture(app: &AppConfig, output: &Path) -> Result<()> {
    let device_name = if app.last_input.is_empty() {
        "default"
    } else {
        app.last_input.as_str()
    };

    let mut engine = audio::CaptureEngine::start(device_name, app)?;
    let mut sink = ChunkSink::open(output, app.target_sample_rate)?;
    // stdout may be carrying audio, so status goes to stderr
    eprintln!("Capturing. Press Ctrl+C to stop.");

    // Graceful shutdown handling
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::Relaxed);
    })?;

    let mut stats = SessionStats::default();
    while running.load(Ordering::Relaxed) {
        match engine.chunks.recv_timeout(Duration::from_millis(100)) {
            Ok(chunk) => {
                sink.write_chunk(&chunk)?;
                stats.record(&chunk);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Audio thread stopped unexpectedly");
                break;
            }
        }
    }

    engine.stop();
    for chunk in engine.chunks.try_iter() {
        sink.write_chunk(&chunk)?;
        stats.record(&chunk);
    }
    sink.finish()?;

    stats.chunks_dropped = engine.chunks_dropped.load(Ordering::Relaxed);
    let overrun = engine.samples_overrun.load(Ordering::Relaxed);
    info!(
        "Session: {} chunks, {:.2}s at {} Hz, {} dropped, {} input samples overrun",
        stats.chunks_written,
        stats.duration_secs(engine.chunker_config.target_sample_rate),
        engine.chunker_config.target_sample_rate,
        stats.chunks_dropped,
        overrun
    );
    eprintln!("Stopped after {} chunks.", stats.chunks_written);
    Ok(())
}

fn list_devices() -> Result<()> {
    let host = cpal::default_host();
    println!("Audio Host: {}", host.id().name());
    println!("\nInput Devices:");
    for device in host.input_devices()? {
        let name = device.name().unwrap_or("Unknown".to_string());
        match device.default_input_config() {
            Ok(config) => println!(
                "  - {} ({} Hz, {} ch)",
                name,
                config.sample_rate().0,
                config.channels()
            ),
            Err(_) => println!("  - {}", name),
        }
    }
    Ok(())
}
