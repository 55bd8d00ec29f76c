use anyhow::{Context, Result};
use directories::ProjectDirs;
use pcmstream_core::constants::{
    DEFAULT_BURST_FRAMES, DEFAULT_CHUNK_DURATION_MS, DEFAULT_GAIN, DEFAULT_TARGET_SAMPLE_RATE,
};
use pcmstream_core::ChunkerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted streaming preferences. CLI flags override these per run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub last_input: String,
    #[serde(default = "default_target_sample_rate")]
    pub target_sample_rate: u32,
    #[serde(default = "default_chunk_duration_ms")]
    pub chunk_duration_ms: f64,
    #[serde(default = "default_gain")]
    pub gain: f32,
    #[serde(default = "default_burst_frames")]
    pub burst_frames: usize,
}

fn default_target_sample_rate() -> u32 {
    DEFAULT_TARGET_SAMPLE_RATE
}

fn default_chunk_duration_ms() -> f64 {
    DEFAULT_CHUNK_DURATION_MS
}

fn default_gain() -> f32 {
    DEFAULT_GAIN
}

fn default_burst_frames() -> usize {
    DEFAULT_BURST_FRAMES
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            last_input: String::new(),
            target_sample_rate: default_target_sample_rate(),
            chunk_duration_ms: default_chunk_duration_ms(),
            gain: default_gain(),
            burst_frames: default_burst_frames(),
        }
    }
}

/// Per-run overrides coming from the command line.
#[derive(Clone, Copy, Debug, Default)]
pub struct Overrides {
    pub target_sample_rate: Option<u32>,
    pub chunk_duration_ms: Option<f64>,
    pub gain: Option<f32>,
}

impl AppConfig {
    /// Loads configuration from disk, or returns default if not found.
    pub fn load() -> Self {
        config_path()
            .and_then(|path| Self::load_from(&path).ok())
            .unwrap_or_default()
    }

    /// Saves configuration to disk in JSON format.
    pub fn save(&self) -> Result<()> {
        let path = config_path().context("Could not determine config directory")?;
        self.save_to(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Malformed {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(rate) = overrides.target_sample_rate {
            self.target_sample_rate = rate;
        }
        if let Some(ms) = overrides.chunk_duration_ms {
            self.chunk_duration_ms = ms;
        }
        if let Some(gain) = overrides.gain {
            self.gain = gain;
        }
    }

    /// Builds the core chunker config for a device running at `input_sample_rate`.
    pub fn chunker_config(&self, input_sample_rate: u32) -> Result<ChunkerConfig> {
        let config = ChunkerConfig::new(input_sample_rate)
            .with_target_sample_rate(self.target_sample_rate)
            .with_chunk_duration_ms(self.chunk_duration_ms)
            .with_gain(self.gain);
        config.validate()?;
        Ok(config)
    }
}

pub fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "pcmstream", "pcmstream")
        .map(|dirs| dirs.config_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = AppConfig::default();
        assert_eq!(config.target_sample_rate, 24000);
        assert_eq!(config.chunk_duration_ms, 20.0);
        assert_eq!(config.gain, 1.0);
        assert_eq!(config.burst_frames, 128);
        assert!(config.last_input.is_empty());
    }

    #[test]
    fn test_config_deserialization_with_defaults() {
        // Minimal JSON - should fill in defaults
        let json = r#"{"last_input":"Mic","gain":0.5}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.last_input, "Mic");
        assert_eq!(config.gain, 0.5);
        assert_eq!(config.target_sample_rate, 24000); // Default
        assert_eq!(config.chunk_duration_ms, 20.0); // Default
    }

    #[test]
    fn test_config_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let original = AppConfig {
            last_input: "USB Mic".to_string(),
            target_sample_rate: 16000,
            chunk_duration_ms: 40.0,
            gain: 1.25,
            burst_frames: 256,
        };

        original.save_to(&path).unwrap();
        let restored = AppConfig::load_from(&path).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn test_load_from_malformed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply(Overrides {
            target_sample_rate: Some(16000),
            chunk_duration_ms: None,
            gain: Some(2.0),
        });
        assert_eq!(config.target_sample_rate, 16000);
        assert_eq!(config.chunk_duration_ms, 20.0);
        assert_eq!(config.gain, 2.0);
    }

    #[test]
    fn test_chunker_config_validates() {
        let config = AppConfig::default();
        let chunker = config.chunker_config(48000).unwrap();
        assert_eq!(chunker.input_sample_rate, 48000);
        assert_eq!(chunker.target_sample_rate, 24000);

        let bad = AppConfig {
            gain: -1.0,
            ..AppConfig::default()
        };
        assert!(bad.chunker_config(48000).is_err());
        assert!(config.chunker_config(0).is_err());
    }
}
