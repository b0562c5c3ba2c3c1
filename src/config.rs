//! Configuration management for the listener and mixer bindings
//!
//! This module provides runtime configuration loading from JSON files so
//! listener limits, asset locations and attenuation constants can be tuned
//! without recompilation. Missing or malformed files fall back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::AudioEngineKind;

/// Default HRTF data set shipped with the SDK.
pub const DEFAULT_HRTF_FILE: &str = "cipic_124.hrtf";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub listener: ListenerConfig,
    #[serde(default)]
    pub output: OutputConfigSection,
    #[serde(default)]
    pub mixer: MixerConfig,
}

/// Listener activation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Maximum concurrently rendered sources (1-64)
    pub max_sources: u32,
    /// Distance beyond which sources are inaudible (0-500)
    pub max_distance: f32,
    /// HRTF file name inside the streaming assets directory
    pub hrtf_file_name: String,
    /// Downstream audio engine the listener binds to
    pub audio_engine: AudioEngineKind,
    /// Packaged, read-only asset directory
    pub streaming_assets_dir: PathBuf,
    /// Writable cache used when assets must be copied before use
    pub cache_dir: Option<PathBuf>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            max_sources: 32,
            max_distance: 100.0,
            hrtf_file_name: DEFAULT_HRTF_FILE.to_string(),
            audio_engine: AudioEngineKind::Unity,
            streaming_assets_dir: PathBuf::from("assets/StreamingAssets"),
            cache_dir: None,
        }
    }
}

/// Output negotiation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfigSection {
    /// Frame size requested from the device, clamped to what it supports
    pub preferred_frame_size: u32,
    /// Sample rate used when no device can be queried
    pub fallback_sample_rate: u32,
}

impl Default for OutputConfigSection {
    fn default() -> Self {
        Self {
            preferred_frame_size: 1024,
            fallback_sample_rate: 48_000,
        }
    }
}

/// Mixer attenuation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Numerator of the inverse-distance curve
    pub scale: f32,
    /// Distances below this are clamped to it
    pub min_distance: f32,
    /// Exposed mixer parameter receiving the attenuation
    pub parameter: String,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            scale: 20.0,
            min_distance: 0.001,
            parameter: "volume".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or defaults if the file doesn't exist or
    /// the JSON is invalid.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load the bundled configuration
    pub fn load() -> Self {
        Self::load_from_file("assets/phonon_config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.listener.max_sources, 32);
        assert_eq!(config.listener.max_distance, 100.0);
        assert_eq!(config.listener.hrtf_file_name, "cipic_124.hrtf");
        assert_eq!(config.listener.audio_engine, AudioEngineKind::Unity);
        assert_eq!(config.mixer.scale, 20.0);
        assert_eq!(config.mixer.parameter, "volume");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{ "listener": { "max_sources": 4, "audio_engine": "wwise" } }"#)
                .unwrap();
        assert_eq!(parsed.listener.max_sources, 4);
        assert_eq!(parsed.listener.audio_engine, AudioEngineKind::Wwise);
        assert_eq!(parsed.listener.max_distance, 100.0);
        assert_eq!(parsed.output.preferred_frame_size, 1024);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load_from_file("does/not/exist.json");
        assert_eq!(config.listener.max_sources, 32);
    }

    #[test]
    fn test_bundled_config_parses() {
        let text = include_str!("../assets/phonon_config.json");
        let parsed: AppConfig = serde_json::from_str(text).unwrap();
        assert_eq!(parsed.listener.hrtf_file_name, DEFAULT_HRTF_FILE);
    }
}
