//! Engine module housing the backend selection layer.
//!
//! This module exposes the audio engine selector, the per-engine
//! `SpatialBackend` variants (`backend`) and output frame negotiation
//! (`output`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ListenerConfig;

pub mod backend;
pub mod output;

pub use backend::{create_backend, ListenerPose, ListenerRequest, SpatialBackend};
pub use output::{
    negotiate_frame_size, platform_probe, DeviceOutput, FixedOutputProbe, OutputConfig,
    OutputProbe,
};
#[cfg(not(target_os = "android"))]
pub use output::CpalOutputProbe;

/// Downstream audio engine hosting the spatializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioEngineKind {
    /// Built-in engine driven through the standalone audio pipeline
    Unity,
    /// Built-in engine using the native spatializer plugin interface
    Unity5,
    FmodStudio,
    Wwise,
}

impl AudioEngineKind {
    pub const ALL: [AudioEngineKind; 4] = [
        AudioEngineKind::Unity,
        AudioEngineKind::Unity5,
        AudioEngineKind::FmodStudio,
        AudioEngineKind::Wwise,
    ];

    /// The primary engine owns the audio pipeline and source teardown.
    pub fn is_primary(self) -> bool {
        self == AudioEngineKind::Unity
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AudioEngineKind::Unity => "unity",
            AudioEngineKind::Unity5 => "unity5",
            AudioEngineKind::FmodStudio => "fmod_studio",
            AudioEngineKind::Wwise => "wwise",
        }
    }
}

impl fmt::Display for AudioEngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioEngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unity" => Ok(AudioEngineKind::Unity),
            "unity5" => Ok(AudioEngineKind::Unity5),
            "fmod" | "fmod_studio" | "fmod-studio" => Ok(AudioEngineKind::FmodStudio),
            "wwise" => Ok(AudioEngineKind::Wwise),
            other => Err(format!("unknown audio engine '{}'", other)),
        }
    }
}

/// Reports which downstream engine is active.
pub trait AudioEngineSelector {
    fn audio_engine(&self) -> AudioEngineKind;
}

impl AudioEngineSelector for AudioEngineKind {
    fn audio_engine(&self) -> AudioEngineKind {
        *self
    }
}

impl AudioEngineSelector for ListenerConfig {
    fn audio_engine(&self) -> AudioEngineKind {
        self.audio_engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unity_is_primary() {
        let primaries: Vec<_> = AudioEngineKind::ALL
            .iter()
            .filter(|kind| kind.is_primary())
            .collect();
        assert_eq!(primaries, vec![&AudioEngineKind::Unity]);
    }

    #[test]
    fn parses_display_names() {
        for kind in AudioEngineKind::ALL {
            assert_eq!(kind.to_string().parse::<AudioEngineKind>(), Ok(kind));
        }
        assert_eq!("FMOD".parse(), Ok(AudioEngineKind::FmodStudio));
        assert!("openal".parse::<AudioEngineKind>().is_err());
    }

    #[test]
    fn config_selects_engine() {
        let config = ListenerConfig {
            audio_engine: AudioEngineKind::Unity5,
            ..ListenerConfig::default()
        };
        assert_eq!(config.audio_engine(), AudioEngineKind::Unity5);
    }
}
