//! Output configuration probing and frame size negotiation.
//!
//! The SDK pipeline must run at the host's output sample rate and with the
//! same frame size as the host mixer, so both are read from the output
//! device before the listener is created.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::OutputConfigSection;
use crate::error::ListenerError;
use crate::runtime::SpeakerLayout;

/// What an output device reports about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceOutput {
    pub sample_rate: u32,
    /// Supported buffer sizes in frames, when the device reports them
    pub buffer_range: Option<(u32, u32)>,
}

/// Negotiated pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub sample_rate: u32,
    pub frame_size: u32,
    pub layout: SpeakerLayout,
}

impl OutputConfig {
    /// Combine a device report with the preferred frame size.
    pub fn negotiate(device: DeviceOutput, preferred_frame_size: u32) -> Self {
        Self {
            sample_rate: device.sample_rate,
            frame_size: negotiate_frame_size(preferred_frame_size, device.buffer_range),
            layout: SpeakerLayout::Stereo,
        }
    }
}

/// Clamp the preferred frame size into the supported range.
///
/// A zero preference or an inverted range never yields a zero frame size.
pub fn negotiate_frame_size(preferred: u32, range: Option<(u32, u32)>) -> u32 {
    let preferred = preferred.max(1);
    match range {
        Some((min, max)) if min <= max => preferred.clamp(min.max(1), max.max(1)),
        _ => preferred,
    }
}

/// Source of the platform's output configuration.
pub trait OutputProbe: Send + Sync {
    fn probe(&self) -> Result<DeviceOutput, ListenerError>;
}

/// Probe returning a fixed device description.
#[derive(Debug, Clone, Copy)]
pub struct FixedOutputProbe {
    device: DeviceOutput,
}

impl FixedOutputProbe {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            device: DeviceOutput {
                sample_rate,
                buffer_range: None,
            },
        }
    }

    pub fn with_buffer_range(mut self, min: u32, max: u32) -> Self {
        self.device.buffer_range = Some((min, max));
        self
    }
}

impl OutputProbe for FixedOutputProbe {
    fn probe(&self) -> Result<DeviceOutput, ListenerError> {
        Ok(self.device)
    }
}

/// Probe reading the default output device through CPAL.
#[cfg(not(target_os = "android"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct CpalOutputProbe {
    fallback_sample_rate: Option<u32>,
}

#[cfg(not(target_os = "android"))]
impl CpalOutputProbe {
    /// Fail activation when no device can be queried.
    pub fn strict() -> Self {
        Self {
            fallback_sample_rate: None,
        }
    }

    /// Fall back to `sample_rate` when no device can be queried.
    pub fn with_fallback(sample_rate: u32) -> Self {
        Self {
            fallback_sample_rate: Some(sample_rate),
        }
    }

    fn query_device() -> Result<DeviceOutput, ListenerError> {
        use cpal::traits::{DeviceTrait, HostTrait};

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| ListenerError::OutputUnavailable {
                reason: "no default output device".to_string(),
            })?;
        let config = device
            .default_output_config()
            .map_err(|err| ListenerError::OutputUnavailable {
                reason: err.to_string(),
            })?;

        let buffer_range = match config.buffer_size() {
            cpal::SupportedBufferSize::Range { min, max } => Some((*min, *max)),
            cpal::SupportedBufferSize::Unknown => None,
        };

        Ok(DeviceOutput {
            sample_rate: config.sample_rate().0,
            buffer_range,
        })
    }
}

#[cfg(not(target_os = "android"))]
impl OutputProbe for CpalOutputProbe {
    fn probe(&self) -> Result<DeviceOutput, ListenerError> {
        use crate::error::ErrorCode;

        match (Self::query_device(), self.fallback_sample_rate) {
            (Ok(device), _) => Ok(device),
            (Err(err), Some(sample_rate)) => {
                log::warn!(
                    "[Output] {}. Falling back to {} Hz.",
                    err.message(),
                    sample_rate
                );
                Ok(DeviceOutput {
                    sample_rate,
                    buffer_range: None,
                })
            }
            (Err(err), None) => Err(err),
        }
    }
}

/// Probe appropriate for the current platform.
pub fn platform_probe(section: &OutputConfigSection) -> Arc<dyn OutputProbe> {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "android")] {
            Arc::new(FixedOutputProbe::new(section.fallback_sample_rate))
        } else {
            Arc::new(CpalOutputProbe::with_fallback(section.fallback_sample_rate))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_size_clamps_into_range() {
        assert_eq!(negotiate_frame_size(1024, Some((64, 512))), 512);
        assert_eq!(negotiate_frame_size(32, Some((64, 512))), 64);
        assert_eq!(negotiate_frame_size(256, Some((64, 512))), 256);
    }

    #[test]
    fn frame_size_without_range_keeps_preference() {
        assert_eq!(negotiate_frame_size(1024, None), 1024);
    }

    #[test]
    fn frame_size_never_zero() {
        assert_eq!(negotiate_frame_size(0, None), 1);
        assert_eq!(negotiate_frame_size(0, Some((0, 0))), 1);
        assert_eq!(negotiate_frame_size(128, Some((512, 64))), 128);
    }

    #[test]
    fn fixed_probe_negotiates_stereo() {
        let probe = FixedOutputProbe::new(44_100).with_buffer_range(256, 2048);
        let config = OutputConfig::negotiate(probe.probe().unwrap(), 4096);
        assert_eq!(
            config,
            OutputConfig {
                sample_rate: 44_100,
                frame_size: 2048,
                layout: SpeakerLayout::Stereo,
            }
        );
    }
}
