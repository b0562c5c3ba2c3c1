//! Opaque boundary to the native Phonon SDK.
//!
//! [`PhononRuntime`] mirrors the SDK entry points one-to-one; the backend
//! variants in `engine::backend` decide which of them to call. The default
//! build ships [`SimulatedRuntime`], which records every call. Enabling the
//! `native` feature adds [`NativeRuntime`], linking the real library.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

#[cfg(feature = "native")]
mod ffi;
mod simulated;

#[cfg(feature = "native")]
pub use ffi::NativeRuntime;
pub use simulated::{FailPoint, RuntimeCall, SimulatedRuntime};

/// Floor applied by the SDK to distance attenuation.
pub const MIN_ATTENUATION: f32 = 0.02;

/// Status code returned by SDK entry points.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhononStatus {
    Success = 0,
    Failure = 1,
    OutOfMemory = 2,
    Initialization = 3,
}

impl PhononStatus {
    /// Map a raw SDK return value. Unknown values count as failures.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => PhononStatus::Success,
            2 => PhononStatus::OutOfMemory,
            3 => PhononStatus::Initialization,
            _ => PhononStatus::Failure,
        }
    }

    pub fn is_success(self) -> bool {
        self == PhononStatus::Success
    }

    /// `Ok(())` on success, the failing status otherwise.
    pub fn into_result(self) -> Result<(), PhononStatus> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Output channel layout handed to the audio pipeline.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerLayout {
    Mono = 0,
    Stereo = 1,
}

/// Listener settings passed verbatim to listener creation.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ListenerSettings {
    pub max_sources: i32,
    pub max_distance: f32,
    pub min_attenuation: f32,
}

/// Opaque per-source handle owned by the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativeSourceHandle(pub usize);

/// Native SDK entry points.
///
/// Implementations must be callable from any thread; the listener context
/// serializes lifecycle calls itself.
pub trait PhononRuntime: Send + Sync {
    fn initialize_audio_pipeline(
        &self,
        sample_rate: u32,
        frame_size: u32,
        layout: SpeakerLayout,
    ) -> PhononStatus;
    fn create_listener(&self, hrtf_path: &Path, settings: &ListenerSettings) -> PhononStatus;
    fn update_listener(&self, position: Vec3, forward: Vec3, up: Vec3);
    fn destroy_listener(&self);

    fn unity5_initialize(
        &self,
        sample_rate: u32,
        frame_size: u32,
        hrtf_path: &Path,
        settings: &ListenerSettings,
    ) -> PhononStatus;
    fn unity5_update_listener(&self);

    fn fmod_initialize(&self, hrtf_path: &Path, settings: &ListenerSettings) -> PhononStatus;
    fn fmod_update_listener(&self);

    fn wwise_create_listener(&self, hrtf_path: &Path, settings: &ListenerSettings)
        -> PhononStatus;

    fn create_source(&self) -> Result<NativeSourceHandle, PhononStatus>;
    fn destroy_source(&self, source: NativeSourceHandle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_from_raw_treats_unknown_as_failure() {
        assert_eq!(PhononStatus::from_raw(0), PhononStatus::Success);
        assert_eq!(PhononStatus::from_raw(2), PhononStatus::OutOfMemory);
        assert_eq!(PhononStatus::from_raw(-7), PhononStatus::Failure);
    }

    #[test]
    fn status_into_result() {
        assert!(PhononStatus::Success.into_result().is_ok());
        assert_eq!(
            PhononStatus::Initialization.into_result(),
            Err(PhononStatus::Initialization)
        );
    }
}
