//! Backend abstractions for the listener binding.
//!
//! Each supported audio engine integrates the spatializer differently: the
//! primary engine drives a standalone pipeline and owns source teardown,
//! the others hand listener creation to their own plugin and read the pose
//! themselves. The variant is chosen once per activation by
//! [`create_backend`].

use std::path::Path;
use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::engine::output::OutputConfig;
use crate::engine::AudioEngineKind;
use crate::error::{InitStage, ListenerError};
use crate::runtime::{ListenerSettings, NativeSourceHandle, PhononRuntime, PhononStatus};

mod fmod;
mod unity;
mod unity5;
mod wwise;

pub use fmod::FmodBackend;
pub use unity::UnityBackend;
pub use unity5::Unity5Backend;
pub use wwise::WwiseBackend;

/// Listener transform forwarded every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ListenerPose {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
}

impl ListenerPose {
    pub fn new(position: Vec3, forward: Vec3, up: Vec3) -> Self {
        Self {
            position,
            forward,
            up,
        }
    }

    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

impl Default for ListenerPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::Z,
            up: Vec3::Y,
        }
    }
}

/// Everything a backend needs to create the listener.
#[derive(Debug, Clone, Copy)]
pub struct ListenerRequest<'a> {
    pub hrtf_path: &'a Path,
    pub settings: ListenerSettings,
    pub output: OutputConfig,
}

/// Trait implemented by engine-specific listener backends.
///
/// Default methods describe engines that manage their own pipeline and
/// teardown; only the primary engine overrides all of them.
pub trait SpatialBackend: Send + Sync {
    fn kind(&self) -> AudioEngineKind;

    /// Prepare the engine-side pipeline before the listener exists.
    fn initialize(&self, output: &OutputConfig) -> Result<(), ListenerError> {
        let _ = output;
        Ok(())
    }

    fn create_listener(&self, request: &ListenerRequest<'_>) -> Result<(), ListenerError>;

    /// Per-frame update. Backends that read the pose internally ignore it.
    fn update_listener(&self, pose: &ListenerPose);

    fn destroy_listener(&self) {}

    /// Whether listener teardown must disable and release every source.
    fn owns_source_teardown(&self) -> bool {
        false
    }

    fn destroy_source(&self, handle: NativeSourceHandle) {
        let _ = handle;
    }
}

/// Select the backend variant for `kind`.
pub fn create_backend(
    kind: AudioEngineKind,
    runtime: Arc<dyn PhononRuntime>,
) -> Box<dyn SpatialBackend> {
    match kind {
        AudioEngineKind::Unity => Box::new(UnityBackend::new(runtime)),
        AudioEngineKind::Unity5 => Box::new(Unity5Backend::new(runtime)),
        AudioEngineKind::FmodStudio => Box::new(FmodBackend::new(runtime)),
        AudioEngineKind::Wwise => Box::new(WwiseBackend::new(runtime)),
    }
}

fn check(stage: InitStage, status: PhononStatus) -> Result<(), ListenerError> {
    status
        .into_result()
        .map_err(|status| ListenerError::InitializationFailed { stage, status })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{RuntimeCall, SimulatedRuntime, SpeakerLayout};

    fn request(path: &Path) -> ListenerRequest<'_> {
        ListenerRequest {
            hrtf_path: path,
            settings: ListenerSettings {
                max_sources: 16,
                max_distance: 80.0,
                min_attenuation: 0.02,
            },
            output: OutputConfig {
                sample_rate: 48_000,
                frame_size: 512,
                layout: SpeakerLayout::Stereo,
            },
        }
    }

    #[test]
    fn factory_matches_kind() {
        let runtime = Arc::new(SimulatedRuntime::new());
        for kind in AudioEngineKind::ALL {
            let backend = create_backend(kind, runtime.clone());
            assert_eq!(backend.kind(), kind);
            assert_eq!(backend.owns_source_teardown(), kind.is_primary());
        }
    }

    #[test]
    fn only_primary_initializes_pipeline() {
        for kind in AudioEngineKind::ALL {
            let runtime = Arc::new(SimulatedRuntime::new());
            let backend = create_backend(kind, runtime.clone());
            backend.initialize(&request(Path::new("h")).output).unwrap();
            let expected = usize::from(kind.is_primary());
            assert_eq!(runtime.call_count(), expected, "{kind}");
        }
    }

    #[test]
    fn each_kind_issues_its_own_create_call() {
        let path = Path::new("cipic_124.hrtf");
        for kind in AudioEngineKind::ALL {
            let runtime = Arc::new(SimulatedRuntime::new());
            create_backend(kind, runtime.clone())
                .create_listener(&request(path))
                .unwrap();
            let calls = runtime.calls();
            assert_eq!(calls.len(), 1);
            let matched = match kind {
                AudioEngineKind::Unity => matches!(calls[0], RuntimeCall::CreateListener { .. }),
                AudioEngineKind::Unity5 => {
                    matches!(calls[0], RuntimeCall::Unity5Initialize { frame_size: 512, .. })
                }
                AudioEngineKind::FmodStudio => {
                    matches!(calls[0], RuntimeCall::FmodInitialize { .. })
                }
                AudioEngineKind::Wwise => {
                    matches!(calls[0], RuntimeCall::WwiseCreateListener { .. })
                }
            };
            assert!(matched, "{kind}: {:?}", calls[0]);
        }
    }

    #[test]
    fn default_pose_faces_forward() {
        let pose = ListenerPose::at(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(pose.forward, Vec3::Z);
        assert_eq!(pose.up, Vec3::Y);
    }
}
