use std::sync::Arc;

use crate::engine::output::OutputConfig;
use crate::engine::AudioEngineKind;
use crate::error::{InitStage, ListenerError};
use crate::runtime::{NativeSourceHandle, PhononRuntime};

use super::{check, ListenerPose, ListenerRequest, SpatialBackend};

/// Primary engine backend driving the standalone SDK audio pipeline.
///
/// This is the only variant that forwards the host transform and that
/// destroys sources and the listener explicitly on teardown.
pub struct UnityBackend {
    runtime: Arc<dyn PhononRuntime>,
}

impl UnityBackend {
    pub fn new(runtime: Arc<dyn PhononRuntime>) -> Self {
        Self { runtime }
    }
}

impl SpatialBackend for UnityBackend {
    fn kind(&self) -> AudioEngineKind {
        AudioEngineKind::Unity
    }

    fn initialize(&self, output: &OutputConfig) -> Result<(), ListenerError> {
        check(
            InitStage::Pipeline,
            self.runtime.initialize_audio_pipeline(
                output.sample_rate,
                output.frame_size,
                output.layout,
            ),
        )
    }

    fn create_listener(&self, request: &ListenerRequest<'_>) -> Result<(), ListenerError> {
        check(
            InitStage::Listener,
            self.runtime
                .create_listener(request.hrtf_path, &request.settings),
        )
    }

    fn update_listener(&self, pose: &ListenerPose) {
        self.runtime
            .update_listener(pose.position, pose.forward, pose.up);
    }

    fn destroy_listener(&self) {
        self.runtime.destroy_listener();
    }

    fn owns_source_teardown(&self) -> bool {
        true
    }

    fn destroy_source(&self, handle: NativeSourceHandle) {
        self.runtime.destroy_source(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{FailPoint, PhononStatus, RuntimeCall, SimulatedRuntime, SpeakerLayout};
    use glam::Vec3;

    #[test]
    fn pipeline_failure_maps_to_pipeline_stage() {
        let runtime = Arc::new(SimulatedRuntime::new());
        runtime.fail_at(FailPoint::Pipeline, PhononStatus::Initialization);
        let backend = UnityBackend::new(runtime);

        let err = backend
            .initialize(&OutputConfig {
                sample_rate: 48_000,
                frame_size: 256,
                layout: SpeakerLayout::Stereo,
            })
            .unwrap_err();
        assert_eq!(
            err,
            ListenerError::InitializationFailed {
                stage: InitStage::Pipeline,
                status: PhononStatus::Initialization,
            }
        );
    }

    #[test]
    fn forwards_full_pose() {
        let runtime = Arc::new(SimulatedRuntime::new());
        let backend = UnityBackend::new(runtime.clone());
        let pose = ListenerPose::new(Vec3::new(1.0, 0.0, 2.0), Vec3::X, Vec3::Y);

        backend.update_listener(&pose);

        assert_eq!(
            runtime.calls(),
            vec![RuntimeCall::UpdateListener {
                position: Vec3::new(1.0, 0.0, 2.0),
                forward: Vec3::X,
                up: Vec3::Y,
            }]
        );
    }
}
