use std::sync::Arc;

use crate::engine::AudioEngineKind;
use crate::error::{InitStage, ListenerError};
use crate::runtime::PhononRuntime;

use super::{check, ListenerPose, ListenerRequest, SpatialBackend};

/// Backend for the FMOD Studio plugin. FMOD owns the pipeline and tracks
/// the listener transform through its own 3D attributes.
pub struct FmodBackend {
    runtime: Arc<dyn PhononRuntime>,
}

impl FmodBackend {
    pub fn new(runtime: Arc<dyn PhononRuntime>) -> Self {
        Self { runtime }
    }
}

impl SpatialBackend for FmodBackend {
    fn kind(&self) -> AudioEngineKind {
        AudioEngineKind::FmodStudio
    }

    fn create_listener(&self, request: &ListenerRequest<'_>) -> Result<(), ListenerError> {
        check(
            InitStage::Listener,
            self.runtime
                .fmod_initialize(request.hrtf_path, &request.settings),
        )
    }

    fn update_listener(&self, _pose: &ListenerPose) {
        self.runtime.fmod_update_listener();
    }
}
