use std::sync::Arc;

use crate::engine::AudioEngineKind;
use crate::error::{InitStage, ListenerError};
use crate::runtime::PhononRuntime;

use super::{check, ListenerPose, ListenerRequest, SpatialBackend};

/// Backend for the built-in engine's native spatializer plugin.
///
/// Pipeline setup and listener creation are a single plugin call, and the
/// plugin reads the listener transform itself on update.
pub struct Unity5Backend {
    runtime: Arc<dyn PhononRuntime>,
}

impl Unity5Backend {
    pub fn new(runtime: Arc<dyn PhononRuntime>) -> Self {
        Self { runtime }
    }
}

impl SpatialBackend for Unity5Backend {
    fn kind(&self) -> AudioEngineKind {
        AudioEngineKind::Unity5
    }

    fn create_listener(&self, request: &ListenerRequest<'_>) -> Result<(), ListenerError> {
        check(
            InitStage::Listener,
            self.runtime.unity5_initialize(
                request.output.sample_rate,
                request.output.frame_size,
                request.hrtf_path,
                &request.settings,
            ),
        )
    }

    fn update_listener(&self, _pose: &ListenerPose) {
        self.runtime.unity5_update_listener();
    }
}
