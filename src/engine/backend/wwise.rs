use std::sync::Arc;

use crate::engine::AudioEngineKind;
use crate::error::{InitStage, ListenerError};
use crate::runtime::PhononRuntime;

use super::{check, ListenerPose, ListenerRequest, SpatialBackend};

/// Backend for the Wwise plugin.
///
/// Wwise positions its listener from game objects registered on the Wwise
/// side, so no per-frame call is made from here.
pub struct WwiseBackend {
    runtime: Arc<dyn PhononRuntime>,
}

impl WwiseBackend {
    pub fn new(runtime: Arc<dyn PhononRuntime>) -> Self {
        Self { runtime }
    }
}

impl SpatialBackend for WwiseBackend {
    fn kind(&self) -> AudioEngineKind {
        AudioEngineKind::Wwise
    }

    fn create_listener(&self, request: &ListenerRequest<'_>) -> Result<(), ListenerError> {
        check(
            InitStage::Listener,
            self.runtime
                .wwise_create_listener(request.hrtf_path, &request.settings),
        )
    }

    fn update_listener(&self, _pose: &ListenerPose) {}
}
