//! Scene-scoped driver tying the listener binding and the attenuation
//! updater to a frame loop.
//!
//! Starting a session activates the listener; dropping it tears the listener
//! down. Activation failures do not abort the session: the listener stays
//! disabled, which is visible through [`ListenerContext::status`].

use std::sync::Arc;

use glam::Vec3;

use crate::config::AppConfig;
use crate::engine::ListenerPose;
use crate::error::ListenerError;
use crate::listener::ListenerContext;
use crate::mixer::{AttenuationTarget, AttenuationUpdater, TickReport};

pub struct SceneSession {
    context: Arc<ListenerContext>,
    updater: AttenuationUpdater,
    targets: Vec<AttenuationTarget>,
    activation: Result<(), ListenerError>,
    frames: u64,
}

impl SceneSession {
    /// Activate the listener for `config` and prepare the attenuation loop.
    pub fn start(context: Arc<ListenerContext>, config: &AppConfig) -> Self {
        let activation = context.activate(&config.listener);
        if activation.is_err() {
            tracing::warn!("[Session] Listener disabled for this scene");
        }

        Self {
            context,
            updater: AttenuationUpdater::new(&config.mixer),
            targets: Vec::new(),
            activation,
            frames: 0,
        }
    }

    pub fn context(&self) -> &Arc<ListenerContext> {
        &self.context
    }

    /// Result of the activation attempted at start.
    pub fn activation(&self) -> Result<(), &ListenerError> {
        self.activation.as_ref().map(|_| ())
    }

    pub fn add_target(&mut self, target: AttenuationTarget) {
        self.targets.push(target);
    }

    /// Move an emitter; returns `false` when no target has that name.
    pub fn move_target(&mut self, emitter: &str, position: Vec3) -> bool {
        match self.targets.iter_mut().find(|t| t.emitter == emitter) {
            Some(target) => {
                target.position = position;
                true
            }
            None => false,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run one frame: forward the pose, then attenuate every target against
    /// the listener position.
    pub fn tick(&mut self, pose: &ListenerPose) -> TickReport {
        self.frames += 1;
        self.context.update_pose(pose);
        self.updater.tick(pose.position, &self.targets)
    }
}

impl Drop for SceneSession {
    fn drop(&mut self) {
        tracing::debug!("[Session] Ending scene after {} frames", self.frames);
        if let Err(err) = self.context.deactivate() {
            crate::error::log_listener_error(&err, "session_drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::HrtfAssetResolver;
    use crate::engine::{AudioEngineKind, FixedOutputProbe};
    use crate::listener::ListenerPhase;
    use crate::mixer::AudioMixer;
    use crate::runtime::{FailPoint, PhononStatus, RuntimeCall, SimulatedRuntime};
    use std::fs;

    fn context(runtime: &Arc<SimulatedRuntime>, assets: &tempfile::TempDir) -> Arc<ListenerContext> {
        Arc::new(
            ListenerContext::new(runtime.clone(), Arc::new(FixedOutputProbe::new(44_100)))
                .with_asset_resolver(HrtfAssetResolver::direct(assets.path())),
        )
    }

    fn assets() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cipic_124.hrtf"), b"hrtf").unwrap();
        dir
    }

    #[test]
    fn session_scopes_listener() {
        let assets = assets();
        let runtime = Arc::new(SimulatedRuntime::new());
        let context = context(&runtime, &assets);

        let session = SceneSession::start(context.clone(), &AppConfig::default());
        assert!(session.activation().is_ok());
        assert_eq!(context.phase(), ListenerPhase::Active);

        drop(session);
        assert_eq!(context.phase(), ListenerPhase::Uninitialized);
        assert!(runtime.calls().contains(&RuntimeCall::DestroyListener));
    }

    #[test]
    fn tick_updates_pose_and_attenuation() {
        let assets = assets();
        let runtime = Arc::new(SimulatedRuntime::new());
        let mixer = Arc::new(AudioMixer::new("sfx"));
        mixer.expose("volume", 0.0).unwrap();

        let mut session = SceneSession::start(context(&runtime, &assets), &AppConfig::default());
        session.add_target(AttenuationTarget::new("bell", Vec3::new(0.0, 0.0, 10.0), mixer.clone()));
        runtime.clear_calls();

        let report = session.tick(&ListenerPose::at(Vec3::new(0.0, 0.0, 5.0)));

        assert!(report.is_clean());
        assert_eq!(session.frames(), 1);
        assert!((mixer.get_float("volume").unwrap().unwrap() - 4.0).abs() < 1e-5);
        assert!(matches!(
            runtime.calls().as_slice(),
            [RuntimeCall::UpdateListener { .. }]
        ));

        assert!(session.move_target("bell", Vec3::new(0.0, 0.0, 25.0)));
        assert!(!session.move_target("missing", Vec3::ZERO));
        session.tick(&ListenerPose::at(Vec3::new(0.0, 0.0, 5.0)));
        assert!((mixer.get_float("volume").unwrap().unwrap() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn failed_activation_still_runs_attenuation() {
        let assets = assets();
        let runtime = Arc::new(SimulatedRuntime::new());
        runtime.fail_at(FailPoint::Listener, PhononStatus::Failure);
        let mixer = Arc::new(AudioMixer::new("sfx"));
        mixer.expose("volume", 0.0).unwrap();

        let mut config = AppConfig::default();
        config.listener.audio_engine = AudioEngineKind::Wwise;
        let mut session = SceneSession::start(context(&runtime, &assets), &config);
        assert!(session.activation().is_err());
        assert!(!session.context().is_enabled());

        session.add_target(AttenuationTarget::new("bell", Vec3::X * 5.0, mixer.clone()));
        let report = session.tick(&ListenerPose::default());

        assert_eq!(report.applied.len(), 1);
        assert!(session.context().status().last_error.is_some());
    }
}
