//! Per-frame inverse-distance attenuation written to mixer parameters.
//!
//! Independent of the listener binding: the reference point is whatever
//! transform the host passes in, usually the listener position.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use glam::Vec3;
use serde::Serialize;

use crate::config::MixerConfig;
use crate::error::{log_mixer_error, MixerError};

/// `scale / max(distance, epsilon)`.
///
/// NaN distances are clamped to `epsilon`; an infinite distance yields 0.
/// A non-positive `epsilon` is replaced by `f32::EPSILON` so the result is
/// always finite for finite `scale`.
pub fn attenuation(distance: f32, scale: f32, epsilon: f32) -> f32 {
    let floor = if epsilon > 0.0 { epsilon } else { f32::EPSILON };
    // f32::max returns the non-NaN operand.
    scale / distance.max(floor)
}

/// Host mixer exposing named float parameters.
pub trait MixerParameterTarget: Send + Sync {
    /// Write `value` to `parameter`.
    ///
    /// Returns `Ok(false)` when the mixer does not expose `parameter`.
    fn set_float(&self, parameter: &str, value: f32) -> Result<bool, MixerError>;
}

/// In-process mixer with explicitly exposed parameters.
#[derive(Debug, Default)]
pub struct AudioMixer {
    name: String,
    params: Mutex<HashMap<String, f32>>,
}

impl AudioMixer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Expose `parameter` with an initial value.
    pub fn expose(&self, parameter: impl Into<String>, initial: f32) -> Result<(), MixerError> {
        self.params
            .lock()
            .map_err(|_| self.poisoned())?
            .insert(parameter.into(), initial);
        Ok(())
    }

    pub fn get_float(&self, parameter: &str) -> Result<Option<f32>, MixerError> {
        Ok(self
            .params
            .lock()
            .map_err(|_| self.poisoned())?
            .get(parameter)
            .copied())
    }

    fn poisoned(&self) -> MixerError {
        MixerError::LockPoisoned {
            component: format!("mixer:{}", self.name),
        }
    }
}

impl MixerParameterTarget for AudioMixer {
    fn set_float(&self, parameter: &str, value: f32) -> Result<bool, MixerError> {
        let mut params = self.params.lock().map_err(|_| self.poisoned())?;
        match params.get_mut(parameter) {
            Some(slot) => {
                *slot = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// One emitter whose attenuation is recomputed every tick.
#[derive(Clone)]
pub struct AttenuationTarget {
    pub emitter: String,
    pub position: Vec3,
    pub mixer: Option<Arc<dyn MixerParameterTarget>>,
}

impl AttenuationTarget {
    pub fn new(
        emitter: impl Into<String>,
        position: Vec3,
        mixer: Arc<dyn MixerParameterTarget>,
    ) -> Self {
        Self {
            emitter: emitter.into(),
            position,
            mixer: Some(mixer),
        }
    }

    /// Target without a mixer group; every tick reports it.
    pub fn unassigned(emitter: impl Into<String>, position: Vec3) -> Self {
        Self {
            emitter: emitter.into(),
            position,
            mixer: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedAttenuation {
    pub emitter: String,
    pub distance: f32,
    pub attenuation: f32,
}

/// Outcome of one [`AttenuationUpdater::tick`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub applied: Vec<AppliedAttenuation>,
    pub failures: Vec<MixerError>,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AttenuationUpdater {
    scale: f32,
    min_distance: f32,
    parameter: String,
}

impl AttenuationUpdater {
    pub fn new(config: &MixerConfig) -> Self {
        Self {
            scale: config.scale,
            min_distance: config.min_distance,
            parameter: config.parameter.clone(),
        }
    }

    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    /// Write the attenuation of every target relative to `reference`.
    ///
    /// A failing target is logged and reported; the others are still written.
    pub fn tick(&self, reference: Vec3, targets: &[AttenuationTarget]) -> TickReport {
        let mut report = TickReport::default();

        for target in targets {
            let distance = target.position.distance(reference);
            let value = attenuation(distance, self.scale, self.min_distance);

            match self.apply(target, value) {
                Ok(()) => report.applied.push(AppliedAttenuation {
                    emitter: target.emitter.clone(),
                    distance,
                    attenuation: value,
                }),
                Err(err) => {
                    log_mixer_error(&err, "attenuation_tick");
                    report.failures.push(err);
                }
            }
        }

        tracing::trace!(
            "[Mixer] Tick applied {} targets, {} failures",
            report.applied.len(),
            report.failures.len()
        );
        report
    }

    fn apply(&self, target: &AttenuationTarget, value: f32) -> Result<(), MixerError> {
        let mixer = target
            .mixer
            .as_ref()
            .ok_or_else(|| MixerError::MissingMixerGroup {
                emitter: target.emitter.clone(),
            })?;

        if mixer.set_float(&self.parameter, value)? {
            Ok(())
        } else {
            Err(MixerError::UnknownParameter {
                emitter: target.emitter.clone(),
                parameter: self.parameter.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixer_with_volume() -> Arc<AudioMixer> {
        let mixer = Arc::new(AudioMixer::new("sfx"));
        mixer.expose("volume", 0.0).unwrap();
        mixer
    }

    #[test]
    fn inverse_distance_curve() {
        assert!((attenuation(5.0, 20.0, 0.001) - 4.0).abs() < 1e-6);
        assert!((attenuation(20.0, 20.0, 0.001) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_distance_is_clamped() {
        let value = attenuation(0.0, 20.0, 0.001);
        assert!(value.is_finite());
        assert!((value - 20_000.0).abs() < 0.5);
    }

    #[test]
    fn non_finite_distances() {
        assert!(attenuation(f32::NAN, 20.0, 0.001).is_finite());
        assert_eq!(attenuation(f32::INFINITY, 20.0, 0.001), 0.0);
        assert!(attenuation(0.0, 20.0, 0.0).is_finite());
    }

    #[test]
    fn tick_writes_mixer_parameter() {
        let mixer = mixer_with_volume();
        let updater = AttenuationUpdater::new(&MixerConfig::default());
        let targets = [AttenuationTarget::new(
            "engine",
            Vec3::new(3.0, 4.0, 0.0),
            mixer.clone(),
        )];

        let report = updater.tick(Vec3::ZERO, &targets);

        assert!(report.is_clean());
        assert_eq!(report.applied.len(), 1);
        assert!((report.applied[0].distance - 5.0).abs() < 1e-6);
        let volume = mixer.get_float("volume").unwrap().unwrap();
        assert!((volume - 4.0).abs() < 1e-6);
    }

    #[test]
    fn missing_mixer_does_not_block_other_targets() {
        let mixer = mixer_with_volume();
        let updater = AttenuationUpdater::new(&MixerConfig::default());
        let targets = [
            AttenuationTarget::unassigned("orphan", Vec3::X),
            AttenuationTarget::new("radio", Vec3::new(0.0, 10.0, 0.0), mixer.clone()),
        ];

        let report = updater.tick(Vec3::ZERO, &targets);

        assert_eq!(
            report.failures,
            vec![MixerError::MissingMixerGroup {
                emitter: "orphan".to_string()
            }]
        );
        assert_eq!(report.applied.len(), 1);
        assert_eq!(report.applied[0].emitter, "radio");
        assert!((mixer.get_float("volume").unwrap().unwrap() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn unexposed_parameter_is_reported() {
        let mixer = Arc::new(AudioMixer::new("music"));
        let updater = AttenuationUpdater::new(&MixerConfig::default());
        let targets = [AttenuationTarget::new("speaker", Vec3::ONE, mixer.clone())];

        let report = updater.tick(Vec3::ZERO, &targets);

        assert_eq!(
            report.failures,
            vec![MixerError::UnknownParameter {
                emitter: "speaker".to_string(),
                parameter: "volume".to_string(),
            }]
        );
        assert_eq!(mixer.get_float("volume").unwrap(), None);
    }

    #[test]
    fn custom_parameter_and_scale() {
        let mixer = Arc::new(AudioMixer::new("ambience"));
        mixer.expose("wind_gain", 1.0).unwrap();
        let updater = AttenuationUpdater::new(&MixerConfig {
            scale: 10.0,
            min_distance: 0.5,
            parameter: "wind_gain".to_string(),
        });
        let targets = [AttenuationTarget::new("wind", Vec3::ZERO, mixer.clone())];

        updater.tick(Vec3::ZERO, &targets);

        assert_eq!(mixer.get_float("wind_gain").unwrap(), Some(20.0));
    }
}
