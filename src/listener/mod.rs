//! ListenerContext: the binaural listener binding.
//!
//! Owns at most one active listener, the queue of sources created before
//! it, and the registry of live sources it must release on teardown. All
//! state that used to be process-wide lives here, and the context is passed
//! explicitly to whoever needs it.
//!
//! # Lifecycle
//! ```text
//! Uninitialized --activate--> Initializing --ok--> Active
//!       ^                          |                  |
//!       +---------- failure -------+             deactivate
//!       |                                             v
//!       +----------------------------------- Deactivating
//! ```
//! `activate` while `Active` and `deactivate` while not `Active` are no-ops.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::assets::HrtfAssetResolver;
use crate::config::{AppConfig, ListenerConfig};
use crate::engine::output::{platform_probe, OutputConfig, OutputProbe};
use crate::engine::{
    create_backend, AudioEngineKind, AudioEngineSelector, ListenerPose, ListenerRequest,
    SpatialBackend,
};
use crate::error::{log_listener_error, ErrorCode, ListenerError};
use crate::runtime::{ListenerSettings, PhononRuntime, MIN_ATTENUATION};
use crate::source::{SourceHandle, SourceId};
use crate::telemetry::{ListenerEvent, ListenerEventKind, TelemetryBus};

mod pending;

use pending::PendingSourceQueue;

/// Accepted range for `max_sources`.
pub const MAX_SOURCES_RANGE: std::ops::RangeInclusive<u32> = 1..=64;

/// Accepted range for `max_distance`.
pub const MAX_DISTANCE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerPhase {
    Uninitialized,
    Initializing,
    Active,
    Deactivating,
}

/// Result of [`ListenerContext::enqueue_source`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The source will be initialized when the listener activates.
    Queued,
    /// The listener is already up; the caller initializes the source itself.
    ListenerActive,
}

/// Result of [`ListenerContext::attach_source`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    Queued,
    Initialized,
}

/// Numeric code plus message of the last activation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: i32,
    pub message: String,
}

impl From<&ListenerError> for ErrorReport {
    fn from(err: &ListenerError) -> Self {
        Self {
            code: err.code(),
            message: err.message(),
        }
    }
}

/// Serializable snapshot of the listener binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerStatus {
    pub phase: ListenerPhase,
    pub engine: Option<AudioEngineKind>,
    pub output: Option<OutputConfig>,
    pub max_sources: Option<i32>,
    pub pending_sources: usize,
    pub registered_sources: usize,
    pub last_error: Option<ErrorReport>,
}

struct ActiveListener {
    backend: Box<dyn SpatialBackend>,
    output: OutputConfig,
    settings: ListenerSettings,
}

struct ListenerState {
    phase: ListenerPhase,
    active: Option<ActiveListener>,
    last_error: Option<ListenerError>,
}

/// Process-scoped listener binding.
///
/// `activate`, `deactivate` and `attach_source` are serialized against each
/// other. Queries, `update_pose` and `enqueue_source` only hold short-lived
/// locks, so source hooks run during activation may call those; a hook that
/// calls one of the serialized methods deadlocks.
pub struct ListenerContext {
    runtime: Arc<dyn PhononRuntime>,
    probe: Arc<dyn OutputProbe>,
    assets: Option<HrtfAssetResolver>,
    preferred_frame_size: u32,
    lifecycle: Mutex<()>,
    state: Mutex<ListenerState>,
    pending: Mutex<PendingSourceQueue>,
    registry: Mutex<Vec<SourceHandle>>,
    telemetry: TelemetryBus,
}

impl ListenerContext {
    /// Create an inactive context over `runtime`, reading the output
    /// configuration from `probe`.
    pub fn new(runtime: Arc<dyn PhononRuntime>, probe: Arc<dyn OutputProbe>) -> Self {
        Self {
            runtime,
            probe,
            assets: None,
            preferred_frame_size: 1024,
            lifecycle: Mutex::new(()),
            state: Mutex::new(ListenerState {
                phase: ListenerPhase::Uninitialized,
                active: None,
                last_error: None,
            }),
            pending: Mutex::new(PendingSourceQueue::new()),
            registry: Mutex::new(Vec::new()),
            telemetry: TelemetryBus::default(),
        }
    }

    /// Create a context with the platform output probe and the configured
    /// frame size preference.
    pub fn from_config(config: &AppConfig, runtime: Arc<dyn PhononRuntime>) -> Self {
        Self::new(runtime, platform_probe(&config.output))
            .with_preferred_frame_size(config.output.preferred_frame_size)
    }

    /// Override the platform HRTF resolution strategy.
    pub fn with_asset_resolver(mut self, resolver: HrtfAssetResolver) -> Self {
        self.assets = Some(resolver);
        self
    }

    pub fn with_preferred_frame_size(mut self, frame_size: u32) -> Self {
        self.preferred_frame_size = frame_size;
        self
    }

    // ========================================================================
    // LOCK HELPER METHODS
    // ========================================================================

    // Guards no data, so a panic while holding it leaves nothing to repair.
    fn lock_lifecycle(&self) -> MutexGuard<'_, ()> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, ListenerState>, ListenerError> {
        self.state.lock().map_err(|_| poisoned("listener_state"))
    }

    fn lock_pending(&self) -> Result<MutexGuard<'_, PendingSourceQueue>, ListenerError> {
        self.pending.lock().map_err(|_| poisoned("pending_sources"))
    }

    fn lock_registry(&self) -> Result<MutexGuard<'_, Vec<SourceHandle>>, ListenerError> {
        self.registry.lock().map_err(|_| poisoned("source_registry"))
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Create the listener against the configured engine.
    ///
    /// No-op when already active. On failure the context stays
    /// `Uninitialized`, the error is logged, recorded for [`Self::last_error`]
    /// and broadcast; calling `activate` again retries from scratch.
    pub fn activate(&self, config: &ListenerConfig) -> Result<(), ListenerError> {
        let _lifecycle = self.lock_lifecycle();

        let engine = config.audio_engine();
        {
            let mut state = self.lock_state()?;
            if state.phase == ListenerPhase::Active {
                log::debug!("[Listener] Already active, ignoring activate");
                return Ok(());
            }
            state.phase = ListenerPhase::Initializing;
        }
        self.telemetry
            .publish(ListenerEventKind::ActivationStarted { engine });

        let active = match self.bring_up(engine, config) {
            Ok(active) => active,
            Err(err) => {
                self.record_failure(&err);
                return Err(err);
            }
        };

        let output = active.output;
        let settings = active.settings;
        {
            let mut state = self.lock_state()?;
            state.active = Some(active);
            state.phase = ListenerPhase::Active;
            state.last_error = None;
        }
        log::info!(
            "[Listener] Active on {} at {} Hz, frame size {}",
            engine,
            output.sample_rate,
            output.frame_size
        );
        self.telemetry.publish(ListenerEventKind::Activated {
            engine,
            sample_rate: output.sample_rate,
            frame_size: output.frame_size,
        });

        let queued = self.lock_pending()?.close_and_drain();
        self.initialize_queued(queued, &settings)?;
        Ok(())
    }

    fn bring_up(
        &self,
        engine: AudioEngineKind,
        config: &ListenerConfig,
    ) -> Result<ActiveListener, ListenerError> {
        let settings = validate_settings(config)?;
        let backend = create_backend(engine, Arc::clone(&self.runtime));

        let device = self.probe.probe()?;
        let output = OutputConfig::negotiate(device, self.preferred_frame_size);
        backend.initialize(&output)?;

        let resolver = self
            .assets
            .clone()
            .unwrap_or_else(|| HrtfAssetResolver::for_platform(config));
        let hrtf_path = resolver.resolve(&config.hrtf_file_name)?;

        backend.create_listener(&ListenerRequest {
            hrtf_path: &hrtf_path,
            settings,
            output,
        })?;

        Ok(ActiveListener {
            backend,
            output,
            settings,
        })
    }

    fn record_failure(&self, err: &ListenerError) {
        log_listener_error(err, "activate");
        match self.state.lock() {
            Ok(mut state) => {
                state.phase = ListenerPhase::Uninitialized;
                state.active = None;
                state.last_error = Some(err.clone());
            }
            Err(_) => log::error!("[Listener] State lock poisoned while recording failure"),
        }
        self.telemetry.publish(ListenerEventKind::ActivationFailed {
            code: err.code(),
            message: err.message(),
        });
    }

    fn initialize_queued(
        &self,
        queued: Vec<SourceHandle>,
        settings: &ListenerSettings,
    ) -> Result<(), ListenerError> {
        let cap = settings.max_sources.max(0) as usize;
        if queued.len() > cap {
            // The SDK enforces the voice cap; every queued source is still
            // initialized here.
            log::warn!(
                "[Listener] {} sources queued for a listener created with max_sources={}",
                queued.len(),
                settings.max_sources
            );
            self.telemetry.publish(ListenerEventKind::SourceCapExceeded {
                queued: queued.len(),
                max_sources: cap as u32,
            });
        }

        for source in queued {
            let id = source.id();
            match source.initialize() {
                Ok(()) => {
                    self.insert_registered(source)?;
                    self.telemetry
                        .publish(ListenerEventKind::SourceInitialized { source: id });
                }
                Err(err) => {
                    log_listener_error(&err, "initialize_queued");
                    self.telemetry.publish(ListenerEventKind::SourceInitFailed {
                        source: id,
                        code: err.code(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Tear the listener down.
    ///
    /// No-op when not active. For engines that own source teardown every
    /// registered source is disabled first, then each one is waited on until
    /// idle and its native handle destroyed, then the listener is destroyed.
    pub fn deactivate(&self) -> Result<(), ListenerError> {
        let _lifecycle = self.lock_lifecycle();

        let active = {
            let mut state = self.lock_state()?;
            if state.phase != ListenerPhase::Active {
                return Ok(());
            }
            state.phase = ListenerPhase::Deactivating;
            state.active.take()
        };
        self.lock_pending()?.reopen();

        let sources = std::mem::take(&mut *self.lock_registry()?);
        if let Some(active) = active {
            if active.backend.owns_source_teardown() {
                let released = release_sources(active.backend.as_ref(), &sources);
                self.telemetry
                    .publish(ListenerEventKind::SourcesReleased { count: released });
            }
            active.backend.destroy_listener();
        }

        self.lock_state()?.phase = ListenerPhase::Uninitialized;
        log::info!("[Listener] Deactivated");
        self.telemetry.publish(ListenerEventKind::Deactivated);
        Ok(())
    }

    /// Forward the listener transform for this frame. No-op unless active.
    pub fn update_pose(&self, pose: &ListenerPose) {
        match self.state.lock() {
            Ok(state) => {
                if let (ListenerPhase::Active, Some(active)) = (state.phase, state.active.as_ref())
                {
                    active.backend.update_listener(pose);
                }
            }
            Err(_) => log::error!("[Listener] State lock poisoned, dropping pose update"),
        }
    }

    // ========================================================================
    // SOURCES
    // ========================================================================

    /// Queue `source` for initialization once the listener activates.
    ///
    /// Returns [`EnqueueOutcome::ListenerActive`] without queueing when the
    /// listener is already up.
    pub fn enqueue_source(&self, source: SourceHandle) -> Result<EnqueueOutcome, ListenerError> {
        if self.lock_pending()?.push(source) {
            Ok(EnqueueOutcome::Queued)
        } else {
            Ok(EnqueueOutcome::ListenerActive)
        }
    }

    /// Track an already initialized source for teardown.
    ///
    /// The phase is checked while the registry is locked, so a source is
    /// either refused or included in the next teardown.
    pub fn register_source(&self, source: SourceHandle) -> Result<(), ListenerError> {
        let mut registry = self.lock_registry()?;
        if self.phase() != ListenerPhase::Active {
            return Err(ListenerError::NotActive);
        }
        push_unique(&mut registry, source);
        Ok(())
    }

    /// Stop tracking a source the host destroyed itself.
    pub fn unregister_source(&self, id: SourceId) -> Result<bool, ListenerError> {
        let mut registry = self.lock_registry()?;
        let before = registry.len();
        registry.retain(|source| source.id() != id);
        Ok(registry.len() != before)
    }

    /// Queue `source`, or initialize and register it when the listener is
    /// already active.
    ///
    /// Holds the lifecycle lock throughout, so `deactivate` cannot run
    /// between initialization and registration. A source initialized for a
    /// listener that is gone anyway has its native handle destroyed.
    pub fn attach_source(&self, source: SourceHandle) -> Result<AttachOutcome, ListenerError> {
        let _lifecycle = self.lock_lifecycle();

        match self.enqueue_source(Arc::clone(&source))? {
            EnqueueOutcome::Queued => Ok(AttachOutcome::Queued),
            EnqueueOutcome::ListenerActive => {
                source.initialize()?;
                if let Err(err) = self.register_source(Arc::clone(&source)) {
                    log_listener_error(&err, "attach_source");
                    source.set_effect_enabled(false);
                    source.wait_until_idle();
                    if let Some(handle) = source.take_native_handle() {
                        self.runtime.destroy_source(handle);
                    }
                    return Err(err);
                }
                Ok(AttachOutcome::Initialized)
            }
        }
    }

    fn insert_registered(&self, source: SourceHandle) -> Result<(), ListenerError> {
        push_unique(&mut *self.lock_registry()?, source);
        Ok(())
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn phase(&self) -> ListenerPhase {
        self.state
            .lock()
            .map(|state| state.phase)
            .unwrap_or(ListenerPhase::Uninitialized)
    }

    pub fn is_enabled(&self) -> bool {
        self.phase() == ListenerPhase::Active
    }

    pub fn output_config(&self) -> Option<OutputConfig> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.active.as_ref().map(|active| active.output))
    }

    /// Negotiated frame size while active.
    pub fn frame_size(&self) -> Option<u32> {
        self.output_config().map(|output| output.frame_size)
    }

    pub fn audio_engine(&self) -> Option<AudioEngineKind> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.active.as_ref().map(|active| active.backend.kind()))
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    pub fn registered_len(&self) -> usize {
        self.registry.lock().map(|registry| registry.len()).unwrap_or(0)
    }

    /// Error of the most recent failed activation, cleared on success.
    pub fn last_error(&self) -> Option<ListenerError> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.last_error.clone())
    }

    pub fn status(&self) -> ListenerStatus {
        let (phase, engine, output, max_sources, last_error) = match self.state.lock() {
            Ok(state) => (
                state.phase,
                state.active.as_ref().map(|active| active.backend.kind()),
                state.active.as_ref().map(|active| active.output),
                state.active.as_ref().map(|active| active.settings.max_sources),
                state.last_error.as_ref().map(ErrorReport::from),
            ),
            Err(_) => (
                ListenerPhase::Uninitialized,
                None,
                None,
                None,
                Some(ErrorReport::from(&poisoned("listener_state"))),
            ),
        };

        ListenerStatus {
            phase,
            engine,
            output,
            max_sources,
            pending_sources: self.pending_len(),
            registered_sources: self.registered_len(),
            last_error,
        }
    }

    pub fn telemetry(&self) -> &TelemetryBus {
        &self.telemetry
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListenerEvent> {
        self.telemetry.subscribe()
    }
}

impl Drop for ListenerContext {
    fn drop(&mut self) {
        if let Err(err) = self.deactivate() {
            log_listener_error(&err, "drop");
        }
    }
}

fn push_unique(registry: &mut Vec<SourceHandle>, source: SourceHandle) {
    if !registry.iter().any(|existing| existing.id() == source.id()) {
        registry.push(source);
    }
}

fn poisoned(component: &str) -> ListenerError {
    ListenerError::LockPoisoned {
        component: component.to_string(),
    }
}

fn validate_settings(config: &ListenerConfig) -> Result<ListenerSettings, ListenerError> {
    if !MAX_SOURCES_RANGE.contains(&config.max_sources) {
        return Err(ListenerError::InvalidSettings {
            field: "max_sources",
            value: config.max_sources.to_string(),
        });
    }
    if !MAX_DISTANCE_RANGE.contains(&config.max_distance) {
        return Err(ListenerError::InvalidSettings {
            field: "max_distance",
            value: config.max_distance.to_string(),
        });
    }

    Ok(ListenerSettings {
        max_sources: config.max_sources as i32,
        max_distance: config.max_distance,
        min_attenuation: MIN_ATTENUATION,
    })
}

/// Disable every source, then wait for each and destroy its native handle.
fn release_sources(backend: &dyn SpatialBackend, sources: &[SourceHandle]) -> usize {
    for source in sources {
        source.set_effect_enabled(false);
    }

    let mut released = 0;
    for source in sources {
        source.wait_until_idle();
        if let Some(handle) = source.take_native_handle() {
            backend.destroy_source(handle);
            released += 1;
        }
    }
    released
}
