//! Spatial source binding.
//!
//! Sources are owned by the host; the listener only needs to initialize the
//! ones that were created before it, disable them on teardown and wait for
//! in-flight processing to finish before their native handle goes away.
//!
//! # Teardown handshake
//! ```text
//! audio thread                       listener teardown
//! ------------                       -----------------
//! signal.try_begin() -> guard
//!   process block                    source.set_effect_enabled(false)
//!                                    source.wait_until_idle()  (blocks)
//! drop(guard) -> notify  ----------> wakes, destroy_source(handle)
//! signal.try_begin() -> None
//! ```

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::error::ListenerError;
use crate::runtime::{NativeSourceHandle, PhononRuntime};

pub type SourceId = u64;

/// Shared handle to a host-owned source.
pub type SourceHandle = Arc<dyn SpatialSource>;

/// Interface the listener binding needs from a source.
pub trait SpatialSource: Send + Sync {
    fn id(&self) -> SourceId;

    /// The source's own initialization hook, run once the listener exists.
    fn initialize(&self) -> Result<(), ListenerError>;

    fn set_effect_enabled(&self, enabled: bool);

    /// Block until no processing block is in flight.
    fn wait_until_idle(&self);

    /// Hand the native handle over for destruction, leaving the source
    /// uninitialized.
    fn take_native_handle(&self) -> Option<NativeSourceHandle>;
}

#[derive(Debug, Default)]
struct GateState {
    enabled: bool,
    busy: bool,
}

/// Completion signal between the audio thread and listener teardown.
///
/// Processing only starts through [`ProcessingSignal::try_begin`], which
/// refuses while the effect is disabled. Disabling therefore bounds the wait
/// in [`ProcessingSignal::wait_until_idle`] to the block already running.
#[derive(Debug, Default)]
pub struct ProcessingSignal {
    state: Mutex<GateState>,
    idle: Condvar,
}

impl ProcessingSignal {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.lock().enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    pub fn is_processing(&self) -> bool {
        self.lock().busy
    }

    /// Mark a processing block as started.
    ///
    /// Returns `None` while disabled or when a block is already in flight.
    pub fn try_begin(&self) -> Option<ProcessingGuard<'_>> {
        let mut state = self.lock();
        if !state.enabled || state.busy {
            return None;
        }
        state.busy = true;
        Some(ProcessingGuard { signal: self })
    }

    pub fn wait_until_idle(&self) {
        let state = self.lock();
        let _state = self
            .idle
            .wait_while(state, |state| state.busy)
            .unwrap_or_else(PoisonError::into_inner);
    }

    fn finish(&self) {
        self.lock().busy = false;
        self.idle.notify_all();
    }
}

/// Marks one processing block as in flight until dropped.
#[must_use = "processing ends when the guard is dropped"]
pub struct ProcessingGuard<'a> {
    signal: &'a ProcessingSignal,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.signal.finish();
    }
}

/// Source backed by a native SDK source object.
pub struct ManagedSource {
    id: SourceId,
    runtime: Arc<dyn PhononRuntime>,
    handle: Mutex<Option<NativeSourceHandle>>,
    signal: ProcessingSignal,
}

impl ManagedSource {
    pub fn new(id: SourceId, runtime: Arc<dyn PhononRuntime>) -> Self {
        Self {
            id,
            runtime,
            handle: Mutex::new(None),
            signal: ProcessingSignal::new(),
        }
    }

    pub fn signal(&self) -> &ProcessingSignal {
        &self.signal
    }

    pub fn is_initialized(&self) -> bool {
        self.native_handle().is_some()
    }

    pub fn native_handle(&self) -> Option<NativeSourceHandle> {
        *self.lock_handle()
    }

    /// Run one processing block on the audio thread.
    ///
    /// Returns `None` without calling `block` when the source is disabled,
    /// not yet initialized, or already processing.
    pub fn process<R>(&self, block: impl FnOnce(NativeSourceHandle) -> R) -> Option<R> {
        let handle = self.native_handle()?;
        let _guard = self.signal.try_begin()?;
        Some(block(handle))
    }

    fn lock_handle(&self) -> MutexGuard<'_, Option<NativeSourceHandle>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SpatialSource for ManagedSource {
    fn id(&self) -> SourceId {
        self.id
    }

    fn initialize(&self) -> Result<(), ListenerError> {
        let mut handle = self.lock_handle();
        if handle.is_some() {
            return Ok(());
        }

        let created =
            self.runtime
                .create_source()
                .map_err(|status| ListenerError::SourceInitFailed {
                    source_id: self.id,
                    reason: format!("create_source returned {:?}", status),
                })?;
        *handle = Some(created);
        self.signal.set_enabled(true);
        log::debug!("[Source {}] Initialized native source {:?}", self.id, created);
        Ok(())
    }

    fn set_effect_enabled(&self, enabled: bool) {
        self.signal.set_enabled(enabled);
    }

    fn wait_until_idle(&self) {
        self.signal.wait_until_idle();
    }

    fn take_native_handle(&self) -> Option<NativeSourceHandle> {
        self.signal.set_enabled(false);
        self.lock_handle().take()
    }
}
