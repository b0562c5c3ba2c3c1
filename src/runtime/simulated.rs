use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use glam::Vec3;
use serde::Serialize;

use super::{ListenerSettings, NativeSourceHandle, PhononRuntime, PhononStatus, SpeakerLayout};

/// A call observed by [`SimulatedRuntime`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum RuntimeCall {
    InitializePipeline {
        sample_rate: u32,
        frame_size: u32,
        layout: SpeakerLayout,
    },
    CreateListener {
        hrtf_path: PathBuf,
        settings: ListenerSettings,
    },
    UpdateListener {
        position: Vec3,
        forward: Vec3,
        up: Vec3,
    },
    DestroyListener,
    Unity5Initialize {
        sample_rate: u32,
        frame_size: u32,
        hrtf_path: PathBuf,
        settings: ListenerSettings,
    },
    Unity5UpdateListener,
    FmodInitialize {
        hrtf_path: PathBuf,
        settings: ListenerSettings,
    },
    FmodUpdateListener,
    WwiseCreateListener {
        hrtf_path: PathBuf,
        settings: ListenerSettings,
    },
    CreateSource {
        handle: NativeSourceHandle,
    },
    DestroySource {
        handle: NativeSourceHandle,
    },
}

/// Entry point groups that can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// `initialize_audio_pipeline`
    Pipeline,
    /// Every listener-creating entry point, whatever the engine
    Listener,
    /// `create_source`
    Source,
}

/// In-process stand-in for the SDK used by tests, the CLI and hosts
/// without the native library.
///
/// Every call is recorded in order. Failures are injected per
/// [`FailPoint`] and stay armed until cleared.
#[derive(Default)]
pub struct SimulatedRuntime {
    calls: Mutex<Vec<RuntimeCall>>,
    failures: Mutex<HashMap<FailPoint, PhononStatus>>,
    next_handle: AtomicUsize,
}

impl SimulatedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call in `point`'s group return `status`.
    pub fn fail_at(&self, point: FailPoint, status: PhononStatus) {
        lock(&self.failures).insert(point, status);
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// Snapshot of the recorded calls.
    pub fn calls(&self) -> Vec<RuntimeCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn record(&self, call: RuntimeCall) {
        lock(&self.calls).push(call);
    }

    fn status_for(&self, point: FailPoint) -> PhononStatus {
        lock(&self.failures)
            .get(&point)
            .copied()
            .unwrap_or(PhononStatus::Success)
    }
}

// A panicking test thread must not hide the calls recorded before it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PhononRuntime for SimulatedRuntime {
    fn initialize_audio_pipeline(
        &self,
        sample_rate: u32,
        frame_size: u32,
        layout: SpeakerLayout,
    ) -> PhononStatus {
        self.record(RuntimeCall::InitializePipeline {
            sample_rate,
            frame_size,
            layout,
        });
        self.status_for(FailPoint::Pipeline)
    }

    fn create_listener(&self, hrtf_path: &Path, settings: &ListenerSettings) -> PhononStatus {
        self.record(RuntimeCall::CreateListener {
            hrtf_path: hrtf_path.to_path_buf(),
            settings: *settings,
        });
        self.status_for(FailPoint::Listener)
    }

    fn update_listener(&self, position: Vec3, forward: Vec3, up: Vec3) {
        self.record(RuntimeCall::UpdateListener {
            position,
            forward,
            up,
        });
    }

    fn destroy_listener(&self) {
        self.record(RuntimeCall::DestroyListener);
    }

    fn unity5_initialize(
        &self,
        sample_rate: u32,
        frame_size: u32,
        hrtf_path: &Path,
        settings: &ListenerSettings,
    ) -> PhononStatus {
        self.record(RuntimeCall::Unity5Initialize {
            sample_rate,
            frame_size,
            hrtf_path: hrtf_path.to_path_buf(),
            settings: *settings,
        });
        self.status_for(FailPoint::Listener)
    }

    fn unity5_update_listener(&self) {
        self.record(RuntimeCall::Unity5UpdateListener);
    }

    fn fmod_initialize(&self, hrtf_path: &Path, settings: &ListenerSettings) -> PhononStatus {
        self.record(RuntimeCall::FmodInitialize {
            hrtf_path: hrtf_path.to_path_buf(),
            settings: *settings,
        });
        self.status_for(FailPoint::Listener)
    }

    fn fmod_update_listener(&self) {
        self.record(RuntimeCall::FmodUpdateListener);
    }

    fn wwise_create_listener(
        &self,
        hrtf_path: &Path,
        settings: &ListenerSettings,
    ) -> PhononStatus {
        self.record(RuntimeCall::WwiseCreateListener {
            hrtf_path: hrtf_path.to_path_buf(),
            settings: *settings,
        });
        self.status_for(FailPoint::Listener)
    }

    fn create_source(&self) -> Result<NativeSourceHandle, PhononStatus> {
        self.status_for(FailPoint::Source).into_result()?;
        let handle = NativeSourceHandle(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        self.record(RuntimeCall::CreateSource { handle });
        Ok(handle)
    }

    fn destroy_source(&self, source: NativeSourceHandle) {
        self.record(RuntimeCall::DestroySource { handle: source });
    }
}
