//! Bindings to the native Phonon SDK.
//!
//! Positions cross the boundary converted from the host's left-handed
//! coordinates to the SDK's right-handed ones (z is negated).

use std::ffi::{c_char, c_int, c_void, CString};
use std::path::Path;

use glam::Vec3;

use super::{ListenerSettings, NativeSourceHandle, PhononRuntime, PhononStatus, SpeakerLayout};

#[repr(C)]
#[derive(Clone, Copy)]
struct IplVector3 {
    x: f32,
    y: f32,
    z: f32,
}

impl From<Vec3> for IplVector3 {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: -v.z,
        }
    }
}

#[link(name = "phonon")]
extern "C" {
    fn iplInitializeAudioPipeline(sample_rate: c_int, frame_size: c_int, layout: c_int) -> c_int;
    fn iplCreateListener(hrtf_path: *const c_char, settings: ListenerSettings) -> c_int;
    fn iplUpdateListener(position: IplVector3, forward: IplVector3, up: IplVector3);
    fn iplDestroyListener();
    fn iplCreateSource(source: *mut *mut c_void) -> c_int;
    fn iplDestroySource(source: *mut c_void);

    fn iplUnity5InitializePhonon3D(
        sample_rate: c_int,
        frame_size: c_int,
        hrtf_path: *const c_char,
        settings: ListenerSettings,
    ) -> c_int;
    fn iplUnity5UpdateListener();

    fn iplFMODInitialize(hrtf_path: *const c_char, settings: ListenerSettings) -> c_int;
    fn iplFMODUpdateListener();

    fn iplWwiseCreateListener(hrtf_path: *const c_char, settings: ListenerSettings) -> c_int;
}

/// Runtime backed by the linked SDK library.
#[derive(Debug, Default)]
pub struct NativeRuntime {
    _unit: (),
}

impl NativeRuntime {
    pub fn new() -> Self {
        Self::default()
    }
}

fn c_path(path: &Path) -> Result<CString, PhononStatus> {
    let text = path.to_str().ok_or(PhononStatus::Failure)?;
    CString::new(text).map_err(|_| PhononStatus::Failure)
}

fn c_int_from(value: u32) -> c_int {
    c_int::try_from(value).unwrap_or(c_int::MAX)
}

impl PhononRuntime for NativeRuntime {
    fn initialize_audio_pipeline(
        &self,
        sample_rate: u32,
        frame_size: u32,
        layout: SpeakerLayout,
    ) -> PhononStatus {
        // SAFETY: plain value arguments; the SDK copies what it keeps.
        let raw = unsafe {
            iplInitializeAudioPipeline(
                c_int_from(sample_rate),
                c_int_from(frame_size),
                layout as c_int,
            )
        };
        PhononStatus::from_raw(raw)
    }

    fn create_listener(&self, hrtf_path: &Path, settings: &ListenerSettings) -> PhononStatus {
        let path = match c_path(hrtf_path) {
            Ok(path) => path,
            Err(status) => return status,
        };
        // SAFETY: `path` outlives the call and is NUL-terminated.
        PhononStatus::from_raw(unsafe { iplCreateListener(path.as_ptr(), *settings) })
    }

    fn update_listener(&self, position: Vec3, forward: Vec3, up: Vec3) {
        // SAFETY: plain value arguments.
        unsafe { iplUpdateListener(position.into(), forward.into(), up.into()) }
    }

    fn destroy_listener(&self) {
        // SAFETY: the listener context only calls this after a successful create.
        unsafe { iplDestroyListener() }
    }

    fn unity5_initialize(
        &self,
        sample_rate: u32,
        frame_size: u32,
        hrtf_path: &Path,
        settings: &ListenerSettings,
    ) -> PhononStatus {
        let path = match c_path(hrtf_path) {
            Ok(path) => path,
            Err(status) => return status,
        };
        // SAFETY: `path` outlives the call and is NUL-terminated.
        let raw = unsafe {
            iplUnity5InitializePhonon3D(
                c_int_from(sample_rate),
                c_int_from(frame_size),
                path.as_ptr(),
                *settings,
            )
        };
        PhononStatus::from_raw(raw)
    }

    fn unity5_update_listener(&self) {
        // SAFETY: no arguments.
        unsafe { iplUnity5UpdateListener() }
    }

    fn fmod_initialize(&self, hrtf_path: &Path, settings: &ListenerSettings) -> PhononStatus {
        let path = match c_path(hrtf_path) {
            Ok(path) => path,
            Err(status) => return status,
        };
        // SAFETY: `path` outlives the call and is NUL-terminated.
        PhononStatus::from_raw(unsafe { iplFMODInitialize(path.as_ptr(), *settings) })
    }

    fn fmod_update_listener(&self) {
        // SAFETY: no arguments.
        unsafe { iplFMODUpdateListener() }
    }

    fn wwise_create_listener(
        &self,
        hrtf_path: &Path,
        settings: &ListenerSettings,
    ) -> PhononStatus {
        let path = match c_path(hrtf_path) {
            Ok(path) => path,
            Err(status) => return status,
        };
        // SAFETY: `path` outlives the call and is NUL-terminated.
        PhononStatus::from_raw(unsafe { iplWwiseCreateListener(path.as_ptr(), *settings) })
    }

    fn create_source(&self) -> Result<NativeSourceHandle, PhononStatus> {
        let mut raw: *mut c_void = std::ptr::null_mut();
        // SAFETY: `raw` is a valid out-pointer for the duration of the call.
        let status = PhononStatus::from_raw(unsafe { iplCreateSource(&mut raw) });
        status.into_result()?;
        if raw.is_null() {
            return Err(PhononStatus::Failure);
        }
        Ok(NativeSourceHandle(raw as usize))
    }

    fn destroy_source(&self, source: NativeSourceHandle) {
        // SAFETY: handles only originate from `create_source` and are
        // destroyed once, after the source stopped processing.
        unsafe { iplDestroySource(source.0 as *mut c_void) }
    }
}
