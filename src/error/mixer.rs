// Mixer error types and constants

use crate::error::ErrorCode;
use log::warn;
use std::fmt;

/// Mixer error code constants
///
/// Error code range: 4001-4003
pub struct MixerErrorCodes {}

impl MixerErrorCodes {
    /// Emitter has no mixer group to write its attenuation to
    pub const MISSING_MIXER_GROUP: i32 = 4001;

    /// Mixer does not expose the attenuation parameter
    pub const UNKNOWN_PARAMETER: i32 = 4002;

    /// Mixer parameter lock was poisoned
    pub const LOCK_POISONED: i32 = 4003;
}

/// Log a mixer error with structured context
///
/// Mixer errors are per-frame configuration problems, so they are logged at
/// warn level rather than error.
pub fn log_mixer_error(err: &MixerError, context: &str) {
    warn!(
        "Mixer error in {}: code={}, component=AttenuationUpdater, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Mixer configuration errors
///
/// Error code range: 4001-4003
#[derive(Debug, Clone, PartialEq)]
pub enum MixerError {
    /// Emitter has no mixer group to write its attenuation to
    MissingMixerGroup { emitter: String },

    /// Mixer does not expose the attenuation parameter
    UnknownParameter { emitter: String, parameter: String },

    /// Mixer parameter lock was poisoned
    LockPoisoned { component: String },
}

impl ErrorCode for MixerError {
    fn code(&self) -> i32 {
        match self {
            MixerError::MissingMixerGroup { .. } => MixerErrorCodes::MISSING_MIXER_GROUP,
            MixerError::UnknownParameter { .. } => MixerErrorCodes::UNKNOWN_PARAMETER,
            MixerError::LockPoisoned { .. } => MixerErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            MixerError::MissingMixerGroup { emitter } => {
                format!("Emitter {} has no mixer group assigned", emitter)
            }
            MixerError::UnknownParameter { emitter, parameter } => {
                format!(
                    "Mixer for emitter {} does not expose parameter '{}'",
                    emitter, parameter
                )
            }
            MixerError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
        }
    }
}

impl fmt::Display for MixerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MixerError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for MixerError {}
