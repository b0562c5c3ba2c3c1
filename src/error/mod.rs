// Error types for the Phonon bridge
//
// This module defines custom error types for listener lifecycle and mixer
// attenuation operations, providing structured error handling with numeric
// codes suitable for reporting across the host/native boundary.

mod listener;
mod mixer;

pub use listener::{log_listener_error, InitStage, ListenerError, ListenerErrorCodes};
pub use mixer::{log_mixer_error, MixerError, MixerErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the host boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
