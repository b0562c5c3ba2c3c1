// Listener error types and constants

use crate::error::ErrorCode;
use crate::runtime::PhononStatus;
use log::error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Listener error code constants
///
/// Single source of truth for the numeric codes reported in logs, telemetry
/// events and status snapshots.
///
/// Error code range: 3001-3007
pub struct ListenerErrorCodes {}

impl ListenerErrorCodes {
    /// Audio pipeline or listener creation was rejected by the runtime
    pub const INITIALIZATION_FAILED: i32 = 3001;

    /// HRTF asset file missing or unreadable
    pub const ASSET_RESOLUTION: i32 = 3002;

    /// Listener settings outside their accepted range
    pub const INVALID_SETTINGS: i32 = 3003;

    /// Output device configuration could not be read
    pub const OUTPUT_UNAVAILABLE: i32 = 3004;

    /// A queued source failed its own initialization hook
    pub const SOURCE_INIT_FAILED: i32 = 3005;

    /// Mutex was poisoned
    pub const LOCK_POISONED: i32 = 3006;

    /// Operation requires an active listener
    pub const NOT_ACTIVE: i32 = 3007;
}

/// Step of listener activation that produced a runtime failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitStage {
    Pipeline,
    Listener,
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitStage::Pipeline => f.write_str("audio pipeline"),
            InitStage::Listener => f.write_str("listener"),
        }
    }
}

/// Log a listener error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_listener_error(err: &ListenerError, context: &str) {
    error!(
        "Listener error in {}: code={}, component=ListenerBinding, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Listener lifecycle errors
///
/// Every variant leaves the listener disabled; callers observe the failure
/// through the returned value or `ListenerContext::last_error`.
///
/// Error code range: 3001-3007
#[derive(Debug, Clone, PartialEq)]
pub enum ListenerError {
    /// Runtime rejected pipeline setup or listener creation
    InitializationFailed { stage: InitStage, status: PhononStatus },

    /// HRTF asset file missing or unreadable
    AssetResolution { path: String, reason: String },

    /// Listener settings outside their accepted range
    InvalidSettings { field: &'static str, value: String },

    /// Output device configuration could not be read
    OutputUnavailable { reason: String },

    /// A queued source failed its own initialization hook
    SourceInitFailed { source_id: u64, reason: String },

    /// Mutex was poisoned
    LockPoisoned { component: String },

    /// Operation requires an active listener
    NotActive,
}

impl ListenerError {
    /// Whether this error aborted an activation attempt.
    pub fn is_initialization_failure(&self) -> bool {
        matches!(
            self,
            ListenerError::InitializationFailed { .. }
                | ListenerError::AssetResolution { .. }
                | ListenerError::InvalidSettings { .. }
                | ListenerError::OutputUnavailable { .. }
        )
    }
}

impl ErrorCode for ListenerError {
    fn code(&self) -> i32 {
        match self {
            ListenerError::InitializationFailed { .. } => ListenerErrorCodes::INITIALIZATION_FAILED,
            ListenerError::AssetResolution { .. } => ListenerErrorCodes::ASSET_RESOLUTION,
            ListenerError::InvalidSettings { .. } => ListenerErrorCodes::INVALID_SETTINGS,
            ListenerError::OutputUnavailable { .. } => ListenerErrorCodes::OUTPUT_UNAVAILABLE,
            ListenerError::SourceInitFailed { .. } => ListenerErrorCodes::SOURCE_INIT_FAILED,
            ListenerError::LockPoisoned { .. } => ListenerErrorCodes::LOCK_POISONED,
            ListenerError::NotActive => ListenerErrorCodes::NOT_ACTIVE,
        }
    }

    fn message(&self) -> String {
        match self {
            ListenerError::InitializationFailed { stage, status } => {
                format!("Unable to initialize {} (status {:?})", stage, status)
            }
            ListenerError::AssetResolution { path, reason } => {
                format!("HRTF asset {} unavailable: {}", path, reason)
            }
            ListenerError::InvalidSettings { field, value } => {
                format!("Listener setting {} out of range (got {})", field, value)
            }
            ListenerError::OutputUnavailable { reason } => {
                format!("Output configuration unavailable: {}", reason)
            }
            ListenerError::SourceInitFailed { source_id, reason } => {
                format!("Source {} failed to initialize: {}", source_id, reason)
            }
            ListenerError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            ListenerError::NotActive => {
                "Listener not active. Enqueue the source instead.".to_string()
            }
        }
    }
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ListenerError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ListenerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_error_codes() {
        assert_eq!(
            ListenerError::InitializationFailed {
                stage: InitStage::Pipeline,
                status: PhononStatus::Failure,
            }
            .code(),
            ListenerErrorCodes::INITIALIZATION_FAILED
        );
        assert_eq!(
            ListenerError::AssetResolution {
                path: "x".to_string(),
                reason: "missing".to_string(),
            }
            .code(),
            ListenerErrorCodes::ASSET_RESOLUTION
        );
        assert_eq!(
            ListenerError::InvalidSettings {
                field: "max_sources",
                value: "0".to_string(),
            }
            .code(),
            ListenerErrorCodes::INVALID_SETTINGS
        );
        assert_eq!(ListenerError::NotActive.code(), ListenerErrorCodes::NOT_ACTIVE);
    }

    #[test]
    fn test_listener_error_messages() {
        let err = ListenerError::InitializationFailed {
            stage: InitStage::Listener,
            status: PhononStatus::OutOfMemory,
        };
        assert_eq!(
            err.message(),
            "Unable to initialize listener (status OutOfMemory)"
        );

        let err = ListenerError::InvalidSettings {
            field: "max_distance",
            value: "600".to_string(),
        };
        assert!(err.message().contains("max_distance"));
    }

    #[test]
    fn test_listener_error_display() {
        let err = ListenerError::NotActive;
        let display = format!("{}", err);
        assert!(display.contains("ListenerError"));
        assert!(display.contains(&err.code().to_string()));
    }

    #[test]
    fn test_initialization_failure_classification() {
        assert!(ListenerError::AssetResolution {
            path: "a".to_string(),
            reason: "b".to_string(),
        }
        .is_initialization_failure());
        assert!(!ListenerError::NotActive.is_initialization_failure());
        assert!(!ListenerError::SourceInitFailed {
            source_id: 1,
            reason: "x".to_string(),
        }
        .is_initialization_failure());
    }
}
