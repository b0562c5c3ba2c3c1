// Phonon Bridge - binaural listener binding
// Listener lifecycle, per-engine backends and mixer attenuation

pub mod assets;
pub mod config;
pub mod engine;
pub mod error;
pub mod listener;
pub mod mixer;
pub mod runtime;
pub mod session;
pub mod source;
pub mod telemetry;

pub use config::AppConfig;
pub use engine::{AudioEngineKind, ListenerPose};
pub use error::{ErrorCode, ListenerError, MixerError};
pub use listener::{ListenerContext, ListenerPhase, ListenerStatus};
pub use session::SceneSession;

use std::sync::Once;

static LOGGING: Once = Once::new();

/// Install the global subscriber for `tracing` and `log` records.
///
/// Android routes records to logcat under the `PhononBridge` tag; other
/// platforms get the fmt subscriber writing to stderr. Safe to call more
/// than once; only the first call installs anything, and an already
/// installed global subscriber is left alone.
pub fn init_logging(level: tracing::Level) {
    LOGGING.call_once(|| install_subscriber(level));
}

#[cfg(target_os = "android")]
fn install_subscriber(level: tracing::Level) {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let layer = match tracing_android::layer("PhononBridge") {
        Ok(layer) => layer,
        Err(err) => {
            log::error!("Failed to open logcat writer: {}", err);
            return;
        }
    };
    if tracing_subscriber::registry()
        .with(LevelFilter::from_level(level))
        .with(layer)
        .try_init()
        .is_err()
    {
        log::debug!("Global subscriber already installed");
    }
}

#[cfg(not(target_os = "android"))]
fn install_subscriber(level: tracing::Level) {
    if tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        log::debug!("Global subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(tracing::Level::DEBUG);
        init_logging(tracing::Level::TRACE);
    }
}
