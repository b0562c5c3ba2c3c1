//! Listener lifecycle telemetry.
//!
//! The bus multiplexes lifecycle events into a bounded history plus a
//! broadcast stream, so hosts can either poll the recent events or
//! subscribe to them.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::engine::AudioEngineKind;
use crate::source::SourceId;

/// Lifecycle event with a timestamp relative to bus creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerEvent {
    pub timestamp_ms: u64,
    pub kind: ListenerEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListenerEventKind {
    ActivationStarted {
        engine: AudioEngineKind,
    },
    Activated {
        engine: AudioEngineKind,
        sample_rate: u32,
        frame_size: u32,
    },
    ActivationFailed {
        code: i32,
        message: String,
    },
    SourceInitialized {
        source: SourceId,
    },
    SourceInitFailed {
        source: SourceId,
        code: i32,
    },
    /// More sources were queued than the listener was created for
    SourceCapExceeded {
        queued: usize,
        max_sources: u32,
    },
    SourcesReleased {
        count: usize,
    },
    Deactivated,
}

/// Broadcast channel plus bounded history of listener events.
pub struct TelemetryBus {
    tx: broadcast::Sender<ListenerEvent>,
    history: Mutex<VecDeque<ListenerEvent>>,
    history_capacity: usize,
    start_instant: Instant,
}

impl TelemetryBus {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            start_instant: Instant::now(),
        }
    }

    pub fn publish(&self, kind: ListenerEventKind) {
        let event = ListenerEvent {
            timestamp_ms: self.start_instant.elapsed().as_millis() as u64,
            kind,
        };

        if self.history_capacity > 0 {
            let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
            if history.len() == self.history_capacity {
                history.pop_front();
            }
            history.push_back(event.clone());
        }

        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListenerEvent> {
        self.tx.subscribe()
    }

    /// Events still held in the history, oldest first.
    pub fn recent(&self) -> Vec<ListenerEvent> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

impl Default for TelemetryBus {
    fn default() -> Self {
        Self::new(128, 64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_bounded_and_ordered() {
        let bus = TelemetryBus::new(8, 2);
        bus.publish(ListenerEventKind::ActivationStarted {
            engine: AudioEngineKind::Unity,
        });
        bus.publish(ListenerEventKind::SourceInitialized { source: 1 });
        bus.publish(ListenerEventKind::Deactivated);

        let recent = bus.recent();
        assert_eq!(recent.len(), 2);
        assert_eq!(
            recent[0].kind,
            ListenerEventKind::SourceInitialized { source: 1 }
        );
        assert_eq!(recent[1].kind, ListenerEventKind::Deactivated);
    }

    #[test]
    fn subscribers_receive_events() {
        let bus = TelemetryBus::default();
        let mut rx = bus.subscribe();
        bus.publish(ListenerEventKind::SourcesReleased { count: 2 });

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, ListenerEventKind::SourcesReleased { count: 2 });
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = ListenerEvent {
            timestamp_ms: 5,
            kind: ListenerEventKind::SourceCapExceeded {
                queued: 3,
                max_sources: 2,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"]["type"], "source_cap_exceeded");
        assert_eq!(json["kind"]["queued"], 3);
    }
}
