use std::collections::VecDeque;

use crate::source::SourceHandle;

/// Sources waiting for the listener to come up.
///
/// The queue is open while no listener exists. Activation closes it and
/// drains it in one step, so an enqueue either lands before the drain or is
/// refused and handled by the caller.
pub(crate) struct PendingSourceQueue {
    queue: VecDeque<SourceHandle>,
    open: bool,
}

impl PendingSourceQueue {
    pub(crate) fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            open: true,
        }
    }

    /// Append `source`; returns `false` (and drops nothing) when closed.
    pub(crate) fn push(&mut self, source: SourceHandle) -> bool {
        if !self.open {
            return false;
        }
        self.queue.push_back(source);
        true
    }

    /// Close the queue and hand over its contents in insertion order.
    pub(crate) fn close_and_drain(&mut self) -> Vec<SourceHandle> {
        self.open = false;
        self.queue.drain(..).collect()
    }

    pub(crate) fn reopen(&mut self) {
        self.open = true;
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::SimulatedRuntime;
    use crate::source::{ManagedSource, SpatialSource};
    use std::sync::Arc;

    fn source(id: u64) -> SourceHandle {
        Arc::new(ManagedSource::new(id, Arc::new(SimulatedRuntime::new())))
    }

    #[test]
    fn drains_in_insertion_order() {
        let mut queue = PendingSourceQueue::new();
        for id in [4, 1, 9] {
            assert!(queue.push(source(id)));
        }

        let ids: Vec<_> = queue.close_and_drain().iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec![4, 1, 9]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn closed_queue_refuses_until_reopened() {
        let mut queue = PendingSourceQueue::new();
        assert!(queue.close_and_drain().is_empty());
        assert!(!queue.push(source(1)));
        assert_eq!(queue.len(), 0);

        queue.reopen();
        assert!(queue.push(source(2)));
        assert_eq!(queue.len(), 1);
    }
}
