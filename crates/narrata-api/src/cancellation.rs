//! Per-task cancellation registry (spec §5 "A `cancel(task_id)` signals a
//! cancellation token"). Grounded on `narrata_bus::TaskRegistry`'s
//! in-memory, `Arc<Mutex<HashMap<...>>>`-backed shape, but keyed to
//! `watch::Sender`s instead of `Task`s: the orchestrator only ever reads
//! its `watch::Receiver`, so the sender half must outlive the spawned task
//! or the channel closes and cancellation can never be signaled.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use narrata_models::TaskId;
use tokio::sync::watch;

#[derive(Clone, Default)]
pub struct CancellationRegistry {
    inner: Arc<Mutex<HashMap<TaskId, watch::Sender<bool>>>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly submitted task and return the receiver the
    /// orchestrator should watch. The sender is held here, not dropped,
    /// so `cancel` can reach it for the task's entire lifetime.
    pub fn register(&self, task_id: TaskId) -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        self.inner.lock().unwrap().insert(task_id, tx);
        rx
    }

    /// Signal cancellation for a task. Returns `false` if the task is
    /// unknown or has already reached a terminal state (its sender was
    /// already removed).
    pub fn cancel(&self, task_id: &TaskId) -> bool {
        match self.inner.lock().unwrap().get(task_id) {
            Some(tx) => tx.send(true).is_ok(),
            None => false,
        }
    }

    /// Drop a task's sender once it has reached a terminal state, so the
    /// map doesn't grow unbounded for the life of the process.
    pub fn remove(&self, task_id: &TaskId) {
        self.inner.lock().unwrap().remove(task_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_returns_false_for_unknown_task() {
        let registry = CancellationRegistry::new();
        assert!(!registry.cancel(&TaskId::new()));
    }

    #[test]
    fn cancel_signals_the_registered_receiver() {
        let registry = CancellationRegistry::new();
        let task_id = TaskId::new();
        let rx = registry.register(task_id.clone());

        assert!(registry.cancel(&task_id));
        assert!(*rx.borrow());
    }

    #[test]
    fn remove_makes_the_task_uncancellable() {
        let registry = CancellationRegistry::new();
        let task_id = TaskId::new();
        let _rx = registry.register(task_id.clone());
        registry.remove(&task_id);

        assert!(!registry.cancel(&task_id));
    }
}
