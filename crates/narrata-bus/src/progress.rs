//! Progress Bus (spec §4.2): one broadcast channel per task, bounded so a
//! slow subscriber never blocks the publisher. Grounded on
//! `vclip-queue/src/progress.rs::ProgressChannel`'s publish/subscribe
//! surface, reimplemented in-memory per the "no durable task store"
//! Non-goal — `original_source/core/progress_tracker.py` is itself
//! memory-first with Redis only as an optional mirror, which this keeps
//! without the mirror.
//!
//! `tokio::sync::broadcast` already implements the "drop the oldest queued
//! record" rule spec.md §4.2 asks for: once a receiver falls more than
//! `capacity` records behind, its next `recv()` returns
//! `RecvError::Lagged(n)` instead of blocking the sender, which is exactly
//! the bounded drop-oldest overflow behavior required — the inverse of the
//! teacher's WS handler (`vclip-api/src/ws.rs::send_ws_message`), which
//! blocks on a slow client instead of dropping.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use narrata_models::{ProgressRecord, TaskId};

pub const DEFAULT_CAPACITY: usize = 16;

struct TaskChannel {
    latest: Option<ProgressRecord>,
    sender: broadcast::Sender<ProgressRecord>,
}

/// Publish-subscribe hub for `ProgressRecord`s, one lane per task.
#[derive(Clone)]
pub struct ProgressBus {
    inner: Arc<Mutex<HashMap<TaskId, TaskChannel>>>,
    capacity: usize,
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ProgressBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    /// Publish a record for its task, creating the task's lane if this is
    /// the first record. Never blocks: if there are no subscribers the
    /// record is simply dropped past `latest`.
    pub fn publish(&self, record: ProgressRecord) {
        let mut tasks = self.inner.lock().unwrap();
        let channel = tasks.entry(record.task_id.clone()).or_insert_with(|| {
            let (sender, _) = broadcast::channel(self.capacity);
            TaskChannel {
                latest: None,
                sender,
            }
        });
        channel.latest = Some(record.clone());
        let _ = channel.sender.send(record);
    }

    /// The last record published for `task_id`, if any.
    pub fn latest(&self, task_id: &TaskId) -> Option<ProgressRecord> {
        self.inner
            .lock()
            .unwrap()
            .get(task_id)
            .and_then(|c| c.latest.clone())
    }

    /// Subscribe to `task_id`'s lane. Returns the current latest record (if
    /// any existed before this call) alongside the receiver, since spec
    /// §4.2 requires "the first message after accept is the current latest".
    pub fn subscribe(&self, task_id: &TaskId) -> (Option<ProgressRecord>, broadcast::Receiver<ProgressRecord>) {
        let mut tasks = self.inner.lock().unwrap();
        let channel = tasks.entry(task_id.clone()).or_insert_with(|| {
            let (sender, _) = broadcast::channel(self.capacity);
            TaskChannel {
                latest: None,
                sender,
            }
        });
        (channel.latest.clone(), channel.sender.subscribe())
    }

    /// Drop a task's lane entirely, used by the Task Registry's TTL sweep
    /// (spec §4.3) so evicted tasks don't leak channels forever.
    pub fn remove(&self, task_id: &TaskId) {
        self.inner.lock().unwrap().remove(task_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use narrata_models::ProgressStatus;

    #[test]
    fn subscribe_before_any_publish_returns_no_latest() {
        let bus = ProgressBus::new(4);
        let task_id = TaskId::new();
        let (latest, _rx) = bus.subscribe(&task_id);
        assert!(latest.is_none());
    }

    #[tokio::test]
    async fn subscribe_after_publish_replays_latest_then_streams_new() {
        let bus = ProgressBus::new(4);
        let task_id = TaskId::new();

        bus.publish(ProgressRecord::new(task_id.clone(), "parsing", 10, "parsing"));
        let (latest, mut rx) = bus.subscribe(&task_id);
        assert_eq!(latest.unwrap().progress, 10);

        bus.publish(ProgressRecord::new(task_id.clone(), "storyboard", 30, "storyboard"));
        let next = rx.recv().await.unwrap();
        assert_eq!(next.progress, 30);
    }

    #[tokio::test]
    async fn slow_subscriber_lags_instead_of_blocking_publisher() {
        let bus = ProgressBus::new(2);
        let task_id = TaskId::new();
        let (_latest, mut rx) = bus.subscribe(&task_id);

        for i in 0..10u8 {
            bus.publish(ProgressRecord::new(task_id.clone(), "ticking", i, "tick"));
        }

        match rx.recv().await {
            Err(broadcast::error::RecvError::Lagged(_)) => {}
            other => panic!("expected Lagged, got {other:?}"),
        }
        let _ = ProgressStatus::Processing;
    }
}
