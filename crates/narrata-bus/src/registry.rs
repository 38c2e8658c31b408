//! Task Registry (spec §3 "Task", §4.3 "Task Registry"): the authoritative
//! record of every submitted task's lifecycle, independent of the Progress
//! Bus's transient pub/sub lane. Grounded on
//! `original_source/core/task_manager.py::TaskManager`, which keeps an
//! in-memory dict of tasks and periodically evicts old completed/failed
//! ones (`cleanup_completed_tasks`); generalized here to a TTL sweep rather
//! than a fixed-count cap, per spec §4.3's "tasks are retained for at least
//! `TASK_TTL` after completion" wording.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use narrata_models::{RenderResult, Task, TaskId, TaskStatus};
use tokio::task::JoinHandle;

use crate::ProgressBus;

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// In-memory task lifecycle store. No durable backing per the "no durable
/// task store" Non-goal — a process restart loses all tasks, same as the
/// Progress Bus.
#[derive(Clone)]
pub struct TaskRegistry {
    inner: Arc<Mutex<HashMap<TaskId, Task>>>,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a freshly submitted task in `Pending` state.
    pub fn create(&self, task_id: TaskId) -> Task {
        let task = Task::new(task_id.clone());
        self.inner.lock().unwrap().insert(task_id, task.clone());
        task
    }

    pub fn get(&self, task_id: &TaskId) -> Option<Task> {
        self.inner.lock().unwrap().get(task_id).cloned()
    }

    pub fn mark_running(&self, task_id: &TaskId) {
        self.update(task_id, |task| {
            task.status = TaskStatus::Running;
        });
    }

    pub fn mark_completed(&self, task_id: &TaskId, result: RenderResult) {
        self.update(task_id, |task| {
            task.status = TaskStatus::Completed;
            task.completed_at = Some(Utc::now());
            task.result = Some(result);
        });
    }

    pub fn mark_failed(&self, task_id: &TaskId, stage: impl Into<String>, error: impl Into<String>) {
        self.update(task_id, |task| {
            task.status = TaskStatus::Failed;
            task.completed_at = Some(Utc::now());
            task.failed_stage = Some(stage.into());
            task.error = Some(error.into());
        });
    }

    pub fn mark_cancelled(&self, task_id: &TaskId) {
        self.update(task_id, |task| {
            task.status = TaskStatus::Cancelled;
            task.completed_at = Some(Utc::now());
        });
    }

    fn update(&self, task_id: &TaskId, f: impl FnOnce(&mut Task)) {
        if let Some(task) = self.inner.lock().unwrap().get_mut(task_id) {
            f(task);
        }
    }

    /// Remove every terminal task whose `completed_at` is older than `ttl`,
    /// dropping its Progress Bus lane too so the two stores stay in sync.
    /// Returns the number of tasks evicted.
    pub fn sweep(&self, bus: &ProgressBus, ttl: Duration) -> usize {
        let cutoff = Utc::now() - chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
        let mut tasks = self.inner.lock().unwrap();
        let expired: Vec<TaskId> = tasks
            .values()
            .filter(|task| task.status.is_terminal())
            .filter(|task| task.completed_at.map(|at| at < cutoff).unwrap_or(false))
            .map(|task| task.task_id.clone())
            .collect();
        for task_id in &expired {
            tasks.remove(task_id);
            bus.remove(task_id);
        }
        expired.len()
    }

    /// Spawn a background sweeper that evicts terminal tasks older than
    /// `ttl` every `interval`. The handle is owned by the caller (typically
    /// dropped with the server, since the registry itself only lives as
    /// long as the process).
    pub fn spawn_sweeper(&self, bus: ProgressBus, interval: Duration, ttl: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let evicted = registry.sweep(&bus, ttl);
                if evicted > 0 {
                    tracing::debug!(evicted, "swept expired tasks from registry");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn sample_result() -> RenderResult {
        let mut result = RenderResult::new(Vec::new());
        result.video_path = Some("out.mp4".to_string());
        result.duration = Some(12.5);
        result
    }

    #[test]
    fn create_then_get_round_trips_pending_task() {
        let registry = TaskRegistry::new();
        let task_id = TaskId::new();
        registry.create(task_id.clone());

        let task = registry.get(&task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn mark_completed_sets_status_and_result() {
        let registry = TaskRegistry::new();
        let task_id = TaskId::new();
        registry.create(task_id.clone());
        registry.mark_running(&task_id);
        registry.mark_completed(&task_id, sample_result());

        let task = registry.get(&task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.completed_at.is_some());
        assert!(task.result.is_some());
    }

    #[test]
    fn mark_failed_records_stage_and_error() {
        let registry = TaskRegistry::new();
        let task_id = TaskId::new();
        registry.create(task_id.clone());
        registry.mark_failed(&task_id, "rendering", "ffmpeg exploded");

        let task = registry.get(&task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.failed_stage.as_deref(), Some("rendering"));
        assert_eq!(task.error.as_deref(), Some("ffmpeg exploded"));
    }

    #[test]
    fn sweep_only_evicts_terminal_tasks_past_ttl() {
        let registry = TaskRegistry::new();
        let bus = ProgressBus::new(4);

        let pending_id = TaskId::new();
        registry.create(pending_id.clone());

        let fresh_done_id = TaskId::new();
        registry.create(fresh_done_id.clone());
        registry.mark_completed(&fresh_done_id, sample_result());

        let evicted = registry.sweep(&bus, Duration::from_secs(3600));
        assert_eq!(evicted, 0);
        assert!(registry.get(&pending_id).is_some());
        assert!(registry.get(&fresh_done_id).is_some());

        let stale_done_id = TaskId::new();
        registry.create(stale_done_id.clone());
        registry.mark_completed(&stale_done_id, sample_result());
        registry.update(&stale_done_id, |task| {
            task.completed_at = Some(Utc::now() - chrono::Duration::hours(2));
        });

        let evicted = registry.sweep(&bus, Duration::from_secs(3600));
        assert_eq!(evicted, 1);
        assert!(registry.get(&stale_done_id).is_none());
        assert!(registry.get(&pending_id).is_some());
    }
}
