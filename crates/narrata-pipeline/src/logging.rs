//! Structured per-task logging utilities.
//!
//! Keeps `task_id`/`stage` attached to every log line instead of repeating
//! them at each call site. Grounded on the teacher's `JobLogger`.

use tracing::{error, info, warn, Span};

use narrata_models::TaskId;

/// Task logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct TaskLogger {
    task_id: String,
    stage: String,
}

impl TaskLogger {
    /// Create a new task logger for a specific task and stage.
    pub fn new(task_id: &TaskId, stage: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            stage: stage.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(task_id = %self.task_id, stage = %self.stage, "stage started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(task_id = %self.task_id, stage = %self.stage, "stage progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(task_id = %self.task_id, stage = %self.stage, "stage warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(task_id = %self.task_id, stage = %self.stage, "stage error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(task_id = %self.task_id, stage = %self.stage, "stage completed: {}", message);
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Create a tracing span for this task, to attach additional
    /// structured fields beyond `task_id`/`stage`.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("task", task_id = %self.task_id, stage = %self.stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_task_id_and_stage() {
        let task_id = TaskId::new();
        let logger = TaskLogger::new(&task_id, "parsing");

        assert_eq!(logger.task_id(), task_id.to_string());
        assert_eq!(logger.stage(), "parsing");
    }
}
