//! Progress record (spec §3 "ProgressRecord", §9 "tagged variants").

use serde::{Deserialize, Serialize};

use crate::task::TaskId;

/// Closed status tag carried by a progress record. The source encodes this
/// as a free-form `type` string (`progress`, `completed`, `error`); we
/// encode it as a closed enum per spec §9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Processing,
    Completed,
    Failed,
    Cancelled,
}

/// The latest known state of a task (spec §3, §4.2). Only the latest record
/// per task is retained by the Progress Bus; `progress` must be
/// non-decreasing across a task's published records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub task_id: TaskId,
    pub status: ProgressStatus,
    /// Stage name (`parsing`, `storyboarding`, `rendering`, `composing`), if
    /// applicable. Absent for the initial/terminal-error records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    pub progress: u8,
    pub message: String,
    /// Free-form extra payload (e.g. the error string on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl ProgressRecord {
    pub fn new(task_id: TaskId, stage: impl Into<String>, progress: u8, message: impl Into<String>) -> Self {
        Self {
            task_id,
            status: ProgressStatus::Processing,
            stage: Some(stage.into()),
            progress,
            message: message.into(),
            extra: None,
        }
    }

    pub fn init(task_id: TaskId) -> Self {
        Self {
            task_id,
            status: ProgressStatus::Processing,
            stage: None,
            progress: 1,
            message: "initializing".to_string(),
            extra: None,
        }
    }

    pub fn completed(task_id: TaskId, message: impl Into<String>) -> Self {
        Self {
            task_id,
            status: ProgressStatus::Completed,
            stage: None,
            progress: 100,
            message: message.into(),
            extra: None,
        }
    }

    /// `progress` should be the last value published for this task so the
    /// monotonic-non-decreasing invariant (spec §8) holds across the
    /// terminal record.
    pub fn failed(task_id: TaskId, stage: impl Into<String>, progress: u8, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            task_id,
            status: ProgressStatus::Failed,
            stage: Some(stage.into()),
            progress,
            message: error.clone(),
            extra: Some(serde_json::json!({ "error": error })),
        }
    }

    pub fn cancelled(task_id: TaskId) -> Self {
        Self {
            task_id,
            status: ProgressStatus::Cancelled,
            stage: None,
            progress: 0,
            message: "cancelled".to_string(),
            extra: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            ProgressStatus::Completed | ProgressStatus::Failed | ProgressStatus::Cancelled
        )
    }
}
