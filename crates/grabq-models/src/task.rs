//! Task records and their lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::{DownloadMode, JobOptions, ProgressSnapshot};

/// Unique identifier for a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate a new random task ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Task processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in the queue
    #[default]
    Queued,
    /// Being executed by the worker
    Processing,
    /// Finished successfully
    Done,
    /// Finished with a failure
    Error,
}

impl TaskStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Processing => "processing",
            TaskStatus::Done => "done",
            TaskStatus::Error => "error",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Error)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejected lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition {from} -> {to}")]
pub struct TransitionError {
    pub from: TaskStatus,
    pub to: TaskStatus,
}

/// One submitted download job.
///
/// `status` only moves queued -> processing -> {done | error}. Once the
/// record is terminal every mutator refuses the change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub url: String,
    pub mode: DownloadMode,
    pub options: JobOptions,
    pub status: TaskStatus,
    pub progress: ProgressSnapshot,
    /// Output base names, in completion order
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Create a queued record.
    pub fn new(id: TaskId, url: impl Into<String>, mode: DownloadMode, options: JobOptions) -> Self {
        Self {
            id,
            url: url.into(),
            mode,
            options,
            status: TaskStatus::Queued,
            progress: ProgressSnapshot::Queued,
            files: Vec::new(),
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// queued -> processing
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(TaskStatus::Queued, TaskStatus::Processing)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// processing -> done
    pub fn complete(&mut self) -> Result<(), TransitionError> {
        self.transition(TaskStatus::Processing, TaskStatus::Done)?;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// processing -> error, recording the failure message.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(TaskStatus::Processing, TaskStatus::Error)?;
        self.error = Some(message.into());
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Overwrite the progress snapshot. Returns `false` once terminal.
    pub fn set_progress(&mut self, progress: ProgressSnapshot) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.progress = progress;
        true
    }

    /// Append an output name. Only accepted while processing.
    pub fn push_file(&mut self, name: impl Into<String>) -> bool {
        if self.status != TaskStatus::Processing {
            return false;
        }
        self.files.push(name.into());
        true
    }

    /// Wall-clock execution time, once both ends are known.
    pub fn run_duration(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }

    fn transition(&mut self, expected: TaskStatus, to: TaskStatus) -> Result<(), TransitionError> {
        if self.status != expected {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
