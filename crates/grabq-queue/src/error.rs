//! Queue error types.

use thiserror::Error;

use grabq_models::{TaskId, TransitionError};

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Task already exists: {0}")]
    DuplicateTask(TaskId),

    #[error("Task {id}: {source}")]
    InvalidTransition {
        id: TaskId,
        #[source]
        source: TransitionError,
    },
}

impl QueueError {
    pub fn not_found(id: &TaskId) -> Self {
        Self::TaskNotFound(id.clone())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, QueueError::TaskNotFound(_))
    }
}
