//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// Engine failure; the message is what ends up on the task record.
    #[error(transparent)]
    Media(#[from] grabq_media::MediaError),

    #[error("Job panicked: {0}")]
    Panicked(String),
}

impl WorkerError {
    pub fn panicked(msg: impl Into<String>) -> Self {
        Self::Panicked(msg.into())
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerError::Media(grabq_media::MediaError::YtDlpNotFound) => "engine_missing",
            WorkerError::Media(_) => "engine",
            WorkerError::Panicked(_) => "panic",
        }
    }
}
