//! Latest-known progress of a task.

use serde::{Deserialize, Serialize};

/// Snapshot of the most recent engine event for a task.
///
/// Only the latest snapshot is kept; it is overwritten on every callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProgressSnapshot {
    /// Waiting for the worker.
    #[default]
    Queued,

    /// Transfer in progress.
    Downloading {
        /// Percent complete, rounded to 2 decimals
        percent: Option<f64>,
        /// Transfer rate in bytes per second
        speed: Option<f64>,
        /// Estimated seconds remaining
        eta: Option<u64>,
        filename: Option<String>,
        /// 1-based position within a collection
        item: Option<u32>,
        /// Number of items in the collection
        of: Option<u32>,
    },

    /// One output file has been completed.
    Finished {
        filename: String,
        item: Option<u32>,
        of: Option<u32>,
    },

    /// Engine-reported diagnostic. Does not by itself end the task.
    Error { info: String },
}

impl ProgressSnapshot {
    /// Get string representation of the snapshot tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressSnapshot::Queued => "queued",
            ProgressSnapshot::Downloading { .. } => "downloading",
            ProgressSnapshot::Finished { .. } => "finished",
            ProgressSnapshot::Error { .. } => "error",
        }
    }
}

/// Round a percentage to two decimals.
pub fn round_percent(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
