//! Shared data models for grabq.
//!
//! This crate provides Serde-serializable types for:
//! - Task records and their lifecycle
//! - Download modes and format choices
//! - Progress snapshots reported to polling clients

pub mod options;
pub mod progress;
pub mod task;

// Re-export common types
pub use options::{DownloadMode, FormatChoice, JobOptions, ParseModeError};
pub use progress::ProgressSnapshot;
pub use task::{TaskId, TaskRecord, TaskStatus, TransitionError};
