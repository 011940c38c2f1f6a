//! Download worker.
//!
//! This crate provides:
//! - The single job executor draining the queue
//! - The progress sink feeding engine events into the task store
//! - Job metrics and structured job logging

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod sink;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::{JobExecutor, WorkerStatus};
pub use logging::JobLogger;
pub use sink::ProgressSink;
