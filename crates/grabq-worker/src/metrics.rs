//! Job metrics recorded by the worker.
//!
//! No-ops unless the binary installs a recorder.

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_STARTED_TOTAL: &str = "grabq_jobs_started_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "grabq_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "grabq_jobs_failed_total";
    pub const JOB_DURATION_SECONDS: &str = "grabq_job_duration_seconds";
    pub const FILES_DOWNLOADED_TOTAL: &str = "grabq_files_downloaded_total";
    pub const WORKER_BUSY: &str = "grabq_worker_busy";
}

/// Record job start.
pub fn record_job_started(mode: &str) {
    let labels = [("mode", mode.to_string())];
    counter!(names::JOBS_STARTED_TOTAL, &labels).increment(1);
    gauge!(names::WORKER_BUSY).set(1.0);
}

/// Record job completed.
pub fn record_job_completed(mode: &str, files: usize, duration_secs: f64) {
    let labels = [("mode", mode.to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
    counter!(names::FILES_DOWNLOADED_TOTAL, &labels).increment(files as u64);
    histogram!(names::JOB_DURATION_SECONDS, &labels).record(duration_secs);
    gauge!(names::WORKER_BUSY).set(0.0);
}

/// Record job failed.
pub fn record_job_failed(mode: &str, reason: &str, duration_secs: f64) {
    let labels = [("mode", mode.to_string()), ("reason", reason.to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
    let mode_label = [("mode", mode.to_string())];
    histogram!(names::JOB_DURATION_SECONDS, &mode_label).record(duration_secs);
    gauge!(names::WORKER_BUSY).set(0.0);
}
