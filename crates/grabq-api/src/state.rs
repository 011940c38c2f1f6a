//! Application state.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;

use grabq_media::MediaEngine;
use grabq_queue::{JobQueue, TaskStore};
use grabq_worker::{JobExecutor, WorkerConfig, WorkerStatus};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: TaskStore,
    pub queue: JobQueue,
    pub worker: WorkerStatus,
    /// Binary the readiness probe resolves
    pub ytdlp_bin: PathBuf,
}

impl AppState {
    /// Build the store and queue, spawn the single worker, and return the
    /// state handed to the router together with the worker's join handle.
    ///
    /// The API config owns the download directory; it overrides the worker's.
    pub fn start(
        config: ApiConfig,
        worker_config: &WorkerConfig,
        engine: Arc<dyn MediaEngine>,
    ) -> (Self, JoinHandle<()>) {
        let worker_config = WorkerConfig {
            download_dir: config.download_dir.clone(),
            ..worker_config.clone()
        };

        let store = TaskStore::new();
        let (queue, receiver) = grabq_queue::channel();
        let executor = JobExecutor::new(&worker_config, store.clone(), receiver, engine);

        let state = Self {
            config,
            store,
            queue,
            worker: executor.status(),
            ytdlp_bin: worker_config.ytdlp_bin.clone(),
        };

        (state, tokio::spawn(executor.run()))
    }
}
