//! Job executor.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tracing::{info, warn, Instrument};

use grabq_media::{build_engine_config, DispatchTarget, MediaEngine};
use grabq_models::{TaskId, TaskRecord};
use grabq_queue::{JobReceiver, TaskStore};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::sink::ProgressSink;

/// Whether the executor loop is still draining the queue.
#[derive(Debug, Clone, Default)]
pub struct WorkerStatus {
    running: Arc<AtomicBool>,
}

impl WorkerStatus {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn set(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }
}

/// Clears the status flag when the loop exits, including by panic.
struct RunningGuard(WorkerStatus);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Single consumer of the job queue. Runs one task at a time, in FIFO order.
pub struct JobExecutor {
    store: TaskStore,
    receiver: JobReceiver,
    engine: Arc<dyn MediaEngine>,
    target: DispatchTarget,
    status: WorkerStatus,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(
        config: &WorkerConfig,
        store: TaskStore,
        receiver: JobReceiver,
        engine: Arc<dyn MediaEngine>,
    ) -> Self {
        let target = DispatchTarget {
            download_dir: config.download_dir.clone(),
            ffmpeg_location: config.ffmpeg_location.clone(),
        };

        let status = WorkerStatus::default();
        // Counts as alive from construction so readiness holds before the first poll.
        status.set(true);

        Self {
            store,
            receiver,
            engine,
            target,
            status,
        }
    }

    /// Liveness handle shared with the HTTP layer.
    pub fn status(&self) -> WorkerStatus {
        self.status.clone()
    }

    /// Drain the queue until the shutdown sentinel arrives or every producer is gone.
    pub async fn run(mut self) {
        let _guard = RunningGuard(self.status.clone());
        info!(download_dir = %self.target.download_dir.display(), "Starting job executor");

        while let Some(task_id) = self.receiver.pop().await {
            self.execute_task(&task_id).await;
        }

        info!("Job executor stopped");
    }

    /// Run one task to a terminal state.
    async fn execute_task(&self, task_id: &TaskId) {
        let Some(record) = self.store.get(task_id) else {
            warn!(task_id = %task_id, "Dequeued unknown task, skipping");
            return;
        };

        let logger = JobLogger::new(task_id, record.mode.as_str());
        if let Err(e) = self.store.mark_processing(task_id) {
            logger.log_warning(&format!("not runnable: {}", e));
            return;
        }

        let span = logger.create_span();
        let started = Instant::now();
        logger.log_start(&record.url);
        metrics::record_job_started(record.mode.as_str());

        let result = self.fetch(&record).instrument(span).await;
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(()) => match self.store.mark_done(task_id) {
                Ok(done) => {
                    metrics::record_job_completed(record.mode.as_str(), done.files.len(), elapsed);
                    logger.log_completion(&format!("{} file(s) in {:.1}s", done.files.len(), elapsed));
                }
                Err(e) => logger.log_error(&format!("failed to mark done: {}", e)),
            },
            Err(e) => {
                let message = e.to_string();
                metrics::record_job_failed(record.mode.as_str(), e.kind(), elapsed);
                logger.log_error(&message);
                if let Err(e) = self.store.mark_error(task_id, message) {
                    logger.log_error(&format!("failed to mark error: {}", e));
                }
            }
        }
    }

    /// Invoke the engine, turning a panic into an ordinary job failure.
    async fn fetch(&self, record: &TaskRecord) -> WorkerResult<()> {
        let config = build_engine_config(&record.url, record.mode, &record.options, &self.target);
        let sink = ProgressSink::new(record.id.clone(), self.store.clone());

        match AssertUnwindSafe(self.engine.fetch(&config, sink.into_callback()))
            .catch_unwind()
            .await
        {
            Ok(result) => result.map_err(WorkerError::from),
            Err(payload) => Err(WorkerError::panicked(panic_message(payload.as_ref()))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use grabq_media::{EngineConfig, EngineEvent, EventCallback, MediaError, MediaResult};
    use grabq_models::{DownloadMode, FormatChoice, JobOptions, TaskStatus};
    use grabq_queue::JobQueue;

    #[derive(Clone)]
    enum Step {
        Emit(EngineEvent),
        Fail(String),
        Panic,
        WaitFor(Arc<Notify>),
    }

    /// Engine that replays a script per URL and records the configs it saw.
    #[derive(Default)]
    struct ScriptedEngine {
        scripts: Mutex<HashMap<String, Vec<Step>>>,
        seen: Mutex<Vec<EngineConfig>>,
    }

    impl ScriptedEngine {
        fn script(self, url: &str, steps: Vec<Step>) -> Self {
            self.scripts.lock().unwrap().insert(url.to_string(), steps);
            self
        }

        fn seen_urls(&self) -> Vec<String> {
            self.seen.lock().unwrap().iter().map(|c| c.url().to_string()).collect()
        }
    }

    #[async_trait]
    impl MediaEngine for ScriptedEngine {
        async fn fetch(&self, config: &EngineConfig, on_event: EventCallback) -> MediaResult<()> {
            self.seen.lock().unwrap().push(config.clone());
            let steps = self
                .scripts
                .lock()
                .unwrap()
                .get(config.url())
                .cloned()
                .unwrap_or_default();

            for step in steps {
                match step {
                    Step::Emit(event) => on_event(event),
                    Step::Fail(message) => return Err(MediaError::download_failed(message, Some(1))),
                    Step::Panic => panic!("engine blew up"),
                    Step::WaitFor(gate) => gate.notified().await,
                }
            }
            Ok(())
        }
    }

    fn finished(path: &str, item: Option<u32>, of: Option<u32>) -> Step {
        Step::Emit(EngineEvent::Finished {
            path: PathBuf::from(path),
            item,
            of,
        })
    }

    fn submit(store: &TaskStore, queue: &JobQueue, url: &str, mode: DownloadMode, options: JobOptions) -> TaskId {
        let id = TaskId::new();
        store.insert(TaskRecord::new(id.clone(), url, mode, options)).unwrap();
        queue.push(id.clone());
        id
    }

    fn start(engine: Arc<ScriptedEngine>) -> (TaskStore, JobQueue, tokio::task::JoinHandle<()>) {
        let store = TaskStore::new();
        let (queue, receiver) = grabq_queue::channel();
        let config = WorkerConfig {
            download_dir: PathBuf::from("/dl"),
            ..WorkerConfig::default()
        };
        let executor = JobExecutor::new(&config, store.clone(), receiver, engine);
        let handle = tokio::spawn(executor.run());
        (store, queue, handle)
    }

    async fn drain(queue: JobQueue, handle: tokio::task::JoinHandle<()>) {
        queue.shutdown();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_single_best_yields_one_file() {
        let engine = Arc::new(ScriptedEngine::default().script(
            "http://x/v",
            vec![
                Step::Emit(EngineEvent::Downloading {
                    percent: Some(50.0),
                    speed: None,
                    eta: None,
                    filename: Some("/dl/Clip [v].f137.mp4".into()),
                    item: None,
                    of: None,
                }),
                finished("/dl/Clip [v].mp4", None, None),
            ],
        ));
        let (store, queue, handle) = start(engine.clone());

        let id = submit(&store, &queue, "http://x/v", DownloadMode::Single, JobOptions::default());
        drain(queue, handle).await;

        let record = store.get(&id).unwrap();
        assert_eq!(record.status, TaskStatus::Done);
        assert_eq!(record.files, vec!["Clip [v].mp4"]);
        assert!(record.error.is_none());

        let seen = engine.seen.lock().unwrap();
        assert_eq!(seen[0].format(), "bestvideo+bestaudio/best");
        assert!(!seen[0].is_playlist());
    }

    #[tokio::test]
    async fn test_collection_files_in_order() {
        let engine = Arc::new(ScriptedEngine::default().script(
            "http://x/list",
            vec![
                finished("/dl/001 - a.mp4", Some(1), Some(3)),
                finished("/dl/002 - b.mp4", Some(2), Some(3)),
                finished("/dl/003 - c.mp4", Some(3), Some(3)),
            ],
        ));
        let (store, queue, handle) = start(engine.clone());

        let options = JobOptions {
            choice: FormatChoice::MaxHeight(720),
            ..JobOptions::default()
        };
        let id = submit(&store, &queue, "http://x/list", DownloadMode::Collection, options);
        drain(queue, handle).await;

        let record = store.get(&id).unwrap();
        assert_eq!(record.status, TaskStatus::Done);
        assert_eq!(record.files, vec!["001 - a.mp4", "002 - b.mp4", "003 - c.mp4"]);

        let seen = engine.seen.lock().unwrap();
        assert_eq!(seen[0].format(), "bestvideo[height<=720]+bestaudio/best");
        assert!(seen[0].is_playlist());
    }

    #[tokio::test]
    async fn test_failure_keeps_earlier_files() {
        let engine = Arc::new(ScriptedEngine::default().script(
            "http://x/list",
            vec![
                finished("/dl/001 - a.mp4", Some(1), Some(2)),
                Step::Emit(EngineEvent::Error {
                    message: "Video unavailable".into(),
                }),
                Step::Fail("Video unavailable".into()),
            ],
        ));
        let (store, queue, handle) = start(engine);

        let id = submit(&store, &queue, "http://x/list", DownloadMode::Collection, JobOptions::default());
        drain(queue, handle).await;

        let record = store.get(&id).unwrap();
        assert_eq!(record.status, TaskStatus::Error);
        assert_eq!(record.files, vec!["001 - a.mp4"]);
        assert!(record.error.as_deref().unwrap().contains("Video unavailable"));
    }

    #[tokio::test]
    async fn test_tasks_run_in_submission_order() {
        let engine = Arc::new(ScriptedEngine::default());
        let (store, queue, handle) = start(engine.clone());

        let first = submit(&store, &queue, "http://x/1", DownloadMode::Single, JobOptions::default());
        let second = submit(&store, &queue, "http://x/2", DownloadMode::Single, JobOptions::default());
        let third = submit(&store, &queue, "http://x/3", DownloadMode::Single, JobOptions::default());
        drain(queue, handle).await;

        assert_eq!(engine.seen_urls(), vec!["http://x/1", "http://x/2", "http://x/3"]);
        for id in [first, second, third] {
            assert_eq!(store.get(&id).unwrap().status, TaskStatus::Done);
        }
    }

    #[tokio::test]
    async fn test_second_task_waits_while_first_runs() {
        let gate = Arc::new(Notify::new());
        let engine = Arc::new(
            ScriptedEngine::default().script("http://x/slow", vec![Step::WaitFor(gate.clone())]),
        );
        let (store, queue, handle) = start(engine);

        let first = submit(&store, &queue, "http://x/slow", DownloadMode::Single, JobOptions::default());
        let second = submit(&store, &queue, "http://x/next", DownloadMode::Single, JobOptions::default());

        tokio::time::timeout(Duration::from_secs(5), async {
            while store.get(&first).unwrap().status != TaskStatus::Processing {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(store.get(&second).unwrap().status, TaskStatus::Queued);

        gate.notify_one();
        drain(queue, handle).await;

        assert_eq!(store.get(&first).unwrap().status, TaskStatus::Done);
        assert_eq!(store.get(&second).unwrap().status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let engine = Arc::new(ScriptedEngine::default().script("http://x/boom", vec![Step::Panic]));
        let (store, queue, handle) = start(engine);

        let boom = submit(&store, &queue, "http://x/boom", DownloadMode::Single, JobOptions::default());
        let after = submit(&store, &queue, "http://x/ok", DownloadMode::Single, JobOptions::default());
        drain(queue, handle).await;

        let record = store.get(&boom).unwrap();
        assert_eq!(record.status, TaskStatus::Error);
        assert!(record.error.as_deref().unwrap().contains("engine blew up"));
        assert_eq!(store.get(&after).unwrap().status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn test_unknown_task_is_skipped() {
        let engine = Arc::new(ScriptedEngine::default());
        let (store, queue, handle) = start(engine.clone());

        queue.push(TaskId::from_string("ghost"));
        let real = submit(&store, &queue, "http://x/real", DownloadMode::Single, JobOptions::default());
        drain(queue, handle).await;

        assert_eq!(engine.seen_urls(), vec!["http://x/real"]);
        assert_eq!(store.get(&real).unwrap().status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn test_audio_choice_extracts_audio() {
        let engine = Arc::new(ScriptedEngine::default());
        let (store, queue, handle) = start(engine.clone());

        let options = JobOptions {
            choice: FormatChoice::Audio,
            audio_format: "opus".into(),
            force_h264: true,
            ..JobOptions::default()
        };
        submit(&store, &queue, "http://x/a", DownloadMode::Single, options);
        drain(queue, handle).await;

        let seen = engine.seen.lock().unwrap();
        let extraction = seen[0].audio_extraction().expect("audio extraction");
        assert_eq!(extraction.codec, "opus");
        assert!(seen[0].merger_ffmpeg_args().is_empty());
    }

    #[tokio::test]
    async fn test_status_clears_when_loop_exits() {
        let store = TaskStore::new();
        let (queue, receiver) = grabq_queue::channel();
        let executor = JobExecutor::new(
            &WorkerConfig::default(),
            store.clone(),
            receiver,
            Arc::new(ScriptedEngine::default()),
        );
        let status = executor.status();
        assert!(status.is_running());

        let handle = tokio::spawn(executor.run());
        drain(queue, handle).await;
        assert!(!status.is_running());
    }
}
