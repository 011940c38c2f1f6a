//! Progress sink: engine events to task record updates.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use grabq_media::{EngineEvent, EventCallback};
use grabq_models::progress::round_percent;
use grabq_models::{ProgressSnapshot, TaskId};
use grabq_queue::TaskStore;

/// Callback target bound to one task.
///
/// Never changes `status`; terminal transitions belong to the worker loop.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    task_id: TaskId,
    store: TaskStore,
}

impl ProgressSink {
    pub fn new(task_id: TaskId, store: TaskStore) -> Self {
        Self { task_id, store }
    }

    /// Apply one engine event to the bound record.
    pub fn handle(&self, event: EngineEvent) {
        let snapshot = match event {
            EngineEvent::Downloading {
                percent,
                speed,
                eta,
                filename,
                item,
                of,
            } => ProgressSnapshot::Downloading {
                percent: percent.map(round_percent),
                speed,
                eta,
                filename,
                item,
                of,
            },
            EngineEvent::Finished { path, item, of } => {
                let name = base_name(&path);
                if !self.store.push_file(&self.task_id, name.clone()) {
                    debug!(task_id = %self.task_id, file = %name, "Dropped finished file for inactive task");
                }
                ProgressSnapshot::Finished {
                    filename: path.to_string_lossy().to_string(),
                    item,
                    of,
                }
            }
            EngineEvent::Error { message } => ProgressSnapshot::Error { info: message },
        };

        if !self.store.set_progress(&self.task_id, snapshot) {
            debug!(task_id = %self.task_id, "Dropped progress for inactive task");
        }
    }

    /// Wrap into the callback type the engine expects.
    pub fn into_callback(self) -> EventCallback {
        Arc::new(move |event| self.handle(event))
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
