//! Process-wide task store.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use grabq_models::{ProgressSnapshot, TaskId, TaskRecord};

use crate::error::{QueueError, QueueResult};

/// In-memory map of task id to record.
///
/// Cloning shares the same map. Readers always get an owned snapshot;
/// writers go through the lifecycle methods, which refuse to touch a
/// terminal record. Records are never evicted.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Arc<RwLock<HashMap<TaskId, TaskRecord>>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly created record. Ids are never reused.
    pub fn insert(&self, record: TaskRecord) -> QueueResult<()> {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        if tasks.contains_key(&record.id) {
            return Err(QueueError::DuplicateTask(record.id));
        }
        debug!(task_id = %record.id, "Stored task");
        tasks.insert(record.id.clone(), record);
        Ok(())
    }

    /// Latest snapshot of a record.
    pub fn get(&self, id: &TaskId) -> Option<TaskRecord> {
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.tasks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// queued -> processing
    pub fn mark_processing(&self, id: &TaskId) -> QueueResult<()> {
        self.transition(id, TaskRecord::start).map(|_| ())
    }

    /// processing -> done. Returns the final snapshot.
    pub fn mark_done(&self, id: &TaskId) -> QueueResult<TaskRecord> {
        self.transition(id, TaskRecord::complete)
    }

    /// processing -> error. Returns the final snapshot.
    pub fn mark_error(&self, id: &TaskId, message: impl Into<String>) -> QueueResult<TaskRecord> {
        let message = message.into();
        self.transition(id, |record| record.fail(message))
    }

    /// Overwrite the progress snapshot. `false` if absent or terminal.
    pub fn set_progress(&self, id: &TaskId, progress: ProgressSnapshot) -> bool {
        self.update(id, |record| record.set_progress(progress))
            .unwrap_or(false)
    }

    /// Append an output name. `false` if absent or not processing.
    pub fn push_file(&self, id: &TaskId, name: impl Into<String>) -> bool {
        let name = name.into();
        self.update(id, |record| record.push_file(name))
            .unwrap_or(false)
    }

    fn update<T>(&self, id: &TaskId, f: impl FnOnce(&mut TaskRecord) -> T) -> Option<T> {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        tasks.get_mut(id).map(f)
    }

    fn transition<F>(&self, id: &TaskId, f: F) -> QueueResult<TaskRecord>
    where
        F: FnOnce(&mut TaskRecord) -> Result<(), grabq_models::TransitionError>,
    {
        self.update(id, |record| {
            f(record)
                .map(|()| record.clone())
                .map_err(|source| QueueError::InvalidTransition {
                    id: id.clone(),
                    source,
                })
        })
        .ok_or_else(|| QueueError::not_found(id))?
    }
}
