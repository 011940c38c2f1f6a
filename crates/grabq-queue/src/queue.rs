//! Unbounded FIFO job queue.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use grabq_models::TaskId;

enum QueueMessage {
    Job(TaskId),
    Shutdown,
}

/// Create a job queue and its single consumer end.
///
/// The receiver is not `Clone`: whoever owns it is the only worker.
pub fn channel() -> (JobQueue, JobReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));

    (
        JobQueue {
            tx,
            depth: Arc::clone(&depth),
        },
        JobReceiver { rx, depth },
    )
}

/// Producer handle. Cheap to clone.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<QueueMessage>,
    depth: Arc<AtomicUsize>,
}

impl JobQueue {
    /// Enqueue a task id. Never blocks; no priority, no deduplication.
    ///
    /// If the worker is gone the id is dropped with a warning and its record
    /// stays queued.
    pub fn push(&self, id: TaskId) {
        self.depth.fetch_add(1, Ordering::SeqCst);
        match self.tx.send(QueueMessage::Job(id)) {
            Ok(()) => debug!("Enqueued task, depth={}", self.depth()),
            Err(mpsc::error::SendError(message)) => {
                self.depth.fetch_sub(1, Ordering::SeqCst);
                if let QueueMessage::Job(id) = message {
                    warn!(task_id = %id, "Worker is not running, task abandoned in queue");
                }
            }
        }
    }

    /// Enqueue the shutdown sentinel behind everything already queued.
    pub fn shutdown(&self) {
        if self.tx.send(QueueMessage::Shutdown).is_ok() {
            info!("Queued shutdown sentinel");
        }
    }

    /// Number of ids waiting to be popped.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// True once the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl std::fmt::Debug for QueueMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueMessage::Job(id) => write!(f, "Job({})", id),
            QueueMessage::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Consumer end of the queue.
#[derive(Debug)]
pub struct JobReceiver {
    rx: mpsc::UnboundedReceiver<QueueMessage>,
    depth: Arc<AtomicUsize>,
}

impl JobReceiver {
    /// Wait for the next id.
    ///
    /// Returns `None` on the shutdown sentinel or when every producer
    /// handle has been dropped.
    pub async fn pop(&mut self) -> Option<TaskId> {
        match self.rx.recv().await? {
            QueueMessage::Job(id) => {
                self.depth.fetch_sub(1, Ordering::SeqCst);
                Some(id)
            }
            QueueMessage::Shutdown => None,
        }
    }
}
