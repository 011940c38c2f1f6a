//! In-memory task store and job queue.
//!
//! This crate provides:
//! - The process-wide task store shared by the API and the worker
//! - An unbounded FIFO of task ids with a single consumer
//!
//! Nothing is persisted; a restart forgets every task.

pub mod error;
pub mod queue;
pub mod store;

pub use error::{QueueError, QueueResult};
pub use queue::{channel, JobQueue, JobReceiver};
pub use store::TaskStore;
