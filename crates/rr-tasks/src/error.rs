//! Task-layer errors.

use thiserror::Error;

use rr_core::TaskId;
use rr_pipeline::{ErrorCategory, PipelineError};

use crate::TaskState;

#[derive(Debug, Error)]
pub enum TaskError {
    /// A location was empty after normalization.  Nothing was queued.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// `poll` on an id that was never issued or has been evicted.
    #[error("unknown task {0}")]
    UnknownTask(TaskId),

    /// `fetch_result` on a task that is still queued or running.
    #[error("task {id} is not ready ({state})")]
    NotReady { id: TaskId, state: TaskState },

    /// `fetch_result` on an unknown, expired or failed task.
    #[error("no result for task {0}")]
    NotFound(TaskId),

    /// A synchronous run failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// `run` was called from one of the manager's own workers.
    #[error("synchronous run called from a task worker thread")]
    WorkerThread,

    #[error("task worker could not be started: {0}")]
    Spawn(#[from] std::io::Error),

    /// Every worker thread has exited; nothing can be queued.
    #[error("no task worker is running")]
    NoWorkers,

    #[error("task store error: {0}")]
    Store(String),

    #[error("task record encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl TaskError {
    /// The client-facing category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            TaskError::InvalidInput(_)                 => ErrorCategory::InvalidInput,
            TaskError::Pipeline(e)                     => e.category(),
            TaskError::UnknownTask(_)
            | TaskError::NotReady { .. }
            | TaskError::NotFound(_)
            | TaskError::WorkerThread
            | TaskError::Spawn(_)
            | TaskError::NoWorkers
            | TaskError::Store(_)
            | TaskError::Json(_)                       => ErrorCategory::Internal,
            #[cfg(feature = "sqlite")]
            TaskError::Sqlite(_)                       => ErrorCategory::Internal,
        }
    }
}

pub type TaskResult<T> = Result<T, TaskError>;
