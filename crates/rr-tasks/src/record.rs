//! Task records and their state machine.
//!
//! ```text
//! queued ──claim──▶ running ──finish──▶ succeeded | failed
//!    │                 │
//!    └─────finish──────┘   (panics, lease expiry)
//! ```
//!
//! Every mutation is a method on [`TaskRecord`] that returns `false` when
//! the transition is not allowed, so stores only need to apply a closure
//! atomically.  A terminal record never changes again.

use std::fmt;

use serde::{Deserialize, Serialize};

use rr_core::{LocationPair, TaskId};
use rr_output::ArtifactRef;
use rr_pipeline::{ErrorCategory, Progress, Stage};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Queued    => "queued",
            TaskState::Running   => "running",
            TaskState::Succeeded => "succeeded",
            TaskState::Failed    => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal error reported to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub category: ErrorCategory,
    pub message:  String,
}

impl TaskFailure {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self { category, message: message.into() }
    }
}

/// How a task ended.
#[derive(Clone, Debug, PartialEq)]
pub enum TaskOutcome {
    Succeeded(ArtifactRef),
    Failed(TaskFailure),
}

// ── Record ────────────────────────────────────────────────────────────────────

/// Everything known about one task.  Timestamps are Unix milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id:          TaskId,
    pub pair:        LocationPair,
    pub state:       TaskState,
    pub progress:    Progress,
    pub artifact:    Option<ArtifactRef>,
    pub error:       Option<TaskFailure>,
    pub created_ms:  u64,
    /// Last state change or progress publication; drives the lease.
    pub updated_ms:  u64,
    /// Set once the task is terminal; drives retention.
    pub finished_ms: Option<u64>,
}

impl TaskRecord {
    pub fn new(id: TaskId, pair: LocationPair, now_ms: u64) -> Self {
        Self {
            id,
            pair,
            state:       TaskState::Queued,
            progress:    Progress::new(Stage::Queued, "Waiting for a worker"),
            artifact:    None,
            error:       None,
            created_ms:  now_ms,
            updated_ms:  now_ms,
            finished_ms: None,
        }
    }

    /// `queued → running`.  Succeeds at most once per record.
    pub fn claim(&mut self, now_ms: u64) -> bool {
        if self.state != TaskState::Queued {
            return false;
        }
        self.state = TaskState::Running;
        self.updated_ms = now_ms;
        true
    }

    /// Record a progress publication from the running pipeline.
    ///
    /// Refused unless the task is running and `progress` moves forward.
    /// Terminal stages are written by [`finish`](Self::finish) together
    /// with the outcome, never here.
    pub fn advance(&mut self, progress: &Progress, now_ms: u64) -> bool {
        if self.state != TaskState::Running
            || progress.stage.is_terminal()
            || !progress.follows(&self.progress)
        {
            return false;
        }
        self.progress = progress.clone();
        self.updated_ms = now_ms;
        true
    }

    /// Move to a terminal state.  Refused if already terminal.
    pub fn finish(&mut self, outcome: TaskOutcome, now_ms: u64) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        match outcome {
            TaskOutcome::Succeeded(artifact) => {
                self.state = TaskState::Succeeded;
                self.progress = Progress::new(Stage::Complete, format!("Map saved to {artifact}"));
                self.artifact = Some(artifact);
            }
            TaskOutcome::Failed(failure) => {
                self.state = TaskState::Failed;
                self.progress = Progress::new(Stage::Failed, failure.message.clone());
                self.error = Some(failure);
            }
        }
        self.updated_ms = now_ms;
        self.finished_ms = Some(now_ms);
        true
    }

    /// Running with no progress for longer than `lease_ms`.
    pub fn lease_lapsed(&self, now_ms: u64, lease_ms: u64) -> bool {
        self.state == TaskState::Running && now_ms.saturating_sub(self.updated_ms) > lease_ms
    }

    /// Finished longer than `retention_ms` ago.
    pub fn expired(&self, now_ms: u64, retention_ms: u64) -> bool {
        self.finished_ms
            .is_some_and(|done| now_ms.saturating_sub(done) > retention_ms)
    }

    pub fn status(&self) -> TaskStatus {
        TaskStatus {
            id:      self.id,
            state:   self.state,
            stage:   self.progress.stage,
            percent: self.progress.percent,
            detail:  self.progress.detail.clone(),
            error:   self.error.clone(),
        }
    }
}

/// What `poll` reports.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub id:      TaskId,
    pub state:   TaskState,
    pub stage:   Stage,
    pub percent: u8,
    pub detail:  String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error:   Option<TaskFailure>,
}
