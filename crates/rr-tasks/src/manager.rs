//! The task manager: submit, poll, fetch, and synchronous runs.
//!
//! ```text
//! submit ─▶ validate ─▶ insert(queued) ─▶ job channel ─┐
//!                                                      ▼
//!            worker thread: claim ─▶ pipeline.run_as(task id) ─▶ finish
//!                                         │
//!                                 progress ─▶ store.update
//! ```
//!
//! Workers are plain named threads draining one shared channel.  A worker
//! takes the next job only after the current one is finished, so a task
//! never runs inside another task's stages.
//!
//! Polls and fetches only read records, plus housekeeping that runs on
//! every call: finished records past the retention window are evicted, a
//! running record whose lease has lapsed is failed with `lease_expired`,
//! and a queued record that no worker of this manager will ever pick up is
//! failed the same way.
//!
//! A store belongs to one manager.  Records left unfinished by an earlier
//! process are failed when the manager is built.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use crossbeam_channel::{Receiver, Sender, unbounded};
use dashmap::DashSet;
use tracing::{debug, error, info, warn};

use rr_core::{LocationPair, TaskConfig, TaskId};
use rr_output::ArtifactRef;
use rr_pipeline::{ErrorCategory, NoopObserver, Pipeline, Progress, ProgressObserver};

use crate::clock::{Clock, SystemClock};
use crate::record::{TaskFailure, TaskOutcome, TaskRecord, TaskState, TaskStatus};
use crate::store::{InMemoryTaskStore, TaskStore};
use crate::{TaskError, TaskResult};

/// Runs generation tasks on a fixed set of worker threads and answers
/// queries about them.
///
/// Create via [`TaskManager::builder`].
pub struct TaskManager {
    shared:       Arc<Shared>,
    jobs:         Sender<Job>,
    worker_ids:   Vec<ThreadId>,
    retention_ms: u64,
    lease_ms:     u64,
}

/// State the manager and its workers both reach.
struct Shared {
    pipeline:  Pipeline,
    store:     Arc<dyn TaskStore>,
    clock:     Arc<dyn Clock>,
    /// Tasks sent to the job channel and not yet claimed by a worker.
    queued:    DashSet<TaskId>,
    in_flight: AtomicUsize,
}

struct Job {
    id:   TaskId,
    pair: LocationPair,
}

impl TaskManager {
    pub fn builder(pipeline: Pipeline) -> TaskManagerBuilder {
        TaskManagerBuilder::new(pipeline)
    }

    /// Validate the location pair and queue a task for it.
    ///
    /// Returns as soon as the task is queued.  Invalid input is rejected
    /// before anything is stored or scheduled.
    pub fn submit(&self, start: &str, end: &str) -> TaskResult<TaskId> {
        let pair = LocationPair::new(start, end).map_err(|e| TaskError::InvalidInput(e.to_string()))?;
        self.sweep();

        let shared = &self.shared;
        let id = TaskId::new();
        shared.queued.insert(id);
        if let Err(e) = shared.store.insert(TaskRecord::new(id, pair.clone(), shared.clock.now_ms())) {
            shared.queued.remove(&id);
            return Err(e);
        }
        info!(task = %id, %pair, "task submitted");

        shared.in_flight.fetch_add(1, Ordering::SeqCst);
        if self.jobs.send(Job { id, pair }).is_err() {
            shared.in_flight.fetch_sub(1, Ordering::SeqCst);
            shared.queued.remove(&id);
            let now = shared.clock.now_ms();
            let failure = TaskFailure::new(ErrorCategory::Internal, "no task worker is running");
            shared.store.update(id, &mut |record| record.finish(TaskOutcome::Failed(failure.clone()), now))?;
            error!(task = %id, "task could not be queued, every worker has exited");
            return Err(TaskError::NoWorkers);
        }
        Ok(id)
    }

    /// Current state, stage, percent and detail of a task.
    pub fn poll(&self, id: TaskId) -> TaskResult<TaskStatus> {
        match self.current(id)? {
            Some(record) => Ok(record.status()),
            None => Err(TaskError::UnknownTask(id)),
        }
    }

    /// The artifact of a succeeded task.
    pub fn fetch_result(&self, id: TaskId) -> TaskResult<ArtifactRef> {
        let record = self.current(id)?.ok_or(TaskError::NotFound(id))?;
        match record.state {
            TaskState::Queued | TaskState::Running => Err(TaskError::NotReady { id, state: record.state }),
            TaskState::Failed => Err(TaskError::NotFound(id)),
            TaskState::Succeeded => record.artifact.ok_or(TaskError::NotFound(id)),
        }
    }

    /// Run the pipeline on the calling thread.  Nothing is recorded and
    /// progress is discarded.
    ///
    /// Must not be called from one of this manager's workers.
    pub fn run(&self, start: &str, end: &str) -> TaskResult<ArtifactRef> {
        if self.worker_ids.contains(&thread::current().id()) {
            return Err(TaskError::WorkerThread);
        }
        let pair = LocationPair::new(start, end).map_err(|e| TaskError::InvalidInput(e.to_string()))?;
        let map = self.shared.pipeline.run(&pair, &mut NoopObserver)?;
        Ok(map.artifact)
    }

    /// Tasks submitted that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    pub fn workers(&self) -> usize {
        self.worker_ids.len()
    }

    pub fn store(&self) -> &dyn TaskStore {
        self.shared.store.as_ref()
    }

    // ── Housekeeping ──────────────────────────────────────────────────────

    /// The record for `id` after eviction and liveness checks, or `None` if
    /// it is unknown or past retention.
    fn current(&self, id: TaskId) -> TaskResult<Option<TaskRecord>> {
        self.sweep();
        self.expire(id)?;
        let now = self.shared.clock.now_ms();
        Ok(self.shared.store.get(id)?.filter(|r| !r.expired(now, self.retention_ms)))
    }

    fn sweep(&self) {
        let cutoff = self.shared.clock.now_ms().saturating_sub(self.retention_ms);
        match self.shared.store.evict_finished_before(cutoff) {
            Ok(0) => {}
            Ok(n) => debug!(evicted = n, "expired task records evicted"),
            Err(e) => warn!(error = %e, "task eviction failed"),
        }
    }

    /// Fail `id` if it is running past its lease, or queued without a
    /// worker of this manager waiting to claim it.
    fn expire(&self, id: TaskId) -> TaskResult<()> {
        let shared = &self.shared;
        let now = shared.clock.now_ms();
        let lease_ms = self.lease_ms;
        let mut failure: Option<TaskFailure> = None;
        shared.store.update(id, &mut |record| {
            let reason = if record.lease_lapsed(now, lease_ms) {
                format!("no progress for more than {} s", lease_ms / 1_000)
            } else if record.state == TaskState::Queued && !shared.queued.contains(&record.id) {
                "queued task has no worker to run it".to_string()
            } else {
                return false;
            };
            let f = TaskFailure::new(ErrorCategory::LeaseExpired, reason);
            failure = Some(f.clone());
            record.finish(TaskOutcome::Failed(f), now)
        })?;
        if let Some(f) = failure {
            warn!(task = %id, reason = %f.message, "task lease expired");
        }
        Ok(())
    }
}

// ── Workers ───────────────────────────────────────────────────────────────────

fn worker_loop(index: usize, jobs: Receiver<Job>, shared: Arc<Shared>) {
    debug!(worker = index, "task worker started");
    for job in jobs.iter() {
        shared.execute(job);
        shared.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
    debug!(worker = index, "task worker stopped");
}

impl Shared {
    fn execute(&self, job: Job) {
        let Job { id, pair } = job;
        let now = self.clock.now_ms();
        let claimed = self.store.update(id, &mut |record| record.claim(now));
        // Only after the claim, so a poll never sees an unclaimed record
        // missing from `queued`.
        self.queued.remove(&id);
        match claimed {
            Ok(true) => {}
            Ok(false) => {
                debug!(task = %id, "task already claimed, finished or gone");
                return;
            }
            Err(e) => {
                error!(task = %id, error = %e, "task could not be claimed");
                return;
            }
        }

        let mut observer = StoreObserver { id, store: self.store.as_ref(), clock: self.clock.as_ref() };
        let stem = id.to_string();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.pipeline.run_as(&stem, &pair, &mut observer)
        }));

        let outcome = match result {
            Ok(Ok(map)) => TaskOutcome::Succeeded(map.artifact),
            Ok(Err(e)) => TaskOutcome::Failed(TaskFailure::new(e.category(), e.to_string())),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(task = %id, panic = %message, "task worker panicked");
                TaskOutcome::Failed(TaskFailure::new(ErrorCategory::Internal, format!("worker panicked: {message}")))
            }
        };

        let now = self.clock.now_ms();
        let mut outcome = Some(outcome);
        let applied = self.store.update(id, &mut |record| match outcome.take() {
            Some(o) => record.finish(o, now),
            None => false,
        });
        match applied {
            Ok(true) => info!(task = %id, "task finished"),
            Ok(false) => warn!(task = %id, "task already terminal, late outcome dropped"),
            Err(e) => error!(task = %id, error = %e, "task outcome could not be stored"),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Writes pipeline progress into the task's record.
struct StoreObserver<'a> {
    id:    TaskId,
    store: &'a dyn TaskStore,
    clock: &'a dyn Clock,
}

impl ProgressObserver for StoreObserver<'_> {
    fn publish(&mut self, progress: &Progress) {
        let now = self.clock.now_ms();
        match self.store.update(self.id, &mut |record| record.advance(progress, now)) {
            Ok(true) => debug!(task = %self.id, stage = %progress.stage, "progress stored"),
            Ok(false) => {}
            Err(e) => warn!(task = %self.id, error = %e, "progress could not be stored"),
        }
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Fluent builder for [`TaskManager`].
///
/// | Method       | Default                     |
/// |--------------|-----------------------------|
/// | `.config(c)` | `TaskConfig::default()`     |
/// | `.store(s)`  | `InMemoryTaskStore`         |
/// | `.clock(c)`  | `SystemClock`               |
pub struct TaskManagerBuilder {
    pipeline: Pipeline,
    config:   TaskConfig,
    store:    Option<Arc<dyn TaskStore>>,
    clock:    Option<Arc<dyn Clock>>,
}

impl TaskManagerBuilder {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline, config: TaskConfig::default(), store: None, clock: None }
    }

    pub fn config(mut self, config: &TaskConfig) -> Self {
        self.config = config.clone();
        self
    }

    pub fn store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> TaskResult<TaskManager> {
        let workers = self.config.workers.max(1);
        let store = self.store.unwrap_or_else(|| Arc::new(InMemoryTaskStore::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        recover_unfinished(store.as_ref(), clock.as_ref())?;

        let shared = Arc::new(Shared {
            pipeline:  self.pipeline,
            store,
            clock,
            queued:    DashSet::new(),
            in_flight: AtomicUsize::new(0),
        });

        let (jobs, rx) = unbounded::<Job>();
        let mut worker_ids = Vec::with_capacity(workers);
        for index in 0..workers {
            let worker_rx = rx.clone();
            let worker_shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("rr-task-{index}"))
                .spawn(move || worker_loop(index, worker_rx, worker_shared))?;
            worker_ids.push(handle.thread().id());
        }
        drop(rx);
        info!(workers, lease_secs = self.config.lease_secs, retention_secs = self.config.retention_secs, "task manager started");

        Ok(TaskManager {
            shared,
            jobs,
            worker_ids,
            retention_ms: self.config.retention().as_millis() as u64,
            lease_ms:     self.config.lease().as_millis() as u64,
        })
    }
}

/// Fail every record an earlier manager left queued or running.
fn recover_unfinished(store: &dyn TaskStore, clock: &dyn Clock) -> TaskResult<()> {
    let now = clock.now_ms();
    let failure = TaskFailure::new(ErrorCategory::LeaseExpired, "interrupted before completion");
    let mut recovered = 0usize;
    for id in store.unfinished()? {
        if store.update(id, &mut |record| record.finish(TaskOutcome::Failed(failure.clone()), now))? {
            recovered += 1;
        }
    }
    if recovered > 0 {
        warn!(recovered, "unfinished tasks from an earlier run marked failed");
    }
    Ok(())
}
