//! Task record persistence.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use rr_core::TaskId;

use crate::{TaskError, TaskRecord, TaskResult};

/// Backing store for task records.
///
/// Implementations apply [`update`](Self::update) atomically per record: a
/// poller sees either the record before the closure ran or after it.
pub trait TaskStore: Send + Sync {
    /// Add a new record.  Fails if the id is already present.
    fn insert(&self, record: TaskRecord) -> TaskResult<()>;

    fn get(&self, id: TaskId) -> TaskResult<Option<TaskRecord>>;

    /// Apply `apply` to the record for `id`.  Returns what `apply` returned,
    /// or `false` if there is no such record.  Changes made by a closure
    /// returning `false` may be discarded.
    fn update(&self, id: TaskId, apply: &mut dyn FnMut(&mut TaskRecord) -> bool) -> TaskResult<bool>;

    /// Drop every terminal record that finished before `cutoff_ms`.
    /// Returns the number of records removed.
    fn evict_finished_before(&self, cutoff_ms: u64) -> TaskResult<usize>;

    /// Ids of every record that has not reached a terminal state.
    fn unfinished(&self) -> TaskResult<Vec<TaskId>>;

    fn len(&self) -> TaskResult<usize>;
}

// ── InMemoryTaskStore ─────────────────────────────────────────────────────────

/// Records in a sharded concurrent map.  Lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    records: DashMap<TaskId, TaskRecord>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskStore for InMemoryTaskStore {
    fn insert(&self, record: TaskRecord) -> TaskResult<()> {
        match self.records.entry(record.id) {
            Entry::Occupied(_) => {
                Err(TaskError::Store(format!("task {} already exists", record.id)))
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    fn get(&self, id: TaskId) -> TaskResult<Option<TaskRecord>> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    fn update(&self, id: TaskId, apply: &mut dyn FnMut(&mut TaskRecord) -> bool) -> TaskResult<bool> {
        // The shard write lock is held for the whole closure.
        Ok(match self.records.get_mut(&id) {
            Some(mut record) => apply(record.value_mut()),
            None => false,
        })
    }

    fn evict_finished_before(&self, cutoff_ms: u64) -> TaskResult<usize> {
        let mut evicted = 0;
        self.records.retain(|_, r| {
            let keep = r.finished_ms.is_none_or(|done| done >= cutoff_ms);
            if !keep {
                evicted += 1;
            }
            keep
        });
        Ok(evicted)
    }

    fn unfinished(&self) -> TaskResult<Vec<TaskId>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.finished_ms.is_none())
            .map(|r| *r.key())
            .collect())
    }

    fn len(&self) -> TaskResult<usize> {
        Ok(self.records.len())
    }
}
