//! SQLite task store (feature `sqlite`).
//!
//! One table, `tasks`, keyed by task id.  The full record is kept as JSON in
//! `body`; `state` and `finished_ms` are duplicated into columns so eviction
//! is a single `DELETE`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};

use rr_core::TaskId;

use crate::{TaskError, TaskRecord, TaskResult, TaskStore};

/// Task records in an SQLite database.  Survives restarts of the process.
pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous  = NORMAL;
    CREATE TABLE IF NOT EXISTS tasks (
        id          TEXT PRIMARY KEY,
        state       TEXT NOT NULL,
        finished_ms INTEGER,
        body        TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS tasks_finished ON tasks (finished_ms);";

impl SqliteTaskStore {
    /// Open (or create) the database at `path` and initialise the schema.
    pub fn open(path: &Path) -> TaskResult<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> TaskResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> TaskResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> TaskResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| TaskError::Store("sqlite connection lock poisoned".into()))
    }
}

fn finished(record: &TaskRecord) -> Option<i64> {
    record.finished_ms.map(|ms| ms as i64)
}

impl TaskStore for SqliteTaskStore {
    fn insert(&self, record: TaskRecord) -> TaskResult<()> {
        let body = serde_json::to_string(&record)?;
        self.lock()?.execute(
            "INSERT INTO tasks (id, state, finished_ms, body) VALUES (?1, ?2, ?3, ?4)",
            params![record.id.to_string(), record.state.as_str(), finished(&record), body],
        )?;
        Ok(())
    }

    fn get(&self, id: TaskId) -> TaskResult<Option<TaskRecord>> {
        let body: Option<String> = self
            .lock()?
            .query_row("SELECT body FROM tasks WHERE id = ?1", params![id.to_string()], |row| row.get(0))
            .optional()?;
        Ok(body.map(|b| serde_json::from_str(&b)).transpose()?)
    }

    fn update(&self, id: TaskId, apply: &mut dyn FnMut(&mut TaskRecord) -> bool) -> TaskResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let body: Option<String> = tx
            .query_row("SELECT body FROM tasks WHERE id = ?1", params![id.to_string()], |row| row.get(0))
            .optional()?;
        let Some(body) = body else {
            return Ok(false);
        };
        let mut record: TaskRecord = serde_json::from_str(&body)?;
        if !apply(&mut record) {
            return Ok(false);
        }
        tx.execute(
            "UPDATE tasks SET state = ?2, finished_ms = ?3, body = ?4 WHERE id = ?1",
            params![
                id.to_string(),
                record.state.as_str(),
                finished(&record),
                serde_json::to_string(&record)?
            ],
        )?;
        tx.commit()?;
        Ok(true)
    }

    fn evict_finished_before(&self, cutoff_ms: u64) -> TaskResult<usize> {
        let removed = self.lock()?.execute(
            "DELETE FROM tasks WHERE finished_ms IS NOT NULL AND finished_ms < ?1",
            params![cutoff_ms as i64],
        )?;
        Ok(removed)
    }

    fn unfinished(&self) -> TaskResult<Vec<TaskId>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id FROM tasks WHERE finished_ms IS NULL")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids.iter()
            .map(|id| id.parse().map_err(|e| TaskError::Store(format!("bad task id {id:?}: {e}"))))
            .collect()
    }

    fn len(&self) -> TaskResult<usize> {
        let n: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}
