//! `rr-tasks`: asynchronous map generation on a fixed set of worker threads.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                      |
//! |-------------|---------------------------------------------------------------|
//! | [`record`]  | `TaskRecord` state machine, `TaskState`, `TaskStatus`         |
//! | [`store`]   | `TaskStore` trait, `InMemoryTaskStore` (dashmap)              |
//! | [`sqlite`]  | `SqliteTaskStore` (feature = `"sqlite"` only)                 |
//! | [`manager`] | `TaskManager`: `submit`, `poll`, `fetch_result`, `run`        |
//! | [`clock`]   | `Clock` trait, system and manual clocks                       |
//! | [`error`]   | `TaskError`, `TaskResult<T>`                                  |
//!
//! # Feature flags
//!
//! | Flag     | Effect                                                      |
//! |----------|-------------------------------------------------------------|
//! | `sqlite` | Enables `SqliteTaskStore` via `rusqlite`.                   |

pub mod clock;
pub mod error;
pub mod manager;
pub mod record;
pub mod store;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(test)]
mod tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{TaskError, TaskResult};
pub use manager::{TaskManager, TaskManagerBuilder};
pub use record::{TaskFailure, TaskOutcome, TaskRecord, TaskState, TaskStatus};
pub use store::{InMemoryTaskStore, TaskStore};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteTaskStore;
