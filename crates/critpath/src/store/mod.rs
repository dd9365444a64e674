//! Task collection seams.
//!
//! The analysis pipeline only reads tasks through [`TaskSource`]. The slippage
//! scanner additionally needs the overdue query and the ability to append audit
//! activities, which [`TaskStore`] adds.
//!
//! [`InMemoryTaskStore`] is the reference implementation. It keeps tasks in
//! insertion order and emits recalculation signals on schedule-relevant
//! mutations. [`JsonlTaskStore`] layers a task file under it: the file is
//! reloaded on [`TaskStore::refresh`] and appended activities are patched
//! into it.

use crate::domain::{Activity, Task, TaskId};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

mod file;
mod in_memory;
mod jsonl;

pub use file::JsonlTaskStore;
pub use in_memory::InMemoryTaskStore;
pub use jsonl::{LoadWarning, load_tasks_jsonl, patch_tasks_jsonl};

/// Read access to the schedulable task set.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// All tasks that are not trashed, in collection order.
    async fn active_tasks(&self) -> Result<Vec<Task>>;
}

/// Task collection with the operations the slippage scanner needs.
#[async_trait]
pub trait TaskStore: TaskSource {
    /// Active, non-completed tasks whose due date is before `now`.
    async fn overdue_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>>;

    /// Append an activity to a task's history.
    ///
    /// Activities are audit entries and do not affect the schedule, so this
    /// never emits a recalculation signal.
    async fn append_activity(&self, id: &TaskId, activity: Activity) -> Result<()>;

    /// Pick up changes made to the collection outside this process.
    ///
    /// Returns whether the collection changed. Stores with no external backing
    /// have nothing to reload.
    async fn refresh(&self) -> Result<bool> {
        Ok(false)
    }
}
