//! Task store backed by a JSONL task file.

use super::jsonl::{LoadWarning, load_tasks_jsonl, patch_tasks_jsonl};
use super::{InMemoryTaskStore, TaskSource, TaskStore};
use crate::domain::{Activity, Task, TaskId};
use crate::error::{Error, Result};
use crate::orchestrator::RecalcHandle;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Task collection loaded from a JSONL file.
///
/// Queries are answered from an [`InMemoryTaskStore`]. The file stays the source
/// of truth: [`TaskStore::refresh`] reloads it, and an appended activity is
/// written back by patching only that task's record. Nothing else is ever written.
///
/// Clones share the same in-memory collection.
#[derive(Debug, Clone)]
pub struct JsonlTaskStore {
    path: PathBuf,
    memory: InMemoryTaskStore,
}

impl JsonlTaskStore {
    /// Load the task file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read. Malformed lines are
    /// returned as warnings.
    pub async fn open(path: impl Into<PathBuf>) -> Result<(Self, Vec<LoadWarning>)> {
        let path = path.into();
        let (tasks, warnings) = load_tasks_jsonl(&path).await?;
        let store = Self {
            path,
            memory: InMemoryTaskStore::from_tasks(tasks),
        };
        Ok((store, warnings))
    }

    /// Attach a recalculation handle, signalled when a refresh finds changes.
    #[must_use]
    pub fn with_recalc(mut self, handle: RecalcHandle) -> Self {
        self.memory = self.memory.with_recalc(handle);
        self
    }

    /// Path of the task file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The in-memory view of the file.
    pub fn memory(&self) -> &InMemoryTaskStore {
        &self.memory
    }
}

#[async_trait]
impl TaskSource for JsonlTaskStore {
    async fn active_tasks(&self) -> Result<Vec<Task>> {
        self.memory.active_tasks().await
    }
}

#[async_trait]
impl TaskStore for JsonlTaskStore {
    async fn overdue_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        self.memory.overdue_tasks(now).await
    }

    async fn append_activity(&self, id: &TaskId, activity: Activity) -> Result<()> {
        self.memory.append_activity(id, activity).await?;
        let task = self
            .memory
            .get(id)
            .await
            .ok_or_else(|| Error::TaskNotFound(id.clone()))?;
        patch_tasks_jsonl(std::slice::from_ref(&task), &self.path).await?;
        Ok(())
    }

    async fn refresh(&self) -> Result<bool> {
        let (tasks, warnings) = load_tasks_jsonl(&self.path).await?;
        for warning in &warnings {
            tracing::debug!(path = %self.path.display(), "{warning}");
        }

        let changed = self.memory.replace_all(tasks).await;
        if changed {
            tracing::info!(path = %self.path.display(), "Task file changed, reloaded");
        }
        Ok(changed)
    }
}
