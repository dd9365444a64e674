//! In-memory task store.

use super::{TaskSource, TaskStore};
use crate::domain::{Activity, NewTask, Task, TaskId, TaskUpdate};
use crate::error::{Error, Result};
use crate::orchestrator::{MutationKind, RecalcHandle};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Prefix for generated task IDs.
const ID_PREFIX: &str = "task";

#[derive(Debug, Default)]
struct Inner {
    tasks: Vec<Task>,
    next_seq: u64,
}

impl Inner {
    fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| &t.id == id)
    }

    fn next_id(&mut self) -> TaskId {
        let taken: HashSet<&str> = self.tasks.iter().map(|t| t.id.as_str()).collect();
        loop {
            self.next_seq += 1;
            let candidate = format!("{ID_PREFIX}-{}", self.next_seq);
            if !taken.contains(candidate.as_str()) {
                return TaskId::new(candidate);
            }
        }
    }
}

/// Task collection held in memory.
///
/// Clones share the same underlying collection. When a [`RecalcHandle`] is
/// attached, creations, deletions and schedule-relevant updates signal the
/// orchestrator after the write lock is released.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    inner: Arc<RwLock<Inner>>,
    recalc: Option<RecalcHandle>,
}

impl InMemoryTaskStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `tasks` in the given order.
    ///
    /// Duplicate IDs are kept as-is here; the graph builder keeps the first.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner { tasks, next_seq: 0 })),
            recalc: None,
        }
    }

    /// Attach a recalculation handle that receives mutation signals.
    #[must_use]
    pub fn with_recalc(mut self, handle: RecalcHandle) -> Self {
        self.recalc = Some(handle);
        self
    }

    /// Create a task with a generated ID.
    pub async fn create(&self, new_task: NewTask) -> Result<Task> {
        if new_task.title.trim().is_empty() {
            return Err(Error::validation("title", "must not be empty"));
        }

        let task = {
            let mut inner = self.inner.write().await;
            let id = inner.next_id();
            let task = new_task.into_task(id);
            inner.tasks.push(task.clone());
            task
        };

        tracing::debug!(task_id = %task.id, "Task created");
        self.signal(MutationKind::Created);
        Ok(task)
    }

    /// Apply a partial update to a task.
    pub async fn update(&self, id: &TaskId, update: TaskUpdate) -> Result<Task> {
        let relevant = update.is_schedule_relevant();

        let task = {
            let mut inner = self.inner.write().await;
            let index = inner
                .position(id)
                .ok_or_else(|| Error::TaskNotFound(id.clone()))?;
            let task = &mut inner.tasks[index];
            task.apply(update);
            task.clone()
        };

        tracing::debug!(task_id = %id, schedule_relevant = relevant, "Task updated");
        if relevant {
            self.signal(MutationKind::Updated);
        }
        Ok(task)
    }

    /// Remove a task from the collection.
    pub async fn delete(&self, id: &TaskId) -> Result<Task> {
        let task = {
            let mut inner = self.inner.write().await;
            let index = inner
                .position(id)
                .ok_or_else(|| Error::TaskNotFound(id.clone()))?;
            inner.tasks.remove(index)
        };

        tracing::debug!(task_id = %id, "Task deleted");
        self.signal(MutationKind::Deleted);
        Ok(task)
    }

    /// Look up a task by ID, trashed or not.
    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        let inner = self.inner.read().await;
        inner.position(id).map(|i| inner.tasks[i].clone())
    }

    /// Replace the whole collection with `tasks`.
    ///
    /// Signals [`MutationKind::Updated`] and returns `true` when the new
    /// collection differs from the current one.
    pub async fn replace_all(&self, tasks: Vec<Task>) -> bool {
        let changed = {
            let mut inner = self.inner.write().await;
            let changed = inner.tasks != tasks;
            if changed {
                inner.tasks = tasks;
            }
            changed
        };

        if changed {
            tracing::debug!("Task collection replaced");
            self.signal(MutationKind::Updated);
        }
        changed
    }

    /// Every task including trashed ones, in collection order.
    pub async fn all(&self) -> Vec<Task> {
        self.inner.read().await.tasks.clone()
    }

    fn signal(&self, kind: MutationKind) {
        if let Some(handle) = &self.recalc {
            handle.notify(kind);
        }
    }
}

#[async_trait]
impl TaskSource for InMemoryTaskStore {
    async fn active_tasks(&self) -> Result<Vec<Task>> {
        let inner = self.inner.read().await;
        Ok(inner.tasks.iter().filter(|t| t.is_active()).cloned().collect())
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn overdue_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tasks
            .iter()
            .filter(|t| t.is_overdue(now))
            .cloned()
            .collect())
    }

    async fn append_activity(&self, id: &TaskId, activity: Activity) -> Result<()> {
        let mut inner = self.inner.write().await;
        let index = inner
            .position(id)
            .ok_or_else(|| Error::TaskNotFound(id.clone()))?;
        inner.tasks[index].activities.push(activity);
        Ok(())
    }
}
