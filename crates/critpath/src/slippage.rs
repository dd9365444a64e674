//! Passive slippage detection.
//!
//! A scan finds overdue tasks, marks each with an `AUTO-FLAGGED` audit activity
//! (at most once per flag window), alerts the task's team, records the overdue
//! set in the impact cache and asks the orchestrator for a recalculation.

use crate::cache::{ImpactCache, SnapshotUpdate};
use crate::clock::Clock;
use crate::domain::{Activity, ActivityKind, Task, TaskId};
use crate::error::Result;
use crate::orchestrator::{MutationKind, RecalcHandle};
use crate::store::TaskStore;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Text that identifies an automatic slippage flag in a task's activities.
pub const AUTO_FLAG_MARKER: &str = "AUTO-FLAGGED";

/// Default period during which a task is not flagged again.
pub const DEFAULT_FLAG_WINDOW_HOURS: i64 = 24;

/// Delivers at-risk alerts to a task's team.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Alert the members of `task.team` that `task` is at risk.
    async fn notify_at_risk(&self, task: &Task, message: &str) -> Result<()>;
}

/// Notifier that writes alerts to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_at_risk(&self, task: &Task, message: &str) -> Result<()> {
        tracing::warn!(task_id = %task.id, team = ?task.team, "{message}");
        Ok(())
    }
}

/// Outcome of one scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Every overdue task found, in store order
    pub overdue: Vec<TaskId>,

    /// Tasks that received a new flag during this scan
    pub newly_flagged: Vec<TaskId>,

    /// Number of alerts delivered
    pub notified: usize,
}

/// Periodic overdue-task sweeper.
pub struct SlippageScanner {
    store: Arc<dyn TaskStore>,
    notifier: Arc<dyn Notifier>,
    cache: Arc<dyn ImpactCache>,
    recalc: RecalcHandle,
    clock: Arc<dyn Clock>,
    flag_window: Duration,
}

impl SlippageScanner {
    /// Create a scanner with the default 24 hour flag window.
    pub fn new(
        store: Arc<dyn TaskStore>,
        notifier: Arc<dyn Notifier>,
        cache: Arc<dyn ImpactCache>,
        recalc: RecalcHandle,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            notifier,
            cache,
            recalc,
            clock,
            flag_window: Duration::hours(DEFAULT_FLAG_WINDOW_HOURS),
        }
    }

    /// Override the flag window.
    #[must_use]
    pub fn with_flag_window(mut self, window: Duration) -> Self {
        self.flag_window = window;
        self
    }

    /// Run one scan.
    ///
    /// The store is refreshed first so the scan sees edits made elsewhere.
    /// Failures to flag or alert a single task are logged and do not abort the
    /// scan; failures to query the store or write the cache do.
    pub async fn scan(&self) -> Result<ScanReport> {
        if let Err(e) = self.store.refresh().await {
            tracing::warn!(error = %e, "Could not refresh tasks, scanning last known state");
        }

        let now = self.clock.now();
        let overdue = self.store.overdue_tasks(now).await?;
        tracing::info!(overdue = overdue.len(), "Scanning for slippage");

        let mut report = ScanReport::default();
        for task in &overdue {
            report.overdue.push(task.id.clone());

            if recently_flagged(task, now, self.flag_window) {
                tracing::debug!(task_id = %task.id, "Already flagged within window");
                continue;
            }

            if let Err(e) = self.store.append_activity(&task.id, flag_activity(task, now)).await {
                tracing::warn!(task_id = %task.id, error = %e, "Failed to flag overdue task");
                continue;
            }
            report.newly_flagged.push(task.id.clone());

            if task.team.is_empty() {
                continue;
            }
            let message = format!(
                "Task \"{}\" is overdue and has been auto-flagged as at risk.",
                task.title
            );
            match self.notifier.notify_at_risk(task, &message).await {
                Ok(()) => report.notified += 1,
                Err(e) => {
                    tracing::warn!(task_id = %task.id, error = %e, "Failed to deliver alert");
                }
            }
        }

        // An empty set clears ids flagged by a previous scan.
        self.cache
            .put(SnapshotUpdate::AtRisk {
                task_ids: report.overdue.clone(),
            })
            .await?;
        self.recalc.notify(MutationKind::SlippageScan);

        tracing::info!(
            overdue = report.overdue.len(),
            newly_flagged = report.newly_flagged.len(),
            notified = report.notified,
            "Slippage scan complete"
        );
        Ok(report)
    }

    /// Scan every `period`, starting immediately.
    ///
    /// Scan errors are logged and the loop continues. Abort the returned handle to
    /// stop.
    pub fn run_periodic(self: Arc<Self>, period: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.scan().await {
                    tracing::error!(error = %e, "Slippage scan failed");
                }
            }
        })
    }
}

fn recently_flagged(task: &Task, now: DateTime<Utc>, window: Duration) -> bool {
    task.activities.iter().any(|a| {
        a.kind == ActivityKind::Bug
            && a.activity.contains(AUTO_FLAG_MARKER)
            && now - a.date < window
    })
}

fn flag_activity(task: &Task, now: DateTime<Utc>) -> Activity {
    let due = task
        .date
        .map_or_else(|| "unknown".to_string(), |d| d.format("%a %b %d %Y").to_string());
    Activity {
        kind: ActivityKind::Bug,
        activity: format!("{AUTO_FLAG_MARKER}: Task is overdue (due {due}). Passive slippage detected."),
        date: now,
    }
}
