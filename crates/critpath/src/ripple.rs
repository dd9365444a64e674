//! Ripple-effect analysis for hypothetical delays.
//!
//! Given one task and a delay, [`simulate`] walks the successor edges of the
//! dependency graph breadth-first and reports every downstream task that would
//! shift. Nothing is persisted; the function can be called repeatedly for
//! "what-if" queries.

use crate::domain::{Priority, Stage, Task, TaskId};
use crate::error::{Error, Result};
use crate::graph::DependencyGraph;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Largest delay a simulation accepts; larger requests are clamped.
pub const MAX_DELAY_DAYS: u32 = 60;

/// Working hours per day used for time-debt estimates.
pub const HOURS_PER_DAY: u32 = 8;

/// Raw simulate input as received from a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulateRequest {
    /// The task to delay
    pub task_id: Option<String>,

    /// Requested delay in days
    pub delay_days: Option<f64>,
}

impl SimulateRequest {
    /// Create a request for `task_id` delayed by `delay_days`.
    pub fn new(task_id: impl Into<String>, delay_days: f64) -> Self {
        Self {
            task_id: Some(task_id.into()),
            delay_days: Some(delay_days),
        }
    }

    /// Validate the request and clamp the delay to `[0, MAX_DELAY_DAYS]`.
    ///
    /// Fractional delays are rounded down to whole days.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the task ID is missing or blank, or if the
    /// delay is missing or not a finite number.
    pub fn validate(&self) -> Result<(TaskId, u32)> {
        let task_id = self
            .task_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::validation("task_id", "task_id is required"))?;

        let delay = self
            .delay_days
            .ok_or_else(|| Error::validation("delay_days", "delay_days is required"))?;
        if !delay.is_finite() {
            return Err(Error::validation(
                "delay_days",
                format!("expected a finite number, got {delay}"),
            ));
        }

        Ok((TaskId::new(task_id), clamp_delay(delay)))
    }
}

/// Clamp a raw delay to whole days in `[0, MAX_DELAY_DAYS]`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clamp_delay(delay_days: f64) -> u32 {
    delay_days.clamp(0.0, f64::from(MAX_DELAY_DAYS)).floor() as u32
}

/// Downstream impact of delaying one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RippleResult {
    /// Number of affected downstream tasks
    pub ripple_count: usize,

    /// Affected tasks in breadth-first order, excluding the delayed task
    pub affected_task_ids: Vec<TaskId>,

    /// Whether any affected task looks like a milestone
    pub impacts_milestone: bool,

    /// Notional schedule loss in working hours
    pub time_debt_hours: u32,

    /// The (clamped) delay that was simulated
    pub delay_days: u32,
}

/// Simulate delaying `task_id` by `delay_days` within `tasks`.
///
/// `delay_days` is expected to be clamped already (see [`SimulateRequest::validate`]).
///
/// # Errors
///
/// Returns `Error::TaskNotFound` if `task_id` is not an active task.
pub fn simulate(task_id: &TaskId, delay_days: u32, tasks: &[Task]) -> Result<RippleResult> {
    let graph = DependencyGraph::build(tasks);
    let start = graph
        .index_of(task_id)
        .ok_or_else(|| Error::TaskNotFound(task_id.clone()))?;

    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    let mut affected = Vec::new();

    while let Some(current) = queue.pop_front() {
        for succ in graph.successors(current) {
            if visited.insert(succ) {
                affected.push(succ);
                queue.push_back(succ);
            }
        }
    }

    let impacts_milestone = affected
        .iter()
        .any(|node| looks_like_milestone(graph.task(*node)));

    Ok(RippleResult {
        ripple_count: affected.len(),
        affected_task_ids: affected
            .into_iter()
            .map(|node| graph.task(node).id.clone())
            .collect(),
        impacts_milestone,
        time_debt_hours: delay_days.saturating_mul(HOURS_PER_DAY),
        delay_days,
    })
}

/// Milestone heuristic: high priority, the milestone stage, or "milestone" in the title.
pub fn looks_like_milestone(task: &Task) -> bool {
    task.priority == Priority::High
        || task.stage == Stage::Milestone
        || task.title.to_lowercase().contains("milestone")
}
