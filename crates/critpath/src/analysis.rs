//! Request-level entry points over a task source.

use crate::cpm::{self, CpmResult, DelayMap};
use crate::enrichment::{Assessment, EnrichmentClient, EnrichmentMetrics, ProjectContext, assess_with_fallback};
use crate::error::Result;
use crate::ripple::{self, RippleResult, SimulateRequest};
use crate::store::TaskSource;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Solve the active task set with optional per-task delays.
pub async fn full_analysis(source: &dyn TaskSource, delays: &DelayMap) -> Result<CpmResult> {
    let tasks = source.active_tasks().await?;
    Ok(cpm::solve(&tasks, delays))
}

/// Ripple metrics for one simulated delay together with an assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Title of the delayed task
    pub task_name: String,

    /// Deterministic ripple metrics
    pub metrics: RippleResult,

    /// Service assessment, or the heuristic fallback
    pub ai: Assessment,
}

/// Validate `request`, simulate the delay and assess the result.
///
/// # Errors
///
/// Returns `Error::Validation` for a malformed request and `Error::TaskNotFound`
/// when the task is not active. Enrichment failures never surface here; they
/// produce the heuristic assessment instead.
pub async fn simulate_with_assessment(
    source: &dyn TaskSource,
    request: &SimulateRequest,
    client: &dyn EnrichmentClient,
    timeout: Duration,
) -> Result<SimulationReport> {
    let (task_id, delay_days) = request.validate()?;
    let tasks = source.active_tasks().await?;
    let metrics = ripple::simulate(&task_id, delay_days, &tasks)?;

    let task_name = tasks
        .iter()
        .find(|t| t.id == task_id)
        .map(|t| t.title.clone())
        .unwrap_or_default();
    tracing::info!(
        task_id = %task_id,
        delay_days,
        ripple_count = metrics.ripple_count,
        "Simulated delay"
    );

    let context = ProjectContext {
        total_tasks: tasks.len(),
    };
    let ai = assess_with_fallback(
        client,
        &EnrichmentMetrics::from(&metrics),
        &task_name,
        &context,
        timeout,
    )
    .await;

    Ok(SimulationReport {
        task_name,
        metrics,
        ai,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Task, TaskId};
    use crate::enrichment::{AssessmentSource, OfflineClient};
    use crate::error::Error;
    use crate::store::InMemoryTaskStore;

    fn chain() -> InMemoryTaskStore {
        let a = Task::new("a", "Foundation");
        let mut b = Task::new("b", "Walls");
        b.dependencies = vec![TaskId::new("a")];
        let mut c = Task::new("c", "Roof");
        c.dependencies = vec![TaskId::new("b")];
        InMemoryTaskStore::from_tasks(vec![a, b, c])
    }

    #[tokio::test]
    async fn test_full_analysis_applies_delays() {
        let store = chain();
        let delays = DelayMap::from([(TaskId::new("b"), 2)]);

        let result = full_analysis(&store, &delays).await.unwrap();
        assert_eq!(result.project_duration, 3);
        assert_eq!(result.node(&TaskId::new("b")).unwrap().delay, 2);
    }

    #[tokio::test]
    async fn test_simulation_report_uses_heuristic_offline() {
        let store = chain();
        let request = SimulateRequest::new("a", 5.0);

        let report = simulate_with_assessment(
            &store,
            &request,
            &OfflineClient,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert_eq!(report.task_name, "Foundation");
        assert_eq!(report.metrics.ripple_count, 2);
        assert_eq!(report.metrics.time_debt_hours, 40);
        assert_eq!(report.ai.source, AssessmentSource::Heuristic);
        // 85 - 10 (delay > 3) - 5 (ripple > 0)
        assert_eq!(report.ai.confidence_score, 70);
    }

    #[tokio::test]
    async fn test_simulation_unknown_task() {
        let store = chain();
        let request = SimulateRequest::new("zzz", 1.0);

        let result =
            simulate_with_assessment(&store, &request, &OfflineClient, Duration::from_secs(1))
                .await;
        assert!(matches!(result, Err(Error::TaskNotFound(_))));
    }
}
