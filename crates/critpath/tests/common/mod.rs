//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use critpath::domain::{Task, TaskId};
use critpath::enrichment::{
    Assessment, AssessmentSource, EnrichmentClient, EnrichmentMetrics, EnrichmentOutcome,
    ProjectContext, RiskLevel,
};
use critpath::error::{Error, Result};
use critpath::orchestrator::OrchestratorEvent;
use critpath::store::TaskSource;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;

/// Build a task with a duration and predecessor list.
pub fn task(id: &str, duration: u32, deps: &[&str]) -> Task {
    let mut task = Task::new(id, format!("Task {id}"));
    task.duration = duration;
    task.dependencies = deps.iter().map(|d| TaskId::new(*d)).collect();
    task
}

/// A service assessment with the given score.
pub fn service_assessment(score: u8) -> Assessment {
    Assessment {
        confidence_score: score,
        risk_level: RiskLevel::from_confidence(score),
        strategic_advice: "Hold the line.".to_string(),
        explanation: format!("score {score}"),
        source: AssessmentSource::Service,
    }
}

/// Task source that counts loads and can fail the first `fail_first` of them.
pub struct CountingSource {
    tasks: Vec<Task>,
    loads: AtomicUsize,
    fail_first: usize,
}

impl CountingSource {
    pub fn new(tasks: Vec<Task>) -> Arc<Self> {
        Self::failing(tasks, 0)
    }

    pub fn failing(tasks: Vec<Task>, fail_first: usize) -> Arc<Self> {
        Arc::new(Self {
            tasks,
            loads: AtomicUsize::new(0),
            fail_first,
        })
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskSource for CountingSource {
    async fn active_tasks(&self) -> Result<Vec<Task>> {
        let n = self.loads.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_first {
            return Err(Error::Storage("task source offline".to_string()));
        }
        Ok(self.tasks.clone())
    }
}

/// Enrichment client that answers call `i` after `delays[i]` with `scores[i]`.
///
/// Calls beyond the script reuse the last entry.
pub struct ScriptedClient {
    script: Vec<(Duration, u8)>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(script: Vec<(Duration, u8)>) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnrichmentClient for ScriptedClient {
    async fn assess(
        &self,
        _metrics: &EnrichmentMetrics,
        _subject: &str,
        _context: &ProjectContext,
    ) -> EnrichmentOutcome {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(&(delay, score)) = self.script.get(n).or(self.script.last()) else {
            return EnrichmentOutcome::Unavailable {
                reason: "empty script".to_string(),
            };
        };
        tokio::time::sleep(delay).await;
        EnrichmentOutcome::Success(service_assessment(score))
    }
}

/// Receive events until one matches `pred`, returning it.
pub async fn next_matching(
    events: &mut broadcast::Receiver<OrchestratorEvent>,
    pred: impl Fn(&OrchestratorEvent) -> bool,
) -> OrchestratorEvent {
    loop {
        let event = events.recv().await.expect("event channel closed");
        if pred(&event) {
            return event;
        }
    }
}

/// Receive events until an assessment for `generation` was offered to the cache.
pub async fn wait_enriched(
    events: &mut broadcast::Receiver<OrchestratorEvent>,
    generation: u64,
) -> OrchestratorEvent {
    next_matching(events, |e| {
        matches!(e, OrchestratorEvent::Enriched { generation: g, .. } if *g == generation)
    })
    .await
}
