//! Reactive recalculation pipeline.
//!
//! The orchestrator keeps the cached [`ImpactSnapshot`](crate::cache::ImpactSnapshot)
//! in step with the task collection. It runs as a background tokio task fed by
//! [`RecalcHandle::notify`], which never blocks the caller.
//!
//! # Pipeline
//!
//! 1. A mutation signal arms (or resets) the [`Debouncer`].
//! 2. When the quiet window elapses, the worker loads the active tasks, runs the
//!    CPM solver and writes the CPM block with a fresh generation and
//!    `ai_pending = true`.
//! 3. Enrichment is spawned as its own task. Its assessment, or the heuristic
//!    fallback after a timeout or failure, is written with the same generation
//!    and clears `ai_pending`.
//!
//! Failures in steps 2 and 3 are logged and published as events; they never
//! stop the worker or reach the code that sent the signal.
//!
//! # Observability
//!
//! Every step publishes an [`OrchestratorEvent`] on a broadcast channel. Tests
//! and callers subscribe with [`Orchestrator::subscribe`] to await completion
//! instead of sleeping.
//!
//! # Overlap
//!
//! A recomputation does not cancel enrichment started by an earlier one. The
//! cache discards an assessment whose generation is older than the stored CPM
//! block, so out-of-order completions cannot clobber newer state.

mod debounce;

pub use debounce::Debouncer;

use crate::cache::{ImpactCache, SnapshotUpdate};
use crate::cpm::{self, CpmResult, DelayMap};
use crate::domain::Task;
use crate::enrichment::{
    AssessmentSource, EnrichmentClient, EnrichmentMetrics, ProjectContext, assess_with_fallback,
};
use crate::store::TaskSource;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default quiet window before a recomputation runs.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Default bound on a single enrichment call.
pub const DEFAULT_ENRICHMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Subject label used when the critical path is empty.
const PROJECT_SUBJECT: &str = "Project";

/// Capacity of the event channel; slow subscribers observe `Lagged`.
const EVENT_CAPACITY: usize = 64;

/// What caused a recalculation signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// A task was created
    Created,

    /// A schedule-relevant field of a task changed
    Updated,

    /// A task was deleted
    Deleted,

    /// The slippage scanner finished a sweep
    SlippageScan,

    /// Explicit request (startup, CLI)
    Manual,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MutationKind::Created => "created",
            MutationKind::Updated => "updated",
            MutationKind::Deleted => "deleted",
            MutationKind::SlippageScan => "slippage-scan",
            MutationKind::Manual => "manual",
        };
        write!(f, "{s}")
    }
}

/// Cheap, cloneable sender of recalculation signals.
#[derive(Debug, Clone)]
pub struct RecalcHandle {
    tx: mpsc::UnboundedSender<MutationKind>,
}

impl RecalcHandle {
    /// Create a handle and the receiving end of its channel.
    ///
    /// [`Orchestrator::spawn`] uses this internally. It is public so that
    /// components emitting signals can be exercised without a running worker.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MutationKind>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Signal that the schedule may have changed. Never blocks.
    pub fn notify(&self, kind: MutationKind) {
        if self.tx.send(kind).is_err() {
            tracing::debug!(%kind, "Recalculation worker has stopped, signal dropped");
        }
    }
}

/// Progress reported by the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorEvent {
    /// A CPM block was written
    Recomputed {
        /// Generation of the new block
        generation: u64,
        /// Number of active tasks
        task_count: usize,
        /// Project duration in days
        project_duration: i64,
        /// Whether enrichment was dispatched
        enrichment_dispatched: bool,
    },

    /// Loading tasks or writing the CPM block failed
    RecomputeFailed {
        /// Generation that was attempted
        generation: u64,
        /// Error description
        error: String,
    },

    /// An assessment was produced and offered to the cache
    Enriched {
        /// Generation the assessment belongs to
        generation: u64,
        /// Whether the cache accepted it (false when stale)
        applied: bool,
        /// Service or heuristic
        source: AssessmentSource,
    },

    /// The assessment could not be written
    EnrichmentFailed {
        /// Generation the assessment belongs to
        generation: u64,
        /// Error description
        error: String,
    },
}

/// Tuning for the orchestrator
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Quiet window before a recomputation
    pub debounce: Duration,

    /// Bound on each enrichment call
    pub enrichment_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            enrichment_timeout: DEFAULT_ENRICHMENT_TIMEOUT,
        }
    }
}

/// A running recalculation worker.
pub struct Orchestrator {
    handle: RecalcHandle,
    events: broadcast::Sender<OrchestratorEvent>,
    shutdown: oneshot::Sender<()>,
    worker: JoinHandle<()>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("handle", &self.handle)
            .field("subscribers", &self.events.receiver_count())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(
        source: Arc<dyn TaskSource>,
        cache: Arc<dyn ImpactCache>,
        client: Arc<dyn EnrichmentClient>,
        config: OrchestratorConfig,
    ) -> Self {
        let (handle, signals) = RecalcHandle::channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (shutdown, shutdown_rx) = oneshot::channel();

        let worker = Worker {
            source,
            cache,
            client,
            config,
            events: events.clone(),
            generation: 0,
        };
        let worker = tokio::spawn(worker.run(signals, shutdown_rx));

        Self {
            handle,
            events,
            shutdown,
            worker,
        }
    }

    /// A handle for sending signals.
    pub fn handle(&self) -> RecalcHandle {
        self.handle.clone()
    }

    /// Subscribe to progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.events.subscribe()
    }

    /// Stop the worker.
    ///
    /// A recomputation that is scheduled but has not fired is dropped. Enrichment
    /// tasks already in flight keep running and still write their result.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.worker.await {
            tracing::error!(error = %e, "Recalculation worker panicked");
        }
    }
}

struct Worker {
    source: Arc<dyn TaskSource>,
    cache: Arc<dyn ImpactCache>,
    client: Arc<dyn EnrichmentClient>,
    config: OrchestratorConfig,
    events: broadcast::Sender<OrchestratorEvent>,
    generation: u64,
}

impl Worker {
    async fn run(
        mut self,
        mut signals: mpsc::UnboundedReceiver<MutationKind>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        // Continue numbering from a persisted snapshot.
        match self.cache.get().await {
            Ok(snapshot) => self.generation = snapshot.map_or(0, |s| s.generation),
            Err(e) => tracing::warn!(error = %e, "Could not read cached generation"),
        }

        let mut debouncer = Debouncer::new(self.config.debounce);
        tracing::debug!(debounce_ms = self.config.debounce.as_millis(), "Recalculation worker started");

        loop {
            let deadline = debouncer.deadline();
            let timer = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now));

            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                signal = signals.recv() => {
                    let Some(kind) = signal else { break };
                    let armed = debouncer.signal(Instant::now());
                    tracing::debug!(%kind, armed, "Recalculation signal");
                }
                () = timer, if debouncer.is_scheduled() => {
                    if debouncer.fire(Instant::now()) {
                        self.recompute().await;
                    }
                }
            }
        }

        tracing::debug!("Recalculation worker stopped");
    }

    async fn recompute(&mut self) {
        self.generation += 1;
        let generation = self.generation;
        tracing::info!(generation, "Recalculating project impact");

        let tasks = match self.source.active_tasks().await {
            Ok(tasks) => tasks,
            Err(e) => {
                self.fail(generation, &e);
                return;
            }
        };

        let result = cpm::solve(&tasks, &DelayMap::new());
        let task_count = result.nodes.len();
        let dispatch = task_count > 0;

        let update = SnapshotUpdate::Cpm {
            cpm: result.clone(),
            calculated_at: Utc::now(),
            generation,
            ai_pending: dispatch,
        };
        if let Err(e) = self.cache.put(update).await {
            self.fail(generation, &e);
            return;
        }

        tracing::info!(
            generation,
            task_count,
            project_duration = result.project_duration,
            critical = result.critical_path.len(),
            "CPM snapshot cached"
        );
        let _ = self.events.send(OrchestratorEvent::Recomputed {
            generation,
            task_count,
            project_duration: result.project_duration,
            enrichment_dispatched: dispatch,
        });

        if dispatch {
            self.dispatch_enrichment(generation, &result, &tasks);
        } else {
            tracing::info!(generation, "No active tasks, skipping enrichment");
        }
    }

    fn dispatch_enrichment(&self, generation: u64, result: &CpmResult, tasks: &[Task]) {
        let (metrics, subject) = project_metrics(result, tasks);
        let context = ProjectContext {
            total_tasks: result.nodes.len(),
        };
        let client = Arc::clone(&self.client);
        let cache = Arc::clone(&self.cache);
        let events = self.events.clone();
        let timeout = self.config.enrichment_timeout;

        tokio::spawn(async move {
            let assessment =
                assess_with_fallback(client.as_ref(), &metrics, &subject, &context, timeout).await;
            let source = assessment.source;

            let event = match cache
                .put(SnapshotUpdate::Enrichment {
                    assessment,
                    generation,
                })
                .await
            {
                Ok(applied) => {
                    if applied {
                        tracing::info!(generation, ?source, "Assessment cached");
                    } else {
                        tracing::info!(generation, "Discarded assessment for superseded snapshot");
                    }
                    OrchestratorEvent::Enriched {
                        generation,
                        applied,
                        source,
                    }
                }
                Err(e) => {
                    tracing::error!(generation, error = %e, "Failed to cache assessment");
                    OrchestratorEvent::EnrichmentFailed {
                        generation,
                        error: e.to_string(),
                    }
                }
            };
            let _ = events.send(event);
        });
    }

    fn fail(&self, generation: u64, error: &crate::error::Error) {
        tracing::error!(generation, error = %error, "Recalculation failed");
        let _ = self.events.send(OrchestratorEvent::RecomputeFailed {
            generation,
            error: error.to_string(),
        });
    }
}

/// Project-level enrichment input for a CPM result.
///
/// The critical path stands in for the ripple: its length is the ripple count,
/// and a path longer than two tasks counts as milestone impact. The subject is
/// the first critical task's title.
fn project_metrics(result: &CpmResult, tasks: &[Task]) -> (EnrichmentMetrics, String) {
    let ripple_count = result.critical_path.len();
    let metrics = EnrichmentMetrics {
        ripple_count,
        time_debt_hours: 0,
        impacts_milestone: ripple_count > 2,
        delay_days: 0,
    };

    let subject = result
        .critical_path
        .first()
        .and_then(|id| tasks.iter().find(|t| &t.id == id))
        .map_or_else(|| PROJECT_SUBJECT.to_string(), |t| t.title.clone());

    (metrics, subject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskId;

    fn task(id: &str, title: &str, deps: &[&str]) -> Task {
        let mut t = Task::new(id, title);
        t.dependencies = deps.iter().map(|d| TaskId::from(*d)).collect();
        t
    }

    #[test]
    fn test_project_metrics_use_critical_path() {
        let tasks = vec![
            task("a", "Kickoff", &[]),
            task("b", "Build", &["a"]),
            task("c", "Launch", &["b"]),
        ];
        let result = cpm::solve(&tasks, &DelayMap::new());

        let (metrics, subject) = project_metrics(&result, &tasks);
        assert_eq!(metrics.ripple_count, 3);
        assert!(metrics.impacts_milestone);
        assert_eq!(metrics.delay_days, 0);
        assert_eq!(subject, "Kickoff");
    }

    #[test]
    fn test_project_metrics_without_tasks() {
        let result = CpmResult::default();
        let (metrics, subject) = project_metrics(&result, &[]);

        assert_eq!(metrics.ripple_count, 0);
        assert!(!metrics.impacts_milestone);
        assert_eq!(subject, "Project");
    }

    #[tokio::test]
    async fn test_notify_after_worker_stopped_does_not_panic() {
        let (handle, rx) = RecalcHandle::channel();
        drop(rx);
        handle.notify(MutationKind::Manual);
    }
}
