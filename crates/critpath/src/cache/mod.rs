//! Impact snapshot cache.
//!
//! The cache holds a single logical record, the [`ImpactSnapshot`]. It is written
//! by three independent parties:
//!
//! - the orchestrator replaces the CPM block after every recomputation,
//! - the enrichment task fills in the assessment some time later,
//! - the slippage scanner replaces the at-risk set.
//!
//! Each writer only touches the fields it owns, expressed as a
//! [`SnapshotUpdate`]. Backends apply updates atomically through
//! [`ImpactSnapshot::apply`], so no writer needs a lock beyond the backend's own.
//!
//! # Generations
//!
//! Every CPM write carries a generation number that increases with each
//! recomputation. Enrichment writes are tagged with the generation they were
//! computed for, and a write older than the stored CPM block is discarded. A
//! slow assessment therefore never overwrites the pending state of a newer
//! snapshot.
//!
//! # Backends
//!
//! - [`InMemoryCache`]: process-local, used by long-running services and tests
//! - [`JsonFileCache`]: one JSON document replaced atomically on every write

mod file;
mod in_memory;

pub use file::JsonFileCache;
pub use in_memory::InMemoryCache;

use crate::cpm::CpmResult;
use crate::domain::TaskId;
use crate::enrichment::Assessment;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The cached scheduling snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactSnapshot {
    /// Latest CPM result (absent until the first recomputation)
    #[serde(default)]
    pub cpm_snapshot: Option<CpmResult>,

    /// Tasks flagged as overdue by the last slippage scan
    #[serde(default)]
    pub at_risk_task_ids: Vec<TaskId>,

    /// When the CPM block was last written
    #[serde(default)]
    pub last_calculated_at: Option<DateTime<Utc>>,

    /// Whether an assessment for the current CPM block is outstanding
    #[serde(default)]
    pub ai_pending: bool,

    /// Latest assessment
    #[serde(default)]
    pub ai_result: Option<Assessment>,

    /// Generation of the CPM block
    #[serde(default)]
    pub generation: u64,
}

/// A write to one block of the snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotUpdate {
    /// Replace the CPM block.
    ///
    /// With `ai_pending` set, the previous assessment stays visible until the new
    /// one lands. Without it, the previous assessment is cleared.
    Cpm {
        /// The new CPM result
        cpm: CpmResult,
        /// Computation time
        calculated_at: DateTime<Utc>,
        /// Recomputation generation
        generation: u64,
        /// Whether an assessment has been dispatched for this generation
        ai_pending: bool,
    },

    /// Store an assessment computed for `generation`
    Enrichment {
        /// The assessment
        assessment: Assessment,
        /// Generation the assessment belongs to
        generation: u64,
    },

    /// Replace the at-risk task set
    AtRisk {
        /// Currently overdue tasks
        task_ids: Vec<TaskId>,
    },
}

impl ImpactSnapshot {
    /// Apply `update` in place.
    ///
    /// Returns `false` when the update was discarded because it belongs to an
    /// older generation than the stored CPM block.
    pub fn apply(&mut self, update: SnapshotUpdate) -> bool {
        match update {
            SnapshotUpdate::Cpm {
                cpm,
                calculated_at,
                generation,
                ai_pending,
            } => {
                self.cpm_snapshot = Some(cpm);
                self.last_calculated_at = Some(calculated_at);
                self.generation = generation;
                self.ai_pending = ai_pending;
                if !ai_pending {
                    self.ai_result = None;
                }
                true
            }
            SnapshotUpdate::Enrichment {
                assessment,
                generation,
            } => {
                if generation < self.generation {
                    return false;
                }
                self.ai_result = Some(assessment);
                self.ai_pending = false;
                true
            }
            SnapshotUpdate::AtRisk { task_ids } => {
                self.at_risk_task_ids = task_ids;
                true
            }
        }
    }
}

/// Observable freshness of the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    /// Nothing has been written yet
    Empty,

    /// An assessment is outstanding for the current CPM block
    Pending,

    /// The CPM block is missing or older than the freshness window
    Stale,

    /// CPM block and assessment are current
    Fresh,
}

/// Read model of the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheView {
    /// Whether any snapshot exists
    pub cached: bool,

    /// Latest CPM result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpm_snapshot: Option<CpmResult>,

    /// Tasks flagged as overdue
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_risk_task_ids: Option<Vec<TaskId>>,

    /// When the CPM block was last written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_calculated_at: Option<DateTime<Utc>>,

    /// Whether an assessment is outstanding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_pending: Option<bool>,

    /// Latest assessment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_result: Option<Assessment>,
}

impl CacheView {
    /// Classify the view relative to `now`.
    ///
    /// A snapshot whose CPM block is older than `stale_after` is `Stale`.
    pub fn state(&self, now: DateTime<Utc>, stale_after: Duration) -> CacheState {
        if !self.cached {
            return CacheState::Empty;
        }
        if self.ai_pending == Some(true) {
            return CacheState::Pending;
        }
        match self.last_calculated_at {
            Some(at) if self.cpm_snapshot.is_some() && now - at <= stale_after => {
                CacheState::Fresh
            }
            _ => CacheState::Stale,
        }
    }
}

impl From<Option<ImpactSnapshot>> for CacheView {
    fn from(snapshot: Option<ImpactSnapshot>) -> Self {
        match snapshot {
            None => Self {
                cached: false,
                cpm_snapshot: None,
                at_risk_task_ids: None,
                last_calculated_at: None,
                ai_pending: None,
                ai_result: None,
            },
            Some(s) => Self {
                cached: true,
                cpm_snapshot: s.cpm_snapshot,
                at_risk_task_ids: Some(s.at_risk_task_ids),
                last_calculated_at: s.last_calculated_at,
                ai_pending: Some(s.ai_pending),
                ai_result: s.ai_result,
            },
        }
    }
}

/// Storage for the impact snapshot.
///
/// Implementations must apply each update atomically with respect to other
/// updates, using [`ImpactSnapshot::apply`] on the current record (or on a
/// default record when none exists).
#[async_trait]
pub trait ImpactCache: Send + Sync {
    /// Read the current snapshot, if any.
    async fn get(&self) -> Result<Option<ImpactSnapshot>>;

    /// Apply a partial update.
    ///
    /// Returns `false` if the update was discarded as stale.
    async fn put(&self, update: SnapshotUpdate) -> Result<bool>;

    /// Read the current snapshot as a [`CacheView`].
    async fn view(&self) -> Result<CacheView> {
        Ok(CacheView::from(self.get().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::{AssessmentSource, RiskLevel};

    fn assessment(score: u8) -> Assessment {
        Assessment {
            confidence_score: score,
            risk_level: RiskLevel::from_confidence(score),
            strategic_advice: "advice".to_string(),
            explanation: "explanation".to_string(),
            source: AssessmentSource::Service,
        }
    }

    fn cpm_update(generation: u64, ai_pending: bool) -> SnapshotUpdate {
        SnapshotUpdate::Cpm {
            cpm: CpmResult::default(),
            calculated_at: Utc::now(),
            generation,
            ai_pending,
        }
    }

    #[test]
    fn test_cpm_write_keeps_previous_assessment_while_pending() {
        let mut snapshot = ImpactSnapshot::default();
        snapshot.apply(cpm_update(1, true));
        snapshot.apply(SnapshotUpdate::Enrichment {
            assessment: assessment(80),
            generation: 1,
        });

        snapshot.apply(cpm_update(2, true));

        assert!(snapshot.ai_pending);
        assert_eq!(snapshot.ai_result.as_ref().unwrap().confidence_score, 80);
        assert_eq!(snapshot.generation, 2);
    }

    #[test]
    fn test_cpm_write_without_dispatch_clears_assessment() {
        let mut snapshot = ImpactSnapshot::default();
        snapshot.apply(cpm_update(1, true));
        snapshot.apply(SnapshotUpdate::Enrichment {
            assessment: assessment(80),
            generation: 1,
        });

        snapshot.apply(cpm_update(2, false));

        assert!(!snapshot.ai_pending);
        assert!(snapshot.ai_result.is_none());
    }

    #[test]
    fn test_stale_enrichment_is_discarded() {
        let mut snapshot = ImpactSnapshot::default();
        snapshot.apply(cpm_update(1, true));
        snapshot.apply(cpm_update(2, true));

        let applied = snapshot.apply(SnapshotUpdate::Enrichment {
            assessment: assessment(10),
            generation: 1,
        });

        assert!(!applied);
        assert!(snapshot.ai_pending);
        assert!(snapshot.ai_result.is_none());
    }

    #[test]
    fn test_at_risk_write_leaves_cpm_block_alone() {
        let mut snapshot = ImpactSnapshot::default();
        snapshot.apply(cpm_update(3, true));
        snapshot.apply(SnapshotUpdate::AtRisk {
            task_ids: vec![TaskId::new("late")],
        });

        assert_eq!(snapshot.generation, 3);
        assert!(snapshot.ai_pending);
        assert_eq!(snapshot.at_risk_task_ids, vec![TaskId::new("late")]);
    }

    #[test]
    fn test_view_states() {
        let now = Utc::now();
        let window = Duration::hours(1);

        let empty = CacheView::from(None);
        assert_eq!(empty.state(now, window), CacheState::Empty);

        let mut snapshot = ImpactSnapshot::default();
        snapshot.apply(SnapshotUpdate::AtRisk { task_ids: vec![] });
        let at_risk_only = CacheView::from(Some(snapshot.clone()));
        assert_eq!(at_risk_only.state(now, window), CacheState::Stale);

        snapshot.apply(SnapshotUpdate::Cpm {
            cpm: CpmResult::default(),
            calculated_at: now,
            generation: 1,
            ai_pending: true,
        });
        let pending = CacheView::from(Some(snapshot.clone()));
        assert_eq!(pending.state(now, window), CacheState::Pending);

        snapshot.apply(SnapshotUpdate::Enrichment {
            assessment: assessment(90),
            generation: 1,
        });
        let fresh = CacheView::from(Some(snapshot));
        assert_eq!(fresh.state(now, window), CacheState::Fresh);
        assert_eq!(
            fresh.state(now + Duration::hours(2), window),
            CacheState::Stale
        );
    }
}
