//! Qualitative assessment of scheduling metrics.
//!
//! The enrichment service is an external collaborator: it receives deterministic
//! metrics and answers with a confidence score, a risk band and some advice. Its
//! answer is modeled as a tagged [`EnrichmentOutcome`] so a failed or missing
//! service is an ordinary value, never an error crossing the boundary.
//!
//! [`assess_with_fallback`] is the entry point callers use. It bounds the call
//! with a timeout and substitutes [`heuristic_assessment`] whenever the service
//! is unavailable, so a usable assessment always comes back.

use crate::error::{Error, Result};
use crate::ripple::RippleResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Deterministic metrics handed to the enrichment service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentMetrics {
    /// Number of affected downstream tasks
    pub ripple_count: usize,

    /// Notional schedule loss in working hours
    pub time_debt_hours: u32,

    /// Whether a milestone is affected
    pub impacts_milestone: bool,

    /// Delay length in days
    pub delay_days: u32,
}

impl From<&RippleResult> for EnrichmentMetrics {
    fn from(ripple: &RippleResult) -> Self {
        Self {
            ripple_count: ripple.ripple_count,
            time_debt_hours: ripple.time_debt_hours,
            impacts_milestone: ripple.impacts_milestone,
            delay_days: ripple.delay_days,
        }
    }
}

/// Project-level context for an assessment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContext {
    /// Number of active tasks in the project
    pub total_tasks: usize,
}

/// Risk band of an assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Manageable
    Low,

    /// Needs attention
    Medium,

    /// Needs intervention
    High,

    /// Needs escalation
    Critical,
}

impl RiskLevel {
    /// Map a confidence score to its risk band.
    pub fn from_confidence(score: u8) -> Self {
        match score {
            0..30 => RiskLevel::Critical,
            30..50 => RiskLevel::High,
            50..70 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        };
        write!(f, "{s}")
    }
}

/// Where an assessment came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentSource {
    /// The enrichment service
    #[default]
    Service,

    /// The local heuristic fallback
    Heuristic,
}

/// A qualitative assessment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    /// Confidence in the schedule, 0 to 100
    pub confidence_score: u8,

    /// Risk band
    pub risk_level: RiskLevel,

    /// One actionable sentence
    pub strategic_advice: String,

    /// Why the score was given
    pub explanation: String,

    /// Origin of the assessment
    #[serde(default)]
    pub source: AssessmentSource,
}

impl Assessment {
    /// Clamp the confidence score into `[0, 100]`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.confidence_score = self.confidence_score.min(100);
        self
    }
}

/// Answer from an enrichment service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    /// The service produced an assessment
    Success(Assessment),

    /// The service could not answer
    Unavailable {
        /// Human-readable cause
        reason: String,
    },
}

impl EnrichmentOutcome {
    /// Convert into a `Result`, mapping `Unavailable` to `Error::EnrichmentUnavailable`.
    ///
    /// # Errors
    ///
    /// Returns `Error::EnrichmentUnavailable` carrying the reason.
    pub fn into_result(self) -> Result<Assessment> {
        match self {
            EnrichmentOutcome::Success(assessment) => Ok(assessment),
            EnrichmentOutcome::Unavailable { reason } => Err(Error::EnrichmentUnavailable(reason)),
        }
    }
}

/// External qualitative-assessment service.
///
/// Implementations must not panic and report every failure as
/// [`EnrichmentOutcome::Unavailable`].
#[async_trait]
pub trait EnrichmentClient: Send + Sync {
    /// Assess `metrics` for the task or project named by `subject`.
    async fn assess(
        &self,
        metrics: &EnrichmentMetrics,
        subject: &str,
        context: &ProjectContext,
    ) -> EnrichmentOutcome;
}

/// Client used when no enrichment service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineClient;

#[async_trait]
impl EnrichmentClient for OfflineClient {
    async fn assess(
        &self,
        _metrics: &EnrichmentMetrics,
        _subject: &str,
        _context: &ProjectContext,
    ) -> EnrichmentOutcome {
        EnrichmentOutcome::Unavailable {
            reason: "no enrichment service configured".to_string(),
        }
    }
}

/// Call `client` with a timeout and fall back to the heuristic on failure.
pub async fn assess_with_fallback(
    client: &dyn EnrichmentClient,
    metrics: &EnrichmentMetrics,
    subject: &str,
    context: &ProjectContext,
    timeout: Duration,
) -> Assessment {
    let result = match tokio::time::timeout(timeout, client.assess(metrics, subject, context)).await
    {
        Ok(outcome) => outcome.into_result(),
        Err(_) => Err(Error::EnrichmentUnavailable(format!(
            "timed out after {}ms",
            timeout.as_millis()
        ))),
    };

    match result {
        Ok(assessment) => {
            tracing::debug!(subject, risk = %assessment.risk_level, "Enrichment succeeded");
            assessment.normalized()
        }
        Err(err) => {
            tracing::warn!(subject, error = %err, "Using heuristic fallback");
            heuristic_assessment(metrics)
        }
    }
}

/// Deterministic assessment derived from the metrics alone.
///
/// Starts from 85 and deducts for delay length, ripple size and milestone
/// impact, then maps the score to a risk band.
pub fn heuristic_assessment(metrics: &EnrichmentMetrics) -> Assessment {
    let mut score: i32 = 85;

    score -= match metrics.delay_days {
        d if d > 7 => 20,
        d if d > 3 => 10,
        _ => 0,
    };
    score -= match metrics.ripple_count {
        r if r > 10 => 25,
        r if r > 5 => 15,
        r if r > 0 => 5,
        _ => 0,
    };
    if metrics.impacts_milestone {
        score -= 20;
    }

    let confidence_score = u8::try_from(score.clamp(5, 100)).unwrap_or(5);
    let risk_level = RiskLevel::from_confidence(confidence_score);

    let strategic_advice = match risk_level {
        RiskLevel::Critical => {
            "Escalate immediately. Re-allocate resources to prevent cascade failure."
        }
        RiskLevel::High => "Approve overtime or scope reduction to contain the blast radius.",
        RiskLevel::Medium => "Review downstream dependencies and adjust timelines proactively.",
        RiskLevel::Low => "The delay is manageable. Monitor progress closely.",
    };

    let explanation = format!(
        "Heuristic estimate: {} tasks affected, {}h debt{}.",
        metrics.ripple_count,
        metrics.time_debt_hours,
        if metrics.impacts_milestone {
            ", milestone at risk"
        } else {
            ""
        }
    );

    Assessment {
        confidence_score,
        risk_level,
        strategic_advice: strategic_advice.to_string(),
        explanation,
        source: AssessmentSource::Heuristic,
    }
}
