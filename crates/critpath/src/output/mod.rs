//! Output formatting for CLI commands.
//!
//! Every printer supports human-readable text and pretty JSON. Text writers are
//! generic over [`Write`] so they can be rendered into buffers under test.

pub mod color;

use crate::analysis::SimulationReport;
use crate::cache::{CacheState, CacheView};
use crate::cpm::CpmResult;
use crate::enrichment::Assessment;
use crate::slippage::ScanReport;
use serde::Serialize;
use std::env;
use std::io::{self, Write};

pub use color::{error, success, warning};

use color::{bold, colorize_id, colorize_risk, dimmed};

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// Configuration for text output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create an `OutputConfig` with explicit values.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Create an `OutputConfig` from the environment.
    ///
    /// Colors are off when `NO_COLOR` is set or `CRITPATH_COLOR` is `0`/`false`.
    pub fn from_env() -> Self {
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("CRITPATH_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);
        Self { use_colors }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { use_colors: true }
    }
}

/// Print any serializable value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(handle, "{json}")
}

/// Print a CPM result.
pub fn print_analysis(result: &CpmResult, mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(result),
        OutputMode::Text => {
            let stdout = io::stdout();
            write_analysis_text(&mut stdout.lock(), result, &OutputConfig::from_env())
        }
    }
}

/// Print a simulation report.
pub fn print_simulation(report: &SimulationReport, mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(report),
        OutputMode::Text => {
            let stdout = io::stdout();
            write_simulation_text(&mut stdout.lock(), report, &OutputConfig::from_env())
        }
    }
}

/// Print a slippage scan report.
pub fn print_scan(report: &ScanReport, mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(report),
        OutputMode::Text => {
            let stdout = io::stdout();
            write_scan_text(&mut stdout.lock(), report, &OutputConfig::from_env())
        }
    }
}

#[derive(Serialize)]
struct LatestJson<'a> {
    state: CacheState,
    #[serde(flatten)]
    view: &'a CacheView,
}

/// Print the cached snapshot with its freshness state.
pub fn print_cache_view(view: &CacheView, state: CacheState, mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(&LatestJson { state, view }),
        OutputMode::Text => {
            let stdout = io::stdout();
            write_cache_view_text(&mut stdout.lock(), view, state, &OutputConfig::from_env())
        }
    }
}

// ============================================================================
// Text Formatting
// ============================================================================

fn write_analysis_text<W: Write>(
    w: &mut W,
    result: &CpmResult,
    config: &OutputConfig,
) -> io::Result<()> {
    if result.nodes.is_empty() {
        return writeln!(w, "No active tasks.");
    }

    writeln!(
        w,
        "{} {} days, {} tasks, impact {:.2}",
        bold("Project duration:", config),
        result.project_duration,
        result.nodes.len(),
        result.total_impact_score
    )?;
    writeln!(w)?;
    writeln!(
        w,
        "{}",
        dimmed(
            &format!(
                "{:<16} {:>4} {:>4} {:>4} {:>4} {:>4} {:>5}  {}",
                "ID", "DUR", "ES", "EF", "LS", "LF", "FLOAT", "TITLE"
            ),
            config
        )
    )?;

    for node in &result.nodes {
        let row = format!(
            "{:>4} {:>4} {:>4} {:>4} {:>4} {:>5}  {}",
            node.duration, node.es, node.ef, node.ls, node.lf, node.float, node.title
        );
        let marker = if node.is_critical { "*" } else { " " };
        let row = if node.is_critical {
            color::error(&row, config)
        } else {
            row
        };
        writeln!(
            w,
            "{marker}{} {row}",
            colorize_id(&format!("{:<15}", node.id.as_str()), config)
        )?;
    }

    writeln!(w)?;
    let path: Vec<&str> = result.critical_path.iter().map(|id| id.as_str()).collect();
    writeln!(w, "{} {}", bold("Critical path:", config), path.join(" -> "))?;

    if result.has_cycle() {
        let cyclic: Vec<&str> = result.cyclic_task_ids.iter().map(|id| id.as_str()).collect();
        writeln!(
            w,
            "{}",
            warning(
                &format!(
                    "Dependency cycle detected; values for {} are best-effort.",
                    cyclic.join(", ")
                ),
                config
            )
        )?;
    }
    Ok(())
}

fn write_assessment_text<W: Write>(
    w: &mut W,
    assessment: &Assessment,
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(
        w,
        "{} {} (confidence {}/100)",
        bold("Risk:", config),
        colorize_risk(assessment.risk_level, config),
        assessment.confidence_score
    )?;
    writeln!(w, "  {}", assessment.strategic_advice)?;
    writeln!(w, "  {}", dimmed(&assessment.explanation, config))
}

fn write_simulation_text<W: Write>(
    w: &mut W,
    report: &SimulationReport,
    config: &OutputConfig,
) -> io::Result<()> {
    let metrics = &report.metrics;
    writeln!(
        w,
        "Delaying {} by {} day(s)",
        bold(&report.task_name, config),
        metrics.delay_days
    )?;
    writeln!(
        w,
        "  {} {}",
        dimmed("Affected tasks:", config),
        metrics.ripple_count
    )?;
    for id in &metrics.affected_task_ids {
        writeln!(w, "    {}", colorize_id(id.as_str(), config))?;
    }
    writeln!(
        w,
        "  {} {}h",
        dimmed("Time debt:", config),
        metrics.time_debt_hours
    )?;
    if metrics.impacts_milestone {
        writeln!(w, "  {}", warning("Milestone at risk", config))?;
    }
    writeln!(w)?;
    write_assessment_text(w, &report.ai, config)
}

fn write_scan_text<W: Write>(w: &mut W, report: &ScanReport, config: &OutputConfig) -> io::Result<()> {
    if report.overdue.is_empty() {
        return writeln!(w, "{}", success("No slippage detected.", config));
    }

    writeln!(
        w,
        "{} overdue task(s), {} newly flagged, {} alert(s) sent",
        report.overdue.len(),
        report.newly_flagged.len(),
        report.notified
    )?;
    for id in &report.overdue {
        let note = if report.newly_flagged.contains(id) {
            warning("flagged", config)
        } else {
            dimmed("already flagged", config)
        };
        writeln!(w, "  {} {note}", colorize_id(id.as_str(), config))?;
    }
    Ok(())
}

fn write_cache_view_text<W: Write>(
    w: &mut W,
    view: &CacheView,
    state: CacheState,
    config: &OutputConfig,
) -> io::Result<()> {
    if !view.cached {
        return writeln!(w, "No impact snapshot cached yet.");
    }

    let state_text = match state {
        CacheState::Fresh => success("fresh", config),
        CacheState::Pending => warning("assessment pending", config),
        CacheState::Stale | CacheState::Empty => error("stale", config),
    };
    writeln!(w, "{} {state_text}", bold("Snapshot:", config))?;

    if let Some(at) = view.last_calculated_at {
        writeln!(
            w,
            "  {} {}",
            dimmed("Calculated:", config),
            at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
    }
    if let Some(cpm) = &view.cpm_snapshot {
        writeln!(
            w,
            "  {} {} days, critical path of {} task(s)",
            dimmed("Duration:", config),
            cpm.project_duration,
            cpm.critical_path.len()
        )?;
    }
    if let Some(at_risk) = view.at_risk_task_ids.as_ref().filter(|ids| !ids.is_empty()) {
        let ids: Vec<&str> = at_risk.iter().map(|id| id.as_str()).collect();
        writeln!(w, "  {} {}", dimmed("At risk:", config), ids.join(", "))?;
    }
    if let Some(assessment) = &view.ai_result {
        writeln!(w)?;
        write_assessment_text(w, assessment, config)?;
    }
    Ok(())
}
