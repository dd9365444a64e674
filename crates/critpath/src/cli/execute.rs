//! Command execution logic.
//!
//! This module contains the implementation of all CLI commands.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

use super::args::{AnalyzeArgs, LatestArgs, ScanArgs, SimulateArgs, WatchArgs};
use crate::analysis::{full_analysis, simulate_with_assessment};
use crate::app::App;
use crate::cache::ImpactCache;
use crate::clock::SystemClock;
use crate::cpm::DelayMap;
use crate::domain::TaskId;
use crate::enrichment::OfflineClient;
use crate::orchestrator::{MutationKind, Orchestrator, OrchestratorConfig, OrchestratorEvent};
use crate::output::{self, OutputMode};
use crate::ripple::SimulateRequest;
use crate::slippage::{LogNotifier, SlippageScanner};
use crate::store::TaskStore;

/// Extra time allowed on top of debounce and enrichment when waiting for a recalculation.
const SETTLE_GRACE: Duration = Duration::from_secs(5);

/// Execute the analyze command
pub async fn execute_analyze(app: &App, args: &AnalyzeArgs, output_mode: OutputMode) -> Result<()> {
    let delays: DelayMap = args
        .delays
        .iter()
        .map(|(id, days)| (TaskId::new(id.as_str()), *days))
        .collect();

    let result = full_analysis(app.store(), &delays).await?;
    output::print_analysis(&result, output_mode)?;
    Ok(())
}

/// Execute the simulate command
pub async fn execute_simulate(
    app: &App,
    args: &SimulateArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let request = SimulateRequest::new(args.task_id.as_str(), args.delay_days);
    let report = simulate_with_assessment(
        app.store(),
        &request,
        &OfflineClient,
        app.config().enrichment_timeout(),
    )
    .await?;

    output::print_simulation(&report, output_mode)?;
    Ok(())
}

/// Execute the scan command
///
/// Runs one slippage scan, then waits for the recalculation it triggers so the
/// cache holds a complete snapshot when the command returns. Only the records
/// of newly flagged tasks are written back to the task file.
pub async fn execute_scan(app: &App, args: &ScanArgs, output_mode: OutputMode) -> Result<()> {
    let config = app.config();
    let cache = app.cache();

    let orchestrator = Orchestrator::spawn(
        Arc::new(app.store().clone()),
        cache.clone(),
        Arc::new(OfflineClient),
        orchestrator_config(app),
    );
    let mut events = orchestrator.subscribe();

    let tasks: Arc<dyn TaskStore> = if args.dry_run {
        Arc::new(app.store().clone())
    } else {
        Arc::new(app.task_file().clone())
    };
    let scanner = SlippageScanner::new(
        tasks,
        Arc::new(LogNotifier),
        cache,
        orchestrator.handle(),
        Arc::new(SystemClock),
    )
    .with_flag_window(config.flag_window());

    let report = scanner.scan().await?;
    if args.dry_run && !report.newly_flagged.is_empty() {
        tracing::info!(
            flagged = report.newly_flagged.len(),
            "Dry run, flags not written to the task file"
        );
    }

    let budget = config.debounce() + config.enrichment_timeout() + SETTLE_GRACE;
    if tokio::time::timeout(budget, wait_for_settle(&mut events))
        .await
        .is_err()
    {
        tracing::warn!("Recalculation did not finish in time");
    }
    orchestrator.shutdown().await;

    output::print_scan(&report, output_mode)?;
    Ok(())
}

/// Execute the latest command
pub async fn execute_latest(app: &App, _args: &LatestArgs, output_mode: OutputMode) -> Result<()> {
    let view = app.cache().view().await?;
    let state = view.state(chrono::Utc::now(), app.config().stale_after());
    output::print_cache_view(&view, state, output_mode)?;
    Ok(())
}

/// Execute the watch command
///
/// Recalculates once at startup, then scans for slippage on a fixed interval
/// until Ctrl-C. Each scan reloads the task file first; edits made since the
/// last scan trigger a recalculation. Flags are written as soon as a scan
/// appends them, so stopping the command writes nothing.
pub async fn execute_watch(app: &App, args: &WatchArgs, output_mode: OutputMode) -> Result<()> {
    let config = app.config();
    let interval = args
        .scan_interval
        .map_or_else(|| config.scan_interval(), Duration::from_secs);
    let cache = app.cache();

    let orchestrator = Orchestrator::spawn(
        Arc::new(app.store().clone()),
        cache.clone(),
        Arc::new(OfflineClient),
        orchestrator_config(app),
    );
    let tasks = Arc::new(app.task_file().clone().with_recalc(orchestrator.handle()));
    let mut events = orchestrator.subscribe();

    let scanner = Arc::new(
        SlippageScanner::new(
            tasks,
            Arc::new(LogNotifier),
            cache,
            orchestrator.handle(),
            Arc::new(SystemClock),
        )
        .with_flag_window(config.flag_window()),
    );

    orchestrator.handle().notify(MutationKind::Manual);
    let scan_task = scanner.run_periodic(interval);
    tracing::info!(
        interval_secs = interval.as_secs(),
        "Watching for slippage, press Ctrl-C to stop"
    );

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            event = events.recv() => match event {
                Ok(event) => report_event(&event, output_mode)?,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Dropped orchestrator events");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    scan_task.abort();
    orchestrator.shutdown().await;
    tracing::info!("Stopped watching");
    Ok(())
}

fn orchestrator_config(app: &App) -> OrchestratorConfig {
    OrchestratorConfig {
        debounce: app.config().debounce(),
        enrichment_timeout: app.config().enrichment_timeout(),
    }
}

/// Wait until the next recalculation has fully settled.
async fn wait_for_settle(events: &mut broadcast::Receiver<OrchestratorEvent>) {
    loop {
        match events.recv().await {
            Ok(OrchestratorEvent::Recomputed {
                enrichment_dispatched: false,
                ..
            })
            | Ok(OrchestratorEvent::Enriched { .. })
            | Ok(OrchestratorEvent::EnrichmentFailed { .. })
            | Ok(OrchestratorEvent::RecomputeFailed { .. })
            | Err(RecvError::Closed) => return,
            Ok(OrchestratorEvent::Recomputed { .. }) | Err(RecvError::Lagged(_)) => {}
        }
    }
}

fn report_event(event: &OrchestratorEvent, output_mode: OutputMode) -> Result<()> {
    match output_mode {
        OutputMode::Json => {
            let value = match event {
                OrchestratorEvent::Recomputed {
                    generation,
                    task_count,
                    project_duration,
                    ..
                } => serde_json::json!({
                    "event": "recomputed",
                    "generation": generation,
                    "task_count": task_count,
                    "project_duration": project_duration,
                }),
                OrchestratorEvent::RecomputeFailed { generation, error } => serde_json::json!({
                    "event": "recompute_failed",
                    "generation": generation,
                    "error": error,
                }),
                OrchestratorEvent::Enriched {
                    generation,
                    applied,
                    source,
                } => serde_json::json!({
                    "event": "enriched",
                    "generation": generation,
                    "applied": applied,
                    "source": source,
                }),
                OrchestratorEvent::EnrichmentFailed { generation, error } => serde_json::json!({
                    "event": "enrichment_failed",
                    "generation": generation,
                    "error": error,
                }),
            };
            output::print_json(&value)?;
        }
        OutputMode::Text => {
            let config = output::OutputConfig::from_env();
            let line = match event {
                OrchestratorEvent::Recomputed {
                    generation,
                    task_count,
                    project_duration,
                    ..
                } => output::success(
                    &format!(
                        "[{generation}] recalculated {task_count} task(s), duration {project_duration} days"
                    ),
                    &config,
                ),
                OrchestratorEvent::Enriched {
                    generation,
                    applied: true,
                    source,
                } => format!("[{generation}] assessment cached ({source:?})"),
                OrchestratorEvent::Enriched { .. } => return Ok(()),
                OrchestratorEvent::RecomputeFailed { generation, error }
                | OrchestratorEvent::EnrichmentFailed { generation, error } => {
                    output::error(&format!("[{generation}] {error}"), &config)
                }
            };
            println!("{line}");
        }
    }
    Ok(())
}
