//! Integration tests for the slippage scanner.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use critpath::cache::{ImpactCache, InMemoryCache};
use critpath::clock::ManualClock;
use critpath::domain::{ActivityKind, Stage, Task, TaskId};
use critpath::error::{Error, Result};
use critpath::orchestrator::{MutationKind, RecalcHandle};
use critpath::slippage::{AUTO_FLAG_MARKER, Notifier, SlippageScanner};
use critpath::store::{InMemoryTaskStore, JsonlTaskStore};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Default)]
struct RecordingNotifier {
    alerts: Mutex<Vec<(TaskId, String)>>,
    fail: bool,
}

impl RecordingNotifier {
    fn alerts(&self) -> Vec<(TaskId, String)> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_at_risk(&self, task: &Task, message: &str) -> Result<()> {
        if self.fail {
            return Err(Error::Storage("mail relay down".to_string()));
        }
        self.alerts
            .lock()
            .unwrap()
            .push((task.id.clone(), message.to_string()));
        Ok(())
    }
}

struct Harness {
    store: InMemoryTaskStore,
    cache: Arc<InMemoryCache>,
    notifier: Arc<RecordingNotifier>,
    clock: Arc<ManualClock>,
    signals: UnboundedReceiver<MutationKind>,
    scanner: SlippageScanner,
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap()
}

fn overdue(id: &str, team: &[&str]) -> Task {
    let mut task = Task::new(id, format!("Task {id}"));
    task.date = Some(start() - Duration::days(3));
    task.team = team.iter().map(|m| (*m).to_string()).collect();
    task
}

fn harness(tasks: Vec<Task>, notifier: RecordingNotifier) -> Harness {
    let store = InMemoryTaskStore::from_tasks(tasks);
    let cache = Arc::new(InMemoryCache::new());
    let notifier = Arc::new(notifier);
    let clock = Arc::new(ManualClock::new(start()));
    let (handle, signals) = RecalcHandle::channel();
    let scanner = SlippageScanner::new(
        Arc::new(store.clone()),
        notifier.clone(),
        cache.clone(),
        handle,
        clock.clone(),
    );
    Harness {
        store,
        cache,
        notifier,
        clock,
        signals,
        scanner,
    }
}

async fn flag_count(store: &InMemoryTaskStore, id: &str) -> usize {
    store
        .get(&TaskId::new(id))
        .await
        .unwrap()
        .activities
        .iter()
        .filter(|a| a.kind == ActivityKind::Bug && a.activity.contains(AUTO_FLAG_MARKER))
        .count()
}

fn drain(signals: &mut UnboundedReceiver<MutationKind>) -> Vec<MutationKind> {
    std::iter::from_fn(|| signals.try_recv().ok()).collect()
}

#[tokio::test]
async fn two_scans_within_window_flag_and_notify_once() {
    let mut h = harness(vec![overdue("late", &["ana"])], RecordingNotifier::default());

    let first = h.scanner.scan().await.unwrap();
    assert_eq!(first.newly_flagged, vec![TaskId::new("late")]);
    assert_eq!(first.notified, 1);

    h.clock.advance(Duration::hours(6));
    let second = h.scanner.scan().await.unwrap();
    assert_eq!(second.overdue, vec![TaskId::new("late")]);
    assert!(second.newly_flagged.is_empty());
    assert_eq!(second.notified, 0);

    assert_eq!(flag_count(&h.store, "late").await, 1);
    assert_eq!(h.notifier.alerts().len(), 1);
    assert_eq!(
        drain(&mut h.signals),
        vec![MutationKind::SlippageScan, MutationKind::SlippageScan]
    );
}

#[tokio::test]
async fn task_is_flagged_again_after_window() {
    let h = harness(vec![overdue("late", &["ana"])], RecordingNotifier::default());

    h.scanner.scan().await.unwrap();
    h.clock.advance(Duration::hours(25));
    let report = h.scanner.scan().await.unwrap();

    assert_eq!(report.newly_flagged, vec![TaskId::new("late")]);
    assert_eq!(flag_count(&h.store, "late").await, 2);
    assert_eq!(h.notifier.alerts().len(), 2);
}

#[tokio::test]
async fn shorter_flag_window_is_honored() {
    let h = harness(vec![overdue("late", &[])], RecordingNotifier::default());
    let scanner = h.scanner.with_flag_window(Duration::hours(1));

    scanner.scan().await.unwrap();
    h.clock.advance(Duration::hours(2));
    scanner.scan().await.unwrap();

    assert_eq!(flag_count(&h.store, "late").await, 2);
}

#[tokio::test]
async fn only_overdue_open_tasks_are_reported() {
    let mut done = overdue("done", &["ana"]);
    done.stage = Stage::Completed;
    let mut trashed = overdue("trashed", &["ana"]);
    trashed.is_trashed = true;
    let mut upcoming = overdue("upcoming", &["ana"]);
    upcoming.date = Some(start() + Duration::days(1));
    let undated = Task::new("undated", "No due date");

    let h = harness(
        vec![overdue("late", &["ana"]), done, trashed, upcoming, undated],
        RecordingNotifier::default(),
    );
    let report = h.scanner.scan().await.unwrap();

    assert_eq!(report.overdue, vec![TaskId::new("late")]);
    let snapshot = h.cache.get().await.unwrap().unwrap();
    assert_eq!(snapshot.at_risk_task_ids, vec![TaskId::new("late")]);
}

#[tokio::test]
async fn unassigned_tasks_are_flagged_without_alert() {
    let h = harness(vec![overdue("solo", &[])], RecordingNotifier::default());

    let report = h.scanner.scan().await.unwrap();

    assert_eq!(report.newly_flagged, vec![TaskId::new("solo")]);
    assert_eq!(report.notified, 0);
    assert!(h.notifier.alerts().is_empty());
}

#[tokio::test]
async fn alert_message_names_the_task() {
    let h = harness(vec![overdue("late", &["ana", "ben"])], RecordingNotifier::default());

    h.scanner.scan().await.unwrap();

    let alerts = h.notifier.alerts();
    assert_eq!(alerts[0].0, TaskId::new("late"));
    assert!(alerts[0].1.contains("\"Task late\" is overdue"));
}

#[tokio::test]
async fn notifier_failure_does_not_abort_scan() {
    let notifier = RecordingNotifier {
        fail: true,
        ..Default::default()
    };
    let mut h = harness(vec![overdue("a", &["ana"]), overdue("b", &["ben"])], notifier);

    let report = h.scanner.scan().await.unwrap();

    assert_eq!(report.newly_flagged.len(), 2);
    assert_eq!(report.notified, 0);
    assert_eq!(drain(&mut h.signals), vec![MutationKind::SlippageScan]);
}

#[tokio::test]
async fn empty_scan_clears_previous_at_risk_ids() {
    let mut h = harness(vec![overdue("late", &[])], RecordingNotifier::default());

    h.scanner.scan().await.unwrap();
    assert_eq!(
        h.cache.get().await.unwrap().unwrap().at_risk_task_ids,
        vec![TaskId::new("late")]
    );

    h.store
        .update(
            &TaskId::new("late"),
            critpath::domain::TaskUpdate {
                stage: Some(Stage::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let report = h.scanner.scan().await.unwrap();

    assert!(report.overdue.is_empty());
    assert!(h.cache.get().await.unwrap().unwrap().at_risk_task_ids.is_empty());
    assert_eq!(drain(&mut h.signals).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn periodic_scans_run_on_interval() {
    let mut h = harness(vec![overdue("late", &[])], RecordingNotifier::default());
    let scanner = Arc::new(h.scanner);

    let task = scanner.run_periodic(std::time::Duration::from_secs(3600));
    tokio::time::sleep(std::time::Duration::from_secs(2 * 3600 + 1800)).await;
    task.abort();

    // Ticks at 0h, 1h and 2h
    assert_eq!(drain(&mut h.signals).len(), 3);
    assert_eq!(flag_count(&h.store, "late").await, 1);
}

#[tokio::test]
async fn file_backed_scan_sees_edits_and_persists_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.jsonl");
    let on_time = Task::new("later", "Later");
    let lines = format!(
        "{}\n{{\"id\":\"notes\",\"title\":\"Notes\",\"description\":\"keep me\"}}\n",
        serde_json::to_string(&on_time).unwrap()
    );
    std::fs::write(&path, &lines).unwrap();

    let (store, _) = JsonlTaskStore::open(&path).await.unwrap();
    let (handle, mut signals) = RecalcHandle::channel();
    let store = store.with_recalc(handle.clone());
    let scanner = SlippageScanner::new(
        Arc::new(store.clone()),
        Arc::new(RecordingNotifier::default()),
        Arc::new(InMemoryCache::new()),
        handle,
        Arc::new(ManualClock::new(start())),
    );

    let first = scanner.scan().await.unwrap();
    assert!(first.overdue.is_empty());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), lines, "nothing flagged, nothing written");
    assert_eq!(drain(&mut signals), vec![MutationKind::SlippageScan]);

    // Another process makes the task overdue.
    let late = overdue("later", &[]);
    let edited = lines.replacen(
        &serde_json::to_string(&on_time).unwrap(),
        &serde_json::to_string(&late).unwrap(),
        1,
    );
    std::fs::write(&path, &edited).unwrap();

    let second = scanner.scan().await.unwrap();
    assert_eq!(second.newly_flagged, vec![TaskId::new("later")]);
    assert_eq!(
        drain(&mut signals),
        vec![MutationKind::Updated, MutationKind::SlippageScan]
    );

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains(AUTO_FLAG_MARKER));
    assert!(content.contains("\"description\":\"keep me\""));

    let (reloaded, _) = JsonlTaskStore::open(&path).await.unwrap();
    assert_eq!(flag_count(reloaded.memory(), "later").await, 1);
}
