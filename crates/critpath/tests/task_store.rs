//! Integration tests for JSONL-backed task collections.
//!
//! # Test Coverage
//!
//! - Resilient loading with malformed and duplicate records
//! - Analysis over a loaded store
//! - Writing changed records back without disturbing the rest of the file

use critpath::analysis::full_analysis;
use critpath::cpm::DelayMap;
use critpath::domain::{NewTask, Stage, TaskId, TaskUpdate};
use critpath::store::{InMemoryTaskStore, LoadWarning, TaskSource, load_tasks_jsonl, patch_tasks_jsonl};
use std::io::Write;
use tempfile::NamedTempFile;

fn create_temp_jsonl_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

const PROJECT: &str = r#"{"id":"design","title":"Write design","duration":2,"cost_per_day":100.0}
{"id":"build","title":"Build","duration":5,"dependencies":["design"],"stage":"in progress"}
{"id":"docs","title":"Docs","duration":1,"dependencies":["design"]}
{"id":"ship","title":"Ship milestone","duration":1,"dependencies":["build","docs"],"priority":"high"}
"#;

#[tokio::test]
async fn loaded_project_can_be_analyzed() {
    let file = create_temp_jsonl_file(PROJECT);
    let (tasks, warnings) = load_tasks_jsonl(file.path()).await.unwrap();
    assert!(warnings.is_empty());

    let store = InMemoryTaskStore::from_tasks(tasks);
    let result = full_analysis(&store, &DelayMap::new()).await.unwrap();

    assert_eq!(result.project_duration, 8);
    let critical: Vec<_> = result.critical_path.iter().map(TaskId::as_str).collect();
    assert_eq!(critical, vec!["design", "build", "ship"]);
    assert_eq!(result.node(&TaskId::new("docs")).unwrap().float, 4);
    assert_eq!(
        result.node(&TaskId::new("build")).unwrap().stage,
        Stage::InProgress
    );
}

#[tokio::test]
async fn corrupt_lines_are_reported_and_skipped() {
    let content = format!(
        "{PROJECT}{{\"id\":\"broken\",\"title\":\n{{\"id\":\"docs\",\"title\":\"Docs again\"}}\n{{\"title\":\"no id\"}}\n"
    );
    let file = create_temp_jsonl_file(&content);

    let (tasks, warnings) = load_tasks_jsonl(file.path()).await.unwrap();

    assert_eq!(tasks.len(), 4);
    assert_eq!(warnings.len(), 3);
    assert!(matches!(warnings[0], LoadWarning::MalformedJson { line_number: 5, .. }));
    assert!(matches!(
        &warnings[1],
        LoadWarning::DuplicateTask { task_id, line_number: 6 } if task_id.as_str() == "docs"
    ));
    assert!(matches!(warnings[2], LoadWarning::MalformedJson { line_number: 7, .. }));
}

#[tokio::test]
async fn trashed_tasks_are_invisible_to_analysis() {
    let file = create_temp_jsonl_file(PROJECT);
    let (tasks, _) = load_tasks_jsonl(file.path()).await.unwrap();
    let store = InMemoryTaskStore::from_tasks(tasks);

    store
        .update(
            &TaskId::new("build"),
            TaskUpdate {
                is_trashed: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(store.active_tasks().await.unwrap().len(), 3);
    let result = full_analysis(&store, &DelayMap::new()).await.unwrap();
    // design(2) -> docs(1) -> ship(1); the edge to the trashed task is dropped.
    assert_eq!(result.project_duration, 4);
    assert!(result.node(&TaskId::new("build")).is_none());
}

#[tokio::test]
async fn mutations_are_patched_into_the_file() {
    let file = create_temp_jsonl_file(&format!("{PROJECT}{{not json\n"));
    let (tasks, _) = load_tasks_jsonl(file.path()).await.unwrap();
    let store = InMemoryTaskStore::from_tasks(tasks);

    let mut new_task = NewTask::new("Announce");
    new_task.dependencies = vec![TaskId::new("ship")];
    let created = store.create(new_task).await.unwrap();
    let updated = store
        .update(
            &TaskId::new("docs"),
            TaskUpdate {
                duration: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let written = patch_tasks_jsonl(&[updated, created.clone()], file.path())
        .await
        .unwrap();
    assert_eq!(written, 2);

    let (reloaded, warnings) = load_tasks_jsonl(file.path()).await.unwrap();
    assert_eq!(warnings.len(), 1, "the malformed line is kept");
    let ids: Vec<_> = reloaded.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["design", "build", "docs", "ship", created.id.as_str()]);
    assert_eq!(reloaded[2].duration, 3);
    assert_eq!(reloaded[4].dependencies, vec![TaskId::new("ship")]);
}
