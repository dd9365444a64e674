//! JSONL persistence for task collections.
//!
//! Each line holds one serialized [`Task`]. Loading is resilient: lines that
//! cannot be parsed are skipped and reported as [`LoadWarning`]s instead of
//! failing the whole file.
//!
//! Writing never regenerates the file. [`patch_tasks_jsonl`] swaps in the
//! records of changed tasks and leaves every other line as it was found.

use crate::atomic::write_atomic;
use crate::domain::{Task, TaskId};
use crate::error::Result;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Non-fatal problems found while loading a task file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// The line is not a valid task record and was skipped.
    MalformedJson {
        /// 1-based line number in the file
        line_number: usize,
        /// Parser message
        error: String,
    },

    /// A task with this ID appeared on an earlier line; the later one was skipped.
    DuplicateTask {
        /// The repeated ID
        task_id: TaskId,
        /// 1-based line number of the skipped record
        line_number: usize,
    },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::MalformedJson { line_number, error } => {
                write!(f, "line {line_number}: malformed task record ({error})")
            }
            LoadWarning::DuplicateTask {
                task_id,
                line_number,
            } => write!(f, "line {line_number}: duplicate task id '{task_id}' skipped"),
        }
    }
}

/// Load tasks from a JSONL file.
///
/// Blank lines are ignored. Returns the tasks in file order together with any
/// warnings. IO errors (including a missing file) are returned as errors.
pub async fn load_tasks_jsonl(path: &Path) -> Result<(Vec<Task>, Vec<LoadWarning>)> {
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();

    let mut tasks = Vec::new();
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();
    let mut line_number = 0;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        let task: Task = match serde_json::from_str(&line) {
            Ok(task) => task,
            Err(e) => {
                warnings.push(LoadWarning::MalformedJson {
                    line_number,
                    error: e.to_string(),
                });
                continue;
            }
        };

        if !seen.insert(task.id.clone()) {
            warnings.push(LoadWarning::DuplicateTask {
                task_id: task.id,
                line_number,
            });
            continue;
        }
        tasks.push(task);
    }

    tracing::debug!(
        path = %path.display(),
        tasks = tasks.len(),
        warnings = warnings.len(),
        "Loaded task file"
    );
    Ok((tasks, warnings))
}

/// Write the current state of `tasks` back into an existing JSONL file.
///
/// Each task replaces the first line that loads as a task with the same ID, the
/// same line [`load_tasks_jsonl`] would have used. Every other line is kept byte
/// for byte, malformed records and skipped duplicates included. Tasks without a
/// matching line are appended in the given order.
///
/// Returns the number of records written. The file is not touched when that is
/// zero.
pub async fn patch_tasks_jsonl(tasks: &[Task], path: &Path) -> Result<usize> {
    if tasks.is_empty() {
        return Ok(0);
    }
    let content = tokio::fs::read_to_string(path).await?;
    let mut pending: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();

    let mut buffer = Vec::with_capacity(content.len());
    let mut written = 0;
    for line in content.split_inclusive('\n') {
        let record = line.trim_end_matches(['\n', '\r']);
        let replacement = serde_json::from_str::<Task>(record)
            .ok()
            .and_then(|loaded| pending.remove(loaded.id.as_str()));

        match replacement {
            Some(task) => {
                serde_json::to_writer(&mut buffer, task)?;
                buffer.extend_from_slice(&line.as_bytes()[record.len()..]);
                written += 1;
            }
            None => buffer.extend_from_slice(line.as_bytes()),
        }
    }

    for task in tasks {
        if pending.remove(task.id.as_str()).is_none() {
            continue;
        }
        if buffer.last().is_some_and(|b| *b != b'\n') {
            buffer.push(b'\n');
        }
        serde_json::to_writer(&mut buffer, task)?;
        buffer.push(b'\n');
        written += 1;
    }

    if written > 0 {
        write_atomic(path, &buffer).await?;
        tracing::debug!(path = %path.display(), records = written, "Patched task file");
    }
    Ok(written)
}
