//! Domain types for task scheduling.
//!
//! Tasks are owned by an external task collection. The scheduling core only reads
//! them; the one exception is the slippage scanner, which appends audit activities
//! through a [`TaskStore`](crate::store::TaskStore).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a task
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create a new task ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Represents a task in the project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier for the task
    pub id: TaskId,

    /// Task title
    pub title: String,

    /// Planned duration in days (1 or more by convention)
    #[serde(default = "default_duration")]
    pub duration: u32,

    /// Cost incurred per day of delay beyond the task's float
    #[serde(default)]
    pub cost_per_day: f64,

    /// Predecessor task IDs
    #[serde(default)]
    pub dependencies: Vec<TaskId>,

    /// Workflow stage
    #[serde(default)]
    pub stage: Stage,

    /// Priority level
    #[serde(default)]
    pub priority: Priority,

    /// Due date
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,

    /// Soft-deleted tasks are excluded from every computation
    #[serde(default)]
    pub is_trashed: bool,

    /// Assignee user IDs
    #[serde(default)]
    pub team: Vec<String>,

    /// Audit log
    #[serde(default)]
    pub activities: Vec<Activity>,

    /// Fields owned by other tools, carried through unchanged on save
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_duration() -> u32 {
    1
}

impl Task {
    /// Create a task with default scheduling attributes.
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            duration: default_duration(),
            cost_per_day: 0.0,
            dependencies: Vec::new(),
            stage: Stage::default(),
            priority: Priority::default(),
            date: None,
            is_trashed: false,
            team: Vec::new(),
            activities: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Whether the task participates in scheduling.
    pub fn is_active(&self) -> bool {
        !self.is_trashed
    }

    /// Whether the task is active, not completed and past its due date.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active()
            && self.stage != Stage::Completed
            && self.date.is_some_and(|due| due < now)
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, update: TaskUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(duration) = update.duration {
            self.duration = duration;
        }
        if let Some(cost) = update.cost_per_day {
            self.cost_per_day = cost;
        }
        if let Some(dependencies) = update.dependencies {
            self.dependencies = dependencies;
        }
        if let Some(stage) = update.stage {
            self.stage = stage;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(date) = update.date {
            self.date = date;
        }
        if let Some(trashed) = update.is_trashed {
            self.is_trashed = trashed;
        }
        if let Some(team) = update.team {
            self.team = team;
        }
    }
}

/// Workflow stage of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Not started
    #[default]
    Todo,

    /// Currently being worked on
    #[serde(rename = "in progress")]
    InProgress,

    /// Done
    Completed,

    /// Marker stage for project milestones
    Milestone,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Todo => "todo",
            Stage::InProgress => "in progress",
            Stage::Completed => "completed",
            Stage::Milestone => "milestone",
        };
        write!(f, "{s}")
    }
}

/// Priority of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Highest priority
    High,

    /// Medium priority
    Medium,

    /// Default priority
    #[default]
    Normal,

    /// Lowest priority
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Normal => "normal",
            Priority::Low => "low",
        };
        write!(f, "{s}")
    }
}

/// An entry in a task's audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Kind of activity
    #[serde(rename = "type")]
    pub kind: ActivityKind,

    /// Free-form description
    pub activity: String,

    /// When the activity was recorded
    pub date: DateTime<Utc>,
}

/// Kind of audit log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// Task was assigned
    Assigned,

    /// Work started
    Started,

    /// Progress note
    #[serde(rename = "in progress")]
    InProgress,

    /// Problem report (also used for automatic slippage flags)
    Bug,

    /// Task completed
    Completed,

    /// Comment
    Commented,
}

/// Data for creating a new task
#[derive(Debug, Clone)]
pub struct NewTask {
    /// Task title
    pub title: String,

    /// Planned duration in days
    pub duration: u32,

    /// Cost per day of delay
    pub cost_per_day: f64,

    /// Predecessor task IDs
    pub dependencies: Vec<TaskId>,

    /// Initial stage
    pub stage: Stage,

    /// Priority level
    pub priority: Priority,

    /// Due date
    pub date: Option<DateTime<Utc>>,

    /// Assignee user IDs
    pub team: Vec<String>,
}

impl NewTask {
    /// Create a new-task request with default attributes.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            duration: default_duration(),
            cost_per_day: 0.0,
            dependencies: Vec::new(),
            stage: Stage::default(),
            priority: Priority::default(),
            date: None,
            team: Vec::new(),
        }
    }

    /// Convert into a [`Task`] with the given ID.
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            title: self.title,
            duration: self.duration,
            cost_per_day: self.cost_per_day,
            dependencies: self.dependencies,
            stage: self.stage,
            priority: self.priority,
            date: self.date,
            is_trashed: false,
            team: self.team,
            activities: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Data for updating an existing task
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    /// New title (if updating)
    pub title: Option<String>,

    /// New duration (if updating)
    pub duration: Option<u32>,

    /// New cost per day (if updating)
    pub cost_per_day: Option<f64>,

    /// New predecessor list (if updating)
    pub dependencies: Option<Vec<TaskId>>,

    /// New stage (if updating)
    pub stage: Option<Stage>,

    /// New priority (if updating)
    pub priority: Option<Priority>,

    /// New due date (if updating, None to clear)
    pub date: Option<Option<DateTime<Utc>>>,

    /// New trashed flag (if updating)
    pub is_trashed: Option<bool>,

    /// New team (if updating)
    pub team: Option<Vec<String>>,
}

impl TaskUpdate {
    /// Whether this update touches a field that affects the schedule.
    ///
    /// Stage, due date, duration, dependency list and the trashed flag are
    /// schedule-relevant. Title, priority, cost and team edits are not.
    pub fn is_schedule_relevant(&self) -> bool {
        self.stage.is_some()
            || self.date.is_some()
            || self.duration.is_some()
            || self.dependencies.is_some()
            || self.is_trashed.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_task_deserializes_with_defaults() {
        let task: Task = serde_json::from_str(r#"{"id":"t1","title":"Design"}"#).unwrap();

        assert_eq!(task.duration, 1);
        assert_eq!(task.cost_per_day, 0.0);
        assert_eq!(task.stage, Stage::Todo);
        assert_eq!(task.priority, Priority::Normal);
        assert!(task.dependencies.is_empty());
        assert!(task.is_active());
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let json = r#"{"id":"t1","title":"Design","description":"keep me","assets":["x.pdf"]}"#;
        let task: Task = serde_json::from_str(json).unwrap();

        assert_eq!(task.extra["description"], "keep me");
        assert_eq!(task.extra["assets"], serde_json::json!(["x.pdf"]));

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["description"], "keep me");
        assert_eq!(value["assets"], serde_json::json!(["x.pdf"]));
        assert_eq!(value["duration"], 1);
    }

    #[test]
    fn test_stage_serialization_uses_spaced_names() {
        let json = serde_json::to_string(&Stage::InProgress).unwrap();
        assert_eq!(json, r#""in progress""#);

        let stage: Stage = serde_json::from_str(r#""milestone""#).unwrap();
        assert_eq!(stage, Stage::Milestone);
    }

    #[test]
    fn test_is_overdue() {
        let now = Utc::now();
        let mut task = Task::new("t1", "Ship");
        assert!(!task.is_overdue(now), "no due date is never overdue");

        task.date = Some(now - Duration::days(1));
        assert!(task.is_overdue(now));

        task.stage = Stage::Completed;
        assert!(!task.is_overdue(now));

        task.stage = Stage::Todo;
        task.is_trashed = true;
        assert!(!task.is_overdue(now));
    }

    #[test]
    fn test_schedule_relevance() {
        assert!(!TaskUpdate::default().is_schedule_relevant());

        let cosmetic = TaskUpdate {
            title: Some("Renamed".to_string()),
            priority: Some(Priority::High),
            ..Default::default()
        };
        assert!(!cosmetic.is_schedule_relevant());

        let structural = TaskUpdate {
            dependencies: Some(vec![TaskId::new("a")]),
            ..Default::default()
        };
        assert!(structural.is_schedule_relevant());

        let cleared_date = TaskUpdate {
            date: Some(None),
            ..Default::default()
        };
        assert!(cleared_date.is_schedule_relevant());
    }

    #[test]
    fn test_apply_update() {
        let mut task = Task::new("t1", "Build");
        task.apply(TaskUpdate {
            duration: Some(5),
            stage: Some(Stage::InProgress),
            is_trashed: Some(true),
            ..Default::default()
        });

        assert_eq!(task.duration, 5);
        assert_eq!(task.stage, Stage::InProgress);
        assert!(!task.is_active());
        assert_eq!(task.title, "Build");
    }
}
