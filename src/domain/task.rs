//! Task domain model
//!
//! Tasks are the work items reconstructed from a checklist document.
//! They carry dependencies on other tasks and a guarded status lifecycle.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a task
///
/// The lifecycle is a closed state machine: every accepted status must be
/// reachable from `NotStarted` through [`TaskStatus::can_transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Blocked,
    Completed,
}

impl TaskStatus {
    /// Returns true if this status represents completion
    pub fn is_complete(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// Returns true if this task is not yet started
    pub fn is_pending(&self) -> bool {
        matches!(self, TaskStatus::NotStarted)
    }

    /// Returns true if this task is currently being worked on
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::InProgress)
    }

    /// Returns true if this task is blocked
    pub fn is_blocked(&self) -> bool {
        matches!(self, TaskStatus::Blocked)
    }

    /// Returns true if the `(self, to)` edge exists in the transition table
    ///
    /// `Completed` is terminal. Edges not listed are illegal:
    ///
    /// | From        | To                                |
    /// |-------------|-----------------------------------|
    /// | NotStarted  | InProgress, Blocked               |
    /// | InProgress  | Completed, Blocked, NotStarted    |
    /// | Blocked     | NotStarted, InProgress            |
    /// | Completed   | (none)                            |
    pub fn can_transition_to(&self, to: TaskStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// Returns the legal target statuses from this status
    pub fn allowed_transitions(&self) -> &'static [TaskStatus] {
        use TaskStatus::*;
        match self {
            NotStarted => &[InProgress, Blocked],
            InProgress => &[Completed, Blocked, NotStarted],
            Blocked => &[NotStarted, InProgress],
            Completed => &[],
        }
    }

    /// Returns true if entering this status requires every dependency of the
    /// task to be complete
    pub fn requires_completed_dependencies(&self) -> bool {
        matches!(self, TaskStatus::InProgress | TaskStatus::Completed)
    }

    /// The checkbox marker character for this status in the document format
    pub fn checkbox_char(&self) -> char {
        if self.is_complete() {
            'x'
        } else {
            ' '
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Completed => "completed",
        }
    }
}

/// Estimated implementation complexity of a task
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }
}

/// Priority of a task
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

/// Test execution counts and coverage for a task
///
/// Opaque to the core: recorded and reported, never interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TestStatus {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    /// Coverage percentage (0.0 - 100.0)
    pub coverage: f64,
}

/// A work item parsed from a checklist document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Opaque identifier, conventionally dotted-numeric (e.g. `1.2.3`)
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// Concatenation of the indented bullet lines under the checkbox line
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Current status
    pub status: TaskStatus,

    /// Estimated complexity
    #[serde(default)]
    pub complexity: Complexity,

    /// Priority
    #[serde(default)]
    pub priority: Priority,

    /// Ids of tasks that must complete before this one may start
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    /// Free-form requirement tags from the `_Requirements: ..._` annotation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<String>,

    /// When the task was first seen
    pub created_date: DateTime<Utc>,

    /// When the task last changed; updated on every accepted status change
    pub last_modified: DateTime<Utc>,

    /// Optional assignee
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    /// Free-form tags
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,

    /// Free-form duration estimate (e.g. `2d`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<String>,

    /// Test counts and coverage, if recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_status: Option<TestStatus>,
}

impl Task {
    /// Creates a new task with the given id and title
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            status: TaskStatus::NotStarted,
            complexity: Complexity::default(),
            priority: Priority::default(),
            dependencies: Vec::new(),
            requirements: Vec::new(),
            created_date: now,
            last_modified: now,
            assignee: None,
            tags: BTreeSet::new(),
            estimated_duration: None,
            test_status: None,
        }
    }

    /// Adds a dependency on another task id (deduplicated, order-preserving)
    pub fn add_dependency(&mut self, dep_id: impl Into<String>) {
        let dep_id = dep_id.into();
        if !self.dependencies.contains(&dep_id) {
            self.dependencies.push(dep_id);
        }
    }

    /// Returns true if this task lists `task_id` as a dependency
    pub fn depends_on(&self, task_id: &str) -> bool {
        self.dependencies.iter().any(|d| d == task_id)
    }

    /// Sets the status and bumps `last_modified`
    ///
    /// No gating here: legality of the edge is the registry's concern.
    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.last_modified = Utc::now();
    }

    /// Returns true if the id follows the conventional dotted-numeric shape
    pub fn has_conventional_id(&self) -> bool {
        !self.id.is_empty()
            && self
                .id
                .split('.')
                .all(|seg| !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit()))
    }

    /// Case-insensitive substring match against id, title, or description
    pub fn matches_query(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let query = query.to_lowercase();
        self.id.to_lowercase().contains(&query)
            || self.title.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
    }
}

/// A heading-delimited grouping of tasks in document order
///
/// Purely organizational: sections carry no invariants beyond containing
/// valid tasks. A document whose tasks precede the first heading gets an
/// implicit section with an empty heading at level 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Heading text, empty for the implicit leading section
    pub heading: String,

    /// Heading level (1-6; 0 for the implicit leading section)
    pub level: u8,

    /// Tasks in document order
    pub tasks: Vec<Task>,
}

impl Section {
    pub fn new(heading: impl Into<String>, level: u8) -> Self {
        Self {
            heading: heading.into(),
            level,
            tasks: Vec::new(),
        }
    }
}
