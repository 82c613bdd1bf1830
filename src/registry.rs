//! # Task Registry
//!
//! Owns the authoritative in-memory snapshot of tasks and sections, mediates
//! every status change through the transition table and dependency gate,
//! propagates one-hop cascade effects to dependents, and exposes the
//! read/query/statistics surface.
//!
//! A snapshot is created atomically by a load (parse + validate) and fully
//! replaced by the next load; a rejected load leaves the prior snapshot
//! untouched. The registry does not serialize concurrent calls itself:
//! callers that can race must wrap an instance in their own mutex.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use fs2::FileExt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{Complexity, DependencyGraph, Priority, Task, TaskStatus};
use crate::parser::{self, ParseMetadata};

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Source unreadable or sink unwritable
    #[error("failed to access '{}': {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Aggregate of structural errors; the load was rejected as a whole
    #[error("document validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("task not found: '{0}'")]
    TaskNotFound(String),

    /// The `(from, to)` edge is not in the transition table
    #[error(
        "invalid transition for task '{task_id}': {} -> {}",
        .from.as_str(),
        .to.as_str()
    )]
    InvalidTransition {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },

    /// An otherwise-legal transition is gated on incomplete dependencies
    #[error(
        "dependency validation failed for task '{task_id}': incomplete dependencies [{}]",
        .incomplete.join(", ")
    )]
    IncompleteDependencies {
        task_id: String,
        incomplete: Vec<String>,
    },
}

/// Result of an accepted status change
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StatusChange {
    pub task_id: String,
    pub previous_status: TaskStatus,
    pub new_status: TaskStatus,
    pub updated_at: DateTime<Utc>,
}

/// Optional filters for [`TaskRegistry::search_tasks`]; all present filters
/// are ANDed
#[derive(Debug, Clone, Default)]
pub struct TaskFilters {
    pub statuses: Option<Vec<TaskStatus>>,
    pub complexities: Option<Vec<Complexity>>,
    pub priorities: Option<Vec<Priority>>,
    pub assignee: Option<String>,
    /// Matches tasks whose tag set intersects these tags
    pub tags: Option<Vec<String>>,
}

impl TaskFilters {
    fn matches(&self, task: &Task) -> bool {
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&task.status) {
                return false;
            }
        }
        if let Some(complexities) = &self.complexities {
            if !complexities.contains(&task.complexity) {
                return false;
            }
        }
        if let Some(priorities) = &self.priorities {
            if !priorities.contains(&task.priority) {
                return false;
            }
        }
        if let Some(assignee) = &self.assignee {
            if task.assignee.as_deref() != Some(assignee.as_str()) {
                return false;
            }
        }
        if let Some(tags) = &self.tags {
            if !tags.iter().any(|tag| task.tags.contains(tag)) {
                return false;
            }
        }
        true
    }
}

/// Aggregate statistics over the current snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct TaskStatistics {
    pub total_tasks: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub blocked: usize,
    pub completed: usize,

    /// Mean `last_modified - created_date` over completed tasks
    pub average_completion: Option<Duration>,

    /// Mean coverage percentage over tasks with a recorded test status
    pub aggregate_coverage: Option<f64>,

    pub by_priority: BTreeMap<Priority, usize>,
    pub by_complexity: BTreeMap<Complexity, usize>,
}

/// Section bookkeeping; tasks stay authoritative in the registry's flat list
#[derive(Debug, Clone)]
struct SectionRef {
    heading: String,
    task_ids: Vec<String>,
}

/// The authoritative task snapshot and its gatekeeper
///
/// Explicitly constructed and injectable; holds no process-wide state.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    /// Tasks in document order
    tasks: Vec<Task>,

    /// Map from task id to position in `tasks`
    index: HashMap<String, usize>,

    sections: Vec<SectionRef>,

    graph: DependencyGraph,
}

impl TaskRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a checklist document from a file, replacing the snapshot
    ///
    /// See [`TaskRegistry::load_from_str`] for the validation contract.
    pub fn load_from_path(&mut self, path: impl AsRef<Path>) -> Result<ParseMetadata, RegistryError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        self.load_from_str(&text)
    }

    /// Loads a checklist document from text, replacing the snapshot
    ///
    /// The load is all-or-nothing: if validation reports any error the whole
    /// document is rejected and the prior snapshot (if any) is left
    /// untouched. Warnings are logged and never block.
    pub fn load_from_str(&mut self, text: &str) -> Result<ParseMetadata, RegistryError> {
        let outcome = parser::parse(text);
        let report = parser::validate(&outcome.tasks);

        for warning in &report.warnings {
            warn!("{warning}");
        }

        if !report.is_valid {
            return Err(RegistryError::Validation(report.errors));
        }

        // Validation guarantees acyclicity and resolvable ids, so building
        // the graph cannot fail here; surface any mismatch as a validation
        // error rather than panicking.
        let graph = DependencyGraph::from_tasks(&outcome.tasks)
            .map_err(|e| RegistryError::Validation(vec![e.to_string()]))?;

        let index: HashMap<String, usize> = outcome
            .tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();

        let sections = outcome
            .sections
            .iter()
            .map(|s| SectionRef {
                heading: s.heading.clone(),
                task_ids: s.tasks.iter().map(|t| t.id.clone()).collect(),
            })
            .collect();

        debug!(
            total_tasks = outcome.metadata.total_tasks,
            input_bytes = outcome.metadata.input_bytes,
            duration_us = outcome.metadata.parse_duration.as_micros() as u64,
            "snapshot loaded"
        );

        self.tasks = outcome.tasks;
        self.index = index;
        self.sections = sections;
        self.graph = graph;

        Ok(outcome.metadata)
    }

    /// All tasks in document order
    pub fn get_all_tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Looks up a task by id; unknown ids are "not found", never an error
    pub fn get_task(&self, task_id: &str) -> Option<&Task> {
        self.index.get(task_id).map(|&i| &self.tasks[i])
    }

    /// Tasks currently in the given status, in document order
    pub fn tasks_by_status(&self, status: TaskStatus) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.status == status).collect()
    }

    /// Tasks under the section(s) with the given heading, in document order
    ///
    /// An unknown heading yields an empty collection.
    pub fn tasks_by_section(&self, heading: &str) -> Vec<&Task> {
        self.sections
            .iter()
            .filter(|s| s.heading == heading)
            .flat_map(|s| s.task_ids.iter())
            .filter_map(|id| self.get_task(id))
            .collect()
    }

    /// Declares that `task_id` depends on `depends_on`
    ///
    /// The document format does not carry dependencies; the surrounding
    /// system wires them after a load. Both ids must resolve in the current
    /// snapshot and the new edge must keep the dependency graph acyclic.
    pub fn add_dependency(&mut self, task_id: &str, depends_on: &str) -> Result<(), RegistryError> {
        let idx = *self
            .index
            .get(task_id)
            .ok_or_else(|| RegistryError::TaskNotFound(task_id.to_string()))?;
        if self.get_task(depends_on).is_none() {
            return Err(RegistryError::TaskNotFound(depends_on.to_string()));
        }

        self.graph
            .add_dependency(task_id, depends_on)
            .map_err(|e| RegistryError::Validation(vec![e.to_string()]))?;
        self.tasks[idx].add_dependency(depends_on);

        Ok(())
    }

    /// Applies a guarded status change
    ///
    /// Checks run in order - existence, transition table, dependency gate -
    /// and nothing mutates until all pass. On success the in-memory change
    /// commits, an optional best-effort rewrite of the backing document runs
    /// (its failure never rolls back the commit), and one-hop cascade
    /// effects propagate to direct dependents.
    pub fn update_status(
        &mut self,
        task_id: &str,
        new_status: TaskStatus,
        persist_to: Option<&Path>,
    ) -> Result<StatusChange, RegistryError> {
        let idx = *self
            .index
            .get(task_id)
            .ok_or_else(|| RegistryError::TaskNotFound(task_id.to_string()))?;

        let current = self.tasks[idx].status;
        if !current.can_transition_to(new_status) {
            return Err(RegistryError::InvalidTransition {
                task_id: task_id.to_string(),
                from: current,
                to: new_status,
            });
        }

        if new_status.requires_completed_dependencies() {
            let incomplete: Vec<String> = self.tasks[idx]
                .dependencies
                .iter()
                .filter(|dep| {
                    self.get_task(dep)
                        .map(|t| !t.status.is_complete())
                        .unwrap_or(true)
                })
                .cloned()
                .collect();

            if !incomplete.is_empty() {
                return Err(RegistryError::IncompleteDependencies {
                    task_id: task_id.to_string(),
                    incomplete,
                });
            }
        }

        self.tasks[idx].set_status(new_status);
        let updated_at = self.tasks[idx].last_modified;

        if let Some(path) = persist_to {
            // Durability is best-effort: the in-memory commit above stands
            // even when the document rewrite fails.
            if let Err(err) = self.persist_status(path, task_id, new_status) {
                warn!(
                    task_id,
                    path = %path.display(),
                    error = %err,
                    "status persistence failed; in-memory change kept"
                );
            }
        }

        for (dependent_id, status) in cascade_changes(&self.tasks, task_id, new_status) {
            if let Some(&i) = self.index.get(&dependent_id) {
                self.tasks[i].set_status(status);
            }
        }

        Ok(StatusChange {
            task_id: task_id.to_string(),
            previous_status: current,
            new_status,
            updated_at,
        })
    }

    /// Rewrites the task's checkbox character in the backing document
    ///
    /// Locked, atomic write (temp file + rename). Returns whether the task's
    /// checkbox line was found in the document.
    fn persist_status(
        &self,
        path: &Path,
        task_id: &str,
        new_status: TaskStatus,
    ) -> Result<bool, RegistryError> {
        let io_err = |p: &Path| {
            let p = p.to_path_buf();
            move |source| RegistryError::Io { path: p, source }
        };

        let text = fs::read_to_string(path).map_err(io_err(path))?;
        let (updated, found) = parser::update_status_char(&text, task_id, new_status);
        if !found {
            warn!(task_id, path = %path.display(), "no checkbox line for task; document left unchanged");
            return Ok(false);
        }

        let temp_path = path.with_extension("tmp");
        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(io_err(&temp_path))?;

            file.lock_exclusive().map_err(io_err(&temp_path))?;

            let mut writer = BufWriter::new(&file);
            writer
                .write_all(updated.as_bytes())
                .map_err(io_err(&temp_path))?;
            writer.flush().map_err(io_err(&temp_path))?;
        }

        fs::rename(&temp_path, path).map_err(io_err(path))?;
        Ok(true)
    }

    /// Case-insensitive substring search over id/title/description with
    /// optional ANDed filters
    pub fn search_tasks(&self, query: &str, filters: &TaskFilters) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.matches_query(query) && filters.matches(t))
            .collect()
    }

    /// Tasks whose dependencies are all complete and that are not complete
    /// themselves, in document order
    pub fn ready_tasks(&self) -> Vec<&Task> {
        let ready = self.graph.ready_tasks(&self.status_map());
        self.in_document_order(ready)
    }

    /// Tasks with at least one incomplete dependency, in document order
    pub fn blocked_tasks(&self) -> Vec<&Task> {
        let blocked = self.graph.blocked_tasks(&self.status_map());
        self.in_document_order(blocked)
    }

    /// Tasks in topological order (dependencies before dependents)
    pub fn execution_order(&self) -> Vec<&Task> {
        match self.graph.topological_order() {
            Ok(order) => order.iter().filter_map(|id| self.get_task(id)).collect(),
            // Load guarantees acyclicity; document order is the safe answer
            // for an empty or never-loaded registry.
            Err(_) => self.tasks.iter().collect(),
        }
    }

    /// Aggregate statistics over the current snapshot
    pub fn statistics(&self) -> TaskStatistics {
        let count = |status: TaskStatus| self.tasks.iter().filter(|t| t.status == status).count();

        let completed_spans: Vec<i64> = self
            .tasks
            .iter()
            .filter(|t| t.status.is_complete())
            .map(|t| (t.last_modified - t.created_date).num_milliseconds())
            .collect();
        let average_completion = if completed_spans.is_empty() {
            None
        } else {
            Some(Duration::milliseconds(
                completed_spans.iter().sum::<i64>() / completed_spans.len() as i64,
            ))
        };

        let coverages: Vec<f64> = self
            .tasks
            .iter()
            .filter_map(|t| t.test_status.as_ref())
            .map(|ts| ts.coverage)
            .collect();
        let aggregate_coverage = if coverages.is_empty() {
            None
        } else {
            Some(coverages.iter().sum::<f64>() / coverages.len() as f64)
        };

        let mut by_priority = BTreeMap::new();
        let mut by_complexity = BTreeMap::new();
        for task in &self.tasks {
            *by_priority.entry(task.priority).or_insert(0) += 1;
            *by_complexity.entry(task.complexity).or_insert(0) += 1;
        }

        TaskStatistics {
            total_tasks: self.tasks.len(),
            not_started: count(TaskStatus::NotStarted),
            in_progress: count(TaskStatus::InProgress),
            blocked: count(TaskStatus::Blocked),
            completed: count(TaskStatus::Completed),
            average_completion,
            aggregate_coverage,
            by_priority,
            by_complexity,
        }
    }

    fn status_map(&self) -> HashMap<String, TaskStatus> {
        self.tasks
            .iter()
            .map(|t| (t.id.clone(), t.status))
            .collect()
    }

    fn in_document_order(&self, ids: Vec<String>) -> Vec<&Task> {
        let wanted: std::collections::HashSet<String> = ids.into_iter().collect();
        self.tasks
            .iter()
            .filter(|t| wanted.contains(&t.id))
            .collect()
    }
}

/// Computes one-hop cascade effects of a status change
///
/// Pure function over the snapshot as it stands *after* the triggering
/// change committed. For every task that directly lists `changed_id` as a
/// dependency:
///
/// - the dependency turning `Blocked` forces a `NotStarted`/`InProgress`
///   dependent to `Blocked`;
/// - the dependency turning `Completed` returns a `Blocked` dependent to
///   `NotStarted` once *all* of its dependencies are complete (ready to be
///   picked up again, not silently resumed).
///
/// Effects are reported in document order and do not recurse into the
/// dependents' own dependents.
pub fn cascade_changes(
    tasks: &[Task],
    changed_id: &str,
    new_status: TaskStatus,
) -> Vec<(String, TaskStatus)> {
    if !matches!(new_status, TaskStatus::Blocked | TaskStatus::Completed) {
        return Vec::new();
    }

    let statuses: HashMap<&str, TaskStatus> =
        tasks.iter().map(|t| (t.id.as_str(), t.status)).collect();

    let mut changes = Vec::new();
    for dependent in tasks.iter().filter(|t| t.depends_on(changed_id)) {
        match new_status {
            TaskStatus::Blocked
                if matches!(
                    dependent.status,
                    TaskStatus::NotStarted | TaskStatus::InProgress
                ) =>
            {
                changes.push((dependent.id.clone(), TaskStatus::Blocked));
            }
            TaskStatus::Completed if dependent.status.is_blocked() => {
                let all_complete = dependent.dependencies.iter().all(|dep| {
                    statuses
                        .get(dep.as_str())
                        .map(|s| s.is_complete())
                        .unwrap_or(false)
                });
                if all_complete {
                    changes.push((dependent.id.clone(), TaskStatus::NotStarted));
                }
            }
            _ => {}
        }
    }

    changes
}
