//! Structural validation of parsed task sets
//!
//! A snapshot is only accepted when it has unique, present ids, resolvable
//! dependencies and an acyclic dependency graph. Warnings flag quality
//! issues that never block a load.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::domain::{find_cycle, Task};

/// Outcome of validating a parsed task set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// False iff `errors` is non-empty
    pub is_valid: bool,

    /// Fatal structural problems; any one of these rejects a load
    pub errors: Vec<String>,

    /// Non-fatal quality issues; logged, never blocking
    pub warnings: Vec<String>,
}

/// Validates a task set for structural integrity
///
/// Errors: missing id, missing title, duplicate id, dependency ids not
/// present in the set, and dependency cycles (reported with the full cycle
/// path). Warnings: missing description, a completed task without recorded
/// test status, and ids outside the conventional dotted-numeric shape.
pub fn validate(tasks: &[Task]) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let known_ids: HashSet<&str> = tasks
        .iter()
        .filter(|t| !t.id.is_empty())
        .map(|t| t.id.as_str())
        .collect();

    let mut seen = HashSet::new();
    for task in tasks {
        if task.id.is_empty() {
            errors.push(format!("task '{}' is missing an id", task.title));
        } else if !seen.insert(task.id.as_str()) {
            errors.push(format!("duplicate task id '{}'", task.id));
        }

        if task.title.is_empty() {
            errors.push(format!("task '{}' is missing a title", task.id));
        }

        for dep in &task.dependencies {
            if !known_ids.contains(dep.as_str()) {
                errors.push(format!(
                    "task '{}' references unknown dependency '{}'",
                    task.id, dep
                ));
            }
        }

        if task.description.is_empty() {
            warnings.push(format!("task '{}' has no description", task.id));
        }

        if task.status.is_complete() && task.test_status.is_none() {
            warnings.push(format!(
                "completed task '{}' has no recorded test status",
                task.id
            ));
        }

        if !task.id.is_empty() && !task.has_conventional_id() {
            warnings.push(format!(
                "task id '{}' does not match the dotted-numeric convention",
                task.id
            ));
        }
    }

    let adjacency: HashMap<String, Vec<String>> = tasks
        .iter()
        .filter(|t| !t.id.is_empty())
        .map(|t| (t.id.clone(), t.dependencies.clone()))
        .collect();

    if let Some(cycle) = find_cycle(&adjacency) {
        errors.push(format!("dependency cycle detected: {}", cycle.join(" -> ")));
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}
