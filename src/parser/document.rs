//! Checklist document parsing and serialization
//!
//! Converts raw checklist text into sections and task records and back.
//! Parsing never fails: malformed lines are skipped and whatever partial
//! structure is derivable gets produced. Structural problems are the
//! validator's job, not the parser's.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::domain::{Section, Task, TaskStatus};

use super::line::{classify, split_task_payload, LineKind};

/// Summary of one parse pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseMetadata {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub in_progress_tasks: usize,
    pub blocked_tasks: usize,

    /// Wall-clock time spent parsing
    #[serde(skip)]
    pub parse_duration: Duration,

    /// Size of the input in bytes
    pub input_bytes: usize,
}

/// Result of parsing a checklist document
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// Sections in document order, each owning its tasks
    pub sections: Vec<Section>,

    /// All tasks in document order
    pub tasks: Vec<Task>,

    pub metadata: ParseMetadata,
}

/// Parses checklist text into sections, tasks and metadata
///
/// A heading closes the current task and section and opens a new section.
/// A checkbox line closes the current task and opens a new one. Requirement
/// annotations and indented bullets attach to the open task; everything else
/// is ignored. Tasks appearing before the first heading land in an implicit
/// section with an empty heading at level 0.
pub fn parse(text: &str) -> ParseOutcome {
    let started = Instant::now();

    let mut sections: Vec<Section> = Vec::new();
    let mut current_section: Option<Section> = None;
    let mut current_task: Option<Task> = None;

    for line in text.lines() {
        match classify(line) {
            LineKind::Heading { level, title } => {
                close_task(&mut current_task, &mut current_section);
                if let Some(section) = current_section.take() {
                    sections.push(section);
                }
                current_section = Some(Section::new(title, level));
            }
            LineKind::Checkbox { checked, payload } => {
                close_task(&mut current_task, &mut current_section);

                let (id, title) = split_task_payload(payload);
                let mut task = Task::new(id.unwrap_or_default(), title);
                if checked {
                    task.status = TaskStatus::Completed;
                }
                current_task = Some(task);
            }
            LineKind::Requirements { tags } => {
                if let Some(task) = current_task.as_mut() {
                    task.requirements = tags;
                }
            }
            LineKind::Bullet { text } => {
                if let Some(task) = current_task.as_mut() {
                    if !task.description.is_empty() {
                        task.description.push('\n');
                    }
                    task.description.push_str(text);
                }
            }
            LineKind::Blank | LineKind::Other => {}
        }
    }

    close_task(&mut current_task, &mut current_section);
    if let Some(section) = current_section.take() {
        sections.push(section);
    }

    let tasks: Vec<Task> = sections
        .iter()
        .flat_map(|s| s.tasks.iter().cloned())
        .collect();

    let metadata = ParseMetadata {
        total_tasks: tasks.len(),
        completed_tasks: tasks.iter().filter(|t| t.status.is_complete()).count(),
        in_progress_tasks: tasks.iter().filter(|t| t.status.is_active()).count(),
        blocked_tasks: tasks.iter().filter(|t| t.status.is_blocked()).count(),
        parse_duration: started.elapsed(),
        input_bytes: text.len(),
    };

    ParseOutcome {
        sections,
        tasks,
        metadata,
    }
}

/// Moves the open task into the open section, creating the implicit leading
/// section when the document starts with a task instead of a heading
fn close_task(current_task: &mut Option<Task>, current_section: &mut Option<Section>) {
    if let Some(task) = current_task.take() {
        current_section
            .get_or_insert_with(|| Section::new("", 0))
            .tasks
            .push(task);
    }
}

/// Serializes sections back into checklist text
///
/// Inverse of [`parse`] for the fields the format carries: re-parsing the
/// output yields the same `(id, status, title)` tuples, descriptions and
/// requirement tags.
pub fn serialize(sections: &[Section]) -> String {
    let mut out = String::new();

    for section in sections {
        if !section.heading.is_empty() && section.level > 0 {
            out.push_str(&"#".repeat(section.level.min(6) as usize));
            out.push(' ');
            out.push_str(&section.heading);
            out.push('\n');
            out.push('\n');
        }

        for task in &section.tasks {
            out.push_str("- [");
            out.push(task.status.checkbox_char());
            out.push_str("] ");
            if !task.id.is_empty() {
                out.push_str(&task.id);
                out.push(' ');
            }
            out.push_str(&task.title);
            out.push('\n');

            for line in task.description.lines() {
                out.push_str("  - ");
                out.push_str(line);
                out.push('\n');
            }

            if !task.requirements.is_empty() {
                out.push_str("  _Requirements: ");
                out.push_str(&task.requirements.join(", "));
                out.push_str("_\n");
            }
        }

        out.push('\n');
    }

    out
}

/// Rewrites the checkbox character of the task with the given id
///
/// Locates the single checkbox line whose parsed id matches `task_id` and
/// replaces only its marker, leaving every other byte of the document
/// untouched. Returns the new text and whether a matching line was found;
/// a missing task is not an error.
pub fn update_status_char(text: &str, task_id: &str, new_status: TaskStatus) -> (String, bool) {
    if task_id.is_empty() {
        return (text.to_string(), false);
    }

    let mut found = false;
    let lines: Vec<String> = text
        .split('\n')
        .map(|line| {
            if !found {
                if let LineKind::Checkbox { payload, .. } = classify(line) {
                    let (id, _) = split_task_payload(payload);
                    if id == Some(task_id) {
                        found = true;
                        return rewrite_marker(line, new_status.checkbox_char());
                    }
                }
            }
            line.to_string()
        })
        .collect();

    (lines.join("\n"), found)
}

/// Replaces the bracket contents of a known-valid checkbox line
///
/// A nonstandard two-character marker like `[ x]` collapses to one character;
/// everything else on the line is preserved byte for byte.
fn rewrite_marker(line: &str, marker: char) -> String {
    let open = match line.find('[') {
        Some(idx) => idx,
        None => return line.to_string(),
    };
    let close = match line[open..].find(']') {
        Some(idx) => open + idx,
        None => return line.to_string(),
    };

    format!("{}{}{}", &line[..=open], marker, &line[close..])
}
