//! Worklist - a checklist-backed task tracking core
//!
//! Worklist reads a structured checklist document (markdown headings plus
//! checkbox lines), reconstructs typed task records, enforces dependency and
//! lifecycle invariants over them, and answers queries against the current
//! snapshot. Status changes are mediated by an explicit transition table and
//! a dependency gate, with one-hop cascading block/unblock effects across
//! dependents.

pub mod domain;
pub mod parser;
pub mod registry;

pub use domain::{Complexity, Priority, Section, Task, TaskStatus, TestStatus};
pub use parser::{ParseMetadata, ParseOutcome, ValidationReport};
pub use registry::{RegistryError, StatusChange, TaskFilters, TaskRegistry, TaskStatistics};
