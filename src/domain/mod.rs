//! Domain models for Worklist
//!
//! Contains the core business types without any I/O concerns.

mod graph;
mod task;

pub use graph::{find_cycle, DependencyGraph, GraphError};
pub use task::{Complexity, Priority, Section, Task, TaskStatus, TestStatus};
