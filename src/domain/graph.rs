//! Dependency graph for tasks
//!
//! Manages the directed graph formed by each task's `dependencies` list.
//! Uses petgraph for graph operations; cycle reporting for validation is a
//! pure depth-first search over a plain adjacency map so the full cycle path
//! can be surfaced, which petgraph's cycle check does not provide.

use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use super::task::{Task, TaskStatus};

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Adding dependency would create a cycle: {0} -> {1}")]
    CycleDetected(String, String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Self-dependency not allowed: {0}")]
    SelfDependency(String),
}

/// A dependency graph over task ids
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// The underlying directed graph; edge `a -> b` means "a must complete
    /// before b"
    graph: DiGraph<String, ()>,

    /// Map from task id to node index
    node_map: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Builds a graph from a collection of tasks
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Result<Self, GraphError> {
        let mut graph = Self::new();

        // First pass: add all nodes
        let tasks: Vec<_> = tasks.into_iter().collect();
        for task in &tasks {
            graph.add_task(&task.id);
        }

        // Second pass: add all edges
        for task in &tasks {
            for dep_id in &task.dependencies {
                graph.add_dependency(&task.id, dep_id)?;
            }
        }

        Ok(graph)
    }

    /// Adds a task node to the graph
    pub fn add_task(&mut self, task_id: &str) {
        if !self.node_map.contains_key(task_id) {
            let idx = self.graph.add_node(task_id.to_string());
            self.node_map.insert(task_id.to_string(), idx);
        }
    }

    /// Adds a dependency edge: `task` depends on `depends_on`
    pub fn add_dependency(&mut self, task: &str, depends_on: &str) -> Result<(), GraphError> {
        if task == depends_on {
            return Err(GraphError::SelfDependency(task.to_string()));
        }

        let task_idx = *self
            .node_map
            .get(task)
            .ok_or_else(|| GraphError::TaskNotFound(task.to_string()))?;

        let dep_idx = *self
            .node_map
            .get(depends_on)
            .ok_or_else(|| GraphError::TaskNotFound(depends_on.to_string()))?;

        // Add edge: depends_on -> task
        self.graph.add_edge(dep_idx, task_idx, ());

        // Check for cycles
        if is_cyclic_directed(&self.graph) {
            if let Some(edge) = self.graph.find_edge(dep_idx, task_idx) {
                self.graph.remove_edge(edge);
            }
            return Err(GraphError::CycleDetected(
                task.to_string(),
                depends_on.to_string(),
            ));
        }

        Ok(())
    }

    /// Returns the direct dependencies of a task
    pub fn dependencies(&self, task_id: &str) -> Vec<String> {
        let task_idx = match self.node_map.get(task_id) {
            Some(idx) => *idx,
            None => return vec![],
        };

        self.graph
            .neighbors_directed(task_idx, petgraph::Direction::Incoming)
            .filter_map(|idx| self.graph.node_weight(idx).cloned())
            .collect()
    }

    /// Returns the direct dependents of a task (tasks that list it as a
    /// dependency)
    pub fn dependents(&self, task_id: &str) -> Vec<String> {
        let task_idx = match self.node_map.get(task_id) {
            Some(idx) => *idx,
            None => return vec![],
        };

        self.graph
            .neighbors_directed(task_idx, petgraph::Direction::Outgoing)
            .filter_map(|idx| self.graph.node_weight(idx).cloned())
            .collect()
    }

    /// Returns tasks whose dependencies are all complete and that are not
    /// themselves complete
    pub fn ready_tasks(&self, statuses: &HashMap<String, TaskStatus>) -> Vec<String> {
        self.node_map
            .keys()
            .filter(|task_id| {
                let status = statuses.get(*task_id).copied().unwrap_or_default();
                if status.is_complete() {
                    return false;
                }

                self.dependencies(task_id).iter().all(|dep_id| {
                    statuses
                        .get(dep_id)
                        .map(|s| s.is_complete())
                        .unwrap_or(false)
                })
            })
            .cloned()
            .collect()
    }

    /// Returns tasks with at least one incomplete dependency
    pub fn blocked_tasks(&self, statuses: &HashMap<String, TaskStatus>) -> Vec<String> {
        self.node_map
            .keys()
            .filter(|task_id| {
                let status = statuses.get(*task_id).copied().unwrap_or_default();
                if status.is_complete() {
                    return false;
                }

                self.dependencies(task_id).iter().any(|dep_id| {
                    statuses
                        .get(dep_id)
                        .map(|s| !s.is_complete())
                        .unwrap_or(true)
                })
            })
            .cloned()
            .collect()
    }

    /// Returns all tasks in topological order (dependencies before dependents)
    pub fn topological_order(&self) -> Result<Vec<String>, GraphError> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order
                .into_iter()
                .filter_map(|idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(cycle) => {
                let id = self
                    .graph
                    .node_weight(cycle.node_id())
                    .cloned()
                    .unwrap_or_default();
                Err(GraphError::CycleDetected(id.clone(), id))
            }
        }
    }

    /// Returns true if the graph contains the task
    pub fn contains(&self, task_id: &str) -> bool {
        self.node_map.contains_key(task_id)
    }

    /// Returns the number of tasks in the graph
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }
}

/// Finds a dependency cycle in an adjacency map, returning the full path
///
/// Pure function over `id -> dependency ids`. The returned path starts and
/// ends with the same id (e.g. `["1.1", "1.2", "1.1"]`). Roots are visited
/// in sorted order so the reported cycle is deterministic. Neighbors absent
/// from the map are treated as leaves; referential integrity is checked
/// separately.
pub fn find_cycle(adjacency: &HashMap<String, Vec<String>>) -> Option<Vec<String>> {
    let mut visited = HashSet::new();
    let mut on_stack = HashSet::new();
    let mut path = Vec::new();

    let mut roots: Vec<&String> = adjacency.keys().collect();
    roots.sort();

    for root in roots {
        if !visited.contains(root.as_str()) {
            if let Some(cycle) =
                cycle_dfs(root, adjacency, &mut visited, &mut on_stack, &mut path)
            {
                return Some(cycle);
            }
        }
    }

    None
}

fn cycle_dfs(
    node: &str,
    adjacency: &HashMap<String, Vec<String>>,
    visited: &mut HashSet<String>,
    on_stack: &mut HashSet<String>,
    path: &mut Vec<String>,
) -> Option<Vec<String>> {
    visited.insert(node.to_string());
    on_stack.insert(node.to_string());
    path.push(node.to_string());

    if let Some(neighbors) = adjacency.get(node) {
        for next in neighbors {
            if on_stack.contains(next.as_str()) {
                // Back edge: the cycle is the path from the first occurrence
                // of `next` down to here, closed with `next` again.
                let start = path.iter().position(|p| p == next).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].to_vec();
                cycle.push(next.clone());
                return Some(cycle);
            }

            if !visited.contains(next.as_str()) {
                if let Some(cycle) = cycle_dfs(next, adjacency, visited, on_stack, path) {
                    return Some(cycle);
                }
            }
        }
    }

    path.pop();
    on_stack.remove(node);
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjacency(edges: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
        edges
            .iter()
            .map(|(id, deps)| {
                (
                    id.to_string(),
                    deps.iter().map(|d| d.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn empty_graph() {
        let graph = DependencyGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.len(), 0);
    }

    #[test]
    fn add_dependency_tracks_both_directions() {
        let mut graph = DependencyGraph::new();
        graph.add_task("1.1");
        graph.add_task("1.2");

        graph.add_dependency("1.2", "1.1").unwrap();

        assert_eq!(graph.dependencies("1.2"), vec!["1.1".to_string()]);
        assert_eq!(graph.dependents("1.1"), vec!["1.2".to_string()]);
    }

    #[test]
    fn cycle_rejected_incrementally() {
        let mut graph = DependencyGraph::new();
        graph.add_task("1.1");
        graph.add_task("1.2");
        graph.add_task("1.3");

        graph.add_dependency("1.2", "1.1").unwrap();
        graph.add_dependency("1.3", "1.2").unwrap();

        let result = graph.add_dependency("1.1", "1.3");
        assert!(matches!(result, Err(GraphError::CycleDetected(_, _))));
    }

    #[test]
    fn self_dependency_rejected() {
        let mut graph = DependencyGraph::new();
        graph.add_task("1.1");

        let result = graph.add_dependency("1.1", "1.1");
        assert!(matches!(result, Err(GraphError::SelfDependency(_))));
    }

    #[test]
    fn unknown_task_returns_error() {
        let mut graph = DependencyGraph::new();
        graph.add_task("1.1");

        let result = graph.add_dependency("1.1", "9.9");
        assert!(matches!(result, Err(GraphError::TaskNotFound(_))));
    }

    #[test]
    fn ready_and_blocked_tasks() {
        let mut graph = DependencyGraph::new();
        graph.add_task("1.1");
        graph.add_task("1.2");
        graph.add_task("1.3");
        graph.add_dependency("1.2", "1.1").unwrap();

        let mut statuses = HashMap::new();
        statuses.insert("1.1".to_string(), TaskStatus::NotStarted);
        statuses.insert("1.2".to_string(), TaskStatus::NotStarted);
        statuses.insert("1.3".to_string(), TaskStatus::NotStarted);

        let ready = graph.ready_tasks(&statuses);
        assert!(ready.contains(&"1.1".to_string()));
        assert!(ready.contains(&"1.3".to_string()));
        assert!(!ready.contains(&"1.2".to_string()));

        let blocked = graph.blocked_tasks(&statuses);
        assert_eq!(blocked, vec!["1.2".to_string()]);

        statuses.insert("1.1".to_string(), TaskStatus::Completed);
        let ready = graph.ready_tasks(&statuses);
        assert!(!ready.contains(&"1.1".to_string()));
        assert!(ready.contains(&"1.2".to_string()));
    }

    #[test]
    fn topological_order() {
        let mut graph = DependencyGraph::new();
        graph.add_task("1.1");
        graph.add_task("1.2");
        graph.add_task("1.3");

        // 1.1 depends on 1.2, 1.2 depends on 1.3
        graph.add_dependency("1.1", "1.2").unwrap();
        graph.add_dependency("1.2", "1.3").unwrap();

        let order = graph.topological_order().unwrap();
        let pos = |id: &str| order.iter().position(|o| o == id).unwrap();

        assert!(pos("1.3") < pos("1.2"));
        assert!(pos("1.2") < pos("1.1"));
    }

    #[test]
    fn from_tasks() {
        let task1 = Task::new("1.1", "Task 1");
        let mut task2 = Task::new("1.2", "Task 2");
        task2.add_dependency("1.1");

        let graph = DependencyGraph::from_tasks([&task1, &task2]).unwrap();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.dependencies("1.2"), vec!["1.1".to_string()]);
    }

    #[test]
    fn find_cycle_on_acyclic_graph() {
        let adj = adjacency(&[("1.1", &[]), ("1.2", &["1.1"]), ("1.3", &["1.1", "1.2"])]);
        assert_eq!(find_cycle(&adj), None);
    }

    #[test]
    fn find_cycle_reports_full_path() {
        let adj = adjacency(&[("1.1", &["1.2"]), ("1.2", &["1.1"])]);
        let cycle = find_cycle(&adj).unwrap();

        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 3);
        assert!(cycle.contains(&"1.1".to_string()));
        assert!(cycle.contains(&"1.2".to_string()));
    }

    #[test]
    fn find_cycle_three_nodes() {
        let adj = adjacency(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"]), ("d", &[])]);
        let cycle = find_cycle(&adj).unwrap();

        // a -> b -> c -> a, starting from the sorted first root
        assert_eq!(cycle, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn find_cycle_self_loop() {
        let adj = adjacency(&[("1.1", &["1.1"])]);
        let cycle = find_cycle(&adj).unwrap();
        assert_eq!(cycle, vec!["1.1", "1.1"]);
    }

    #[test]
    fn find_cycle_ignores_missing_neighbors() {
        // 9.9 is referenced but absent; that's a referential-integrity error,
        // not a cycle.
        let adj = adjacency(&[("1.1", &["9.9"])]);
        assert_eq!(find_cycle(&adj), None);
    }
}
