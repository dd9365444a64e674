//! Dependency graph construction using petgraph.
//!
//! The graph is built fresh from a flat task collection for every computation.
//!
//! # Edge Direction Convention
//!
//! Edges point from **predecessor -> successor**: if task B lists task A in its
//! `dependencies`, the graph holds the edge `A -> B`. Outgoing edges of a node are
//! therefore the tasks that cannot start before it finishes.
//!
//! # Active Set
//!
//! Trashed tasks are excluded. References to predecessors outside the active set
//! are dropped silently, and repeated references to the same predecessor collapse
//! into a single edge.
//!
//! # Determinism
//!
//! Node indices follow input order and neighbor lists are returned sorted by node
//! index, so every traversal over the graph visits nodes in a reproducible order.

use crate::domain::{Task, TaskId};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A dependency edge from a predecessor to its successor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// The predecessor task
    pub source: TaskId,

    /// The successor task
    pub target: TaskId,
}

/// Dependency graph over the active tasks of a collection.
#[derive(Debug)]
pub struct DependencyGraph<'a> {
    /// Graph nodes hold indices into `tasks`; edges carry no weight.
    graph: DiGraph<usize, ()>,

    /// Active tasks in input order, indexed by `NodeIndex::index()`.
    tasks: Vec<&'a Task>,

    /// Mapping from TaskId to graph NodeIndex.
    node_map: HashMap<&'a TaskId, NodeIndex>,

    /// Edges in discovery order (task input order, then dependency list order).
    edges: Vec<Edge>,
}

impl<'a> DependencyGraph<'a> {
    /// Build the graph for the active tasks in `tasks`.
    ///
    /// When two active tasks share an ID the first one wins and the duplicate is
    /// ignored with a warning.
    pub fn build(tasks: &'a [Task]) -> Self {
        let mut graph = DiGraph::new();
        let mut active = Vec::new();
        let mut node_map = HashMap::new();

        // First pass: one node per active task
        for task in tasks.iter().filter(|t| t.is_active()) {
            if node_map.contains_key(&task.id) {
                tracing::warn!(task_id = %task.id, "Duplicate task ID ignored");
                continue;
            }
            let node = graph.add_node(active.len());
            node_map.insert(&task.id, node);
            active.push(task);
        }

        // Second pass: predecessor -> successor edges
        let mut edges = Vec::new();
        for task in &active {
            let successor = node_map[&task.id];
            for dep_id in &task.dependencies {
                let Some(&predecessor) = node_map.get(dep_id) else {
                    tracing::trace!(task_id = %task.id, dependency = %dep_id, "Skipping dangling dependency");
                    continue;
                };
                if graph.find_edge(predecessor, successor).is_some() {
                    continue;
                }
                graph.add_edge(predecessor, successor, ());
                edges.push(Edge {
                    source: dep_id.clone(),
                    target: task.id.clone(),
                });
            }
        }

        Self {
            graph,
            tasks: active,
            node_map,
            edges,
        }
    }

    /// Number of active tasks in the graph.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// All node indices in input order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// The task stored at `node`.
    pub fn task(&self, node: NodeIndex) -> &'a Task {
        self.tasks[self.graph[node]]
    }

    /// Look up the node for a task ID.
    pub fn index_of(&self, id: &TaskId) -> Option<NodeIndex> {
        self.node_map.get(id).copied()
    }

    /// Look up an active task by ID.
    pub fn get(&self, id: &TaskId) -> Option<&'a Task> {
        self.index_of(id).map(|node| self.task(node))
    }

    /// Direct successors of `node`, sorted by node index.
    pub fn successors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors(node, Direction::Outgoing)
    }

    /// Direct predecessors of `node`, sorted by node index.
    pub fn predecessors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors(node, Direction::Incoming)
    }

    /// Number of incoming edges of `node`.
    pub fn in_degree(&self, node: NodeIndex) -> usize {
        self.graph.neighbors_directed(node, Direction::Incoming).count()
    }

    /// Edges in discovery order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    fn neighbors(&self, node: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self.graph.neighbors_directed(node, direction).collect();
        out.sort_unstable();
        out
    }
}
