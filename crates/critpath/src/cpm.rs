//! Critical Path Method solver.
//!
//! [`solve`] is a pure function: it builds a [`DependencyGraph`], orders it with
//! Kahn's algorithm and runs the classic forward and backward passes.
//!
//! # Passes
//!
//! - **Forward**: `es = max(ef of predecessors)` (0 without predecessors),
//!   `ef = es + duration`. The project duration is the largest `ef`.
//! - **Backward**: `lf = min(ls of successors)` (project duration without
//!   successors), `ls = lf - duration`.
//! - **Float**: `ls - es`. Nodes with zero float form the critical path.
//! - **Impact**: `cost_per_day * max(0, delay - float)`. Only delay that exceeds
//!   a task's slack costs anything.
//!
//! # Cycles
//!
//! A dependency cycle leaves nodes that Kahn's algorithm never releases. They are
//! appended to the order in input order and listed in
//! [`CpmResult::cyclic_task_ids`]. During the passes each node only looks at
//! neighbors that were already scheduled, so every node still gets values. Those
//! values are best-effort and carry no scheduling guarantee.

use crate::domain::{Priority, Stage, Task, TaskId};
use crate::graph::{DependencyGraph, Edge};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Caller-supplied delays in days, keyed by task.
pub type DelayMap = HashMap<TaskId, u32>;

/// A task with its computed schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledNode {
    /// Task identifier
    pub id: TaskId,

    /// Task title
    pub title: String,

    /// Planned duration in days
    pub duration: u32,

    /// Cost per day of delay
    pub cost_per_day: f64,

    /// Workflow stage
    pub stage: Stage,

    /// Priority level
    pub priority: Priority,

    /// Active predecessors
    pub dependencies: Vec<TaskId>,

    /// Earliest start
    pub es: i64,

    /// Earliest finish
    pub ef: i64,

    /// Latest start
    pub ls: i64,

    /// Latest finish
    pub lf: i64,

    /// Slack (`ls - es`)
    pub float: i64,

    /// Whether the node has zero float
    pub is_critical: bool,

    /// Delay applied from the delay map
    pub delay: u32,

    /// Cost of the delay beyond the node's float
    pub impact_score: f64,
}

/// Output of a CPM computation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpmResult {
    /// Scheduled nodes in topological order
    pub nodes: Vec<ScheduledNode>,

    /// Dependency edges
    pub edges: Vec<Edge>,

    /// Zero-float task IDs in topological order
    pub critical_path: Vec<TaskId>,

    /// Largest earliest finish over all nodes
    pub project_duration: i64,

    /// Sum of all impact scores
    pub total_impact_score: f64,

    /// Tasks that sit on a dependency cycle (or behind one)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cyclic_task_ids: Vec<TaskId>,
}

impl CpmResult {
    /// Look up a scheduled node by task ID.
    pub fn node(&self, id: &TaskId) -> Option<&ScheduledNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Whether the dependency graph contained a cycle.
    pub fn has_cycle(&self) -> bool {
        !self.cyclic_task_ids.is_empty()
    }
}

/// Run the critical path computation over `tasks`.
///
/// Trashed tasks are ignored. `delays` may name unknown tasks; those entries
/// have no effect.
pub fn solve(tasks: &[Task], delays: &DelayMap) -> CpmResult {
    let graph = DependencyGraph::build(tasks);
    let node_count = graph.len();

    let (order, cyclic) = topological_order(&graph);
    if !cyclic.is_empty() {
        tracing::warn!(
            cyclic = cyclic.len(),
            "Dependency cycle detected, falling back to best-effort ordering"
        );
    }

    // Forward pass (ES, EF)
    let mut es: Vec<Option<i64>> = vec![None; node_count];
    let mut ef: Vec<Option<i64>> = vec![None; node_count];
    for &node in &order {
        let start = graph
            .predecessors(node)
            .into_iter()
            .filter_map(|pred| ef[pred.index()])
            .max()
            .unwrap_or(0);
        es[node.index()] = Some(start);
        ef[node.index()] = Some(start + i64::from(graph.task(node).duration));
    }

    let project_duration = ef.iter().flatten().copied().max().unwrap_or(0);

    // Backward pass (LF, LS) over the reversed order
    let mut lf: Vec<Option<i64>> = vec![None; node_count];
    let mut ls: Vec<Option<i64>> = vec![None; node_count];
    for &node in order.iter().rev() {
        let finish = graph
            .successors(node)
            .into_iter()
            .filter_map(|succ| ls[succ.index()])
            .min()
            .unwrap_or(project_duration);
        lf[node.index()] = Some(finish);
        ls[node.index()] = Some(finish - i64::from(graph.task(node).duration));
    }

    let mut nodes = Vec::with_capacity(node_count);
    let mut critical_path = Vec::new();
    let mut total_impact_score = 0.0;

    for &node in &order {
        let task = graph.task(node);
        let i = node.index();
        // Every ordered node was visited by both passes.
        let (node_es, node_ef) = (es[i].unwrap_or(0), ef[i].unwrap_or(0));
        let (node_ls, node_lf) = (ls[i].unwrap_or(0), lf[i].unwrap_or(0));
        let float = node_ls - node_es;

        let delay = delays.get(&task.id).copied().unwrap_or(0);
        let impact_score = impact_score(task.cost_per_day, delay, float);
        total_impact_score += impact_score;

        if float == 0 {
            critical_path.push(task.id.clone());
        }

        nodes.push(ScheduledNode {
            id: task.id.clone(),
            title: task.title.clone(),
            duration: task.duration,
            cost_per_day: task.cost_per_day,
            stage: task.stage,
            priority: task.priority,
            dependencies: graph
                .predecessors(node)
                .into_iter()
                .map(|pred| graph.task(pred).id.clone())
                .collect(),
            es: node_es,
            ef: node_ef,
            ls: node_ls,
            lf: node_lf,
            float,
            is_critical: float == 0,
            delay,
            impact_score,
        });
    }

    CpmResult {
        nodes,
        edges: graph.edges().to_vec(),
        critical_path,
        project_duration,
        total_impact_score,
        cyclic_task_ids: cyclic
            .into_iter()
            .map(|node| graph.task(node).id.clone())
            .collect(),
    }
}

/// Cost of the part of `delay` that exceeds `float`.
#[allow(clippy::cast_precision_loss)]
fn impact_score(cost_per_day: f64, delay: u32, float: i64) -> f64 {
    let excess = (i64::from(delay) - float).max(0);
    cost_per_day * excess as f64
}

/// Kahn's algorithm seeded with zero in-degree nodes in input order.
///
/// Returns the full ordering and the subset of nodes that had to be appended
/// because they never reached in-degree zero.
fn topological_order(graph: &DependencyGraph<'_>) -> (Vec<NodeIndex>, Vec<NodeIndex>) {
    let mut in_degree: Vec<usize> = graph.nodes().map(|n| graph.in_degree(n)).collect();
    let mut queue: VecDeque<NodeIndex> = graph
        .nodes()
        .filter(|n| in_degree[n.index()] == 0)
        .collect();

    let mut order = Vec::with_capacity(graph.len());
    let mut placed = vec![false; graph.len()];

    while let Some(node) = queue.pop_front() {
        order.push(node);
        placed[node.index()] = true;
        for succ in graph.successors(node) {
            in_degree[succ.index()] -= 1;
            if in_degree[succ.index()] == 0 {
                queue.push_back(succ);
            }
        }
    }

    let cyclic: Vec<NodeIndex> = graph.nodes().filter(|n| !placed[n.index()]).collect();
    order.extend(cyclic.iter().copied());
    (order, cyclic)
}
