//! Commit ancestry algorithms.
//!
//! - **Edge derivation**: `CommitEdge`s recomputed from `Commit::parent_ids`
//! - **Topological order**: Kahn's algorithm, ties broken by (timestamp, id)
//! - **Ancestors**: DFS over the reversed DAG via petgraph
//!
//! Edges are never stored: `parent_ids` is the single source of ancestry.

use petgraph::graph::NodeIndex;
use petgraph::visit::{Dfs, Reversed};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use super::models::CommitDag;
use crate::models::{Commit, CommitEdge, EdgeType};

// ============================================================================
// Edge derivation
// ============================================================================

/// Derive parent → child edges among the given commits.
///
/// The first parent yields a `parent` edge, or a `branch` edge when that
/// parent was recorded on another branch name. Every further parent yields a
/// `merge` edge. Parents outside the given set produce no edge.
pub fn derive_edges<'a>(commits: impl IntoIterator<Item = &'a Commit>) -> Vec<CommitEdge> {
    let commits: Vec<&Commit> = commits.into_iter().collect();
    let by_id: HashMap<&str, &Commit> = commits.iter().map(|c| (c.id.as_str(), *c)).collect();

    let mut edges = Vec::new();
    for child in &commits {
        for (position, parent_id) in child.parent_ids.iter().enumerate() {
            let Some(parent) = by_id.get(parent_id.as_str()) else {
                continue;
            };
            let edge_type = if position > 0 {
                EdgeType::Merge
            } else if parent.branch_name != child.branch_name {
                EdgeType::Branch
            } else {
                EdgeType::Parent
            };
            edges.push(CommitEdge::new(&parent.id, &child.id, edge_type));
        }
    }
    edges
}

// ============================================================================
// Ordering
// ============================================================================

/// Commit IDs ordered parents-first.
///
/// Among commits whose parents are all emitted, the oldest (then smallest
/// id) goes first, so the result is deterministic. Nodes caught in a cycle,
/// which well-formed history never has, are appended in timestamp order.
pub fn topological_order(dag: &CommitDag) -> Vec<String> {
    let g = &dag.graph;
    let key = |idx: NodeIndex| Reverse((g[idx].timestamp, g[idx].id.clone(), idx));

    let mut in_degree: Vec<usize> = g
        .node_indices()
        .map(|idx| g.neighbors_directed(idx, Direction::Incoming).count())
        .collect();

    let mut ready: BinaryHeap<_> = g
        .node_indices()
        .filter(|idx| in_degree[idx.index()] == 0)
        .map(key)
        .collect();

    let mut order = Vec::with_capacity(g.node_count());
    let mut emitted = HashSet::with_capacity(g.node_count());
    while let Some(Reverse((_, id, idx))) = ready.pop() {
        order.push(id);
        emitted.insert(idx);
        for child in g.neighbors_directed(idx, Direction::Outgoing) {
            let degree = &mut in_degree[child.index()];
            *degree = degree.saturating_sub(1);
            if *degree == 0 {
                ready.push(key(child));
            }
        }
    }

    if order.len() < g.node_count() {
        let mut rest: Vec<NodeIndex> = g
            .node_indices()
            .filter(|idx| !emitted.contains(idx))
            .collect();
        rest.sort_by(|a, b| (g[*a].timestamp, &g[*a].id).cmp(&(g[*b].timestamp, &g[*b].id)));
        order.extend(rest.into_iter().map(|idx| g[idx].id.clone()));
    }
    order
}

/// IDs of `head` and every commit reachable through its parents.
/// Empty when `head` is not in the DAG.
pub fn ancestors(dag: &CommitDag, head: &str) -> HashSet<String> {
    let Some(start) = dag.get_index(head) else {
        return HashSet::new();
    };
    let reversed = Reversed(&dag.graph);
    let mut dfs = Dfs::new(reversed, start);
    let mut seen = HashSet::new();
    while let Some(idx) = dfs.next(reversed) {
        seen.insert(dag.graph[idx].id.clone());
    }
    seen
}
