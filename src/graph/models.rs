//! Data structures for the assembled project view.
//!
//! ## Aggregates (assembler output)
//! - [`ProjectGraph`]: every entity of one project, with derived commit edges
//! - [`ProjectStats`]: entity counts, contributors and last activity
//! - [`ContributionData`]: per-day commit and task-change counts
//!
//! ## Working graph
//! - [`CommitDag`]: petgraph wrapper with commit ID ↔ NodeIndex mapping

use crate::models::{Branch, Commit, CommitEdge, EdgeType, Issue, Project, PullRequest, Task};
use chrono::{DateTime, NaiveDate, Utc};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Aggregates
// ============================================================================

/// Request-scoped view of one project, recomputed on every read.
///
/// `commits` are in topological order (parents before children); `edges`
/// only link commits that are both part of `commits`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectGraph {
    pub project: Project,
    pub commits: Vec<Commit>,
    pub branches: Vec<Branch>,
    pub edges: Vec<CommitEdge>,
    pub issues: Vec<Issue>,
    pub pull_requests: Vec<PullRequest>,
    pub tasks: Vec<Task>,
}

/// Summary counts for a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStats {
    pub total_commits: usize,
    pub total_branches: usize,
    pub total_tasks: usize,
    pub total_issues: usize,
    pub total_pull_requests: usize,
    /// Distinct commit-author emails
    pub active_contributors: usize,
    /// Latest commit timestamp or branch activity; `None` when the project has
    /// neither commits nor branches
    pub last_activity: Option<DateTime<Utc>>,
}

/// Activity counts for one calendar day (UTC)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionDay {
    pub date: NaiveDate,
    pub commits: usize,
    pub task_changes: usize,
}

/// Activity of a project, optionally narrowed to one contributor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionData {
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub total_commits: usize,
    pub total_task_changes: usize,
    /// Days with at least one commit, oldest first
    pub days: Vec<ContributionDay>,
}

// ============================================================================
// CommitDag: petgraph wrapper with ID mapping
// ============================================================================

/// Node payload of a [`CommitDag`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitNode {
    pub id: String,
    pub timestamp: DateTime<Utc>,
}

/// Parent → child graph over a set of commits.
///
/// Parents outside the set are ignored, so a DAG built from one project's
/// commits never reaches into another project.
#[derive(Debug, Clone, Default)]
pub struct CommitDag {
    pub graph: DiGraph<CommitNode, EdgeType>,
    pub id_to_index: HashMap<String, NodeIndex>,
}

impl CommitDag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the DAG from commits in any order.
    pub fn from_commits<'a>(commits: impl IntoIterator<Item = &'a Commit>) -> Self {
        let commits: Vec<&Commit> = commits.into_iter().collect();
        let mut dag = Self {
            graph: DiGraph::with_capacity(commits.len(), commits.len()),
            id_to_index: HashMap::with_capacity(commits.len()),
        };
        for commit in &commits {
            dag.add_node(CommitNode {
                id: commit.id.clone(),
                timestamp: commit.timestamp,
            });
        }
        for edge in super::algorithms::derive_edges(commits.iter().copied()) {
            dag.add_edge(&edge.from, &edge.to, edge.edge_type);
        }
        dag
    }

    /// Add a node, returning the existing index if the ID is already known.
    pub fn add_node(&mut self, node: CommitNode) -> NodeIndex {
        if let Some(&idx) = self.id_to_index.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.id_to_index.insert(id, idx);
        idx
    }

    /// Add a parent → child edge. `None` if either commit is unknown.
    pub fn add_edge(
        &mut self,
        from_id: &str,
        to_id: &str,
        edge_type: EdgeType,
    ) -> Option<petgraph::graph::EdgeIndex> {
        let from_idx = self.id_to_index.get(from_id)?;
        let to_idx = self.id_to_index.get(to_id)?;
        Some(self.graph.add_edge(*from_idx, *to_idx, edge_type))
    }

    pub fn get_index(&self, id: &str) -> Option<NodeIndex> {
        self.id_to_index.get(id).copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
