//! In-memory entity store
//!
//! [`EntityStore`] is the single source of truth for every entity. State lives
//! behind one `tokio::sync::RwLock`: reads share it, every mutation holds the
//! write guard for its whole duration, so compound mutations (commit + branch
//! head, merge commit + pull request) are never observable half-applied.
//!
//! Operations are split by entity family:
//! - [`projects`]: project CRUD and cascade delete
//! - [`commits`]: commits, branches and pull request merges
//! - [`work_items`]: tasks, issues (with comments) and pull requests
//! - [`query`]: list options, typed filters and pagination

pub mod commits;
pub mod error;
pub mod projects;
pub mod query;
pub mod work_items;

pub use error::StoreError;
pub use query::{
    CommitFilter, IssueFilter, ListOptions, Page, Pagination, ProjectFilter, PullRequestFilter,
    SortKey, SortOrder, TaskFilter, DEFAULT_LIMIT, MAX_LIMIT,
};

use crate::events::{EntityType, EventEmitter};
use crate::fixtures::{generate_seed, GeneratedProject, SeedConfig};
use crate::graph::{self, ContributionData, ProjectGraph, ProjectStats};
use crate::models::*;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Entity counts, for health checks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub projects: usize,
    pub commits: usize,
    pub branches: usize,
    pub tasks: usize,
    pub issues: usize,
    pub pull_requests: usize,
}

/// Raw collections, keyed by id
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub(crate) projects: HashMap<String, Project>,
    pub(crate) commits: HashMap<String, Commit>,
    pub(crate) branches: HashMap<String, Branch>,
    pub(crate) tasks: HashMap<String, Task>,
    pub(crate) issues: HashMap<String, Issue>,
    pub(crate) pull_requests: HashMap<String, PullRequest>,
    /// Last issue number handed out per project
    issue_counters: HashMap<String, u64>,
    /// Last pull request number handed out per project
    pr_counters: HashMap<String, u64>,
}

impl StoreState {
    fn from_seed(seed: &SeedConfig) -> Self {
        let mut state = Self::default();
        for generated in generate_seed(seed) {
            state.insert_generated(generated);
        }
        state
    }

    /// Load a generated project; counters resume after its highest numbers.
    pub(crate) fn insert_generated(&mut self, generated: GeneratedProject) {
        let project_id = generated.project.id.clone();
        let last_issue = generated.issues.iter().map(|i| i.number).max().unwrap_or(0);
        let last_pr = generated
            .pull_requests
            .iter()
            .map(|pr| pr.number)
            .max()
            .unwrap_or(0);
        self.issue_counters.insert(project_id.clone(), last_issue);
        self.pr_counters.insert(project_id, last_pr);

        let project = generated.project;
        self.projects.insert(project.id.clone(), project);
        self.commits
            .extend(generated.commits.into_iter().map(|c| (c.id.clone(), c)));
        self.branches
            .extend(generated.branches.into_iter().map(|b| (b.id.clone(), b)));
        self.tasks
            .extend(generated.tasks.into_iter().map(|t| (t.id.clone(), t)));
        self.issues
            .extend(generated.issues.into_iter().map(|i| (i.id.clone(), i)));
        self.pull_requests
            .extend(generated.pull_requests.into_iter().map(|pr| (pr.id.clone(), pr)));
    }

    pub(crate) fn stats(&self) -> StoreStats {
        StoreStats {
            projects: self.projects.len(),
            commits: self.commits.len(),
            branches: self.branches.len(),
            tasks: self.tasks.len(),
            issues: self.issues.len(),
            pull_requests: self.pull_requests.len(),
        }
    }

    pub(crate) fn require_project(&self, project_id: &str) -> Result<&Project, StoreError> {
        self.projects
            .get(project_id)
            .ok_or_else(|| StoreError::not_found(EntityType::Project, project_id))
    }

    /// Number the next issue of a project will get; taken by `claim_issue_number`
    pub(crate) fn next_issue_number(&self, project_id: &str) -> u64 {
        self.issue_counters.get(project_id).copied().unwrap_or(0) + 1
    }

    pub(crate) fn claim_issue_number(&mut self, project_id: &str, number: u64) {
        self.issue_counters.insert(project_id.to_string(), number);
    }

    /// Number the next pull request of a project will get
    pub(crate) fn next_pr_number(&self, project_id: &str) -> u64 {
        self.pr_counters.get(project_id).copied().unwrap_or(0) + 1
    }

    pub(crate) fn claim_pr_number(&mut self, project_id: &str, number: u64) {
        self.pr_counters.insert(project_id.to_string(), number);
    }

    pub(crate) fn project_commits<'a>(
        &'a self,
        project_id: &'a str,
    ) -> impl Iterator<Item = &'a Commit> + 'a {
        self.commits
            .values()
            .filter(move |c| c.project_id == project_id)
    }

    pub(crate) fn project_branches<'a>(
        &'a self,
        project_id: &'a str,
    ) -> impl Iterator<Item = &'a Branch> + 'a {
        self.branches
            .values()
            .filter(move |b| b.project_id == project_id)
    }

    pub(crate) fn project_tasks<'a>(
        &'a self,
        project_id: &'a str,
    ) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.values().filter(move |t| t.project_id == project_id)
    }

    pub(crate) fn project_issues<'a>(
        &'a self,
        project_id: &'a str,
    ) -> impl Iterator<Item = &'a Issue> + 'a {
        self.issues
            .values()
            .filter(move |i| i.project_id == project_id)
    }

    pub(crate) fn project_pull_requests<'a>(
        &'a self,
        project_id: &'a str,
    ) -> impl Iterator<Item = &'a PullRequest> + 'a {
        self.pull_requests
            .values()
            .filter(move |pr| pr.project_id == project_id)
    }

    pub(crate) fn find_branch<'a>(&'a self, project_id: &'a str, name: &str) -> Option<&'a Branch> {
        self.project_branches(project_id).find(|b| b.name == name)
    }
}

/// Timestamp for an update: now, or 1µs past `previous` when the clock has
/// not moved beyond it.
pub(crate) fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// Labels with duplicates removed, first occurrence kept
pub(crate) fn dedup_labels(labels: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    labels
        .into_iter()
        .filter(|label| seen.insert(label.clone()))
        .collect()
}

/// Authoritative in-memory store of projects and their entities
pub struct EntityStore {
    state: RwLock<StoreState>,
    /// Restored by `reset`; `None` resets to empty
    seed: Option<SeedConfig>,
    event_emitter: Option<Arc<dyn EventEmitter>>,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    /// Empty store
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            seed: None,
            event_emitter: None,
        }
    }

    /// Store loaded with generated sample projects
    pub fn seeded(seed: SeedConfig) -> Self {
        let state = StoreState::from_seed(&seed);
        debug!(
            projects = state.projects.len(),
            commits = state.commits.len(),
            "Seeded entity store"
        );
        Self {
            state: RwLock::new(state),
            seed: Some(seed),
            event_emitter: None,
        }
    }

    /// Emit a CrudEvent after every successful mutation
    pub fn with_event_emitter(mut self, emitter: Arc<dyn EventEmitter>) -> Self {
        self.event_emitter = Some(emitter);
        self
    }

    pub(crate) async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, StoreState> {
        self.state.read().await
    }

    pub(crate) async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, StoreState> {
        self.state.write().await
    }

    pub(crate) fn emitter(&self) -> Option<&dyn EventEmitter> {
        self.event_emitter.as_deref()
    }

    /// Remove every entity and reset all counters
    pub async fn clear_all(&self) {
        let mut state = self.write().await;
        *state = StoreState::default();
        info!("Cleared entity store");
    }

    /// Wipe and reload the seed this store was built with
    pub async fn reset(&self) {
        let fresh = match &self.seed {
            Some(seed) => StoreState::from_seed(seed),
            None => StoreState::default(),
        };
        let mut state = self.write().await;
        *state = fresh;
        info!(projects = state.projects.len(), "Reset entity store");
    }

    pub async fn store_stats(&self) -> StoreStats {
        self.read().await.stats()
    }

    // ========================================================================
    // Assembled views
    // ========================================================================

    /// Every entity of a project plus derived commit edges; `None` if the
    /// project does not exist
    pub async fn get_project_graph(&self, project_id: &str) -> Option<ProjectGraph> {
        graph::assembler::project_graph(&*self.read().await, project_id)
    }

    pub async fn get_project_stats(&self, project_id: &str) -> Option<ProjectStats> {
        graph::assembler::project_stats(&*self.read().await, project_id)
    }

    /// Per-day activity, optionally for one contributor (matched on author
    /// email or name, case-insensitively)
    pub async fn get_contribution_data(
        &self,
        project_id: &str,
        user: Option<&str>,
    ) -> Option<ContributionData> {
        graph::assembler::contribution_data(&*self.read().await, project_id, user)
    }

    /// The branch head and all its ancestors, newest first
    pub async fn get_branch_history(&self, branch_id: &str) -> Option<Vec<Commit>> {
        graph::assembler::branch_history(&*self.read().await, branch_id)
    }
}
