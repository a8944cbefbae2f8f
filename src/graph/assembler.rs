//! Project-scoped views joined from the store's raw collections.
//!
//! Nothing here is cached: every call recomputes from the state it is given.

use std::collections::{BTreeMap, HashSet};

use super::algorithms::{ancestors, derive_edges, topological_order};
use super::models::{CommitDag, ContributionData, ContributionDay, ProjectGraph, ProjectStats};
use crate::models::{Branch, Commit};
use crate::store::StoreState;

/// Default branch first, then most recent activity, then id
pub fn sort_branches(branches: &mut [Branch]) {
    branches.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then_with(|| b.last_activity.cmp(&a.last_activity))
            .then_with(|| a.id.cmp(&b.id))
    });
}

pub(crate) fn project_graph(state: &StoreState, project_id: &str) -> Option<ProjectGraph> {
    let project = state.projects.get(project_id)?.clone();

    let dag = CommitDag::from_commits(state.project_commits(project_id));
    let commits: Vec<Commit> = topological_order(&dag)
        .iter()
        .filter_map(|id| state.commits.get(id).cloned())
        .collect();
    let edges = derive_edges(&commits);

    let mut branches: Vec<_> = state.project_branches(project_id).cloned().collect();
    sort_branches(&mut branches);

    let mut tasks: Vec<_> = state.project_tasks(project_id).cloned().collect();
    tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

    let mut issues: Vec<_> = state.project_issues(project_id).cloned().collect();
    issues.sort_by_key(|i| i.number);

    let mut pull_requests: Vec<_> = state.project_pull_requests(project_id).cloned().collect();
    pull_requests.sort_by_key(|pr| pr.number);

    Some(ProjectGraph {
        project,
        commits,
        branches,
        edges,
        issues,
        pull_requests,
        tasks,
    })
}

pub(crate) fn project_stats(state: &StoreState, project_id: &str) -> Option<ProjectStats> {
    state.projects.get(project_id)?;

    let commits: Vec<&Commit> = state.project_commits(project_id).collect();
    let branches: Vec<&Branch> = state.project_branches(project_id).collect();

    let contributors: HashSet<String> = commits
        .iter()
        .map(|c| c.author.email.to_lowercase())
        .collect();
    let last_activity = commits
        .iter()
        .map(|c| c.timestamp)
        .chain(branches.iter().map(|b| b.last_activity))
        .max();

    Some(ProjectStats {
        total_commits: commits.len(),
        total_branches: branches.len(),
        total_tasks: state.project_tasks(project_id).count(),
        total_issues: state.project_issues(project_id).count(),
        total_pull_requests: state.project_pull_requests(project_id).count(),
        active_contributors: contributors.len(),
        last_activity,
    })
}

fn authored_by(commit: &Commit, user: &str) -> bool {
    commit.author.email.eq_ignore_ascii_case(user) || commit.author.name.eq_ignore_ascii_case(user)
}

pub(crate) fn contribution_data(
    state: &StoreState,
    project_id: &str,
    user: Option<&str>,
) -> Option<ContributionData> {
    state.projects.get(project_id)?;

    let mut days: BTreeMap<_, (usize, usize)> = BTreeMap::new();
    for commit in state.project_commits(project_id) {
        if user.is_some_and(|u| !authored_by(commit, u)) {
            continue;
        }
        let day = days.entry(commit.timestamp.date_naive()).or_default();
        day.0 += 1;
        day.1 += commit.changed_tasks.len();
    }

    let days: Vec<ContributionDay> = days
        .into_iter()
        .map(|(date, (commits, task_changes))| ContributionDay {
            date,
            commits,
            task_changes,
        })
        .collect();

    Some(ContributionData {
        project_id: project_id.to_string(),
        user: user.map(str::to_string),
        total_commits: days.iter().map(|d| d.commits).sum(),
        total_task_changes: days.iter().map(|d| d.task_changes).sum(),
        days,
    })
}

pub(crate) fn branch_history(state: &StoreState, branch_id: &str) -> Option<Vec<Commit>> {
    let branch = state.branches.get(branch_id)?;
    let dag = CommitDag::from_commits(state.project_commits(&branch.project_id));
    let reachable = ancestors(&dag, &branch.head_commit_id);

    let mut history: Vec<Commit> = reachable
        .iter()
        .filter_map(|id| state.commits.get(id).cloned())
        .collect();
    history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
    Some(history)
}
