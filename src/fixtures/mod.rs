//! Sample data generation for seeding and tests
//!
//! Shapes are deterministic, contents are random. Every generated project is
//! internally consistent:
//! - each branch head refers to a generated commit
//! - each commit except the first lists exactly the previous commit as parent
//! - each edge joins two generated commits
//!
//! Identifiers are `{prefix}-{suffix}` where the suffix is unique within a
//! process run. They are not meant to be secure or globally unique.

use crate::graph::derive_edges;
use crate::models::*;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

pub const MAIN_BRANCH: &str = "main";

const CONTRIBUTORS: &[(&str, &str)] = &[
    ("Alex Morgan", "alex.morgan@example.com"),
    ("Sam Rivera", "sam.rivera@example.com"),
    ("Jordan Lee", "jordan.lee@example.com"),
    ("Casey Kim", "casey.kim@example.com"),
];

const PROJECT_NAMES: &[&str] = &[
    "Home Renovation",
    "Garden Plan",
    "Reading List",
    "Fitness Routine",
    "Side Project Launch",
    "Trip to Lisbon",
];

const TASK_TITLES: &[&str] = &[
    "Compare paint samples",
    "Order seeds",
    "Book train tickets",
    "Draft landing page copy",
    "Sort receipts",
    "Fix squeaky door",
    "Plan weekly meals",
    "Renew library card",
    "Schedule dentist appointment",
    "Back up photos",
];

const COMMIT_MESSAGES: &[&str] = &[
    "Add initial task list",
    "Reprioritize weekend chores",
    "Mark shopping done",
    "Move errands to next week",
    "Split research into subtasks",
    "Close out finished items",
    "Update due dates",
];

const ISSUE_TITLES: &[&str] = &[
    "Budget is unclear",
    "Missing supplier contact",
    "Deadline conflicts with holiday",
    "Need second opinion on layout",
];

const LABELS: &[&str] = &["home", "errand", "research", "finance", "health", "urgent"];

const FEATURE_BRANCHES: &[&str] = &[
    "feature/weekend-plan",
    "feature/budget-review",
    "feature/spring-cleanup",
];

/// Shape of a generated project
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    pub owner: String,
    pub tasks: usize,
    /// At least one commit is always generated
    pub commits: usize,
    pub issues: usize,
    pub pull_requests: usize,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            owner: "demo-user".into(),
            tasks: 8,
            commits: 6,
            issues: 3,
            pull_requests: 2,
        }
    }
}

/// Sample data loaded into a store at startup and on `reset`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub projects: usize,
    #[serde(flatten)]
    pub project: FixtureConfig,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            projects: 3,
            project: FixtureConfig::default(),
        }
    }
}

/// All entities of one generated project
#[derive(Debug, Clone)]
pub struct GeneratedProject {
    pub project: Project,
    pub tasks: Vec<Task>,
    pub commits: Vec<Commit>,
    pub branches: Vec<Branch>,
    pub edges: Vec<CommitEdge>,
    pub issues: Vec<Issue>,
    pub pull_requests: Vec<PullRequest>,
}

// ============================================================================
// Identifiers
// ============================================================================

/// `{prefix}-{32 hex chars}`
pub fn generate_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

/// 40 lowercase hex characters from a uniform random source
pub fn generate_hash() -> String {
    hex::encode(rand::random::<[u8; 20]>())
}

/// First 7 characters of a commit hash
pub fn short_hash(hash: &str) -> String {
    hash.chars().take(7).collect()
}

// ============================================================================
// Random helpers
// ============================================================================

fn random_index(len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (rand::random::<u64>() % len as u64) as usize
}

fn pick<'a>(items: &[&'a str]) -> &'a str {
    items[random_index(items.len())]
}

/// Inclusive range
fn random_between(min: usize, max: usize) -> usize {
    min + random_index(max - min + 1)
}

fn random_author() -> CommitAuthor {
    let (name, email) = CONTRIBUTORS[random_index(CONTRIBUTORS.len())];
    CommitAuthor {
        name: name.to_string(),
        email: email.to_string(),
        avatar_url: None,
    }
}

fn random_labels() -> Vec<String> {
    let mut labels: Vec<String> = (0..random_between(0, 2))
        .map(|_| pick(LABELS).to_string())
        .collect();
    labels.sort();
    labels.dedup();
    labels
}

// ============================================================================
// Single entities
// ============================================================================

pub fn generate_project(owner: &str, created_at: DateTime<Utc>) -> Project {
    Project {
        id: generate_id("project"),
        name: pick(PROJECT_NAMES).to_string(),
        description: "Sample project generated for local development".to_string(),
        owner: owner.to_string(),
        created_at,
        updated_at: created_at,
        is_private: rand::random::<bool>(),
        default_branch: MAIN_BRANCH.to_string(),
        star_count: random_between(0, 40) as u32,
        fork_count: random_between(0, 5) as u32,
    }
}

pub fn generate_task(project_id: &str, created_at: DateTime<Utc>) -> Task {
    const STATUSES: [TaskStatus; 5] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Done,
        TaskStatus::Blocked,
    ];
    const PRIORITIES: [TaskPriority; 4] = [
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
        TaskPriority::Urgent,
    ];
    let assignee = rand::random::<bool>()
        .then(|| CONTRIBUTORS[random_index(CONTRIBUTORS.len())].1.to_string());
    Task {
        id: generate_id("task"),
        title: pick(TASK_TITLES).to_string(),
        description: None,
        status: STATUSES[random_index(STATUSES.len())],
        priority: PRIORITIES[random_index(PRIORITIES.len())],
        assignee,
        created_at,
        updated_at: created_at + Duration::minutes(random_between(0, 120) as i64),
        due_date: rand::random::<bool>()
            .then(|| created_at + Duration::days(random_between(1, 21) as i64)),
        labels: random_labels(),
        metadata: BTreeMap::new(),
        project_id: project_id.to_string(),
        branch_id: None,
    }
}

/// Build a commit with derived hash, short hash and stats
pub fn build_commit(
    project_id: &str,
    branch_name: &str,
    message: &str,
    author: CommitAuthor,
    parent_ids: Vec<String>,
    changed_tasks: Vec<TaskChange>,
    timestamp: DateTime<Utc>,
) -> Commit {
    let hash = generate_hash();
    Commit {
        id: generate_id("commit"),
        short_hash: short_hash(&hash),
        hash,
        message: message.to_string(),
        author,
        timestamp,
        parent_ids,
        branch_name: branch_name.to_string(),
        project_id: project_id.to_string(),
        stats: CommitStats::from_changes(&changed_tasks),
        changed_tasks,
    }
}

/// A linear chain: every commit but the first has the previous one as sole parent
pub fn generate_commit_chain(
    project_id: &str,
    branch_name: &str,
    len: usize,
    tasks: &[Task],
    start: DateTime<Utc>,
    step: Duration,
) -> Vec<Commit> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut commits: Vec<Commit> = Vec::with_capacity(len);

    for i in 0..len {
        let mut changes = Vec::new();
        if !tasks.is_empty() {
            for _ in 0..random_between(1, 3.min(tasks.len())) {
                let task = &tasks[random_index(tasks.len())];
                if changes.iter().any(|c: &TaskChange| c.task_id == task.id) {
                    continue;
                }
                let change_type = if seen.insert(task.id.as_str()) {
                    ChangeType::Created
                } else if rand::random::<bool>() {
                    ChangeType::Modified
                } else {
                    ChangeType::Moved
                };
                changes.push(TaskChange {
                    task_id: task.id.clone(),
                    change_type,
                    old_values: None,
                    new_values: Some(TaskSnapshot {
                        status: Some(task.status),
                        ..Default::default()
                    }),
                    notes: None,
                });
            }
        }
        let parents = commits
            .last()
            .map(|prev| vec![prev.id.clone()])
            .unwrap_or_default();
        let message = if i == 0 {
            "Initial commit"
        } else {
            pick(COMMIT_MESSAGES)
        };
        commits.push(build_commit(
            project_id,
            branch_name,
            message,
            random_author(),
            parents,
            changes,
            start + step * i as i32,
        ));
    }
    commits
}

// ============================================================================
// Complete project
// ============================================================================

/// One project with tasks, a commit chain on `main`, a default and a feature
/// branch, issues, pull requests and the edges of the chain
pub fn generate_complete_project(config: &FixtureConfig) -> GeneratedProject {
    let now = Utc::now();
    let created_at = now - Duration::days(30);
    let mut project = generate_project(&config.owner, created_at);

    let tasks: Vec<Task> = (0..config.tasks)
        .map(|i| generate_task(&project.id, created_at + Duration::hours(i as i64)))
        .collect();

    let commit_count = config.commits.max(1);
    let step = Duration::minutes((29 * 24 * 60) / (commit_count as i64 + 1));
    let commits = generate_commit_chain(
        &project.id,
        MAIN_BRANCH,
        commit_count,
        &tasks,
        created_at + Duration::hours(12),
        step,
    );

    // The chain is never empty
    let last = &commits[commits.len() - 1];
    let earlier = &commits[(commits.len() - 1) / 2];
    let main = Branch {
        id: generate_id("branch"),
        name: MAIN_BRANCH.to_string(),
        project_id: project.id.clone(),
        head_commit_id: last.id.clone(),
        created_at: commits[0].timestamp,
        created_by: config.owner.clone(),
        is_default: true,
        is_protected: true,
        last_activity: last.timestamp,
    };
    let feature = Branch {
        id: generate_id("branch"),
        name: pick(FEATURE_BRANCHES).to_string(),
        project_id: project.id.clone(),
        head_commit_id: earlier.id.clone(),
        created_at: earlier.timestamp,
        created_by: last.author.email.clone(),
        is_default: false,
        is_protected: false,
        last_activity: earlier.timestamp,
    };

    let issues = (0..config.issues)
        .map(|i| generate_issue(&project.id, i as u64 + 1, created_at + Duration::days(i as i64 + 1)))
        .collect();

    let pull_requests = (0..config.pull_requests)
        .map(|i| {
            generate_pull_request(
                &project.id,
                i as u64 + 1,
                &feature.name,
                &main.name,
                created_at + Duration::days(i as i64 + 2),
            )
        })
        .collect();

    project.updated_at = last.timestamp;
    let edges = derive_edges(&commits);

    GeneratedProject {
        project,
        tasks,
        commits,
        branches: vec![main, feature],
        edges,
        issues,
        pull_requests,
    }
}

/// Every project described by a seed config
pub fn generate_seed(seed: &SeedConfig) -> Vec<GeneratedProject> {
    (0..seed.projects)
        .map(|_| generate_complete_project(&seed.project))
        .collect()
}

fn generate_issue(project_id: &str, number: u64, created_at: DateTime<Utc>) -> Issue {
    const STATUSES: [IssueStatus; 3] = [
        IssueStatus::Open,
        IssueStatus::InProgress,
        IssueStatus::Closed,
    ];
    const PRIORITIES: [IssuePriority; 4] = [
        IssuePriority::Low,
        IssuePriority::Medium,
        IssuePriority::High,
        IssuePriority::Critical,
    ];
    let status = STATUSES[random_index(STATUSES.len())];
    let updated_at = created_at + Duration::hours(random_between(1, 48) as i64);
    let author = CONTRIBUTORS[random_index(CONTRIBUTORS.len())].1.to_string();
    let comments = (0..random_between(0, 2))
        .map(|i| IssueComment {
            id: generate_id("comment"),
            content: "Looked into this, notes in the task".to_string(),
            author: CONTRIBUTORS[random_index(CONTRIBUTORS.len())].1.to_string(),
            created_at: created_at + Duration::minutes(30 * (i as i64 + 1)),
            updated_at: None,
        })
        .collect();
    Issue {
        id: generate_id("issue"),
        number,
        title: pick(ISSUE_TITLES).to_string(),
        description: "Generated sample issue".to_string(),
        status,
        priority: PRIORITIES[random_index(PRIORITIES.len())],
        author,
        assignee: None,
        created_at,
        updated_at,
        closed_at: (status == IssueStatus::Closed).then_some(updated_at),
        labels: random_labels(),
        comments,
        project_id: project_id.to_string(),
    }
}

fn generate_pull_request(
    project_id: &str,
    number: u64,
    from_branch: &str,
    to_branch: &str,
    created_at: DateTime<Utc>,
) -> PullRequest {
    const STATUSES: [PullRequestStatus; 4] = [
        PullRequestStatus::Open,
        PullRequestStatus::Draft,
        PullRequestStatus::Merged,
        PullRequestStatus::Closed,
    ];
    let status = STATUSES[random_index(STATUSES.len())];
    let updated_at = created_at + Duration::hours(random_between(1, 72) as i64);
    PullRequest {
        id: generate_id("pull_request"),
        number,
        title: format!("Merge {} into {}", from_branch, to_branch),
        description: "Generated sample pull request".to_string(),
        from_branch: from_branch.to_string(),
        to_branch: to_branch.to_string(),
        status,
        author: CONTRIBUTORS[random_index(CONTRIBUTORS.len())].1.to_string(),
        reviewers: vec![CONTRIBUTORS[random_index(CONTRIBUTORS.len())].1.to_string()],
        created_at,
        updated_at,
        merged_at: (status == PullRequestStatus::Merged).then_some(updated_at),
        closed_at: (status == PullRequestStatus::Closed).then_some(updated_at),
        merge_commit_id: None,
        conflicts: vec![],
        project_id: project_id.to_string(),
    }
}
