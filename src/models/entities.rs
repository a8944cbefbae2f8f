//! Entity types of the git-style task workflow
//!
//! Every entity is immutable-by-replacement: the store clones, modifies and
//! re-inserts a value, it never hands out mutable references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Project
// ============================================================================

/// A project owning commits, branches, tasks, issues and pull requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    /// User identifier of the owner
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_private: bool,
    /// Name of the branch flagged `is_default`
    pub default_branch: String,
    pub star_count: u32,
    pub fork_count: u32,
}

// ============================================================================
// Commit
// ============================================================================

/// Author of a commit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Counts derived from a commit's task changes
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitStats {
    pub tasks_added: u32,
    pub tasks_modified: u32,
    pub tasks_deleted: u32,
    pub total_changes: u32,
}

impl CommitStats {
    /// Count changes per change type. `moved` only contributes to the total.
    pub fn from_changes(changes: &[TaskChange]) -> Self {
        let mut stats = Self::default();
        for change in changes {
            match change.change_type {
                ChangeType::Created => stats.tasks_added += 1,
                ChangeType::Modified => stats.tasks_modified += 1,
                ChangeType::Deleted => stats.tasks_deleted += 1,
                ChangeType::Moved => {}
            }
        }
        stats.total_changes = changes.len() as u32;
        stats
    }
}

/// An immutable record of task changes linked to zero or more parents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Commit {
    pub id: String,
    /// 40 lowercase hex characters
    pub hash: String,
    /// First 7 characters of `hash`
    pub short_hash: String,
    pub message: String,
    pub author: CommitAuthor,
    pub timestamp: DateTime<Utc>,
    /// Empty for a root commit, two or more for a merge commit
    pub parent_ids: Vec<String>,
    /// Branch the commit was recorded against (informational)
    pub branch_name: String,
    pub project_id: String,
    #[serde(default)]
    pub changed_tasks: Vec<TaskChange>,
    pub stats: CommitStats,
}

impl Commit {
    pub fn is_root(&self) -> bool {
        self.parent_ids.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parent_ids.len() > 1
    }
}

/// Kind of change a commit applied to a task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Created,
    Modified,
    Deleted,
    Moved,
}

/// Partial task snapshot recorded before/after a change
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
}

/// A change to one task, embedded in a commit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskChange {
    pub task_id: String,
    pub change_type: ChangeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_values: Option<TaskSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_values: Option<TaskSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// ============================================================================
// Branch
// ============================================================================

/// A named, mutable pointer to a commit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Branch {
    pub id: String,
    pub name: String,
    pub project_id: String,
    pub head_commit_id: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub is_default: bool,
    pub is_protected: bool,
    pub last_activity: DateTime<Utc>,
}

// ============================================================================
// Task
// ============================================================================

/// Status of a task
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Done,
    Blocked,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Review => "review",
            Self::Done => "done",
            Self::Blocked => "blocked",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "todo" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "review" => Ok(Self::Review),
            "done" => Ok(Self::Done),
            "blocked" => Ok(Self::Blocked),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown task status: {}", s)),
        }
    }
}

/// Priority of a task
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(format!("Unknown task priority: {}", s)),
        }
    }
}

/// A unit of personal work tracked by commits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    /// Set-like: duplicates are removed on write
    #[serde(default)]
    pub labels: Vec<String>,
    /// Opaque passthrough data, never validated
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
}

// ============================================================================
// Issue
// ============================================================================

/// Status of an issue
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    #[default]
    Open,
    InProgress,
    Closed,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Closed => "closed",
        }
    }
}

impl FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("Unknown issue status: {}", s)),
        }
    }
}

/// Priority of an issue
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum IssuePriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl IssuePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl FromStr for IssuePriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Unknown issue priority: {}", s)),
        }
    }
}

/// A comment embedded in an issue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueComment {
    pub id: String,
    pub content: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A tracked problem or request inside a project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub id: String,
    /// Sequential per project, 1-based
    pub number: u64,
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    pub priority: IssuePriority,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Present iff `status == Closed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub comments: Vec<IssueComment>,
    pub project_id: String,
}

// ============================================================================
// Pull request
// ============================================================================

/// Status of a pull request
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestStatus {
    #[default]
    Open,
    Merged,
    Closed,
    Draft,
}

impl PullRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Merged => "merged",
            Self::Closed => "closed",
            Self::Draft => "draft",
        }
    }
}

impl FromStr for PullRequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "merged" => Ok(Self::Merged),
            "closed" => Ok(Self::Closed),
            "draft" => Ok(Self::Draft),
            _ => Err(format!("Unknown pull request status: {}", s)),
        }
    }
}

/// How a field conflict was resolved
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    AcceptIncoming,
    AcceptCurrent,
    Manual,
}

/// Resolution record attached to a conflict
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConflictResolution {
    pub strategy: ResolutionStrategy,
    pub resolved_value: serde_json::Value,
    pub resolved_by: String,
    pub resolved_at: DateTime<Utc>,
}

/// Per-field conflict detected by a merge attempt
///
/// Reserved for a merge component; nothing in this crate populates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConflictInfo {
    pub task_id: String,
    pub field: String,
    pub base_value: serde_json::Value,
    pub incoming_value: serde_json::Value,
    pub current_value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ConflictResolution>,
}

/// A request to merge one branch into another
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PullRequest {
    pub id: String,
    /// Sequential per project, never reused
    pub number: u64,
    pub title: String,
    pub description: String,
    /// Branch name, not id
    pub from_branch: String,
    /// Branch name, not id
    pub to_branch: String,
    pub status: PullRequestStatus,
    pub author: String,
    #[serde(default)]
    pub reviewers: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_commit_id: Option<String>,
    #[serde(default)]
    pub conflicts: Vec<ConflictInfo>,
    pub project_id: String,
}

// ============================================================================
// Commit edges
// ============================================================================

/// Kind of ancestry link between two commits
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// First parent on the same branch
    Parent,
    /// Second or later parent of a merge commit
    Merge,
    /// First parent recorded on a different branch (branch point)
    Branch,
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parent => write!(f, "parent"),
            Self::Merge => write!(f, "merge"),
            Self::Branch => write!(f, "branch"),
        }
    }
}

/// Parent → child link, derived from `Commit::parent_ids`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CommitEdge {
    pub id: String,
    /// Parent commit id
    pub from: String,
    /// Child commit id
    pub to: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
}

impl CommitEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>, edge_type: EdgeType) -> Self {
        let from = from.into();
        let to = to.into();
        Self {
            id: format!("edge-{}-{}", from, to),
            from,
            to,
            edge_type,
        }
    }
}
