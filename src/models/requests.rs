//! Request DTOs accepted by the entity store
//!
//! Status and priority travel as raw strings so that a single validation pass
//! can report an unknown value alongside every other problem in the payload.
//! Fields absent from an update request leave the stored value untouched;
//! unknown fields (including `id`) are ignored on deserialization.

use super::entities::{ChangeType, CommitAuthor, TaskSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_branch_name() -> String {
    "main".to_string()
}

// ============================================================================
// Projects
// ============================================================================

/// Request to create a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default = "default_branch_name")]
    pub default_branch: String,
}

/// Partial update of a project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: Option<bool>,
    #[serde(default)]
    pub star_count: Option<u32>,
    #[serde(default)]
    pub fork_count: Option<u32>,
}

// ============================================================================
// Commits & branches
// ============================================================================

/// One task change submitted with a commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskChangeInput {
    pub task_id: String,
    pub change_type: ChangeType,
    #[serde(default)]
    pub old_values: Option<TaskSnapshot>,
    #[serde(default)]
    pub new_values: Option<TaskSnapshot>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request to record a commit on a branch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommitRequest {
    pub message: String,
    pub branch_name: String,
    pub author: CommitAuthor,
    #[serde(default)]
    pub task_changes: Vec<TaskChangeInput>,
}

/// Request to create a branch pointing at an existing commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBranchRequest {
    pub name: String,
    pub from_commit_id: String,
    pub created_by: String,
}

/// Partial update of a branch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBranchRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub head_commit_id: Option<String>,
    #[serde(default)]
    pub is_protected: Option<bool>,
    /// Only `true` is meaningful: promotes this branch to default
    #[serde(default)]
    pub is_default: Option<bool>,
}

// ============================================================================
// Tasks
// ============================================================================

/// Request to create a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to `todo`
    #[serde(default)]
    pub status: Option<String>,
    /// Defaults to `medium`
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub branch_id: Option<String>,
}

/// Partial update of a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    pub branch_id: Option<String>,
}

// ============================================================================
// Issues
// ============================================================================

/// Request to open an issue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateIssueRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Defaults to `open`
    #[serde(default)]
    pub status: Option<String>,
    /// Defaults to `medium`
    #[serde(default)]
    pub priority: Option<String>,
    pub author: String,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Partial update of an issue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateIssueRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
}

/// Request to comment on an issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddIssueCommentRequest {
    pub content: String,
    pub author: String,
}

// ============================================================================
// Pull requests
// ============================================================================

/// Request to open a pull request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePullRequestRequest {
    pub title: String,
    pub description: String,
    pub from_branch: String,
    pub to_branch: String,
    pub author: String,
    #[serde(default)]
    pub reviewers: Vec<String>,
    /// Open as `draft` instead of `open`
    #[serde(default)]
    pub draft: bool,
}

/// Partial update of a pull request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePullRequestRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reviewers: Option<Vec<String>>,
}
