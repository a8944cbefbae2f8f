//! Test helper factories and store builders
//!
//! Provides request factories with sensible defaults and helpers for building
//! small stores with a project and a default branch.
#![allow(dead_code)]

use crate::fixtures::{FixtureConfig, SeedConfig};
use crate::models::*;
use crate::store::{EntityStore, ListOptions};

// ============================================================================
// Store builders
// ============================================================================

/// A store seeded with two small generated projects
pub fn seeded_store() -> EntityStore {
    EntityStore::seeded(SeedConfig {
        projects: 2,
        project: FixtureConfig {
            tasks: 5,
            commits: 4,
            issues: 2,
            pull_requests: 1,
            ..Default::default()
        },
    })
}

/// Id of the first listed project
pub async fn first_project_id(store: &EntityStore) -> String {
    let page = store.list_projects(&ListOptions::default()).await;
    page.data[0].id.clone()
}

/// A new project with a root commit and a default `main` branch on it
pub async fn project_with_main(store: &EntityStore) -> (Project, Commit, Branch) {
    let project = store
        .create_project(create_project_request("Home"))
        .await
        .expect("create project");
    let root = store
        .create_commit(&project.id, commit_request("main", "Initial commit"))
        .await
        .expect("create root commit");
    let main = store
        .create_branch(&project.id, branch_request("main", &root.id))
        .await
        .expect("create main branch");
    (project, root, main)
}

// ============================================================================
// Request factories
// ============================================================================

pub fn author(name: &str) -> CommitAuthor {
    CommitAuthor {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        avatar_url: None,
    }
}

pub fn create_project_request(name: &str) -> CreateProjectRequest {
    CreateProjectRequest {
        name: name.to_string(),
        description: "Personal tasks".to_string(),
        owner: "alice".to_string(),
        is_private: false,
        default_branch: "main".to_string(),
    }
}

pub fn commit_request(branch: &str, message: &str) -> CreateCommitRequest {
    CreateCommitRequest {
        message: message.to_string(),
        branch_name: branch.to_string(),
        author: author("Alice"),
        task_changes: Vec::new(),
    }
}

pub fn task_change(task_id: &str, change_type: ChangeType) -> TaskChangeInput {
    TaskChangeInput {
        task_id: task_id.to_string(),
        change_type,
        old_values: None,
        new_values: None,
        notes: None,
    }
}

pub fn branch_request(name: &str, from_commit_id: &str) -> CreateBranchRequest {
    CreateBranchRequest {
        name: name.to_string(),
        from_commit_id: from_commit_id.to_string(),
        created_by: "alice".to_string(),
    }
}

pub fn create_task_request(title: &str) -> CreateTaskRequest {
    CreateTaskRequest {
        title: title.to_string(),
        ..Default::default()
    }
}

pub fn create_issue_request(title: &str) -> CreateIssueRequest {
    CreateIssueRequest {
        title: title.to_string(),
        description: "Found while cleaning up".to_string(),
        author: "alice".to_string(),
        ..Default::default()
    }
}

pub fn pull_request_request(from: &str, to: &str) -> CreatePullRequestRequest {
    CreatePullRequestRequest {
        title: format!("Merge {} into {}", from, to),
        description: "Ready for review".to_string(),
        from_branch: from.to_string(),
        to_branch: to.to_string(),
        author: "alice".to_string(),
        ..Default::default()
    }
}
