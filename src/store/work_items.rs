//! Tasks, issues and pull requests
//!
//! Requests carry status and priority as strings; they are parsed only after
//! the request has passed validation.

use super::query::{self, IssueFilter, ListOptions, Page, PullRequestFilter, TaskFilter};
use super::{dedup_labels, next_timestamp, EntityStore, StoreError};
use crate::events::{CrudAction, CrudEvent, EntityType};
use crate::fixtures::generate_id;
use crate::models::*;
use crate::validation::*;
use chrono::Utc;
use std::str::FromStr;

/// Parse an already validated enum field
fn parse_field<T: FromStr<Err = String>>(raw: Option<&str>) -> Result<Option<T>, StoreError> {
    raw.map(|s| {
        s.parse::<T>()
            .map_err(|e| StoreError::from(ValidationError { errors: vec![e] }))
    })
    .transpose()
}

impl EntityStore {
    // ========================================================================
    // Tasks
    // ========================================================================

    pub async fn list_tasks(
        &self,
        project_id: &str,
        options: &ListOptions<TaskFilter>,
    ) -> Result<Page<Task>, StoreError> {
        let state = self.read().await;
        state.require_project(project_id)?;
        Ok(query::query(state.project_tasks(project_id), options))
    }

    pub async fn get_task(&self, id: &str) -> Option<Task> {
        self.read().await.tasks.get(id).cloned()
    }

    pub async fn create_task(
        &self,
        project_id: &str,
        req: CreateTaskRequest,
    ) -> Result<Task, StoreError> {
        validate_create_task(&req).into_result()?;
        let status = parse_field::<TaskStatus>(req.status.as_deref())?.unwrap_or_default();
        let priority = parse_field::<TaskPriority>(req.priority.as_deref())?.unwrap_or_default();

        let mut state = self.write().await;
        state.require_project(project_id)?;
        if let Some(branch_id) = &req.branch_id {
            check_task_branch(&state, project_id, branch_id)?;
        }

        let now = Utc::now();
        let task = Task {
            id: generate_id("task"),
            title: req.title.trim().to_string(),
            description: req.description,
            status,
            priority,
            assignee: req.assignee,
            created_at: now,
            updated_at: now,
            due_date: req.due_date,
            labels: dedup_labels(req.labels),
            metadata: req.metadata,
            project_id: project_id.to_string(),
            branch_id: req.branch_id,
        };
        validate_task(&task).into_result()?;

        state.tasks.insert(task.id.clone(), task.clone());
        drop(state);

        if let Some(emitter) = self.emitter() {
            emitter.emit_created(
                EntityType::Task,
                &task.id,
                serde_json::json!({ "title": task.title, "status": task.status.as_str() }),
                Some(task.project_id.clone()),
            );
        }
        Ok(task)
    }

    pub async fn update_task(&self, id: &str, req: UpdateTaskRequest) -> Result<Task, StoreError> {
        validate_update_task(&req).into_result()?;
        let status = parse_field::<TaskStatus>(req.status.as_deref())?;
        let priority = parse_field::<TaskPriority>(req.priority.as_deref())?;

        let mut state = self.write().await;
        let mut task = state
            .tasks
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityType::Task, id))?;

        if let Some(branch_id) = &req.branch_id {
            check_task_branch(&state, &task.project_id, branch_id)?;
            task.branch_id = Some(branch_id.clone());
        }
        if let Some(title) = req.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = req.description {
            task.description = Some(description);
        }
        if let Some(status) = status {
            task.status = status;
        }
        if let Some(priority) = priority {
            task.priority = priority;
        }
        if let Some(assignee) = req.assignee {
            task.assignee = Some(assignee);
        }
        if let Some(due) = req.due_date {
            task.due_date = Some(due);
        }
        if let Some(labels) = req.labels {
            task.labels = dedup_labels(labels);
        }
        if let Some(metadata) = req.metadata {
            task.metadata = metadata;
        }
        task.updated_at = next_timestamp(task.updated_at);
        validate_task(&task).into_result()?;

        state.tasks.insert(task.id.clone(), task.clone());
        drop(state);

        if let Some(emitter) = self.emitter() {
            emitter.emit_updated(
                EntityType::Task,
                &task.id,
                serde_json::json!({ "status": task.status.as_str(), "priority": task.priority.as_str() }),
                Some(task.project_id.clone()),
            );
        }
        Ok(task)
    }

    pub async fn delete_task(&self, id: &str) -> bool {
        let removed = self.write().await.tasks.remove(id);
        match removed {
            Some(task) => {
                if let Some(emitter) = self.emitter() {
                    emitter.emit_deleted(EntityType::Task, id, Some(task.project_id));
                }
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Issues
    // ========================================================================

    pub async fn list_issues(
        &self,
        project_id: &str,
        options: &ListOptions<IssueFilter>,
    ) -> Result<Page<Issue>, StoreError> {
        let state = self.read().await;
        state.require_project(project_id)?;
        Ok(query::query(state.project_issues(project_id), options))
    }

    pub async fn get_issue(&self, id: &str) -> Option<Issue> {
        self.read().await.issues.get(id).cloned()
    }

    /// Open an issue with the next number of its project
    pub async fn create_issue(
        &self,
        project_id: &str,
        req: CreateIssueRequest,
    ) -> Result<Issue, StoreError> {
        validate_create_issue(&req).into_result()?;
        let status = parse_field::<IssueStatus>(req.status.as_deref())?.unwrap_or_default();
        let priority = parse_field::<IssuePriority>(req.priority.as_deref())?.unwrap_or_default();

        let mut state = self.write().await;
        state.require_project(project_id)?;

        let now = Utc::now();
        let issue = Issue {
            id: generate_id("issue"),
            number: state.next_issue_number(project_id),
            title: req.title.trim().to_string(),
            description: req.description,
            status,
            priority,
            author: req.author,
            assignee: req.assignee,
            created_at: now,
            updated_at: now,
            closed_at: (status == IssueStatus::Closed).then_some(now),
            labels: dedup_labels(req.labels),
            comments: Vec::new(),
            project_id: project_id.to_string(),
        };
        validate_issue(&issue).into_result()?;

        state.claim_issue_number(project_id, issue.number);
        state.issues.insert(issue.id.clone(), issue.clone());
        drop(state);

        if let Some(emitter) = self.emitter() {
            emitter.emit_created(
                EntityType::Issue,
                &issue.id,
                serde_json::json!({ "number": issue.number, "title": issue.title }),
                Some(issue.project_id.clone()),
            );
        }
        Ok(issue)
    }

    /// Update an issue. Moving to `closed` stamps `closed_at`; moving away
    /// from `closed` clears it.
    pub async fn update_issue(
        &self,
        id: &str,
        req: UpdateIssueRequest,
    ) -> Result<Issue, StoreError> {
        validate_update_issue(&req).into_result()?;
        let status = parse_field::<IssueStatus>(req.status.as_deref())?;
        let priority = parse_field::<IssuePriority>(req.priority.as_deref())?;

        let mut state = self.write().await;
        let mut issue = state
            .issues
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityType::Issue, id))?;

        if let Some(title) = req.title {
            issue.title = title.trim().to_string();
        }
        if let Some(description) = req.description {
            issue.description = description;
        }
        if let Some(priority) = priority {
            issue.priority = priority;
        }
        if let Some(assignee) = req.assignee {
            issue.assignee = Some(assignee);
        }
        if let Some(labels) = req.labels {
            issue.labels = dedup_labels(labels);
        }
        issue.updated_at = next_timestamp(issue.updated_at);
        if let Some(status) = status {
            issue.status = status;
            issue.closed_at = match status {
                IssueStatus::Closed => issue.closed_at.or(Some(issue.updated_at)),
                IssueStatus::Open | IssueStatus::InProgress => None,
            };
        }
        validate_issue(&issue).into_result()?;

        state.issues.insert(issue.id.clone(), issue.clone());
        drop(state);

        if let Some(emitter) = self.emitter() {
            emitter.emit_updated(
                EntityType::Issue,
                &issue.id,
                serde_json::json!({ "status": issue.status.as_str() }),
                Some(issue.project_id.clone()),
            );
        }
        Ok(issue)
    }

    /// Append a comment to an issue
    pub async fn add_issue_comment(
        &self,
        issue_id: &str,
        req: AddIssueCommentRequest,
    ) -> Result<IssueComment, StoreError> {
        validate_issue_comment(&req).into_result()?;

        let mut state = self.write().await;
        let mut issue = state
            .issues
            .get(issue_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityType::Issue, issue_id))?;

        issue.updated_at = next_timestamp(issue.updated_at);
        let comment = IssueComment {
            id: generate_id("comment"),
            content: req.content,
            author: req.author,
            created_at: issue.updated_at,
            updated_at: None,
        };
        issue.comments.push(comment.clone());
        validate_issue(&issue).into_result()?;

        state.issues.insert(issue.id.clone(), issue.clone());
        drop(state);

        if let Some(emitter) = self.emitter() {
            emitter.emit(
                CrudEvent::new(EntityType::IssueComment, CrudAction::Created, &comment.id)
                    .with_related(EntityType::Issue, &issue.id)
                    .with_project_id(&issue.project_id),
            );
        }
        Ok(comment)
    }

    /// Remove an issue. Its number is not reused.
    pub async fn delete_issue(&self, id: &str) -> bool {
        let removed = self.write().await.issues.remove(id);
        match removed {
            Some(issue) => {
                if let Some(emitter) = self.emitter() {
                    emitter.emit_deleted(EntityType::Issue, id, Some(issue.project_id));
                }
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Pull requests
    // ========================================================================

    pub async fn list_pull_requests(
        &self,
        project_id: &str,
        options: &ListOptions<PullRequestFilter>,
    ) -> Result<Page<PullRequest>, StoreError> {
        let state = self.read().await;
        state.require_project(project_id)?;
        Ok(query::query(state.project_pull_requests(project_id), options))
    }

    pub async fn get_pull_request(&self, id: &str) -> Option<PullRequest> {
        self.read().await.pull_requests.get(id).cloned()
    }

    /// Open a pull request with the next number of its project.
    ///
    /// Branch names are not resolved here; `merge_pull_request` requires
    /// both to exist.
    pub async fn create_pull_request(
        &self,
        project_id: &str,
        req: CreatePullRequestRequest,
    ) -> Result<PullRequest, StoreError> {
        validate_create_pull_request(&req).into_result()?;

        let mut state = self.write().await;
        state.require_project(project_id)?;

        let now = Utc::now();
        let pr = PullRequest {
            id: generate_id("pull_request"),
            number: state.next_pr_number(project_id),
            title: req.title.trim().to_string(),
            description: req.description,
            from_branch: req.from_branch,
            to_branch: req.to_branch,
            status: if req.draft {
                PullRequestStatus::Draft
            } else {
                PullRequestStatus::Open
            },
            author: req.author,
            reviewers: req.reviewers,
            created_at: now,
            updated_at: now,
            merged_at: None,
            closed_at: None,
            merge_commit_id: None,
            conflicts: Vec::new(),
            project_id: project_id.to_string(),
        };
        validate_pull_request(&pr).into_result()?;

        state.claim_pr_number(project_id, pr.number);
        state.pull_requests.insert(pr.id.clone(), pr.clone());
        drop(state);

        if let Some(emitter) = self.emitter() {
            emitter.emit_created(
                EntityType::PullRequest,
                &pr.id,
                serde_json::json!({ "number": pr.number, "from": pr.from_branch, "to": pr.to_branch }),
                Some(pr.project_id.clone()),
            );
        }
        Ok(pr)
    }

    /// Update a pull request. A merged pull request is final, and only
    /// [`EntityStore::merge_pull_request`] can move one to `merged`. Closing
    /// stamps `closed_at`; reopening clears it.
    pub async fn update_pull_request(
        &self,
        id: &str,
        req: UpdatePullRequestRequest,
    ) -> Result<PullRequest, StoreError> {
        validate_update_pull_request(&req).into_result()?;
        let status = parse_field::<PullRequestStatus>(req.status.as_deref())?;

        let mut state = self.write().await;
        let mut pr = state
            .pull_requests
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityType::PullRequest, id))?;

        if pr.status == PullRequestStatus::Merged && status.is_some_and(|s| s != pr.status) {
            return Err(StoreError::Consistency(format!(
                "pull request #{} is already merged",
                pr.number
            )));
        }
        if status == Some(PullRequestStatus::Merged) && pr.status != PullRequestStatus::Merged {
            return Err(StoreError::Consistency(format!(
                "pull request #{} can only be merged through merge_pull_request",
                pr.number
            )));
        }

        if let Some(title) = req.title {
            pr.title = title.trim().to_string();
        }
        if let Some(description) = req.description {
            pr.description = description;
        }
        if let Some(reviewers) = req.reviewers {
            pr.reviewers = reviewers;
        }
        pr.updated_at = next_timestamp(pr.updated_at);
        if let Some(status) = status {
            pr.status = status;
            match status {
                PullRequestStatus::Merged => {}
                PullRequestStatus::Closed => {
                    pr.closed_at = pr.closed_at.or(Some(pr.updated_at));
                }
                PullRequestStatus::Open | PullRequestStatus::Draft => pr.closed_at = None,
            }
        }
        validate_pull_request(&pr).into_result()?;

        state.pull_requests.insert(pr.id.clone(), pr.clone());
        drop(state);

        if let Some(emitter) = self.emitter() {
            emitter.emit_updated(
                EntityType::PullRequest,
                &pr.id,
                serde_json::json!({ "status": pr.status.as_str() }),
                Some(pr.project_id.clone()),
            );
        }
        Ok(pr)
    }

    /// Remove a pull request. Its number is not reused.
    pub async fn delete_pull_request(&self, id: &str) -> bool {
        let removed = self.write().await.pull_requests.remove(id);
        match removed {
            Some(pr) => {
                if let Some(emitter) = self.emitter() {
                    emitter.emit_deleted(EntityType::PullRequest, id, Some(pr.project_id));
                }
                true
            }
            None => false,
        }
    }
}

/// A task may only point at a branch of its own project
fn check_task_branch(
    state: &super::StoreState,
    project_id: &str,
    branch_id: &str,
) -> Result<(), StoreError> {
    match state.branches.get(branch_id) {
        Some(b) if b.project_id == project_id => Ok(()),
        Some(_) => Err(StoreError::Consistency(format!(
            "branch {} belongs to another project",
            branch_id
        ))),
        None => Err(ValidationError {
            errors: vec!["branch_id must reference an existing branch".into()],
        }
        .into()),
    }
}
