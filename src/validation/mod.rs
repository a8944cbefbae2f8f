//! Structural and business-rule validation
//!
//! Validators never stop at the first problem: each returns a
//! [`ValidationResult`] holding every violated rule, in the order the rules
//! were checked. [`ValidationResult::into_result`] turns that into a single
//! [`ValidationError`] for the store's mutation paths.
//!
//! Validation is stateless. Cross-entity checks (does a commit exist, does the
//! project own it) live in the store.

use crate::models::*;
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_LABEL_LEN: usize = 50;

static ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]+(?:_[a-z]+)*-[A-Za-z0-9]+$").expect("id pattern is valid")
});
static HASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{40}$").expect("hash pattern is valid"));
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});
static BRANCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._/-]*$").expect("branch pattern is valid")
});

// ============================================================================
// Result types
// ============================================================================

/// Every violated rule of a payload, joined for display
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed: {}", .errors.join("; "))]
pub struct ValidationError {
    pub errors: Vec<String>,
}

/// Outcome of a validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    errors: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Append the findings of another pass after this one's
    pub fn merge(mut self, other: ValidationResult) -> Self {
        self.errors.extend(other.errors);
        self
    }

    /// Fail with one error aggregating all messages
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                errors: self.errors,
            })
        }
    }

    fn check(&mut self, ok: bool, message: impl Into<String>) {
        if !ok {
            self.errors.push(message.into());
        }
    }

    fn required(&mut self, field: &str, value: &str) {
        self.check(!value.trim().is_empty(), format!("{} is required", field));
    }

    fn required_with_max(&mut self, field: &str, value: &str, max: usize) {
        if value.trim().is_empty() {
            self.errors.push(format!("{} is required", field));
        } else if value.chars().count() > max {
            self.errors
                .push(format!("{} must be at most {} characters", field, max));
        }
    }

    fn one_of<T: FromStr>(&mut self, field: &str, value: Option<&str>, allowed: &[&str]) {
        if let Some(raw) = value {
            if T::from_str(raw).is_err() {
                self.errors.push(format!(
                    "{} must be one of: {}",
                    field,
                    allowed.join(", ")
                ));
            }
        }
    }

    fn id(&mut self, field: &str, value: &str) {
        self.check(is_valid_id(value), format!("{} has an invalid id format", field));
    }

    fn labels(&mut self, labels: &[String]) {
        for label in labels {
            if label.trim().is_empty() {
                self.errors.push("labels must not contain empty values".into());
                break;
            }
            if label.chars().count() > MAX_LABEL_LEN {
                self.errors.push(format!(
                    "labels must be at most {} characters each",
                    MAX_LABEL_LEN
                ));
                break;
            }
        }
    }

    fn author(&mut self, author: &CommitAuthor) {
        self.required("author.name", &author.name);
        self.check(
            is_valid_email(&author.email),
            "author.email must be a valid email address",
        );
    }
}

const TASK_STATUSES: &[&str] = &["todo", "in_progress", "review", "done", "blocked", "cancelled"];
const TASK_PRIORITIES: &[&str] = &["low", "medium", "high", "urgent"];
const ISSUE_STATUSES: &[&str] = &["open", "in_progress", "closed"];
const ISSUE_PRIORITIES: &[&str] = &["low", "medium", "high", "critical"];
const PR_STATUSES: &[&str] = &["open", "merged", "closed", "draft"];

// ============================================================================
// Format predicates
// ============================================================================

/// `{prefix}-{suffix}` with a lowercase prefix and alphanumeric suffix
pub fn is_valid_id(id: &str) -> bool {
    ID_RE.is_match(id)
}

/// 40 lowercase hexadecimal characters
pub fn is_valid_hash(hash: &str) -> bool {
    HASH_RE.is_match(hash)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// No whitespace, no leading separator, no `..`
pub fn is_valid_branch_name(name: &str) -> bool {
    BRANCH_RE.is_match(name) && !name.contains("..") && !name.ends_with('/')
}

// ============================================================================
// Entity validators
// ============================================================================

pub fn validate_project(project: &Project) -> ValidationResult {
    let mut v = ValidationResult::default();
    v.id("id", &project.id);
    v.required_with_max("name", &project.name, MAX_NAME_LEN);
    v.required("owner", &project.owner);
    v.check(
        is_valid_branch_name(&project.default_branch),
        "default_branch must be a valid branch name",
    );
    v.check(
        project.updated_at >= project.created_at,
        "updated_at must not precede created_at",
    );
    v
}

pub fn validate_commit(commit: &Commit) -> ValidationResult {
    let mut v = ValidationResult::default();
    v.id("id", &commit.id);
    v.check(
        is_valid_hash(&commit.hash),
        "hash must be 40 lowercase hexadecimal characters",
    );
    v.check(
        commit.hash.get(..7) == Some(commit.short_hash.as_str()),
        "short_hash must be the first 7 characters of hash",
    );
    v.required("message", &commit.message);
    v.author(&commit.author);
    v.required("branch_name", &commit.branch_name);
    for parent in &commit.parent_ids {
        if !is_valid_id(parent) {
            v.errors.push("parent_ids has an invalid id format".into());
            break;
        }
    }
    v.check(
        !commit.parent_ids.contains(&commit.id),
        "a commit cannot be its own parent",
    );
    v.check(
        commit.stats == CommitStats::from_changes(&commit.changed_tasks),
        "stats must match changed_tasks",
    );
    v
}

pub fn validate_branch(branch: &Branch) -> ValidationResult {
    let mut v = ValidationResult::default();
    v.id("id", &branch.id);
    v.check(
        is_valid_branch_name(&branch.name),
        "name must be a valid branch name",
    );
    v.id("project_id", &branch.project_id);
    v.id("head_commit_id", &branch.head_commit_id);
    v.check(
        branch.last_activity >= branch.created_at,
        "last_activity must not precede created_at",
    );
    v
}

pub fn validate_task(task: &Task) -> ValidationResult {
    let mut v = ValidationResult::default();
    v.id("id", &task.id);
    v.required_with_max("title", &task.title, MAX_TITLE_LEN);
    v.labels(&task.labels);
    v.id("project_id", &task.project_id);
    v.check(
        task.updated_at >= task.created_at,
        "updated_at must not precede created_at",
    );
    v
}

pub fn validate_issue(issue: &Issue) -> ValidationResult {
    let mut v = ValidationResult::default();
    v.id("id", &issue.id);
    v.check(issue.number >= 1, "number must be at least 1");
    v.required_with_max("title", &issue.title, MAX_TITLE_LEN);
    v.required("author", &issue.author);
    v.labels(&issue.labels);
    v.id("project_id", &issue.project_id);
    v.check(
        issue.updated_at >= issue.created_at,
        "updated_at must not precede created_at",
    );
    match (issue.status, issue.closed_at) {
        (IssueStatus::Closed, None) => v.errors.push("closed issues require closed_at".into()),
        (IssueStatus::Open | IssueStatus::InProgress, Some(_)) => v
            .errors
            .push("closed_at is only allowed on closed issues".into()),
        _ => {}
    }
    for comment in &issue.comments {
        if comment.content.trim().is_empty() || comment.author.trim().is_empty() {
            v.errors
                .push("comments require non-empty content and author".into());
            break;
        }
    }
    v
}

pub fn validate_pull_request(pr: &PullRequest) -> ValidationResult {
    let mut v = ValidationResult::default();
    v.id("id", &pr.id);
    v.check(pr.number >= 1, "number must be at least 1");
    v.required_with_max("title", &pr.title, MAX_TITLE_LEN);
    v.required("description", &pr.description);
    v.required("from_branch", &pr.from_branch);
    v.required("to_branch", &pr.to_branch);
    v.check(
        pr.from_branch != pr.to_branch,
        "from_branch and to_branch must differ",
    );
    v.required("author", &pr.author);
    v.check(
        pr.reviewers.iter().all(|r| !r.trim().is_empty()),
        "reviewers must not contain empty values",
    );
    v.id("project_id", &pr.project_id);
    v.check(
        pr.updated_at >= pr.created_at,
        "updated_at must not precede created_at",
    );
    v.check(
        pr.status != PullRequestStatus::Merged || pr.merged_at.is_some(),
        "merged pull requests require merged_at",
    );
    v
}

// ============================================================================
// Request validators
// ============================================================================

pub fn validate_create_project(req: &CreateProjectRequest) -> ValidationResult {
    let mut v = ValidationResult::default();
    v.required_with_max("name", &req.name, MAX_NAME_LEN);
    v.required("owner", &req.owner);
    v.check(
        is_valid_branch_name(&req.default_branch),
        "default_branch must be a valid branch name",
    );
    v
}

pub fn validate_update_project(req: &UpdateProjectRequest) -> ValidationResult {
    let mut v = ValidationResult::default();
    if let Some(name) = req.name.as_deref() {
        v.required_with_max("name", name, MAX_NAME_LEN);
    }
    v
}

pub fn validate_create_commit(req: &CreateCommitRequest) -> ValidationResult {
    let mut v = ValidationResult::default();
    v.required("message", &req.message);
    v.required("branch_name", &req.branch_name);
    v.author(&req.author);
    for change in &req.task_changes {
        if change.task_id.trim().is_empty() {
            v.errors.push("task_changes entries require task_id".into());
            break;
        }
    }
    v
}

pub fn validate_create_branch(req: &CreateBranchRequest) -> ValidationResult {
    let mut v = ValidationResult::default();
    if req.name.trim().is_empty() {
        v.errors.push("name is required".into());
    } else {
        v.check(
            is_valid_branch_name(&req.name),
            "name must be a valid branch name",
        );
    }
    v.required("from_commit_id", &req.from_commit_id);
    v.required("created_by", &req.created_by);
    v
}

pub fn validate_update_branch(req: &UpdateBranchRequest) -> ValidationResult {
    let mut v = ValidationResult::default();
    if let Some(name) = req.name.as_deref() {
        v.check(
            is_valid_branch_name(name),
            "name must be a valid branch name",
        );
    }
    if let Some(head) = req.head_commit_id.as_deref() {
        v.required("head_commit_id", head);
    }
    v.check(
        req.is_default != Some(false),
        "is_default can only be set to true; promote another branch instead",
    );
    v
}

pub fn validate_create_task(req: &CreateTaskRequest) -> ValidationResult {
    let mut v = ValidationResult::default();
    v.required_with_max("title", &req.title, MAX_TITLE_LEN);
    v.one_of::<TaskStatus>("status", req.status.as_deref(), TASK_STATUSES);
    v.one_of::<TaskPriority>("priority", req.priority.as_deref(), TASK_PRIORITIES);
    v.labels(&req.labels);
    v
}

pub fn validate_update_task(req: &UpdateTaskRequest) -> ValidationResult {
    let mut v = ValidationResult::default();
    if let Some(title) = req.title.as_deref() {
        v.required_with_max("title", title, MAX_TITLE_LEN);
    }
    v.one_of::<TaskStatus>("status", req.status.as_deref(), TASK_STATUSES);
    v.one_of::<TaskPriority>("priority", req.priority.as_deref(), TASK_PRIORITIES);
    if let Some(labels) = &req.labels {
        v.labels(labels);
    }
    v
}

pub fn validate_create_issue(req: &CreateIssueRequest) -> ValidationResult {
    let mut v = ValidationResult::default();
    v.required_with_max("title", &req.title, MAX_TITLE_LEN);
    v.one_of::<IssueStatus>("status", req.status.as_deref(), ISSUE_STATUSES);
    v.one_of::<IssuePriority>("priority", req.priority.as_deref(), ISSUE_PRIORITIES);
    v.required("author", &req.author);
    v.labels(&req.labels);
    v
}

pub fn validate_update_issue(req: &UpdateIssueRequest) -> ValidationResult {
    let mut v = ValidationResult::default();
    if let Some(title) = req.title.as_deref() {
        v.required_with_max("title", title, MAX_TITLE_LEN);
    }
    v.one_of::<IssueStatus>("status", req.status.as_deref(), ISSUE_STATUSES);
    v.one_of::<IssuePriority>("priority", req.priority.as_deref(), ISSUE_PRIORITIES);
    if let Some(labels) = &req.labels {
        v.labels(labels);
    }
    v
}

pub fn validate_issue_comment(req: &AddIssueCommentRequest) -> ValidationResult {
    let mut v = ValidationResult::default();
    v.required("content", &req.content);
    v.required("author", &req.author);
    v
}

pub fn validate_create_pull_request(req: &CreatePullRequestRequest) -> ValidationResult {
    let mut v = ValidationResult::default();
    v.required_with_max("title", &req.title, MAX_TITLE_LEN);
    v.required("description", &req.description);
    v.required("from_branch", &req.from_branch);
    v.required("to_branch", &req.to_branch);
    v.required("author", &req.author);
    v.check(
        req.reviewers.iter().all(|r| !r.trim().is_empty()),
        "reviewers must not contain empty values",
    );
    v
}

pub fn validate_update_pull_request(req: &UpdatePullRequestRequest) -> ValidationResult {
    let mut v = ValidationResult::default();
    if let Some(title) = req.title.as_deref() {
        v.required_with_max("title", title, MAX_TITLE_LEN);
    }
    if let Some(description) = req.description.as_deref() {
        v.required("description", description);
    }
    v.one_of::<PullRequestStatus>("status", req.status.as_deref(), PR_STATUSES);
    if let Some(reviewers) = &req.reviewers {
        v.check(
            reviewers.iter().all(|r| !r.trim().is_empty()),
            "reviewers must not contain empty values",
        );
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn sample_task() -> Task {
        let now = Utc::now();
        Task {
            id: "task-abc123".into(),
            title: "Water the plants".into(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            assignee: None,
            created_at: now,
            updated_at: now,
            due_date: None,
            labels: vec!["home".into()],
            metadata: Default::default(),
            project_id: "project-1".into(),
            branch_id: None,
        }
    }

    #[test]
    fn test_format_predicates() {
        assert!(is_valid_id("commit-4f2a9c"));
        assert!(is_valid_id("pull_request-42"));
        assert!(!is_valid_id("commit"));
        assert!(!is_valid_id("Commit-1"));
        assert!(!is_valid_id("commit-"));

        assert!(is_valid_hash(&"a".repeat(40)));
        assert!(!is_valid_hash(&"A".repeat(40)));
        assert!(!is_valid_hash(&"a".repeat(39)));

        assert!(is_valid_email("alice@example.com"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("alice example.com"));

        assert!(is_valid_branch_name("main"));
        assert!(is_valid_branch_name("feature/garden-plan"));
        assert!(!is_valid_branch_name("has space"));
        assert!(!is_valid_branch_name("-leading"));
        assert!(!is_valid_branch_name("a..b"));
    }

    #[test]
    fn test_create_task_reports_all_errors() {
        let req = CreateTaskRequest {
            title: "".into(),
            status: Some("finished".into()),
            ..Default::default()
        };
        let result = validate_create_task(&req);
        assert_eq!(
            result.errors(),
            &[
                "title is required".to_string(),
                "status must be one of: todo, in_progress, review, done, blocked, cancelled"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_into_result_joins_in_check_order() {
        let req = CreateTaskRequest {
            title: "   ".into(),
            priority: Some("whenever".into()),
            ..Default::default()
        };
        let err = validate_create_task(&req).into_result().unwrap_err();
        assert_eq!(err.errors.len(), 2);
        assert_eq!(
            err.to_string(),
            "validation failed: title is required; priority must be one of: low, medium, high, urgent"
        );
    }

    #[test]
    fn test_valid_task_passes() {
        assert!(validate_task(&sample_task()).is_valid());
    }

    #[test]
    fn test_task_title_too_long() {
        let mut task = sample_task();
        task.title = "x".repeat(MAX_TITLE_LEN + 1);
        let result = validate_task(&task);
        assert_eq!(result.errors().len(), 1);
        assert!(result.errors()[0].contains("at most"));
    }

    #[test]
    fn test_task_updated_before_created() {
        let mut task = sample_task();
        task.updated_at = task.created_at - Duration::seconds(1);
        assert!(!validate_task(&task).is_valid());
    }

    #[test]
    fn test_task_metadata_is_not_validated() {
        let mut task = sample_task();
        task.metadata
            .insert("".into(), serde_json::json!({"anything": [1, null]}));
        assert!(validate_task(&task).is_valid());
    }

    #[test]
    fn test_issue_closed_at_rule() {
        let now = Utc::now();
        let mut issue = Issue {
            id: "issue-1".into(),
            number: 1,
            title: "Leaky tap".into(),
            description: String::new(),
            status: IssueStatus::Closed,
            priority: IssuePriority::High,
            author: "alice".into(),
            assignee: None,
            created_at: now,
            updated_at: now,
            closed_at: None,
            labels: vec![],
            comments: vec![],
            project_id: "project-1".into(),
        };
        assert_eq!(
            validate_issue(&issue).errors(),
            &["closed issues require closed_at".to_string()]
        );
        issue.closed_at = Some(now);
        assert!(validate_issue(&issue).is_valid());
        issue.status = IssueStatus::Open;
        assert!(!validate_issue(&issue).is_valid());
    }

    #[test]
    fn test_commit_short_hash_and_stats_rules() {
        let hash = "0123456789abcdef0123456789abcdef01234567".to_string();
        let mut commit = Commit {
            id: "commit-1".into(),
            hash: hash.clone(),
            short_hash: hash[..7].to_string(),
            message: "Plan week".into(),
            author: CommitAuthor {
                name: "Alice".into(),
                email: "alice@example.com".into(),
                avatar_url: None,
            },
            timestamp: Utc::now(),
            parent_ids: vec![],
            branch_name: "main".into(),
            project_id: "project-1".into(),
            changed_tasks: vec![],
            stats: CommitStats::default(),
        };
        assert!(validate_commit(&commit).is_valid());

        commit.short_hash = "fffffff".into();
        commit.stats.total_changes = 3;
        let result = validate_commit(&commit);
        assert_eq!(result.errors().len(), 2);
    }

    #[test]
    fn test_create_commit_request_rules() {
        let req = CreateCommitRequest {
            message: "".into(),
            branch_name: "".into(),
            author: CommitAuthor {
                name: "".into(),
                email: "not-an-email".into(),
                avatar_url: None,
            },
            task_changes: vec![],
        };
        let result = validate_create_commit(&req);
        assert_eq!(result.errors().len(), 4);
    }

    #[test]
    fn test_pull_request_branches_must_differ() {
        let req = CreatePullRequestRequest {
            title: "Merge".into(),
            description: "desc".into(),
            from_branch: "main".into(),
            to_branch: "main".into(),
            author: "alice".into(),
            ..Default::default()
        };
        // Request-level check only covers non-empty fields
        assert!(validate_create_pull_request(&req).is_valid());
    }

    #[test]
    fn test_update_branch_rejects_demotion() {
        let req = UpdateBranchRequest {
            is_default: Some(false),
            ..Default::default()
        };
        assert!(!validate_update_branch(&req).is_valid());
    }

    #[test]
    fn test_merge_appends_errors() {
        let a = validate_create_issue(&CreateIssueRequest::default());
        let b = validate_issue_comment(&AddIssueCommentRequest {
            content: "".into(),
            author: "bob".into(),
        });
        let merged = a.clone().merge(b);
        assert_eq!(merged.errors().len(), a.errors().len() + 1);
        assert_eq!(merged.errors().last().unwrap(), "content is required");
    }
}
