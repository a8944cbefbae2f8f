//! Commits, branches and pull request merges
//!
//! The compound mutations here validate everything up front and only then
//! touch the collections, all under one write guard.

use super::query::{self, CommitFilter, ListOptions, Page};
use super::{next_timestamp, EntityStore, StoreError};
use crate::events::{CrudAction, CrudEvent, EntityType};
use crate::fixtures::{build_commit, generate_id};
use crate::graph::{ancestors, sort_branches, CommitDag};
use crate::models::*;
use crate::validation::{
    validate_branch, validate_commit, validate_create_branch, validate_create_commit,
    validate_pull_request, validate_update_branch, ValidationError,
};
use chrono::Utc;
use tracing::debug;

impl EntityStore {
    // ========================================================================
    // Commits
    // ========================================================================

    pub async fn list_commits(
        &self,
        project_id: &str,
        options: &ListOptions<CommitFilter>,
    ) -> Result<Page<Commit>, StoreError> {
        let state = self.read().await;
        state.require_project(project_id)?;
        Ok(query::query(state.project_commits(project_id), options))
    }

    pub async fn get_commit(&self, id: &str) -> Option<Commit> {
        self.read().await.commits.get(id).cloned()
    }

    /// Record a commit on `req.branch_name`.
    ///
    /// If the project has a branch of that name, its head becomes the sole
    /// parent and the branch is advanced to the new commit in the same step.
    /// Otherwise the commit is a root and no branch is created.
    pub async fn create_commit(
        &self,
        project_id: &str,
        req: CreateCommitRequest,
    ) -> Result<Commit, StoreError> {
        validate_create_commit(&req).into_result()?;

        let mut state = self.write().await;
        state.require_project(project_id)?;

        let branch = state.find_branch(project_id, &req.branch_name).cloned();
        let parent = branch
            .as_ref()
            .and_then(|b| state.commits.get(&b.head_commit_id));
        let timestamp = match parent {
            Some(p) => next_timestamp(p.timestamp),
            None => Utc::now(),
        };
        let parent_ids = parent.map(|p| vec![p.id.clone()]).unwrap_or_default();

        let changes = req
            .task_changes
            .into_iter()
            .map(|c| TaskChange {
                task_id: c.task_id,
                change_type: c.change_type,
                old_values: c.old_values,
                new_values: c.new_values,
                notes: c.notes,
            })
            .collect();

        let commit = build_commit(
            project_id,
            &req.branch_name,
            req.message.trim(),
            req.author,
            parent_ids,
            changes,
            timestamp,
        );
        validate_commit(&commit).into_result()?;

        state.commits.insert(commit.id.clone(), commit.clone());
        let advanced = branch.map(|mut b| {
            b.head_commit_id = commit.id.clone();
            b.last_activity = commit.timestamp;
            state.branches.insert(b.id.clone(), b.clone());
            b
        });
        drop(state);

        if let Some(emitter) = self.emitter() {
            emitter.emit_created(
                EntityType::Commit,
                &commit.id,
                serde_json::json!({ "message": commit.message, "branch_name": commit.branch_name }),
                Some(project_id.to_string()),
            );
            if let Some(b) = &advanced {
                emitter.emit(
                    CrudEvent::new(EntityType::Branch, CrudAction::Updated, &b.id)
                        .with_related(EntityType::Commit, &commit.id)
                        .with_project_id(project_id),
                );
            }
        }
        Ok(commit)
    }

    // ========================================================================
    // Branches
    // ========================================================================

    /// Branches of a project, default branch first, then by last activity
    pub async fn list_branches(&self, project_id: &str) -> Result<Vec<Branch>, StoreError> {
        let state = self.read().await;
        state.require_project(project_id)?;
        let mut branches: Vec<Branch> = state.project_branches(project_id).cloned().collect();
        sort_branches(&mut branches);
        Ok(branches)
    }

    pub async fn get_branch(&self, id: &str) -> Option<Branch> {
        self.read().await.branches.get(id).cloned()
    }

    /// Create a branch pointing at an existing commit of the same project.
    ///
    /// The branch becomes the default iff its name is the project's
    /// `default_branch` and the project has no default branch yet.
    pub async fn create_branch(
        &self,
        project_id: &str,
        req: CreateBranchRequest,
    ) -> Result<Branch, StoreError> {
        let mut state = self.write().await;
        let project = state.require_project(project_id)?.clone();

        let mut errors = validate_create_branch(&req).errors().to_vec();
        let from = state.commits.get(&req.from_commit_id);
        if from.is_none() && !req.from_commit_id.trim().is_empty() {
            errors.push("from_commit_id must reference an existing commit".into());
        }
        if !errors.is_empty() {
            return Err(ValidationError { errors }.into());
        }

        if let Some(commit) = from {
            if commit.project_id != project_id {
                return Err(StoreError::Consistency(format!(
                    "commit {} belongs to another project",
                    commit.id
                )));
            }
        }
        if state.find_branch(project_id, &req.name).is_some() {
            return Err(StoreError::Consistency(format!(
                "branch '{}' already exists",
                req.name
            )));
        }

        let has_default = state.project_branches(project_id).any(|b| b.is_default);
        let now = Utc::now();
        let branch = Branch {
            id: generate_id("branch"),
            is_default: !has_default && req.name == project.default_branch,
            name: req.name,
            project_id: project_id.to_string(),
            head_commit_id: req.from_commit_id,
            created_at: now,
            created_by: req.created_by,
            is_protected: false,
            last_activity: now,
        };
        validate_branch(&branch).into_result()?;

        state.branches.insert(branch.id.clone(), branch.clone());
        drop(state);

        if let Some(emitter) = self.emitter() {
            emitter.emit(
                CrudEvent::new(EntityType::Branch, CrudAction::Created, &branch.id)
                    .with_related(EntityType::Commit, &branch.head_commit_id)
                    .with_payload(serde_json::to_value(&branch).unwrap_or_default())
                    .with_project_id(project_id),
            );
        }
        Ok(branch)
    }

    /// Rename, move, protect or promote a branch.
    ///
    /// Promoting to default demotes the previous default and updates the
    /// project's `default_branch`; renaming the default branch does the same.
    pub async fn update_branch(
        &self,
        id: &str,
        req: UpdateBranchRequest,
    ) -> Result<Branch, StoreError> {
        validate_update_branch(&req).into_result()?;

        let mut state = self.write().await;
        let mut branch = state
            .branches
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityType::Branch, id))?;
        let mut project = state.require_project(&branch.project_id)?.clone();

        if let Some(name) = req.name {
            if name != branch.name {
                if state.find_branch(&branch.project_id, &name).is_some() {
                    return Err(StoreError::Consistency(format!(
                        "branch '{}' already exists",
                        name
                    )));
                }
                branch.name = name;
            }
        }
        if let Some(head) = req.head_commit_id {
            match state.commits.get(&head) {
                None => {
                    return Err(ValidationError {
                        errors: vec!["head_commit_id must reference an existing commit".into()],
                    }
                    .into())
                }
                Some(c) if c.project_id != branch.project_id => {
                    return Err(StoreError::Consistency(format!(
                        "commit {} belongs to another project",
                        c.id
                    )))
                }
                Some(_) => branch.head_commit_id = head,
            }
        }
        if let Some(protected) = req.is_protected {
            branch.is_protected = protected;
        }
        let promote = req.is_default == Some(true) && !branch.is_default;
        if promote {
            branch.is_default = true;
        }
        branch.last_activity = next_timestamp(branch.last_activity);
        validate_branch(&branch).into_result()?;

        let project_changed = branch.is_default && project.default_branch != branch.name;
        if project_changed {
            project.default_branch = branch.name.clone();
            project.updated_at = next_timestamp(project.updated_at);
        }

        let demoted: Vec<String> = if promote {
            state
                .branches
                .values_mut()
                .filter(|b| b.project_id == branch.project_id && b.is_default && b.id != branch.id)
                .map(|b| {
                    b.is_default = false;
                    b.id.clone()
                })
                .collect()
        } else {
            Vec::new()
        };
        state.branches.insert(branch.id.clone(), branch.clone());
        if project_changed {
            state.projects.insert(project.id.clone(), project.clone());
        }
        drop(state);

        if let Some(emitter) = self.emitter() {
            let project_id = Some(branch.project_id.clone());
            emitter.emit_updated(
                EntityType::Branch,
                &branch.id,
                serde_json::to_value(&branch).unwrap_or_default(),
                project_id.clone(),
            );
            for other in &demoted {
                emitter.emit_updated(
                    EntityType::Branch,
                    other,
                    serde_json::json!({ "is_default": false }),
                    project_id.clone(),
                );
            }
            if project_changed {
                emitter.emit_updated(
                    EntityType::Project,
                    &project.id,
                    serde_json::json!({ "default_branch": project.default_branch }),
                    project_id,
                );
            }
        }
        Ok(branch)
    }

    /// Remove a branch; its commits stay. The default branch is never
    /// removed. Returns whether a branch was removed.
    pub async fn delete_branch(&self, id: &str) -> bool {
        let mut state = self.write().await;
        match state.branches.get(id) {
            None => return false,
            Some(b) if b.is_default => {
                debug!(branch_id = %id, "Refusing to delete default branch");
                return false;
            }
            Some(_) => {}
        }
        let removed = state.branches.remove(id);
        drop(state);

        if let (Some(emitter), Some(b)) = (self.emitter(), &removed) {
            emitter.emit_deleted(EntityType::Branch, id, Some(b.project_id.clone()));
        }
        removed.is_some()
    }

    // ========================================================================
    // Merging
    // ========================================================================

    /// Merge an open pull request.
    ///
    /// Creates a merge commit on `to_branch` with parents
    /// `[to_branch head, from_branch head]`, advances `to_branch` and marks
    /// the pull request merged. Nothing is merged when `from_branch` head is
    /// already in `to_branch` history. Task-level conflicts are not detected.
    pub async fn merge_pull_request(
        &self,
        id: &str,
        author: CommitAuthor,
    ) -> Result<PullRequest, StoreError> {
        let mut state = self.write().await;
        let mut pr = state
            .pull_requests
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityType::PullRequest, id))?;

        if pr.status != PullRequestStatus::Open {
            return Err(StoreError::Consistency(format!(
                "pull request #{} is {}, only open pull requests can be merged",
                pr.number,
                pr.status.as_str()
            )));
        }

        let message = format!("Merge pull request #{} from {}", pr.number, pr.from_branch);
        validate_create_commit(&CreateCommitRequest {
            message: message.clone(),
            branch_name: pr.to_branch.clone(),
            author: author.clone(),
            task_changes: Vec::new(),
        })
        .into_result()?;

        let from = state
            .find_branch(&pr.project_id, &pr.from_branch)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityType::Branch, &pr.from_branch))?;
        let mut to = state
            .find_branch(&pr.project_id, &pr.to_branch)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityType::Branch, &pr.to_branch))?;
        let target_history = ancestors(
            &CommitDag::from_commits(state.project_commits(&pr.project_id)),
            &to.head_commit_id,
        );
        if target_history.contains(&from.head_commit_id) {
            return Err(StoreError::Consistency(format!(
                "'{}' has nothing to merge into '{}'",
                pr.from_branch, pr.to_branch
            )));
        }

        let latest_parent = [&to.head_commit_id, &from.head_commit_id]
            .iter()
            .filter_map(|c| state.commits.get(*c))
            .map(|c| c.timestamp)
            .max();
        let timestamp = latest_parent.map_or_else(Utc::now, next_timestamp);

        let commit = build_commit(
            &pr.project_id,
            &pr.to_branch,
            &message,
            author,
            vec![to.head_commit_id.clone(), from.head_commit_id.clone()],
            Vec::new(),
            timestamp,
        );
        validate_commit(&commit).into_result()?;

        to.head_commit_id = commit.id.clone();
        to.last_activity = commit.timestamp;

        pr.status = PullRequestStatus::Merged;
        pr.merged_at = Some(commit.timestamp);
        pr.merge_commit_id = Some(commit.id.clone());
        pr.updated_at = next_timestamp(pr.updated_at).max(commit.timestamp);
        validate_pull_request(&pr).into_result()?;

        state.commits.insert(commit.id.clone(), commit.clone());
        state.branches.insert(to.id.clone(), to.clone());
        state.pull_requests.insert(pr.id.clone(), pr.clone());
        drop(state);

        if let Some(emitter) = self.emitter() {
            let project_id = Some(pr.project_id.clone());
            emitter.emit_created(
                EntityType::Commit,
                &commit.id,
                serde_json::json!({ "message": commit.message, "parent_ids": commit.parent_ids }),
                project_id.clone(),
            );
            emitter.emit(
                CrudEvent::new(EntityType::Branch, CrudAction::Updated, &to.id)
                    .with_related(EntityType::Commit, &commit.id)
                    .with_project_id(&pr.project_id),
            );
            emitter.emit_updated(
                EntityType::PullRequest,
                &pr.id,
                serde_json::json!({ "status": pr.status.as_str(), "merge_commit_id": commit.id }),
                project_id,
            );
        }
        Ok(pr)
    }
}

#[cfg(test)]
mod tests {
    use crate::events::{CrudAction, EntityType, EventBus};
    use crate::models::*;
    use crate::store::{CommitFilter, EntityStore, ListOptions, StoreError};
    use crate::test_helpers::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_commit_advances_branch_head() {
        let store = EntityStore::new();
        let (project, root, main) = project_with_main(&store).await;

        let commit = store
            .create_commit(&project.id, commit_request("main", "Plan week"))
            .await
            .unwrap();

        assert_eq!(commit.parent_ids, vec![root.id.clone()]);
        let main = store.get_branch(&main.id).await.unwrap();
        assert_eq!(main.head_commit_id, commit.id);
        assert_eq!(main.last_activity, commit.timestamp);
    }

    #[tokio::test]
    async fn test_commit_on_unknown_branch_is_root() {
        let store = EntityStore::new();
        let (project, _, _) = project_with_main(&store).await;
        let branches_before = store.list_branches(&project.id).await.unwrap().len();

        let commit = store
            .create_commit(&project.id, commit_request("experiment", "Try it"))
            .await
            .unwrap();

        assert!(commit.parent_ids.is_empty());
        assert_eq!(store.list_branches(&project.id).await.unwrap().len(), branches_before);
    }

    #[tokio::test]
    async fn test_commit_hash_and_stats() {
        let store = EntityStore::new();
        let (project, _, _) = project_with_main(&store).await;
        let mut req = commit_request("main", "Two changes");
        req.task_changes = vec![
            task_change("task-a", ChangeType::Created),
            task_change("task-b", ChangeType::Modified),
        ];

        let commit = store.create_commit(&project.id, req).await.unwrap();
        assert_eq!(commit.hash.len(), 40);
        assert_eq!(commit.short_hash, &commit.hash[..7]);
        assert_eq!(commit.stats.tasks_added, 1);
        assert_eq!(commit.stats.tasks_modified, 1);
        assert_eq!(commit.stats.total_changes, 2);
    }

    #[tokio::test]
    async fn test_invalid_commit_request_stores_nothing() {
        let store = EntityStore::new();
        let (project, _, main) = project_with_main(&store).await;
        let mut req = commit_request("main", "");
        req.author.email = "not-an-email".into();

        let err = store.create_commit(&project.id, req).await.unwrap_err();
        assert_eq!(err.validation_errors().len(), 2);
        assert_eq!(store.store_stats().await.commits, 1);
        assert_eq!(store.get_branch(&main.id).await, Some(main));
    }

    #[tokio::test]
    async fn test_commit_in_missing_project() {
        let store = EntityStore::new();
        let err = store
            .create_commit("project-missing", commit_request("main", "x"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_concurrent_commits_keep_parent_links() {
        let store = Arc::new(EntityStore::new());
        let (project, _, main) = project_with_main(&store).await;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                let project_id = project.id.clone();
                tokio::spawn(async move {
                    store
                        .create_commit(&project_id, commit_request("main", &format!("step {}", i)))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // The branch history is one unbroken chain through all nine commits
        let history = store.get_branch_history(&main.id).await.unwrap();
        assert_eq!(history.len(), 9);
        for pair in history.windows(2) {
            assert_eq!(pair[0].parent_ids, vec![pair[1].id.clone()]);
        }
    }

    #[tokio::test]
    async fn test_list_commits_filters_by_author() {
        let store = EntityStore::new();
        let (project, _, _) = project_with_main(&store).await;
        let mut req = commit_request("main", "by bob");
        req.author = author("Bob");
        store.create_commit(&project.id, req).await.unwrap();

        let page = store
            .list_commits(
                &project.id,
                &ListOptions::with_filters(CommitFilter {
                    author: Some("BOB@".into()),
                    ..Default::default()
                }),
            )
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.data[0].author.name, "Bob");
    }

    #[tokio::test]
    async fn test_first_main_branch_becomes_default() {
        let store = EntityStore::new();
        let (project, _, main) = project_with_main(&store).await;
        assert!(main.is_default);
        assert_eq!(main.name, project.default_branch);
    }

    #[tokio::test]
    async fn test_create_branch_rules() {
        let store = EntityStore::new();
        let (project, root, _) = project_with_main(&store).await;

        let feature = store
            .create_branch(&project.id, branch_request("feature/x", &root.id))
            .await
            .unwrap();
        assert!(!feature.is_default);
        assert!(!feature.is_protected);
        assert_eq!(feature.head_commit_id, root.id);

        let dup = store
            .create_branch(&project.id, branch_request("feature/x", &root.id))
            .await;
        assert!(matches!(dup, Err(StoreError::Consistency(_))));

        let missing = store
            .create_branch(&project.id, branch_request("feature/y", "commit-missing"))
            .await
            .unwrap_err();
        assert_eq!(
            missing.validation_errors(),
            ["from_commit_id must reference an existing commit".to_string()]
        );
    }

    #[tokio::test]
    async fn test_create_branch_rejects_foreign_commit() {
        let store = EntityStore::new();
        let (_, foreign_root, _) = project_with_main(&store).await;
        let (other, _, _) = project_with_main(&store).await;

        let result = store
            .create_branch(&other.id, branch_request("stolen", &foreign_root.id))
            .await;
        assert!(matches!(result, Err(StoreError::Consistency(_))));
    }

    #[tokio::test]
    async fn test_promote_branch_demotes_previous_default() {
        let store = EntityStore::new();
        let (project, root, main) = project_with_main(&store).await;
        let dev = store
            .create_branch(&project.id, branch_request("develop", &root.id))
            .await
            .unwrap();

        let dev = store
            .update_branch(
                &dev.id,
                UpdateBranchRequest {
                    is_default: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(dev.is_default);
        assert!(!store.get_branch(&main.id).await.unwrap().is_default);
        assert_eq!(store.get_project(&project.id).await.unwrap().default_branch, "develop");
        let branches = store.list_branches(&project.id).await.unwrap();
        assert_eq!(branches[0].id, dev.id);
        assert_eq!(branches.iter().filter(|b| b.is_default).count(), 1);
    }

    #[tokio::test]
    async fn test_default_branch_cannot_be_deleted() {
        let store = EntityStore::new();
        let (project, root, main) = project_with_main(&store).await;
        let feature = store
            .create_branch(&project.id, branch_request("feature/x", &root.id))
            .await
            .unwrap();

        assert!(!store.delete_branch(&main.id).await);
        assert!(store.delete_branch(&feature.id).await);
        assert!(!store.delete_branch(&feature.id).await);
    }

    #[tokio::test]
    async fn test_merge_pull_request_creates_merge_commit() {
        let store = EntityStore::new();
        let (project, root, main) = project_with_main(&store).await;
        let feature = store
            .create_branch(&project.id, branch_request("feature/x", &root.id))
            .await
            .unwrap();
        let on_feature = store
            .create_commit(&project.id, commit_request("feature/x", "Feature work"))
            .await
            .unwrap();
        let on_main = store
            .create_commit(&project.id, commit_request("main", "Main work"))
            .await
            .unwrap();
        let pr = store
            .create_pull_request(&project.id, pull_request_request("feature/x", "main"))
            .await
            .unwrap();

        let merged = store.merge_pull_request(&pr.id, author("Alice")).await.unwrap();
        assert_eq!(merged.status, PullRequestStatus::Merged);
        assert!(merged.merged_at.is_some());

        let merge_id = merged.merge_commit_id.clone().unwrap();
        let merge = store.get_commit(&merge_id).await.unwrap();
        assert!(merge.is_merge());
        assert_eq!(merge.parent_ids, vec![on_main.id.clone(), on_feature.id.clone()]);
        assert_eq!(store.get_branch(&main.id).await.unwrap().head_commit_id, merge_id);
        assert_eq!(store.get_branch(&feature.id).await.unwrap().head_commit_id, on_feature.id);

        let again = store.merge_pull_request(&pr.id, author("Alice")).await;
        assert!(matches!(again, Err(StoreError::Consistency(_))));
    }

    #[tokio::test]
    async fn test_merge_rejects_branch_already_in_target() {
        let store = EntityStore::new();
        let (project, root, main) = project_with_main(&store).await;
        store
            .create_branch(&project.id, branch_request("feature/x", &root.id))
            .await
            .unwrap();
        let on_main = store
            .create_commit(&project.id, commit_request("main", "Main work"))
            .await
            .unwrap();
        let pr = store
            .create_pull_request(&project.id, pull_request_request("feature/x", "main"))
            .await
            .unwrap();

        let result = store.merge_pull_request(&pr.id, author("Alice")).await;
        assert!(matches!(result, Err(StoreError::Consistency(_))));
        assert_eq!(store.get_branch(&main.id).await.unwrap().head_commit_id, on_main.id);
        let pr = store.get_pull_request(&pr.id).await.unwrap();
        assert_eq!(pr.status, PullRequestStatus::Open);
        assert!(pr.merge_commit_id.is_none());
        assert_eq!(store.list_commits(&project.id, &ListOptions::default()).await.unwrap().pagination.total, 2);
    }

    #[tokio::test]
    async fn test_merge_rejects_draft_and_same_heads() {
        let store = EntityStore::new();
        let (project, root, _) = project_with_main(&store).await;
        store
            .create_branch(&project.id, branch_request("feature/x", &root.id))
            .await
            .unwrap();

        let same_heads = store
            .create_pull_request(&project.id, pull_request_request("feature/x", "main"))
            .await
            .unwrap();
        let result = store.merge_pull_request(&same_heads.id, author("Alice")).await;
        assert!(matches!(result, Err(StoreError::Consistency(_))));

        store
            .create_commit(&project.id, commit_request("feature/x", "Feature work"))
            .await
            .unwrap();
        let mut draft_req = pull_request_request("feature/x", "main");
        draft_req.draft = true;
        let draft = store.create_pull_request(&project.id, draft_req).await.unwrap();
        let result = store.merge_pull_request(&draft.id, author("Alice")).await;
        assert!(matches!(result, Err(StoreError::Consistency(_))));
        assert_eq!(
            store.get_pull_request(&draft.id).await.unwrap().status,
            PullRequestStatus::Draft
        );
    }

    #[tokio::test]
    async fn test_merge_with_missing_branch() {
        let store = EntityStore::new();
        let (project, _, _) = project_with_main(&store).await;
        let pr = store
            .create_pull_request(&project.id, pull_request_request("feature/gone", "main"))
            .await
            .unwrap();

        let result = store.merge_pull_request(&pr.id, author("Alice")).await;
        assert!(matches!(
            result,
            Err(StoreError::NotFound { entity: EntityType::Branch, ref id }) if id == "feature/gone"
        ));
        assert!(matches!(
            store.merge_pull_request("pr-missing", author("Alice")).await,
            Err(StoreError::NotFound { entity: EntityType::PullRequest, .. })
        ));
    }

    #[tokio::test]
    async fn test_update_branch_rename_and_move_head() {
        let store = EntityStore::new();
        let (project, root, _) = project_with_main(&store).await;
        let feature = store
            .create_branch(&project.id, branch_request("feature/x", &root.id))
            .await
            .unwrap();

        let collision = store
            .update_branch(
                &feature.id,
                UpdateBranchRequest {
                    name: Some("main".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(collision, Err(StoreError::Consistency(_))));

        let scratch = store
            .create_commit(&project.id, commit_request("scratch", "Loose idea"))
            .await
            .unwrap();
        let moved = store
            .update_branch(
                &feature.id,
                UpdateBranchRequest {
                    name: Some("feature/y".into()),
                    head_commit_id: Some(scratch.id.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.name, "feature/y");
        assert_eq!(moved.head_commit_id, scratch.id);
        assert!(moved.last_activity > feature.last_activity);

        let (_, foreign_root, _) = project_with_main(&store).await;
        let foreign = store
            .update_branch(
                &feature.id,
                UpdateBranchRequest {
                    head_commit_id: Some(foreign_root.id.clone()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(foreign, Err(StoreError::Consistency(_))));

        let missing = store
            .update_branch(
                &feature.id,
                UpdateBranchRequest {
                    head_commit_id: Some("commit-missing".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(
            missing.validation_errors(),
            ["head_commit_id must reference an existing commit".to_string()]
        );
        assert_eq!(store.get_branch(&feature.id).await.unwrap().head_commit_id, scratch.id);
    }

    #[tokio::test]
    async fn test_update_branch_cannot_clear_default() {
        let store = EntityStore::new();
        let (_, _, main) = project_with_main(&store).await;

        let err = store
            .update_branch(
                &main.id,
                UpdateBranchRequest {
                    is_default: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.validation_errors().len(), 1);
        assert!(store.get_branch(&main.id).await.unwrap().is_default);
    }

    #[tokio::test]
    async fn test_commit_emits_commit_and_branch_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let store = EntityStore::new().with_event_emitter(Arc::new(bus.clone()));
        let (project, _, main) = project_with_main(&store).await;
        while rx.try_recv().is_ok() {}

        let commit = store
            .create_commit(&project.id, commit_request("main", "Evented"))
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.entity_type, EntityType::Commit);
        assert_eq!(first.action, CrudAction::Created);
        assert_eq!(first.entity_id, commit.id);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.entity_type, EntityType::Branch);
        assert_eq!(second.entity_id, main.id);
        assert_eq!(second.related.unwrap().entity_id, commit.id);
    }
}
