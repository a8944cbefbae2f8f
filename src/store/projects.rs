//! Project operations

use super::query::{self, ListOptions, Page, ProjectFilter};
use super::{next_timestamp, EntityStore, StoreError};
use crate::events::EntityType;
use crate::fixtures::generate_id;
use crate::models::*;
use crate::validation::{validate_create_project, validate_project, validate_update_project};
use chrono::Utc;

impl EntityStore {
    pub async fn list_projects(&self, options: &ListOptions<ProjectFilter>) -> Page<Project> {
        let state = self.read().await;
        query::query(state.projects.values(), options)
    }

    pub async fn get_project(&self, id: &str) -> Option<Project> {
        self.read().await.projects.get(id).cloned()
    }

    pub async fn create_project(&self, req: CreateProjectRequest) -> Result<Project, StoreError> {
        validate_create_project(&req).into_result()?;

        let now = Utc::now();
        let project = Project {
            id: generate_id("project"),
            name: req.name.trim().to_string(),
            description: req.description,
            owner: req.owner,
            created_at: now,
            updated_at: now,
            is_private: req.is_private,
            default_branch: req.default_branch,
            star_count: 0,
            fork_count: 0,
        };
        validate_project(&project).into_result()?;

        self.write()
            .await
            .projects
            .insert(project.id.clone(), project.clone());

        if let Some(emitter) = self.emitter() {
            emitter.emit_created(
                EntityType::Project,
                &project.id,
                serde_json::to_value(&project).unwrap_or_default(),
                Some(project.id.clone()),
            );
        }
        Ok(project)
    }

    pub async fn update_project(
        &self,
        id: &str,
        req: UpdateProjectRequest,
    ) -> Result<Project, StoreError> {
        validate_update_project(&req).into_result()?;

        let mut state = self.write().await;
        let mut project = state
            .projects
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityType::Project, id))?;

        if let Some(name) = req.name {
            project.name = name.trim().to_string();
        }
        if let Some(description) = req.description {
            project.description = description;
        }
        if let Some(is_private) = req.is_private {
            project.is_private = is_private;
        }
        if let Some(stars) = req.star_count {
            project.star_count = stars;
        }
        if let Some(forks) = req.fork_count {
            project.fork_count = forks;
        }
        project.updated_at = next_timestamp(project.updated_at);
        validate_project(&project).into_result()?;

        state.projects.insert(project.id.clone(), project.clone());
        drop(state);

        if let Some(emitter) = self.emitter() {
            emitter.emit_updated(
                EntityType::Project,
                &project.id,
                serde_json::to_value(&project).unwrap_or_default(),
                Some(project.id.clone()),
            );
        }
        Ok(project)
    }

    /// Remove a project with all of its commits, branches, tasks, issues and
    /// pull requests. Returns whether the project existed.
    pub async fn delete_project(&self, id: &str) -> bool {
        let mut state = self.write().await;
        if state.projects.remove(id).is_none() {
            return false;
        }
        state.commits.retain(|_, c| c.project_id != id);
        state.branches.retain(|_, b| b.project_id != id);
        state.tasks.retain(|_, t| t.project_id != id);
        state.issues.retain(|_, i| i.project_id != id);
        state.pull_requests.retain(|_, pr| pr.project_id != id);
        drop(state);

        if let Some(emitter) = self.emitter() {
            emitter.emit_deleted(EntityType::Project, id, Some(id.to_string()));
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::store::query::SortKey;
    use crate::store::{EntityStore, ListOptions, ProjectFilter, SortOrder, StoreError};
    use crate::test_helpers::*;
    use crate::models::UpdateProjectRequest;

    #[tokio::test]
    async fn test_create_and_get_project() {
        let store = EntityStore::new();
        let project = store.create_project(create_project_request("Home")).await.unwrap();

        assert!(project.id.starts_with("project-"));
        assert_eq!(project.created_at, project.updated_at);
        assert_eq!(store.get_project(&project.id).await, Some(project));
    }

    #[tokio::test]
    async fn test_create_project_reports_every_problem() {
        let store = EntityStore::new();
        let mut req = create_project_request("");
        req.owner = String::new();

        let err = store.create_project(req).await.unwrap_err();
        let errors = err.validation_errors();
        assert!(errors.contains(&"name is required".to_string()));
        assert!(errors.contains(&"owner is required".to_string()));
        assert_eq!(store.store_stats().await.projects, 0);
    }

    #[tokio::test]
    async fn test_update_project_bumps_updated_at() {
        let store = EntityStore::new();
        let project = store.create_project(create_project_request("Home")).await.unwrap();

        let updated = store
            .update_project(
                &project.id,
                UpdateProjectRequest {
                    name: Some("Household".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.id, project.id);
        assert_eq!(updated.name, "Household");
        assert!(updated.updated_at > project.updated_at);
        assert_eq!(store.get_project(&project.id).await.unwrap().name, "Household");
    }

    #[tokio::test]
    async fn test_update_project_invalid_leaves_value_untouched() {
        let store = EntityStore::new();
        let project = store.create_project(create_project_request("Home")).await.unwrap();

        let result = store
            .update_project(
                &project.id,
                UpdateProjectRequest {
                    name: Some("  ".into()),
                    description: Some("changed".into()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(StoreError::Validation(_))));
        assert_eq!(store.get_project(&project.id).await, Some(project));
    }

    #[tokio::test]
    async fn test_update_missing_project() {
        let store = EntityStore::new();
        let err = store
            .update_project("project-missing", UpdateProjectRequest::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_project_twice() {
        let store = EntityStore::new();
        let project = store.create_project(create_project_request("Home")).await.unwrap();
        assert!(store.delete_project(&project.id).await);
        assert!(!store.delete_project(&project.id).await);
        assert!(store.get_project(&project.id).await.is_none());
    }

    #[tokio::test]
    async fn test_delete_project_cascades() {
        let store = seeded_store();
        let project_id = first_project_id(&store).await;

        assert!(store.delete_project(&project_id).await);
        let state = store.read().await;
        assert!(state.commits.values().all(|c| c.project_id != project_id));
        assert!(state.branches.values().all(|b| b.project_id != project_id));
        assert!(state.tasks.values().all(|t| t.project_id != project_id));
        assert!(state.issues.values().all(|i| i.project_id != project_id));
        assert!(state.pull_requests.values().all(|p| p.project_id != project_id));
    }

    #[tokio::test]
    async fn test_list_projects_search_and_sort() {
        let store = EntityStore::new();
        for name in ["Garden", "Groceries", "Taxes"] {
            store.create_project(create_project_request(name)).await.unwrap();
        }

        let page = store
            .list_projects(&ListOptions::with_filters(ProjectFilter {
                search: Some("GR".into()),
                ..Default::default()
            }))
            .await;
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.data[0].name, "Groceries");

        let by_name = store
            .list_projects(&ListOptions {
                sort_by: Some(SortKey::Name),
                sort_order: SortOrder::Asc,
                ..Default::default()
            })
            .await;
        let names: Vec<&str> = by_name.data.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Garden", "Groceries", "Taxes"]);
    }
}
