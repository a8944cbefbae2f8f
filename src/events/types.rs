//! CRUD event types for store change notifications

use serde::{Deserialize, Serialize};
use std::fmt;

/// The type of entity that was mutated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Project,
    Commit,
    Branch,
    Task,
    Issue,
    IssueComment,
    PullRequest,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project => write!(f, "project"),
            Self::Commit => write!(f, "commit"),
            Self::Branch => write!(f, "branch"),
            Self::Task => write!(f, "task"),
            Self::Issue => write!(f, "issue"),
            Self::IssueComment => write!(f, "issue comment"),
            Self::PullRequest => write!(f, "pull request"),
        }
    }
}

/// The CRUD action performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrudAction {
    Created,
    Updated,
    Deleted,
}

/// An entity linked to the mutated one (e.g. the commit a branch now points at)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedEntity {
    pub entity_type: EntityType,
    pub entity_id: String,
}

/// A CRUD event emitted after a successful mutation
///
/// Must be Clone for `tokio::sync::broadcast`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrudEvent {
    /// The type of entity that was mutated
    pub entity_type: EntityType,
    /// The action performed
    pub action: CrudAction,
    /// The ID of the mutated entity
    pub entity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<RelatedEntity>,
    /// Optional payload with entity data (e.g. new status, title)
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
    /// ISO 8601 timestamp
    pub timestamp: String,
    /// Optional project ID for subscriber-side filtering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl CrudEvent {
    /// Create a new CrudEvent with the current timestamp
    pub fn new(entity_type: EntityType, action: CrudAction, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            action,
            entity_id: entity_id.into(),
            related: None,
            payload: serde_json::Value::Null,
            timestamp: chrono::Utc::now().to_rfc3339(),
            project_id: None,
        }
    }

    /// Set the related entity
    pub fn with_related(mut self, entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        self.related = Some(RelatedEntity {
            entity_type,
            entity_id: entity_id.into(),
        });
        self
    }

    /// Set the payload
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Set the project ID
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }
}

/// Sink for CrudEvents. Emitting must never block or fail the caller.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: CrudEvent);

    fn emit_created(
        &self,
        entity_type: EntityType,
        entity_id: &str,
        payload: serde_json::Value,
        project_id: Option<String>,
    ) {
        self.emit(build(entity_type, CrudAction::Created, entity_id, payload, project_id));
    }

    fn emit_updated(
        &self,
        entity_type: EntityType,
        entity_id: &str,
        payload: serde_json::Value,
        project_id: Option<String>,
    ) {
        self.emit(build(entity_type, CrudAction::Updated, entity_id, payload, project_id));
    }

    fn emit_deleted(&self, entity_type: EntityType, entity_id: &str, project_id: Option<String>) {
        self.emit(build(
            entity_type,
            CrudAction::Deleted,
            entity_id,
            serde_json::Value::Null,
            project_id,
        ));
    }
}

fn build(
    entity_type: EntityType,
    action: CrudAction,
    entity_id: &str,
    payload: serde_json::Value,
    project_id: Option<String>,
) -> CrudEvent {
    let event = CrudEvent::new(entity_type, action, entity_id).with_payload(payload);
    match project_id {
        Some(pid) => event.with_project_id(pid),
        None => event,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_snake_case() {
        assert_eq!(
            serde_json::to_string(&EntityType::PullRequest).unwrap(),
            "\"pull_request\""
        );
        assert_eq!(
            serde_json::to_string(&EntityType::IssueComment).unwrap(),
            "\"issue_comment\""
        );
        assert_eq!(EntityType::PullRequest.to_string(), "pull request");
    }

    #[test]
    fn test_crud_event_serde_roundtrip() {
        let event = CrudEvent::new(EntityType::Commit, CrudAction::Created, "commit-123")
            .with_payload(serde_json::json!({"message": "Plan the week"}))
            .with_project_id("project-456");

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: CrudEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.entity_type, EntityType::Commit);
        assert_eq!(deserialized.action, CrudAction::Created);
        assert_eq!(deserialized.entity_id, "commit-123");
        assert_eq!(deserialized.project_id.as_deref(), Some("project-456"));
        assert!(deserialized.related.is_none());
    }

    #[test]
    fn test_crud_event_with_related() {
        let event = CrudEvent::new(EntityType::Branch, CrudAction::Updated, "branch-1")
            .with_related(EntityType::Commit, "commit-2");

        let related = event.related.unwrap();
        assert_eq!(related.entity_type, EntityType::Commit);
        assert_eq!(related.entity_id, "commit-2");
    }

    #[test]
    fn test_crud_event_null_payload_omitted() {
        let event = CrudEvent::new(EntityType::Task, CrudAction::Deleted, "task-1");
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("\"payload\""));
        assert!(!json.contains("\"related\""));
        assert!(!json.contains("\"project_id\""));
    }
}
