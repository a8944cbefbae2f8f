//! Errors returned by store mutations

use crate::events::EntityType;
use crate::validation::ValidationError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Payload or merged result violates one or more rules
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityType, id: String },

    /// Cross-entity rule violated (foreign commit, duplicate branch name, ...)
    #[error("consistency violation: {0}")]
    Consistency(String),
}

impl StoreError {
    pub fn not_found(entity: EntityType, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Messages of a validation failure, empty for other kinds
    pub fn validation_errors(&self) -> &[String] {
        match self {
            Self::Validation(e) => &e.errors,
            _ => &[],
        }
    }
}
