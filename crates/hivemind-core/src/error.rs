//! Domain-level error types.

use thiserror::Error;

/// Domain errors - business logic failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Validation(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    /// Backend failure, passed through as the storage layer reported it.
    #[error(transparent)]
    Storage(RepoError),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }
}

impl From<RepoError> for DomainError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound { entity, id } => DomainError::NotFound { entity, id },
            RepoError::Duplicate { entity, id } => {
                DomainError::Duplicate(format!("{entity} with id {id} already exists"))
            }
            other => DomainError::Storage(other),
        }
    }
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} with id {id} already exists")]
    Duplicate { entity: &'static str, id: String },
}

impl RepoError {
    pub fn post_not_found(id: impl Into<String>) -> Self {
        RepoError::NotFound {
            entity: "post",
            id: id.into(),
        }
    }

    pub fn comment_not_found(id: impl Into<String>) -> Self {
        RepoError::NotFound {
            entity: "comment",
            id: id.into(),
        }
    }

    pub fn parent_not_found(id: impl Into<String>) -> Self {
        RepoError::NotFound {
            entity: "parent comment",
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::NotFound { .. })
    }
}
