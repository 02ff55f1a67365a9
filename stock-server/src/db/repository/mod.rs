//! Repository Module
//!
//! Data access as free functions over the shared pool. Uniqueness for every
//! natural key lives in the schema (UNIQUE indexes + ON CONFLICT), so
//! re-running any upsert converges instead of duplicating rows.

// Tenancy
pub mod store;

// Catalog mirror
pub mod inventory;
pub mod product;

// Rules domain
pub mod rule;

// Boundaries
pub mod notification;
pub mod webhook;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
