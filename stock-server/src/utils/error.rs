//! Application-level error type
//!
//! Workers have no synchronous caller waiting on them, so errors surface as
//! store `sync_status` / application `status` plus log output; `AppError`
//! carries the classification needed for retry decisions on the way there.

use crate::db::repository::RepoError;
use crate::shopify::ShopifyError;

/// Application error enum
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    /// Remote catalog API failure. `retryable` distinguishes transient
    /// (timeouts, 5xx, rate limit) from permanent (auth revoked, 4xx).
    #[error("Remote API error: {message}")]
    Remote { message: String, retryable: bool },
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Whether re-running the failed operation can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Remote { retryable, .. } => *retryable,
            AppError::Database(_) => true,
            _ => false,
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            RepoError::Validation(msg) => AppError::Validation(msg),
            RepoError::Duplicate(msg) => AppError::Validation(msg),
            RepoError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl From<ShopifyError> for AppError {
    fn from(err: ShopifyError) -> Self {
        let retryable = err.is_retryable();
        AppError::Remote {
            message: err.to_string(),
            retryable,
        }
    }
}

/// Result type for application operations
pub type AppResult<T> = Result<T, AppError>;
