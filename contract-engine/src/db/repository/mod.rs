//! Repository Module
//!
//! Plain async functions over the SQLite pool, one module per table.
//! Mutations on `contract` are guarded by the optimistic `version` column;
//! a lost race surfaces as [`RepoError::VersionConflict`] so the caller can
//! re-read the fresh state and re-evaluate instead of overwriting.

pub mod contract;
pub mod cosigner;
pub mod sequence;

use shared::error::{AppError, ErrorCode};
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

    #[error("Version conflict: {0}")]
    VersionConflict(String),

    #[error("Cosigner share sum would reach {attempted}%, cap is 100%")]
    ShareExceeded { attempted: f64 },
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound(err.to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Duplicate(err.to_string())
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::with_message(ErrorCode::NotFound, msg),
            RepoError::Duplicate(msg) => AppError::with_message(ErrorCode::AlreadyExists, msg),
            RepoError::Database(msg) => AppError::database(msg),
            RepoError::Validation(msg) => AppError::validation(msg),
            RepoError::VersionConflict(msg) => AppError::conflict(msg),
            RepoError::ShareExceeded { attempted } => {
                AppError::new(ErrorCode::CosignerShareExceeded)
                    .with_detail("attempted_sum", attempted)
            }
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
