//! Shared types for the contract lifecycle platform
//!
//! Common types used across crates: the unified error taxonomy,
//! domain models for contracts and cosigners, and small utilities.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCode};
