//! Error type and result alias

use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// This is the primary error type crossing the engine boundary, providing:
/// - Standardized error codes via [`ErrorCode`]
/// - Human-readable messages
/// - Optional structured details (violated preconditions, resource ids, ...)
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (field-level errors, context, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    // ==================== Convenience constructors ====================

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{} not found", r))
            .with_detail("resource", r)
    }

    /// Create a contract-not-found error
    pub fn contract_not_found(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::with_message(ErrorCode::ContractNotFound, format!("Contract {} not found", id))
            .with_detail("contract_id", id)
    }

    /// Create an invalid-transition error carrying every violated precondition
    pub fn invalid_transition(
        action: impl Into<String>,
        violations: Vec<String>,
    ) -> Self {
        let action = action.into();
        Self::with_message(
            ErrorCode::InvalidTransition,
            format!("Transition '{}' rejected", action),
        )
        .with_detail("action", action)
        .with_detail("violations", violations)
    }

    /// Create a precondition-failed error for a single named precondition
    pub fn precondition_failed(code: ErrorCode, name: &str) -> Self {
        Self::new(code).with_detail("precondition", name)
    }

    /// Create a sequence conflict error
    pub fn sequence_conflict(number: impl Into<String>) -> Self {
        let n = number.into();
        Self::with_message(
            ErrorCode::SequenceConflict,
            format!("Business number {} already exists", n),
        )
        .with_detail("business_number", n)
    }

    /// Create an external failure error
    pub fn external(subsystem: &str, msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ExternalServiceFailure, msg)
            .with_detail("subsystem", subsystem)
    }

    /// Create a partial-failure error; `domain_rolled_back` tells the caller
    /// whether compensation restored the previous domain state
    pub fn partial_failure(operation: &str, domain_rolled_back: bool, cause: impl Into<String>) -> Self {
        Self::with_message(
            ErrorCode::PartialFailure,
            format!("Operation '{}' ran compensation: {}", operation, cause.into()),
        )
        .with_detail("operation", operation)
        .with_detail("domain_rolled_back", domain_rolled_back)
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::TransitionConflict, msg)
    }

    // ==================== Accessors ====================

    /// Violated precondition names, if this error carries any
    pub fn violations(&self) -> Vec<String> {
        self.details
            .as_ref()
            .and_then(|d| d.get("violations"))
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a partial failure left the domain rolled back
    pub fn domain_rolled_back(&self) -> Option<bool> {
        self.details
            .as_ref()
            .and_then(|d| d.get("domain_rolled_back"))
            .and_then(|v| v.as_bool())
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new() {
        let err = AppError::new(ErrorCode::NotFound);
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Resource not found");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_app_error_with_detail() {
        let err = AppError::validation("Missing required fields")
            .with_detail("field", "zone")
            .with_detail("reason", "required");

        assert_eq!(err.code, ErrorCode::ValidationFailed);
        let details = err.details.unwrap();
        assert_eq!(details.get("field").unwrap(), "zone");
        assert_eq!(details.get("reason").unwrap(), "required");
    }

    #[test]
    fn test_invalid_transition_carries_all_violations() {
        let err = AppError::invalid_transition(
            "finalize",
            vec!["meter_required".into(), "signatures_incomplete".into()],
        );
        assert_eq!(err.code, ErrorCode::InvalidTransition);
        assert_eq!(
            err.violations(),
            vec!["meter_required", "signatures_incomplete"]
        );
    }

    #[test]
    fn test_partial_failure_flag() {
        let err = AppError::partial_failure("finalize", true, "operations notify timed out");
        assert_eq!(err.code, ErrorCode::PartialFailure);
        assert_eq!(err.domain_rolled_back(), Some(true));

        let err = AppError::partial_failure("create", false, "meter provisioning failed");
        assert_eq!(err.domain_rolled_back(), Some(false));
    }

    #[test]
    fn test_http_status() {
        assert_eq!(
            AppError::new(ErrorCode::ContractNotFound).http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::sequence_conflict("C-P-TLS-25-00001").http_status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_display() {
        let err = AppError::with_message(ErrorCode::NotFound, "Contract not found");
        assert_eq!(format!("{}", err), "Contract not found");
    }
}
