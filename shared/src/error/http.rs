//! HTTP status mapping for error codes
//!
//! The engine itself carries no transport layer, but the identifier and
//! error contracts are consumed by REST frontends; the mapping lives here
//! so every transport agrees on it.

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::Success => StatusCode::OK,

            // 400: structural/validation failures, never mutate state
            ErrorCode::ValidationFailed
            | ErrorCode::InvalidRequest
            | ErrorCode::InvalidFormat
            | ErrorCode::RequiredField
            | ErrorCode::ValueOutOfRange
            | ErrorCode::ZoneNotEncodable
            | ErrorCode::AmountExceedsCeiling
            | ErrorCode::InvalidBusinessNumber => StatusCode::BAD_REQUEST,

            // 404
            ErrorCode::NotFound | ErrorCode::ContractNotFound | ErrorCode::CosignerNotFound => {
                StatusCode::NOT_FOUND
            }

            // 409: conflicts, retryable after re-reading current state
            ErrorCode::AlreadyExists
            | ErrorCode::TransitionConflict
            | ErrorCode::ContractAlreadyFinalized
            | ErrorCode::SequenceConflict
            | ErrorCode::CosignerShareExceeded
            | ErrorCode::CosignerImmutable => StatusCode::CONFLICT,

            // 422: the state machine or business rules rejected the request
            ErrorCode::InvalidTransition
            | ErrorCode::MeterRequired
            | ErrorCode::SignaturesIncomplete
            | ErrorCode::CosignerNotAllowed
            | ErrorCode::CosignerRequired
            | ErrorCode::ClientInactive
            | ErrorCode::MeterUnavailable
            | ErrorCode::SubscriptionInactive => StatusCode::UNPROCESSABLE_ENTITY,

            // 502/504: downstream subsystems
            ErrorCode::ExternalServiceFailure | ErrorCode::PartialFailure => {
                StatusCode::BAD_GATEWAY
            }
            ErrorCode::ExternalTimeout => StatusCode::GATEWAY_TIMEOUT,

            // 500
            ErrorCode::Unknown
            | ErrorCode::CompensationFailed
            | ErrorCode::InternalError
            | ErrorCode::DatabaseError
            | ErrorCode::ConfigError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            ErrorCode::ValidationFailed.http_status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_not_found_maps_to_404() {
        assert_eq!(
            ErrorCode::ContractNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_conflicts_map_to_409() {
        assert_eq!(
            ErrorCode::SequenceConflict.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::TransitionConflict.http_status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_domain_rejections_map_to_422() {
        assert_eq!(
            ErrorCode::InvalidTransition.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::MeterRequired.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_external_failures() {
        assert_eq!(
            ErrorCode::ExternalServiceFailure.http_status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ErrorCode::ExternalTimeout.http_status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
