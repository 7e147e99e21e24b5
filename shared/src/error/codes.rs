//! Unified error codes for the contract lifecycle platform
//!
//! This module defines all error codes used across the engine and any
//! transport layer mounted on top of it. Error codes are organized by
//! category:
//! - 0xxx: General errors
//! - 2xxx: Contract lifecycle errors
//! - 3xxx: Cosigner errors
//! - 4xxx: Numbering (sequence/identifier) errors
//! - 5xxx: External subsystem errors
//! - 6xxx: Saga / compensation errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 2xxx: Contract ====================
    /// Contract not found
    ContractNotFound = 2001,
    /// Requested lifecycle transition is not legal
    InvalidTransition = 2002,
    /// A concurrent transition won; caller must re-read and re-evaluate
    TransitionConflict = 2003,
    /// Contract already carries a business number
    ContractAlreadyFinalized = 2004,
    /// At least one active meter must be linked
    MeterRequired = 2005,
    /// Not all cosigners have signed
    SignaturesIncomplete = 2006,
    /// Zone cannot be encoded into the business-number alphabet
    ZoneNotEncodable = 2007,
    /// Total amount exceeds the ceiling for the contract kind
    AmountExceedsCeiling = 2008,

    // ==================== 3xxx: Cosigner ====================
    /// Cosigner not found
    CosignerNotFound = 3001,
    /// Cosigner share sum would exceed 100%
    CosignerShareExceeded = 3002,
    /// Contract kind forbids cosigners
    CosignerNotAllowed = 3003,
    /// Contract kind requires at least one cosigner
    CosignerRequired = 3004,
    /// Cosigner is signed and immutable without administrative override
    CosignerImmutable = 3005,

    // ==================== 4xxx: Numbering ====================
    /// Allocator produced a business number already present
    SequenceConflict = 4001,
    /// Business number does not match the published format
    InvalidBusinessNumber = 4002,

    // ==================== 5xxx: External ====================
    /// External subsystem call failed
    ExternalServiceFailure = 5001,
    /// External subsystem call timed out
    ExternalTimeout = 5002,
    /// Owner or cosigner is not active in the client registry
    ClientInactive = 5003,
    /// Meter is not available for linking
    MeterUnavailable = 5004,
    /// Subscription is not active
    SubscriptionInactive = 5005,

    // ==================== 6xxx: Saga ====================
    /// A saga ran compensation; domain outcome is flagged in details
    PartialFailure = 6001,
    /// Compensation itself failed; manual intervention required
    CompensationFailed = 6002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9003,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Contract
            ErrorCode::ContractNotFound => "Contract not found",
            ErrorCode::InvalidTransition => "Lifecycle transition is not legal",
            ErrorCode::TransitionConflict => {
                "Contract was modified concurrently; re-read and retry"
            }
            ErrorCode::ContractAlreadyFinalized => "Contract already has a business number",
            ErrorCode::MeterRequired => "At least one active meter must be linked",
            ErrorCode::SignaturesIncomplete => "Not all cosigners have signed",
            ErrorCode::ZoneNotEncodable => "Zone cannot be encoded into a business number",
            ErrorCode::AmountExceedsCeiling => "Total amount exceeds the contract kind ceiling",

            // Cosigner
            ErrorCode::CosignerNotFound => "Cosigner not found",
            ErrorCode::CosignerShareExceeded => "Cosigner share sum would exceed 100%",
            ErrorCode::CosignerNotAllowed => "Contract kind does not allow cosigners",
            ErrorCode::CosignerRequired => "Contract kind requires at least one cosigner",
            ErrorCode::CosignerImmutable => "Cosigner is signed and cannot be modified",

            // Numbering
            ErrorCode::SequenceConflict => "Allocated business number already exists",
            ErrorCode::InvalidBusinessNumber => "Business number format is invalid",

            // External
            ErrorCode::ExternalServiceFailure => "External subsystem call failed",
            ErrorCode::ExternalTimeout => "External subsystem call timed out",
            ErrorCode::ClientInactive => "Client is not active",
            ErrorCode::MeterUnavailable => "Meter is not available",
            ErrorCode::SubscriptionInactive => "Subscription is not active",

            // Saga
            ErrorCode::PartialFailure => "Operation ran compensation after a partial failure",
            ErrorCode::CompensationFailed => "Compensation failed; manual intervention required",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.code(), self.message())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid error code: {0}")]
pub struct InvalidErrorCode(pub u16);

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => ErrorCode::Success,
            1 => ErrorCode::Unknown,
            2 => ErrorCode::ValidationFailed,
            3 => ErrorCode::NotFound,
            4 => ErrorCode::AlreadyExists,
            5 => ErrorCode::InvalidRequest,
            6 => ErrorCode::InvalidFormat,
            7 => ErrorCode::RequiredField,
            8 => ErrorCode::ValueOutOfRange,

            2001 => ErrorCode::ContractNotFound,
            2002 => ErrorCode::InvalidTransition,
            2003 => ErrorCode::TransitionConflict,
            2004 => ErrorCode::ContractAlreadyFinalized,
            2005 => ErrorCode::MeterRequired,
            2006 => ErrorCode::SignaturesIncomplete,
            2007 => ErrorCode::ZoneNotEncodable,
            2008 => ErrorCode::AmountExceedsCeiling,

            3001 => ErrorCode::CosignerNotFound,
            3002 => ErrorCode::CosignerShareExceeded,
            3003 => ErrorCode::CosignerNotAllowed,
            3004 => ErrorCode::CosignerRequired,
            3005 => ErrorCode::CosignerImmutable,

            4001 => ErrorCode::SequenceConflict,
            4002 => ErrorCode::InvalidBusinessNumber,

            5001 => ErrorCode::ExternalServiceFailure,
            5002 => ErrorCode::ExternalTimeout,
            5003 => ErrorCode::ClientInactive,
            5004 => ErrorCode::MeterUnavailable,
            5005 => ErrorCode::SubscriptionInactive,

            6001 => ErrorCode::PartialFailure,
            6002 => ErrorCode::CompensationFailed,

            9001 => ErrorCode::InternalError,
            9002 => ErrorCode::DatabaseError,
            9003 => ErrorCode::ConfigError,

            other => return Err(InvalidErrorCode(other)),
        };
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::InvalidTransition.code(), 2002);
        assert_eq!(ErrorCode::SequenceConflict.code(), 4001);
        assert_eq!(ErrorCode::PartialFailure.code(), 6001);
        assert_eq!(ErrorCode::DatabaseError.code(), 9002);
    }

    #[test]
    fn test_round_trip_u16() {
        for code in [
            ErrorCode::Success,
            ErrorCode::ValidationFailed,
            ErrorCode::InvalidTransition,
            ErrorCode::CosignerShareExceeded,
            ErrorCode::SequenceConflict,
            ErrorCode::ExternalTimeout,
            ErrorCode::PartialFailure,
            ErrorCode::InternalError,
        ] {
            let raw: u16 = code.into();
            assert_eq!(ErrorCode::try_from(raw).unwrap(), code);
        }
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert_eq!(ErrorCode::try_from(1234), Err(InvalidErrorCode(1234)));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::InvalidTransition).unwrap();
        assert_eq!(json, "2002");
        let back: ErrorCode = serde_json::from_str("2002").unwrap();
        assert_eq!(back, ErrorCode::InvalidTransition);
    }
}
