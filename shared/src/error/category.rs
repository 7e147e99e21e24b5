//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Categories are determined by the leading digit of the error code:
/// - 0xxx: General errors
/// - 2xxx: Contract lifecycle errors
/// - 3xxx: Cosigner errors
/// - 4xxx: Numbering errors
/// - 5xxx: External subsystem errors
/// - 6xxx: Saga errors
/// - 9xxx: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Contract lifecycle errors (2xxx)
    Contract,
    /// Cosigner errors (3xxx)
    Cosigner,
    /// Numbering errors (4xxx)
    Numbering,
    /// External subsystem errors (5xxx)
    External,
    /// Saga / compensation errors (6xxx)
    Saga,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..2000 => Self::General,
            2000..3000 => Self::Contract,
            3000..4000 => Self::Cosigner,
            4000..5000 => Self::Numbering,
            5000..6000 => Self::External,
            6000..7000 => Self::Saga,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Contract => "contract",
            Self::Cosigner => "cosigner",
            Self::Numbering => "numbering",
            Self::External => "external",
            Self::Saga => "saga",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(8), ErrorCategory::General);

        assert_eq!(ErrorCategory::from_code(2001), ErrorCategory::Contract);
        assert_eq!(ErrorCategory::from_code(3002), ErrorCategory::Cosigner);
        assert_eq!(ErrorCategory::from_code(4001), ErrorCategory::Numbering);
        assert_eq!(ErrorCategory::from_code(5002), ErrorCategory::External);
        assert_eq!(ErrorCategory::from_code(6001), ErrorCategory::Saga);
        assert_eq!(ErrorCategory::from_code(9002), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(10000), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::NotFound.category(), ErrorCategory::General);
        assert_eq!(
            ErrorCode::InvalidTransition.category(),
            ErrorCategory::Contract
        );
        assert_eq!(
            ErrorCode::CosignerShareExceeded.category(),
            ErrorCategory::Cosigner
        );
        assert_eq!(
            ErrorCode::SequenceConflict.category(),
            ErrorCategory::Numbering
        );
        assert_eq!(ErrorCode::ExternalTimeout.category(), ErrorCategory::External);
        assert_eq!(ErrorCode::PartialFailure.category(), ErrorCategory::Saga);
        assert_eq!(ErrorCode::InternalError.category(), ErrorCategory::System);
    }

    #[test]
    fn test_category_serialize() {
        let json = serde_json::to_string(&ErrorCategory::Contract).unwrap();
        assert_eq!(json, "\"contract\"");
        let back: ErrorCategory = serde_json::from_str("\"saga\"").unwrap();
        assert_eq!(back, ErrorCategory::Saga);
    }
}
