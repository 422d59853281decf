//! # Error Types
//!
//! Domain-specific error types for bistro-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bistro-core errors (this file)                                        │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Field rules broken before a write              │
//! │                                                                         │
//! │  bistro-db errors (separate crate)                                     │
//! │  └── DbError          - Sessions, transactions, SQLite failures        │
//! │                                                                         │
//! │  Flow: ValidationError → DbError::Invalid → unit_of_work caller        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
///
/// Raised by pure domain helpers such as opening-hours parsing.
/// Persistence failures never show up here.
#[derive(Debug, Error)]
pub enum CoreError {
    /// `open_days` contains something that is not a weekday.
    ///
    /// ## When This Occurs
    /// - Typo in the stored list (`"MONDAY;TUSDAY"`)
    /// - Wrong separator (`"MONDAY,TUESDAY"`)
    #[error("Unknown weekday '{0}' in open days")]
    UnknownWeekday(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when an entity field doesn't meet requirements.
/// Checked by repositories right before the entity is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., country code, weekday list).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates a Required error for the given field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates an InvalidFormat error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::UnknownWeekday("TUSDAY".to_string());
        assert_eq!(err.to_string(), "Unknown weekday 'TUSDAY' in open days");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("street").to_string(),
            "street is required"
        );

        let err = ValidationError::TooLong {
            field: "reservation_number".to_string(),
            max: 10,
        };
        assert_eq!(
            err.to_string(),
            "reservation_number must be at most 10 characters"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("name").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
