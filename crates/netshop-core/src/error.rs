//! # Error Types
//!
//! Domain-specific error types for netshop-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  netshop-core errors (this file)                                       │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── QueryError       - Strict query build failures                    │
//! │                                                                         │
//! │  netshop-db errors (separate crate)                                    │
//! │  └── DbError          - Database and transaction failures              │
//! │                                                                         │
//! │  Flow: ValidationError/QueryError → DbError → request handler          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any SQL runs; surfaced to the caller unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
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

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., malformed email, metadata that isn't JSON).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Query Error
// =============================================================================

/// Errors from [`SelectQuery::build_strict`](crate::query::SelectQuery::build_strict).
///
/// The lenient `build()` never fails; these only exist so the repositories can
/// refuse to send a query whose placeholders would not line up with its
/// arguments.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A `$name` placeholder appears in the query text but was never bound.
    #[error("Unbound query parameter: ${name}")]
    UnboundParameter { name: String },
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = QueryError::UnboundParameter {
            name: "customerId".to_string(),
        };
        assert_eq!(err.to_string(), "Unbound query parameter: $customerId");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "delivery.city".to_string(),
        };
        assert_eq!(err.to_string(), "delivery.city is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }
}
