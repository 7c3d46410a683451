//! Domain error taxonomy for the storage runtime.
//!
//! Every layer wraps and forwards the underlying cause rather than swallowing
//! it, preserving which entity and which operation failed. Backend-specific
//! error codes (e.g. a unique-violation SQLSTATE) are translated into this
//! taxonomy at the point closest to the driver.

use std::fmt;

use crate::driver::{DriverError, ScanError};

/// Storage runtime error type.
///
/// `NotFound` is a distinguished variant so callers of `find_one`/`find_by_id`
/// can branch on "absent" vs. "broken".
#[derive(Debug)]
pub enum StoreError {
    /// Zero rows where exactly one was expected.
    NotFound {
        /// Table whose lookup came up empty.
        entity: &'static str,
    },
    /// A required input entity or parameter was not supplied.
    NilModel(&'static str),
    /// Unique-constraint violation, translated from the driver's error code.
    AlreadyExists {
        entity: &'static str,
        source: DriverError,
    },
    /// Predicate or statement rendering failed; no partial execution occurred.
    QueryBuild { message: String },
    /// Driver-level failure while executing a statement.
    Execution {
        entity: &'static str,
        operation: &'static str,
        source: DriverError,
    },
    /// The operation is not available on this backend.
    Unsupported {
        operation: &'static str,
        reason: &'static str,
    },
    /// A fetched row could not be converted into the entity type.
    Scan {
        entity: &'static str,
        source: ScanError,
    },
}

impl StoreError {
    pub(crate) fn query_build(message: impl Into<String>) -> Self {
        StoreError::QueryBuild {
            message: message.into(),
        }
    }

    /// Returns `true` for the distinguished "zero rows" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Returns `true` when the failure was a unique-constraint violation.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { entity } => {
                write!(f, "{entity}: row not found")
            }
            StoreError::NilModel(what) => {
                write!(f, "required model is missing: {what}")
            }
            StoreError::AlreadyExists { entity, source } => {
                write!(f, "{entity}: row already exists: {source}")
            }
            StoreError::QueryBuild { message } => {
                write!(f, "failed to build query: {message}")
            }
            StoreError::Execution {
                entity,
                operation,
                source,
            } => {
                write!(f, "{entity}: {operation} failed: {source}")
            }
            StoreError::Unsupported { operation, reason } => {
                write!(f, "{operation} is not supported: {reason}")
            }
            StoreError::Scan { entity, source } => {
                write!(f, "{entity}: failed to scan row: {source}")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::AlreadyExists { source, .. } | StoreError::Execution { source, .. } => {
                Some(source)
            }
            StoreError::Scan { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_distinguished() {
        let err = StoreError::NotFound { entity: "users" };
        assert!(err.is_not_found());
        assert!(!err.is_already_exists());
        assert!(err.to_string().contains("row not found"));
    }

    #[test]
    fn execution_preserves_source() {
        let err = StoreError::Execution {
            entity: "users",
            operation: "find_many",
            source: DriverError::execution("connection reset"),
        };
        let source = std::error::Error::source(&err).expect("source");
        assert!(source.to_string().contains("connection reset"));
    }

    #[test]
    fn already_exists_from_unique_violation() {
        let err = StoreError::AlreadyExists {
            entity: "users",
            source: DriverError::unique_violation("duplicate key value (23505)"),
        };
        assert!(err.is_already_exists());
        assert!(err.to_string().contains("already exists"));
    }
}
