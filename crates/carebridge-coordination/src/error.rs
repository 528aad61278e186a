//! Caller-facing error taxonomy for the coordination services.
//!
//! Domain-authorization failures (doctor not assigned, sender not a
//! participant, reader not a participant) surface as Validation or
//! NotFound, never as a generic "forbidden": authorization here is a
//! domain relationship, not an identity check.

use carebridge_storage::StorageError;
use thiserror::Error;

/// Errors returned to callers of the coordination services.
#[derive(Debug, Error)]
pub enum CoordinationError {
    /// The request is missing data or names an unrecognized value, or a
    /// domain rule rejects it (e.g. "doctor is not assigned to this
    /// patient").
    #[error("Validation failed: {0}")]
    Validation(String),

    /// An entity the request depends on does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The request collides with the current protocol state, e.g. a
    /// duplicate acceptance from the same party on a pending consensus
    /// record.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A persistent infrastructure failure. Transient store conflicts are
    /// retried once before degrading to this.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoordinationError {
    /// Creates a new Validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a new NotFound error.
    #[must_use]
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a new Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a conflict error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns the error category label for logging/monitoring.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<StorageError> for CoordinationError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, id } => Self::NotFound { entity, id },
            StorageError::AlreadyExists { entity, id } => {
                Self::Conflict(format!("{entity} already exists: {id}"))
            }
            StorageError::InvalidRecord { message } => Self::Validation(message),
            StorageError::TransactionConflict { message }
            | StorageError::TransactionError { message }
            | StorageError::ConnectionError { message }
            | StorageError::Internal { message } => Self::Internal(message),
        }
    }
}

/// Convenience result type for coordination operations.
pub type Result<T> = std::result::Result<T, CoordinationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_mapping() {
        let err: CoordinationError = StorageError::not_found("Patient", "123").into();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Patient not found: 123");

        let err: CoordinationError =
            StorageError::invalid_record("feedback requires a closed episode").into();
        assert!(matches!(err, CoordinationError::Validation(_)));

        let err: CoordinationError = StorageError::transaction_conflict("retry me").into();
        assert!(matches!(err, CoordinationError::Internal(_)));
    }

    #[test]
    fn test_categories() {
        assert_eq!(CoordinationError::validation("x").category(), "validation");
        assert_eq!(
            CoordinationError::not_found("Chat", "y").category(),
            "not_found"
        );
        assert_eq!(CoordinationError::conflict("z").category(), "conflict");
    }
}
