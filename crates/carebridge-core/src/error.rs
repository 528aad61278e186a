use thiserror::Error;

/// Core error types for CareBridge domain operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unrecognized patient status: {0}")]
    InvalidStatus(String),

    #[error("Unrecognized party role: {0}")]
    InvalidRole(String),

    #[error("Unrecognized gender: {0}")]
    InvalidGender(String),

    #[error("Unrecognized attachment kind: {0}")]
    InvalidAttachmentKind(String),

    #[error("Unrecognized message order: {0}")]
    InvalidOrder(String),

    #[error("Invalid pagination: {message}")]
    InvalidPage { message: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("UUID error: {0}")]
    UuidError(#[from] uuid::Error),
}

impl CoreError {
    /// Create a new InvalidPage error
    pub fn invalid_page(message: impl Into<String>) -> Self {
        Self::InvalidPage {
            message: message.into(),
        }
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidStatus(_)
            | Self::InvalidRole(_)
            | Self::InvalidGender(_)
            | Self::InvalidAttachmentKind(_)
            | Self::InvalidOrder(_)
            | Self::InvalidPage { .. }
            | Self::UuidError(_) => ErrorCategory::Validation,
            Self::JsonError(_) => ErrorCategory::Serialization,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Serialization,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Serialization => write!(f, "serialization"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_status_display() {
        let err = CoreError::InvalidStatus("archived".into());
        assert_eq!(err.to_string(), "Unrecognized patient status: archived");
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_invalid_page() {
        let err = CoreError::invalid_page("page must be >= 1");
        assert!(err.to_string().contains("page must be >= 1"));
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_uuid_error_conversion() {
        let uuid_err = uuid::Uuid::parse_str("not-a-uuid").unwrap_err();
        let core_err: CoreError = uuid_err.into();
        assert!(matches!(core_err, CoreError::UuidError(_)));
        assert_eq!(core_err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
        assert_eq!(ErrorCategory::Serialization.to_string(), "serialization");
    }
}
