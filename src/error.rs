//! Error types for envelope-share
//!
//! One error enum covers the whole library. Variants map onto the caller-facing
//! taxonomy: unauthenticated, not found, forbidden, user errors and datastore
//! errors. Nothing in the library retries; errors surface to the caller as-is.

use thiserror::Error;

/// The main error type for envelope-share operations
#[derive(Error, Debug)]
pub enum EnvelopeError {
    /// No caller identity was supplied
    #[error("Not logged in")]
    Unauthenticated,

    /// Entity not found, or the caller is not a member of the profile that owns it
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// The caller is a member but lacks the role, or a membership policy forbids the action
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Caller-correctable input error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Duplicate entity errors
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: &'static str,
        identifier: String,
    },

    /// Referential-integrity refusal from the store
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// CSV import errors
    #[error("Import error: {0}")]
    Import(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl EnvelopeError {
    pub fn user_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "User",
            identifier: identifier.into(),
        }
    }

    pub fn profile_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Budget profile",
            identifier: identifier.into(),
        }
    }

    pub fn membership_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Membership",
            identifier: identifier.into(),
        }
    }

    pub fn envelope_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Envelope",
            identifier: identifier.into(),
        }
    }

    pub fn transaction_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Transaction",
            identifier: identifier.into(),
        }
    }

    pub fn invitation_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Invitation",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a forbidden error
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }

    /// Check if the caller can fix this by changing their input
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Duplicate { .. })
    }

    /// Check if this error came from the datastore
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io(_) | Self::Json(_))
    }
}

impl From<std::io::Error> for EnvelopeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for EnvelopeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<csv::Error> for EnvelopeError {
    fn from(err: csv::Error) -> Self {
        Self::Import(err.to_string())
    }
}

/// Result type alias for envelope-share operations
pub type EnvelopeResult<T> = Result<T, EnvelopeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthenticated_message() {
        assert_eq!(EnvelopeError::Unauthenticated.to_string(), "Not logged in");
    }

    #[test]
    fn test_not_found_error() {
        let err = EnvelopeError::envelope_not_found("Groceries");
        assert_eq!(err.to_string(), "Envelope not found: Groceries");
        assert!(err.is_not_found());
        assert!(!err.is_forbidden());
    }

    #[test]
    fn test_user_error_classification() {
        assert!(EnvelopeError::Validation("bad".into()).is_user_error());
        assert!(EnvelopeError::Duplicate {
            entity_type: "Invitation",
            identifier: "a@b.c".into(),
        }
        .is_user_error());
        assert!(!EnvelopeError::Forbidden("no".into()).is_user_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EnvelopeError = io_err.into();
        assert!(err.is_storage());
    }
}
