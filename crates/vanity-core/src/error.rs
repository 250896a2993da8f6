//! Error types for Vanity.

use strum::{Display, IntoStaticStr};
use thiserror::Error;

/// Why a piece of caller input was rejected.
///
/// The snake_case rendering of each variant is a stable reason code that
/// adapters may map to localized messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ValidationReason {
    TooShort,
    TooLong,
    InvalidCharacters,
    ForbiddenWord,
    RankNameCollision,
    InvalidColorFormat,
    UnknownOption,
    OptionUnavailable,
    CapabilityMissing,
    WrongKind,
}

/// Why a request clashed with current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ConflictReason {
    PendingRequestExists,
    CooldownActive,
    NicknameCooldown,
    InvalidState,
}

/// A shared error type for every Vanity crate.
///
/// Validation and conflict errors are returned to callers as-is and never
/// retried. Store errors are retried by the persistence layer before they
/// surface. Config errors abort one file's load and keep the prior state.
#[derive(Error, Debug, Clone)]
pub enum VanityError {
    /// Caller input failed a validation rule.
    #[error("Validation failed ({reason}): {message}")]
    Validation {
        reason: ValidationReason,
        message: String,
    },

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// The request conflicts with the current state of an entity.
    #[error("Conflict ({reason}): {message}")]
    Conflict {
        reason: ConflictReason,
        message: String,
    },

    /// Backing store failure (I/O, timeout, driver error)
    #[error("Store error: {0}")]
    Store(String),

    /// Malformed declarative configuration
    #[error("Configuration error in {file}: {message}")]
    Config { file: String, message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl VanityError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    pub fn validation(reason: ValidationReason, message: impl Into<String>) -> Self {
        Self::Validation {
            reason,
            message: message.into(),
        }
    }

    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    pub fn conflict(reason: ConflictReason, message: impl Into<String>) -> Self {
        Self::Conflict {
            reason,
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    pub fn config(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Store and I/O failures are transient; everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Io { .. })
    }

    /// Returns the validation reason, if this is a validation error.
    pub fn validation_reason(&self) -> Option<ValidationReason> {
        match self {
            Self::Validation { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Returns the conflict reason, if this is a conflict error.
    pub fn conflict_reason(&self) -> Option<ConflictReason> {
        match self {
            Self::Conflict { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Stable, machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { reason, .. } => (*reason).into(),
            Self::Conflict { reason, .. } => (*reason).into(),
            Self::NotFound { .. } => "not_found",
            Self::Store(_) => "store_error",
            Self::Config { .. } => "config_error",
            Self::Serialization { .. } => "serialization_error",
            Self::Io { .. } => "io_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for VanityError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<toml::de::Error> for VanityError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for VanityError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, VanityError>`.
pub type Result<T> = std::result::Result<T, VanityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes_are_snake_case() {
        let err = VanityError::validation(ValidationReason::InvalidColorFormat, "bad");
        assert_eq!(err.code(), "invalid_color_format");

        let err = VanityError::conflict(ConflictReason::PendingRequestExists, "dup");
        assert_eq!(err.code(), "pending_request_exists");
        assert_eq!(
            err.to_string(),
            "Conflict (pending_request_exists): dup"
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(VanityError::store("down").is_retryable());
        assert!(!VanityError::not_found("profile", "x").is_retryable());
        assert!(
            !VanityError::validation(ValidationReason::TooLong, "long").is_retryable()
        );
    }
}
