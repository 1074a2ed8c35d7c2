//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// authorization, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or missing input. The message names the offending field.
    #[error("{0}")]
    Validation(String),

    /// The referenced entity does not exist (or is not visible to the caller).
    #[error("not found")]
    NotFound,

    /// Duplicate unique key or a referential-integrity block.
    #[error("{0}")]
    Conflict(String),

    /// The caller's role or ownership is insufficient.
    ///
    /// Deliberately carries no detail.
    #[error("unauthorized")]
    Unauthorized,

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Require a non-blank text field, returning it trimmed.
    pub fn require_text(field: &str, value: &str) -> DomainResult<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Self::validation(format!("{field} is required")));
        }
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_text_trims_and_names_field() {
        assert_eq!(DomainError::require_text("subject", "  Hi ").unwrap(), "Hi");

        let err = DomainError::require_text("subject", "   ").unwrap_err();
        assert_eq!(err, DomainError::Validation("subject is required".into()));
        assert_eq!(err.to_string(), "subject is required");
    }

    #[test]
    fn unauthorized_message_is_generic() {
        assert_eq!(DomainError::Unauthorized.to_string(), "unauthorized");
    }
}
