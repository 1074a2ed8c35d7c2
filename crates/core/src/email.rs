//! Email normalization.
//!
//! Email addresses are the join key between a guest and the tickets they own,
//! so every comparison goes through [`normalize_email`].

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Lower-case and trim an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A normalized, non-empty email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Normalize and validate an address.
    ///
    /// Only a minimal shape check is done (`local@domain`); deliverability is
    /// the notifier's concern.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let normalized = normalize_email(raw);
        if normalized.is_empty() {
            return Err(DomainError::validation("email is required"));
        }
        match normalized.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                Ok(Self(normalized))
            }
            _ => Err(DomainError::validation("email is invalid")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against an unnormalized address.
    pub fn matches(&self, raw: &str) -> bool {
        self.0 == normalize_email(raw)
    }
}

impl ValueObject for EmailAddress {}

impl core::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_email("  Jane@Example.com "), "jane@example.com");

        let email = EmailAddress::parse("Jane@Example.com").unwrap();
        assert_eq!(email.as_str(), "jane@example.com");
        assert!(email.matches(" JANE@example.COM"));
    }

    #[test]
    fn rejects_blank_and_malformed() {
        assert_eq!(
            EmailAddress::parse("  ").unwrap_err(),
            DomainError::validation("email is required")
        );
        assert!(EmailAddress::parse("no-at-sign").is_err());
        assert!(EmailAddress::parse("@example.com").is_err());
    }

    #[test]
    fn deserialization_normalizes() {
        let email: EmailAddress = serde_json::from_str("\"Bob@Example.COM\"").unwrap();
        assert_eq!(email.as_str(), "bob@example.com");
        assert!(serde_json::from_str::<EmailAddress>("\"\"").is_err());
    }
}
