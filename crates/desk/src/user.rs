//! User accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use nesk_auth::{Identity, Role};
use nesk_core::{DomainError, DomainResult, EmailAddress, Entity, UserId};

/// A field that only server code may set.
///
/// Serializes like `T` but has no `Deserialize` impl, so no request body can
/// produce one. The only way in is [`ServerAssigned::assign`], called from
/// code paths that already passed authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServerAssigned<T>(T);

impl<T> ServerAssigned<T> {
    pub fn assign(value: T) -> Self {
        Self(value)
    }

    pub fn get(&self) -> &T {
        &self.0
    }
}

impl<T: Serialize> Serialize for ServerAssigned<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// A persisted user account. `email` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAccount {
    pub id: UserId,
    pub email: EmailAddress,
    pub name: Option<String>,
    pub role: ServerAssigned<Role>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    /// A new customer account. Accounts always start as `user`.
    pub fn customer(email: EmailAddress, name: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            email,
            name,
            role: ServerAssigned::assign(Role::User),
            email_verified: false,
            created_at: now,
        }
    }

    pub fn role(&self) -> Role {
        *self.role.get()
    }

    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id,
            email: self.email.clone(),
            role: self.role(),
        }
    }
}

impl Entity for UserAccount {
    type Id = UserId;

    fn id(&self) -> &UserId {
        &self.id
    }
}

/// Admin edit of a user's profile. There is no role field: roles change only
/// through the dedicated role operation, and an unknown `role` key is
/// rejected at deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
}

/// Validated profile changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidUserPatch {
    pub name: Option<String>,
    pub email: Option<EmailAddress>,
    pub email_verified: Option<bool>,
}

impl UpdateUserInput {
    pub fn validate(&self) -> DomainResult<ValidUserPatch> {
        Ok(ValidUserPatch {
            name: self
                .name
                .as_deref()
                .map(|n| DomainError::require_text("name", n))
                .transpose()?,
            email: self.email.as_deref().map(EmailAddress::parse).transpose()?,
            email_verified: self.email_verified,
        })
    }
}

impl ValidUserPatch {
    pub fn apply(&self, user: &mut UserAccount) {
        if let Some(name) = &self.name {
            user.name = Some(name.clone());
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(verified) = self.email_verified {
            user.email_verified = verified;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_accounts_are_plain_users() {
        let user = UserAccount::customer(
            EmailAddress::parse("jane@example.com").unwrap(),
            Some("Jane".into()),
            Utc::now(),
        );
        assert_eq!(user.role(), Role::User);
        assert_eq!(user.identity().role, Role::User);
    }

    #[test]
    fn role_serializes_but_cannot_be_supplied() {
        let user = UserAccount::customer(
            EmailAddress::parse("jane@example.com").unwrap(),
            None,
            Utc::now(),
        );
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["role"], "user");

        let raw = r#"{"name":"Jane","role":"admin"}"#;
        assert!(serde_json::from_str::<UpdateUserInput>(raw).is_err());
    }

    #[test]
    fn patch_validates_email() {
        let input = UpdateUserInput {
            email: Some("not-an-email".into()),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }
}
