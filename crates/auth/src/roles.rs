use core::str::FromStr;

use serde::{Deserialize, Serialize};

use nesk_core::DomainError;

use crate::Principal;

/// Role lattice: `anonymous < user < staff < admin`.
///
/// The discriminants are the lattice levels and the derived `Ord` follows
/// them, so "staff or above" is always `role >= Role::Staff`. Call sites use
/// [`at_least`] instead of comparing role names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Anonymous = 0,
    User = 1,
    Staff = 2,
    Admin = 3,
}

impl Role {
    /// Roles that may be persisted on a user account.
    pub const ASSIGNABLE: [Role; 3] = [Role::User, Role::Staff, Role::Admin];

    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Anonymous => "anonymous",
            Role::User => "user",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }

    /// Parse a role that may be stored on a user account.
    ///
    /// `anonymous` is not assignable; neither is anything outside the lattice.
    pub fn parse_assignable(raw: &str) -> Result<Self, DomainError> {
        match raw.parse::<Role>() {
            Ok(role) if Self::ASSIGNABLE.contains(&role) => Ok(role),
            _ => Err(DomainError::validation("role is invalid")),
        }
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anonymous" => Ok(Role::Anonymous),
            "user" => Ok(Role::User),
            "staff" => Ok(Role::Staff),
            "admin" => Ok(Role::Admin),
            _ => Err(DomainError::validation("role is invalid")),
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single role comparison primitive.
pub fn at_least(principal: &Principal, minimum: Role) -> bool {
    principal.role() >= minimum
}
