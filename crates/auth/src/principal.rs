use serde::Serialize;

use nesk_core::{EmailAddress, UserId};

use crate::Role;

/// The resolved actor for one request.
///
/// Constructed fresh per request by the session layer. There is no
/// `Deserialize` impl: a principal (and its role) is never built from client
/// input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    id: Option<UserId>,
    role: Role,
    email: Option<EmailAddress>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self {
            id: None,
            role: Role::Anonymous,
            email: None,
        }
    }

    /// A signed-in principal. An `Anonymous` role yields the anonymous principal.
    pub fn authenticated(id: UserId, email: EmailAddress, role: Role) -> Self {
        if role == Role::Anonymous {
            return Self::anonymous();
        }
        Self {
            id: Some(id),
            role,
            email: Some(email),
        }
    }

    pub fn id(&self) -> Option<UserId> {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn email(&self) -> Option<&EmailAddress> {
        self.email.as_ref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_none()
    }
}

impl Default for Principal {
    fn default() -> Self {
        Self::anonymous()
    }
}
