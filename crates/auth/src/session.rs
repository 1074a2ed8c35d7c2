//! Session consumption: request credentials → [`Principal`].
//!
//! Issuing and storing sessions is the credential system's job; this module
//! only defines the verification contract and how a verified session becomes
//! a principal.

use thiserror::Error;
use tracing::debug;

use nesk_core::{EmailAddress, UserId};

use crate::{Principal, Role};

/// Upper bound on token length accepted for verification.
const MAX_TOKEN_LEN: usize = 256;

/// Unexpected backend failure while resolving a session.
///
/// "No session" is never an error; it is the anonymous principal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session backend unavailable: {0}")]
    Backend(String),
}

/// Transport-level credential material carried by a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCredentials {
    pub session_cookie: Option<String>,
    pub bearer_token: Option<String>,
}

impl RequestCredentials {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn cookie(token: impl Into<String>) -> Self {
        Self {
            session_cookie: Some(token.into()),
            bearer_token: None,
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            session_cookie: None,
            bearer_token: Some(token.into()),
        }
    }

    /// Non-blank tokens in the order they are tried: cookie, then header.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        [self.session_cookie.as_deref(), self.bearer_token.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Verifies an opaque session token.
pub trait CredentialVerifier: Send + Sync {
    /// `Ok(None)` for unknown, expired or revoked tokens.
    fn verify(&self, token: &str) -> Result<Option<UserId>, SessionError>;
}

/// Persisted identity of a user, as the authorization layer needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: EmailAddress,
    pub role: Role,
}

/// Read access to persisted user records.
pub trait UserDirectory: Send + Sync {
    fn identity(&self, user_id: &UserId) -> Result<Option<Identity>, SessionError>;
}

impl<T: CredentialVerifier + ?Sized> CredentialVerifier for std::sync::Arc<T> {
    fn verify(&self, token: &str) -> Result<Option<UserId>, SessionError> {
        (**self).verify(token)
    }
}

impl<T: UserDirectory + ?Sized> UserDirectory for std::sync::Arc<T> {
    fn identity(&self, user_id: &UserId) -> Result<Option<Identity>, SessionError> {
        (**self).identity(user_id)
    }
}

/// Resolves request credentials to a principal.
///
/// Resolution is a pure lookup: it never renews, extends or otherwise
/// mutates session state.
#[derive(Debug, Clone)]
pub struct SessionResolver<V, D> {
    verifier: V,
    directory: D,
}

impl<V, D> SessionResolver<V, D>
where
    V: CredentialVerifier,
    D: UserDirectory,
{
    pub fn new(verifier: V, directory: D) -> Self {
        Self {
            verifier,
            directory,
        }
    }

    pub fn resolve_principal(
        &self,
        credentials: &RequestCredentials,
    ) -> Result<Principal, SessionError> {
        self.resolve_session(credentials).map(|(principal, _)| principal)
    }

    /// The principal for the first token that resolves to a live user,
    /// together with that token. Anonymous with no token otherwise.
    pub fn resolve_session<'c>(
        &self,
        credentials: &'c RequestCredentials,
    ) -> Result<(Principal, Option<&'c str>), SessionError> {
        for token in credentials.tokens() {
            let principal = self.resolve_token(token)?;
            if !principal.is_anonymous() {
                return Ok((principal, Some(token)));
            }
        }
        Ok((Principal::anonymous(), None))
    }

    fn resolve_token(&self, token: &str) -> Result<Principal, SessionError> {
        if !well_formed(token) {
            debug!("malformed session token; resolving anonymous");
            return Ok(Principal::anonymous());
        }

        let Some(user_id) = self.verifier.verify(token)? else {
            debug!("session token did not verify; resolving anonymous");
            return Ok(Principal::anonymous());
        };

        self.principal_for(&user_id)
    }

    /// Re-read a principal's identity from the user record.
    ///
    /// Used right before a mutation so that a demoted or deleted user cannot
    /// act on a role it held when the request started.
    pub fn refresh(&self, principal: &Principal) -> Result<Principal, SessionError> {
        match principal.id() {
            Some(user_id) => self.principal_for(&user_id),
            None => Ok(Principal::anonymous()),
        }
    }

    fn principal_for(&self, user_id: &UserId) -> Result<Principal, SessionError> {
        match self.directory.identity(user_id)? {
            Some(identity) => Ok(Principal::authenticated(
                identity.user_id,
                identity.email,
                identity.role,
            )),
            None => {
                debug!(%user_id, "session refers to a missing user; resolving anonymous");
                Ok(Principal::anonymous())
            }
        }
    }
}

fn well_formed(token: &str) -> bool {
    token.len() <= MAX_TOKEN_LEN && token.chars().all(|c| c.is_ascii_graphic())
}
