//! Server-side session registry.
//!
//! Tokens are opaque random strings; everything the server trusts about a
//! session (subject, validity window) lives here, never in the token.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use nesk_auth::{CredentialVerifier, SessionClaims, SessionError, validate_claims};
use nesk_core::UserId;

#[derive(Debug)]
pub struct SessionRegistry {
    ttl: Duration,
    sessions: RwLock<HashMap<String, SessionClaims>>,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a session for `user_id` (sign-in). Returns the token.
    pub fn issue(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String, SessionError> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| SessionError::Backend("session expiry out of range".into()))?;
        let token = Uuid::new_v4().simple().to_string();
        let claims = SessionClaims {
            user_id,
            issued_at: now,
            expires_at,
        };
        self.sessions
            .write()
            .map_err(|_| poisoned())?
            .insert(token.clone(), claims);
        Ok(token)
    }

    /// End a session (sign-out). Returns whether the token was live.
    pub fn revoke(&self, token: &str) -> Result<bool, SessionError> {
        Ok(self
            .sessions
            .write()
            .map_err(|_| poisoned())?
            .remove(token)
            .is_some())
    }

    /// End every session of a user.
    pub fn revoke_user(&self, user_id: &UserId) -> Result<usize, SessionError> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        let before = sessions.len();
        sessions.retain(|_, claims| &claims.user_id != user_id);
        Ok(before - sessions.len())
    }

    pub fn verify_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, SessionError> {
        let sessions = self.sessions.read().map_err(|_| poisoned())?;
        let Some(claims) = sessions.get(token) else {
            return Ok(None);
        };

        match validate_claims(claims, now) {
            Ok(()) => Ok(Some(claims.user_id)),
            Err(err) => {
                debug!(error = %err, "session rejected");
                Ok(None)
            }
        }
    }

    /// Drop sessions that are no longer valid at `now`.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, SessionError> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        let before = sessions.len();
        sessions.retain(|_, claims| validate_claims(claims, now).is_ok());
        Ok(before - sessions.len())
    }
}

impl CredentialVerifier for SessionRegistry {
    fn verify(&self, token: &str) -> Result<Option<UserId>, SessionError> {
        self.verify_at(token, Utc::now())
    }
}

fn poisoned() -> SessionError {
    SessionError::Backend("session registry lock poisoned".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_until_revoked() {
        let registry = SessionRegistry::new(Duration::hours(1));
        let user = UserId::new();
        let token = registry.issue(user, Utc::now()).unwrap();

        assert_eq!(registry.verify(&token).unwrap(), Some(user));
        assert!(registry.revoke(&token).unwrap());
        assert_eq!(registry.verify(&token).unwrap(), None);
        assert!(!registry.revoke(&token).unwrap());
    }

    #[test]
    fn expired_sessions_stop_verifying_and_get_purged() {
        let registry = SessionRegistry::new(Duration::minutes(30));
        let issued = Utc::now() - Duration::hours(1);
        let token = registry.issue(UserId::new(), issued).unwrap();

        assert_eq!(registry.verify_at(&token, Utc::now()).unwrap(), None);
        assert_eq!(registry.purge_expired(Utc::now()).unwrap(), 1);
    }

    #[test]
    fn expiry_past_the_calendar_is_an_error() {
        let registry = SessionRegistry::new(Duration::days(365));
        let err = registry.issue(UserId::new(), DateTime::<Utc>::MAX_UTC).unwrap_err();
        assert!(matches!(err, SessionError::Backend(_)));
    }

    #[test]
    fn unknown_tokens_are_not_errors() {
        let registry = SessionRegistry::new(Duration::hours(1));
        assert_eq!(registry.verify("nope").unwrap(), None);
    }

    #[test]
    fn revoke_user_ends_all_their_sessions() {
        let registry = SessionRegistry::new(Duration::hours(1));
        let user = UserId::new();
        let a = registry.issue(user, Utc::now()).unwrap();
        let b = registry.issue(user, Utc::now()).unwrap();
        let other = registry.issue(UserId::new(), Utc::now()).unwrap();

        assert_eq!(registry.revoke_user(&user).unwrap(), 2);
        assert_eq!(registry.verify(&a).unwrap(), None);
        assert_eq!(registry.verify(&b).unwrap(), None);
        assert!(registry.verify(&other).unwrap().is_some());
    }
}
