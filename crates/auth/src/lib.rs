//! `nesk-auth`: authentication/authorization boundary for the help desk.
//!
//! This crate is intentionally decoupled from HTTP and storage: sessions are
//! consumed through [`CredentialVerifier`] and [`UserDirectory`], and every
//! allow/deny decision goes through [`authorize`].

pub mod actions;
pub mod authorize;
pub mod claims;
pub mod principal;
pub mod roles;
pub mod session;

pub use actions::{Action, AdminAction, KbAction, ReportAction, TicketAction, UserAction};
pub use authorize::{
    Decision, DenialReason, InternalVisibility, Ownership, ResourceDescriptor, authorize,
    can_see_internal, retain_visible,
};
pub use claims::{SessionClaims, TokenValidationError, validate_claims};
pub use principal::Principal;
pub use roles::{Role, at_least};
pub use session::{
    CredentialVerifier, Identity, RequestCredentials, SessionError, SessionResolver,
    UserDirectory,
};
