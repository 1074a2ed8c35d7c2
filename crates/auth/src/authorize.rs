//! Resource policy engine.
//!
//! [`authorize`] is the single source of truth for "may this principal do
//! this action to this resource". It is pure: no IO, no clock, no hidden
//! state, so it is safe to call speculatively and to call again under a lock
//! right before a mutation.

use serde::Serialize;

use nesk_core::{DomainError, EmailAddress, UserId};

use crate::actions::{Action, KbAction, TicketAction};
use crate::{Principal, Role, at_least};

/// Ownership metadata of a ticket, plus the email the caller claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    pub owner_id: UserId,
    pub owner_email: EmailAddress,
    /// Email supplied with an owner-scoped lookup. When absent, the
    /// principal's own email is used as the claim.
    pub claimed_email: Option<String>,
}

/// What the engine may know about the target resource.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourceDescriptor {
    pub ownership: Option<Ownership>,
    /// Publication state of a KB article.
    pub published: Option<bool>,
}

impl ResourceDescriptor {
    /// No instance metadata (type-level checks, listings, creation).
    pub fn none() -> Self {
        Self::default()
    }

    pub fn owned(
        owner_id: UserId,
        owner_email: EmailAddress,
        claimed_email: Option<String>,
    ) -> Self {
        Self {
            ownership: Some(Ownership {
                owner_id,
                owner_email,
                claimed_email,
            }),
            published: None,
        }
    }

    pub fn article(published: bool) -> Self {
        Self {
            ownership: None,
            published: Some(published),
        }
    }
}

/// Why a request was denied. Logged server-side, never returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenialReason {
    /// The principal's role is below the action's ceiling.
    InsufficientRole { required: Role, actual: Role },
    /// Owner-scoped access without a matching owner email.
    NotOwner,
    /// Owner-scoped action without ownership metadata to check.
    MissingOwnership,
    /// Article is not published and the principal cannot see drafts.
    Unpublished,
    /// The action does not apply to a principal of this kind
    /// (e.g. a signed-in principal creating a ticket as a guest).
    NotApplicable,
}

impl core::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DenialReason::InsufficientRole { required, actual } => {
                write!(f, "role '{actual}' is below required '{required}'")
            }
            DenialReason::NotOwner => f.write_str("claimed email does not match the owner"),
            DenialReason::MissingOwnership => f.write_str("ownership metadata missing"),
            DenialReason::Unpublished => f.write_str("article is not published"),
            DenialReason::NotApplicable => f.write_str("action not applicable to principal"),
        }
    }
}

/// Output of [`authorize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny { reason: DenialReason },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Collapse to the uniform domain error.
    pub fn into_result(self) -> Result<(), DomainError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny { .. } => Err(DomainError::Unauthorized),
        }
    }

    fn deny(reason: DenialReason) -> Self {
        Decision::Deny { reason }
    }
}

/// Decide whether `principal` may perform `action` on `resource`.
///
/// Ownership never lifts a principal above its role ceiling: owner-scoped
/// actions (`ReadOwn`, `ReplyOwn`) are distinct actions, and every other
/// ticket action is role-gated regardless of ownership.
pub fn authorize(principal: &Principal, action: Action, resource: &ResourceDescriptor) -> Decision {
    match action {
        Action::Ticket(TicketAction::CreateAsGuest) => {
            if principal.is_anonymous() {
                Decision::Allow
            } else {
                Decision::deny(DenialReason::NotApplicable)
            }
        }
        Action::Ticket(TicketAction::ReadOwn | TicketAction::ReplyOwn) => {
            if at_least(principal, Role::Staff) {
                return Decision::Allow;
            }
            owner_scoped(principal, resource)
        }
        Action::KbArticle(KbAction::ReadPublished) => match resource.published {
            Some(false) if !at_least(principal, Role::Staff) => {
                Decision::deny(DenialReason::Unpublished)
            }
            _ => Decision::Allow,
        },
        other => require(principal, minimum_role(other)),
    }
}

/// Minimum role for the purely role-gated actions.
///
/// Owner-scoped and guest-only actions are handled in [`authorize`] and map
/// to the lowest role that can ever be granted them.
pub fn minimum_role(action: Action) -> Role {
    match action {
        Action::Ticket(TicketAction::CreateAsGuest)
        | Action::Ticket(TicketAction::ReadOwn)
        | Action::Ticket(TicketAction::ReplyOwn)
        | Action::KbArticle(KbAction::ReadPublished) => Role::Anonymous,
        Action::Ticket(TicketAction::CreateAsSelf) => Role::User,
        Action::Ticket(
            TicketAction::ReadAny
            | TicketAction::UpdateStatus
            | TicketAction::UpdateAssignment
            | TicketAction::ReplyPublic
            | TicketAction::ReplyInternal,
        ) => Role::Staff,
        Action::KbArticle(_) => Role::Staff,
        Action::Category(_)
        | Action::Setting(_)
        | Action::EmailTemplate(_)
        | Action::TeamMember(_)
        | Action::User(_)
        | Action::Report(_) => Role::Admin,
    }
}

fn require(principal: &Principal, required: Role) -> Decision {
    if at_least(principal, required) {
        Decision::Allow
    } else {
        Decision::deny(DenialReason::InsufficientRole {
            required,
            actual: principal.role(),
        })
    }
}

fn owner_scoped(principal: &Principal, resource: &ResourceDescriptor) -> Decision {
    let Some(ownership) = &resource.ownership else {
        return Decision::deny(DenialReason::MissingOwnership);
    };

    let claim = ownership
        .claimed_email
        .as_deref()
        .or_else(|| principal.email().map(EmailAddress::as_str));

    match claim {
        Some(claim) if ownership.owner_email.matches(claim) => Decision::Allow,
        _ => Decision::deny(DenialReason::NotOwner),
    }
}

/// Whether the principal may see staff-only (internal) ticket notes.
pub fn can_see_internal(principal: &Principal) -> bool {
    at_least(principal, Role::Staff)
}

/// Records that may be staff-only.
pub trait InternalVisibility {
    fn is_internal(&self) -> bool;
}

/// Drop every internal record the principal may not see.
pub fn retain_visible<T: InternalVisibility>(principal: &Principal, items: &mut Vec<T>) {
    if !can_see_internal(principal) {
        items.retain(|item| !item.is_internal());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{AdminAction, ReportAction, UserAction};

    fn email(s: &str) -> EmailAddress {
        EmailAddress::parse(s).unwrap()
    }

    fn principal(role: Role) -> Principal {
        match role {
            Role::Anonymous => Principal::anonymous(),
            r => Principal::authenticated(UserId::new(), email("someone@example.com"), r),
        }
    }

    fn all_roles() -> [Role; 4] {
        [Role::Anonymous, Role::User, Role::Staff, Role::Admin]
    }

    fn allowed(role: Role, action: Action, resource: &ResourceDescriptor) -> bool {
        authorize(&principal(role), action, resource).is_allowed()
    }

    #[test]
    fn guest_creation_only_for_anonymous() {
        let action = Action::Ticket(TicketAction::CreateAsGuest);
        let none = ResourceDescriptor::none();
        assert!(allowed(Role::Anonymous, action, &none));
        for role in [Role::User, Role::Staff, Role::Admin] {
            assert_eq!(
                authorize(&principal(role), action, &none),
                Decision::Deny {
                    reason: DenialReason::NotApplicable
                }
            );
        }
    }

    #[test]
    fn create_as_self_requires_sign_in() {
        let action = Action::Ticket(TicketAction::CreateAsSelf);
        let none = ResourceDescriptor::none();
        assert!(!allowed(Role::Anonymous, action, &none));
        assert!(allowed(Role::User, action, &none));
        assert!(allowed(Role::Staff, action, &none));
        assert!(allowed(Role::Admin, action, &none));
    }

    #[test]
    fn read_own_requires_matching_email_below_staff() {
        let owner = UserId::new();
        let action = Action::Ticket(TicketAction::ReadOwn);

        let matching = ResourceDescriptor::owned(
            owner,
            email("jane@example.com"),
            Some(" Jane@Example.com ".into()),
        );
        let wrong = ResourceDescriptor::owned(
            owner,
            email("jane@example.com"),
            Some("mallory@example.com".into()),
        );

        assert!(allowed(Role::Anonymous, action, &matching));
        assert!(allowed(Role::User, action, &matching));
        assert!(!allowed(Role::Anonymous, action, &wrong));
        assert!(!allowed(Role::User, action, &wrong));
        assert!(allowed(Role::Staff, action, &wrong));
        assert!(allowed(Role::Admin, action, &wrong));
    }

    #[test]
    fn read_own_falls_back_to_principal_email() {
        let owner_email = email("sam@example.com");
        let sam = Principal::authenticated(UserId::new(), owner_email.clone(), Role::User);
        let resource = ResourceDescriptor::owned(UserId::new(), owner_email, None);

        let read_own = Action::Ticket(TicketAction::ReadOwn);
        assert!(authorize(&sam, read_own, &resource).is_allowed());
        assert_eq!(
            authorize(
                &Principal::anonymous(),
                Action::Ticket(TicketAction::ReadOwn),
                &resource
            ),
            Decision::Deny {
                reason: DenialReason::NotOwner
            }
        );
    }

    #[test]
    fn owner_scoped_without_metadata_is_denied() {
        let decision = authorize(
            &principal(Role::User),
            Action::Ticket(TicketAction::ReadOwn),
            &ResourceDescriptor::none(),
        );
        assert_eq!(
            decision,
            Decision::Deny {
                reason: DenialReason::MissingOwnership
            }
        );
    }

    #[test]
    fn ownership_never_lifts_role_ceiling() {
        let owner_email = email("owner@example.com");
        let owner = Principal::authenticated(UserId::new(), owner_email.clone(), Role::User);
        let own_ticket = ResourceDescriptor::owned(owner.id().unwrap(), owner_email, None);

        for action in [
            TicketAction::ReadAny,
            TicketAction::UpdateStatus,
            TicketAction::UpdateAssignment,
            TicketAction::ReplyPublic,
            TicketAction::ReplyInternal,
        ] {
            assert!(
                !authorize(&owner, Action::Ticket(action), &own_ticket).is_allowed(),
                "{action:?} must stay staff-only"
            );
        }
    }

    #[test]
    fn staff_ticket_and_kb_actions() {
        let none = ResourceDescriptor::none();
        let actions = [
            Action::Ticket(TicketAction::ReadAny),
            Action::Ticket(TicketAction::UpdateStatus),
            Action::Ticket(TicketAction::UpdateAssignment),
            Action::Ticket(TicketAction::ReplyPublic),
            Action::Ticket(TicketAction::ReplyInternal),
            Action::KbArticle(KbAction::ReadAny),
            Action::KbArticle(KbAction::Create),
            Action::KbArticle(KbAction::Update),
            Action::KbArticle(KbAction::Delete),
            Action::KbArticle(KbAction::Publish),
        ];
        for action in actions {
            assert!(!allowed(Role::Anonymous, action, &none));
            assert!(!allowed(Role::User, action, &none));
            assert!(allowed(Role::Staff, action, &none));
            assert!(allowed(Role::Admin, action, &none));
        }
    }

    #[test]
    fn published_articles_are_public_drafts_are_not() {
        let action = Action::KbArticle(KbAction::ReadPublished);
        for role in all_roles() {
            assert!(allowed(role, action, &ResourceDescriptor::article(true)));
            assert!(allowed(role, action, &ResourceDescriptor::none()));
        }
        assert!(!allowed(Role::Anonymous, action, &ResourceDescriptor::article(false)));
        assert!(!allowed(Role::User, action, &ResourceDescriptor::article(false)));
        assert!(allowed(Role::Staff, action, &ResourceDescriptor::article(false)));
    }

    #[test]
    fn admin_resources_are_admin_only() {
        let none = ResourceDescriptor::none();
        let crud = [
            AdminAction::Read,
            AdminAction::Create,
            AdminAction::Update,
            AdminAction::Delete,
        ];
        for a in crud {
            for action in [
                Action::Category(a),
                Action::Setting(a),
                Action::EmailTemplate(a),
                Action::TeamMember(a),
            ] {
                assert!(!allowed(Role::Staff, action, &none));
                assert!(allowed(Role::Admin, action, &none));
            }
        }
        for a in [
            UserAction::Read,
            UserAction::Update,
            UserAction::Delete,
            UserAction::UpdateRole,
        ] {
            assert!(!allowed(Role::User, Action::User(a), &none));
            assert!(!allowed(Role::Staff, Action::User(a), &none));
            assert!(allowed(Role::Admin, Action::User(a), &none));
        }
        for a in [
            ReportAction::Dashboard,
            ReportAction::TicketStats,
            ReportAction::ActivityFeed,
        ] {
            assert!(!allowed(Role::Staff, Action::Report(a), &none));
            assert!(allowed(Role::Admin, Action::Report(a), &none));
        }
    }

    #[test]
    fn denial_collapses_to_uniform_error() {
        let decision = authorize(
            &Principal::anonymous(),
            Action::Setting(AdminAction::Delete),
            &ResourceDescriptor::none(),
        );
        assert_eq!(decision.into_result(), Err(DomainError::Unauthorized));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        struct Note {
            internal: bool,
        }

        impl InternalVisibility for Note {
            fn is_internal(&self) -> bool {
                self.internal
            }
        }

        fn role_strategy() -> impl Strategy<Value = Role> {
            prop_oneof![
                Just(Role::Anonymous),
                Just(Role::User),
                Just(Role::Staff),
                Just(Role::Admin),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: below staff, internal replies are denied whatever the ownership claim.
            #[test]
            fn reply_internal_denied_below_staff(
                role in role_strategy(),
                claim in proptest::option::of("[a-z]{1,8}@example\\.com"),
            ) {
                let p = principal(role);
                let resource = ResourceDescriptor::owned(
                    UserId::new(),
                    email("someone@example.com"),
                    claim,
                );
                let decision =
                    authorize(&p, Action::Ticket(TicketAction::ReplyInternal), &resource);
                prop_assert_eq!(decision.is_allowed(), role >= Role::Staff);
            }

            /// Property: filtered listings never leak internal notes below staff.
            #[test]
            fn retain_visible_strips_internal_notes(
                role in role_strategy(),
                flags in proptest::collection::vec(any::<bool>(), 0..32),
            ) {
                let p = principal(role);
                let mut notes: Vec<Note> =
                    flags.iter().map(|&internal| Note { internal }).collect();
                retain_visible(&p, &mut notes);

                if role < Role::Staff {
                    prop_assert!(notes.iter().all(|n| !n.internal));
                    prop_assert_eq!(notes.len(), flags.iter().filter(|f| !**f).count());
                } else {
                    prop_assert_eq!(notes.len(), flags.len());
                }
            }

            /// Property: decisions are deterministic.
            #[test]
            fn authorize_is_deterministic(role in role_strategy(), published in any::<bool>()) {
                let p = principal(role);
                let resource = ResourceDescriptor::article(published);
                let action = Action::KbArticle(KbAction::ReadPublished);
                let first = authorize(&p, action, &resource);
                prop_assert_eq!(first, authorize(&p, action, &resource));
            }
        }
    }
}
