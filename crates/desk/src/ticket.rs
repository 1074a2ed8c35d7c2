//! Tickets and ticket replies.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nesk_auth::InternalVisibility;
use nesk_core::{
    CategoryId, DomainError, DomainResult, EmailAddress, Entity, PriorityId, ReplyId,
    TeamMemberId, TicketId, UserId,
};

// ─────────────────────────────────────────────────────────────────────────────
// Status
// ─────────────────────────────────────────────────────────────────────────────

/// Ticket lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    WaitingCustomer,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 5] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::WaitingCustomer,
        TicketStatus::Resolved,
        TicketStatus::Closed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::WaitingCustomer => "waiting_customer",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::validation("status is invalid"))
    }
}

impl core::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ticket
// ─────────────────────────────────────────────────────────────────────────────

/// A support ticket. `user_id` is the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub subject: String,
    pub status: TicketStatus,
    pub user_id: UserId,
    pub category_id: Option<CategoryId>,
    pub priority_id: Option<PriorityId>,
    pub assigned_to: Option<TeamMemberId>,
    pub opened_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

impl Ticket {
    pub fn open(
        owner: UserId,
        subject: String,
        category_id: Option<CategoryId>,
        priority_id: Option<PriorityId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TicketId::new(),
            subject,
            status: TicketStatus::Open,
            user_id: owner,
            category_id,
            priority_id,
            assigned_to: None,
            opened_at: now,
            last_update: now,
        }
    }

    /// Set the status. Returns `false` (and leaves the ticket untouched)
    /// when the status is already `status`.
    pub fn set_status(&mut self, status: TicketStatus, now: DateTime<Utc>) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        self.last_update = now;
        true
    }

    pub fn set_priority(&mut self, priority_id: Option<PriorityId>, now: DateTime<Utc>) -> bool {
        if self.priority_id == priority_id {
            return false;
        }
        self.priority_id = priority_id;
        self.last_update = now;
        true
    }

    pub fn set_category(&mut self, category_id: Option<CategoryId>, now: DateTime<Utc>) -> bool {
        if self.category_id == category_id {
            return false;
        }
        self.category_id = category_id;
        self.last_update = now;
        true
    }

    pub fn assign(&mut self, member: Option<TeamMemberId>, now: DateTime<Utc>) -> bool {
        if self.assigned_to == member {
            return false;
        }
        self.assigned_to = member;
        self.last_update = now;
        true
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_update = now;
    }
}

impl Entity for Ticket {
    type Id = TicketId;

    fn id(&self) -> &TicketId {
        &self.id
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Replies
// ─────────────────────────────────────────────────────────────────────────────

/// Who wrote a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorType {
    Customer,
    Staff,
}

/// A message on a ticket. Internal replies are staff-only notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketReply {
    pub id: ReplyId,
    pub ticket_id: TicketId,
    pub author_id: UserId,
    pub author_type: AuthorType,
    pub message: String,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

impl TicketReply {
    /// A customer-authored reply. Always public.
    pub fn from_customer(
        ticket_id: TicketId,
        author_id: UserId,
        message: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReplyId::new(),
            ticket_id,
            author_id,
            author_type: AuthorType::Customer,
            message,
            is_internal: false,
            created_at: now,
        }
    }

    pub fn from_staff(
        ticket_id: TicketId,
        author_id: UserId,
        message: String,
        is_internal: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReplyId::new(),
            ticket_id,
            author_id,
            author_type: AuthorType::Staff,
            message,
            is_internal,
            created_at: now,
        }
    }
}

impl Entity for TicketReply {
    type Id = ReplyId;

    fn id(&self) -> &ReplyId {
        &self.id
    }
}

impl InternalVisibility for TicketReply {
    fn is_internal(&self) -> bool {
        self.is_internal
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inputs
// ─────────────────────────────────────────────────────────────────────────────

/// Ticket submission form.
///
/// `name`/`email` identify a guest; they are ignored for signed-in callers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTicketInput {
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub priority_id: Option<PriorityId>,
}

/// Validated ticket content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketContent {
    pub subject: String,
    pub message: String,
}

impl CreateTicketInput {
    pub fn validate_content(&self) -> DomainResult<TicketContent> {
        Ok(TicketContent {
            subject: DomainError::require_text("subject", &self.subject)?,
            message: DomainError::require_text("message", &self.message)?,
        })
    }

    /// Guest identity: non-empty name and a normalized email.
    pub fn validate_guest(&self) -> DomainResult<(String, EmailAddress)> {
        let name =
            DomainError::require_text("name", self.name.as_deref().unwrap_or_default())?;
        let email = EmailAddress::parse(self.email.as_deref().unwrap_or_default())?;
        Ok((name, email))
    }
}

/// A reply body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplyInput {
    pub message: String,
    #[serde(default)]
    pub is_internal: bool,
}

impl ReplyInput {
    pub fn validate(&self) -> DomainResult<String> {
        DomainError::require_text("message", &self.message)
    }
}

/// Staff ticket list filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TicketFilters {
    #[serde(default)]
    pub status: Option<String>,
    /// Priority name, case-insensitive.
    #[serde(default)]
    pub priority: Option<String>,
    /// Category name, case-insensitive.
    #[serde(default)]
    pub category: Option<String>,
    /// Free text over subject (case-insensitive) and id.
    #[serde(default)]
    pub search: Option<String>,
}

impl TicketFilters {
    pub fn status(&self) -> DomainResult<Option<TicketStatus>> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }

    /// Match the text search against a ticket.
    pub fn matches_search(&self, ticket: &Ticket) -> bool {
        let search = self.search.as_deref().map(str::trim);
        let Some(search) = search.filter(|s| !s.is_empty()) else {
            return true;
        };
        ticket
            .subject
            .to_lowercase()
            .contains(&search.to_lowercase())
            || ticket.id.to_string().contains(search)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn status_parses_closed_set() {
        for status in TicketStatus::ALL {
            assert_eq!(status.as_str().parse::<TicketStatus>().unwrap(), status);
        }
        assert_eq!(
            "reopened".parse::<TicketStatus>().unwrap_err(),
            DomainError::validation("status is invalid")
        );
    }

    #[test]
    fn set_status_is_idempotent() {
        let mut ticket = Ticket::open(UserId::new(), "Login issue".into(), None, None, now());
        assert_eq!(ticket.status, TicketStatus::Open);

        assert!(ticket.set_status(TicketStatus::Resolved, now()));
        let after_first = ticket.clone();
        assert!(!ticket.set_status(TicketStatus::Resolved, now()));
        assert_eq!(ticket, after_first);
    }

    #[test]
    fn customer_replies_are_always_public() {
        let reply =
            TicketReply::from_customer(TicketId::new(), UserId::new(), "hi".into(), now());
        assert!(!reply.is_internal);
        assert_eq!(reply.author_type, AuthorType::Customer);
    }

    #[test]
    fn guest_input_requires_name_and_email() {
        let mut input = CreateTicketInput {
            subject: "Login issue".into(),
            message: "Cannot sign in".into(),
            ..Default::default()
        };
        assert_eq!(
            input.validate_guest().unwrap_err(),
            DomainError::validation("name is required")
        );

        input.name = Some("Jane Doe".into());
        assert_eq!(
            input.validate_guest().unwrap_err(),
            DomainError::validation("email is required")
        );

        input.email = Some(" Jane@Example.com".into());
        let (name, email) = input.validate_guest().unwrap();
        assert_eq!(name, "Jane Doe");
        assert_eq!(email.as_str(), "jane@example.com");
    }

    #[test]
    fn content_validation_names_field() {
        let input = CreateTicketInput {
            subject: "  ".into(),
            message: "body".into(),
            ..Default::default()
        };
        assert_eq!(
            input.validate_content().unwrap_err(),
            DomainError::validation("subject is required")
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let raw = r#"{"subject":"s","message":"m","status":"closed"}"#;
        assert!(serde_json::from_str::<CreateTicketInput>(raw).is_err());
    }

    #[test]
    fn search_matches_subject_case_insensitively() {
        let ticket = Ticket::open(UserId::new(), "Login Issue".into(), None, None, now());
        let filters = TicketFilters {
            search: Some("login".into()),
            ..Default::default()
        };
        assert!(filters.matches_search(&ticket));

        let filters = TicketFilters {
            search: Some("billing".into()),
            ..Default::default()
        };
        assert!(!filters.matches_search(&ticket));
    }
}
