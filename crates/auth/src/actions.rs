//! Closed action vocabulary, one enumeration per resource type.

use serde::{Deserialize, Serialize};

/// Actions on tickets and their replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketAction {
    /// Submit a ticket as a guest, supplying name + email.
    CreateAsGuest,
    /// Submit a ticket owned by the signed-in principal.
    CreateAsSelf,
    /// Read a ticket by id + matching owner email.
    ReadOwn,
    /// Post a public reply on a ticket by id + matching owner email.
    ReplyOwn,
    ReadAny,
    UpdateStatus,
    /// Reassign, recategorize or reprioritize.
    UpdateAssignment,
    ReplyPublic,
    ReplyInternal,
}

/// Actions on knowledge-base articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KbAction {
    ReadPublished,
    ReadAny,
    Create,
    Update,
    Delete,
    Publish,
}

/// CRUD on admin-managed resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    Read,
    Create,
    Update,
    Delete,
}

/// Actions on user accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    Read,
    Update,
    Delete,
    UpdateRole,
}

/// Admin reporting reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportAction {
    Dashboard,
    TicketStats,
    ActivityFeed,
}

/// An action tagged with the resource type it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "resource", content = "action", rename_all = "snake_case")]
pub enum Action {
    Ticket(TicketAction),
    KbArticle(KbAction),
    Category(AdminAction),
    Setting(AdminAction),
    EmailTemplate(AdminAction),
    TeamMember(AdminAction),
    User(UserAction),
    Report(ReportAction),
}

impl Action {
    /// Stable name used in logs, e.g. `ticket.update_status`.
    pub fn name(&self) -> String {
        let (resource, action) = match self {
            Action::Ticket(a) => ("ticket", serde_name(a)),
            Action::KbArticle(a) => ("kb_article", serde_name(a)),
            Action::Category(a) => ("category", serde_name(a)),
            Action::Setting(a) => ("setting", serde_name(a)),
            Action::EmailTemplate(a) => ("email_template", serde_name(a)),
            Action::TeamMember(a) => ("team_member", serde_name(a)),
            Action::User(a) => ("user", serde_name(a)),
            Action::Report(a) => ("report", serde_name(a)),
        };
        format!("{resource}.{action}")
    }
}

fn serde_name<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => "unknown".to_string(),
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name())
    }
}
