//! Activity (audit) entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nesk_core::{ActivityEntryId, Entity, UserId};

/// Entity type an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Ticket,
    KbArticle,
    Category,
    Setting,
    EmailTemplate,
    TeamMember,
    User,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Ticket => "ticket",
            EntityType::KbArticle => "kb_article",
            EntityType::Category => "category",
            EntityType::Setting => "setting",
            EntityType::EmailTemplate => "email_template",
            EntityType::TeamMember => "team_member",
            EntityType::User => "user",
        }
    }
}

/// Immutable audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: ActivityEntryId,
    pub actor_id: Option<UserId>,
    /// Verb, e.g. `create`, `update`, `delete`, `update_status`.
    pub action: String,
    pub entity_type: EntityType,
    pub entity_id: Option<String>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for ActivityEntry {
    type Id = ActivityEntryId;

    fn id(&self) -> &ActivityEntryId {
        &self.id
    }
}

/// An entry waiting to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub actor_id: Option<UserId>,
    pub action: &'static str,
    pub entity_type: EntityType,
    pub entity_id: Option<String>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
}

impl NewActivity {
    pub fn new(action: &'static str, entity_type: EntityType) -> Self {
        Self {
            actor_id: None,
            action,
            entity_type,
            entity_id: None,
            details: None,
            ip_address: None,
        }
    }

    pub fn actor(mut self, actor_id: Option<UserId>) -> Self {
        self.actor_id = actor_id;
        self
    }

    pub fn entity(mut self, entity_id: impl ToString) -> Self {
        self.entity_id = Some(entity_id.to_string());
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn ip(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }

    pub fn into_entry(self, now: DateTime<Utc>) -> ActivityEntry {
        ActivityEntry {
            id: ActivityEntryId::new(),
            actor_id: self.actor_id,
            action: self.action.to_string(),
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            details: self.details,
            ip_address: self.ip_address,
            created_at: now,
        }
    }
}
