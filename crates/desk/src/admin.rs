//! Admin-managed records: settings, email templates, team members.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nesk_auth::Role;
use nesk_core::{
    DomainError, DomainResult, EmailAddress, EmailTemplateId, Entity, SettingId, TeamMemberId,
};

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// A key/value setting. `key` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub id: SettingId,
    pub key: String,
    pub value: String,
    pub category: String,
    pub updated_at: DateTime<Utc>,
}

impl Setting {
    pub const DEFAULT_CATEGORY: &'static str = "general";
}

impl Entity for Setting {
    type Id = SettingId;

    fn id(&self) -> &SettingId {
        &self.id
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Email templates
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: EmailTemplateId,
    pub name: String,
    pub subject: String,
    pub body: String,
    /// Comma-separated placeholder names, e.g. `ticketId,subject`.
    pub variables: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for EmailTemplate {
    type Id = EmailTemplateId;

    fn id(&self) -> &EmailTemplateId {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailTemplateInput {
    pub name: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub variables: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl EmailTemplateInput {
    pub fn into_template(self, now: DateTime<Utc>) -> DomainResult<EmailTemplate> {
        Ok(EmailTemplate {
            id: EmailTemplateId::new(),
            name: DomainError::require_text("name", &self.name)?,
            subject: DomainError::require_text("subject", &self.subject)?,
            body: DomainError::require_text("body", &self.body)?,
            variables: self.variables.trim().to_string(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailTemplatePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub variables: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl EmailTemplatePatch {
    pub fn validate(&self) -> DomainResult<()> {
        for (field, value) in [
            ("name", &self.name),
            ("subject", &self.subject),
            ("body", &self.body),
        ] {
            if let Some(value) = value {
                DomainError::require_text(field, value)?;
            }
        }
        Ok(())
    }

    pub fn apply(&self, template: &mut EmailTemplate, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            template.name = name.trim().to_string();
        }
        if let Some(subject) = &self.subject {
            template.subject = subject.trim().to_string();
        }
        if let Some(body) = &self.body {
            template.body = body.trim().to_string();
        }
        if let Some(variables) = &self.variables {
            template.variables = variables.trim().to_string();
        }
        if let Some(description) = &self.description {
            template.description = Some(description.clone()).filter(|d| !d.trim().is_empty());
        }
        template.updated_at = now;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Team members
// ─────────────────────────────────────────────────────────────────────────────

/// A member of the support team (KB authors, ticket assignees).
///
/// `role` here is directory metadata; authorization always uses the role on
/// the user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: TeamMemberId,
    pub email: EmailAddress,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Entity for TeamMember {
    type Id = TeamMemberId;

    fn id(&self) -> &TeamMemberId {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeamMemberInput {
    pub email: String,
    pub name: String,
    pub role: String,
}

impl TeamMemberInput {
    pub fn into_member(self, now: DateTime<Utc>) -> DomainResult<TeamMember> {
        Ok(TeamMember {
            id: TeamMemberId::new(),
            email: EmailAddress::parse(&self.email)?,
            name: DomainError::require_text("name", &self.name)?,
            role: Role::parse_assignable(self.role.trim())?,
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeamMemberPatch {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// A validated team member patch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidTeamMemberPatch {
    pub email: Option<EmailAddress>,
    pub name: Option<String>,
    pub role: Option<Role>,
}

impl TeamMemberPatch {
    pub fn validate(&self) -> DomainResult<ValidTeamMemberPatch> {
        Ok(ValidTeamMemberPatch {
            email: self.email.as_deref().map(EmailAddress::parse).transpose()?,
            name: self
                .name
                .as_deref()
                .map(|n| DomainError::require_text("name", n))
                .transpose()?,
            role: self
                .role
                .as_deref()
                .map(|r| Role::parse_assignable(r.trim()))
                .transpose()?,
        })
    }
}

impl ValidTeamMemberPatch {
    pub fn apply(&self, member: &mut TeamMember) {
        if let Some(email) = &self.email {
            member.email = email.clone();
        }
        if let Some(name) = &self.name {
            member.name = name.clone();
        }
        if let Some(role) = self.role {
            member.role = role;
        }
    }
}
