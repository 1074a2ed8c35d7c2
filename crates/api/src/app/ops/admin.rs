//! Administration: team, users, settings, email templates, categories.
//!
//! Every mutation here is admin-only and lands in the activity log.

use serde::{Deserialize, Serialize};
use tracing::info;

use nesk_auth::{Action, AdminAction, Principal, Role, UserAction};
use nesk_core::{CategoryId, DomainError, EmailTemplateId, SettingId, TeamMemberId, UserId};
use nesk_desk::{
    Category, CategoryInput, CategoryPatch, EmailTemplate, EmailTemplateInput,
    EmailTemplatePatch, EntityType, NewActivity, Setting, TeamMember, TeamMemberInput,
    TeamMemberPatch, UpdateUserInput, UserAccount,
};
use nesk_infra::{CategoryDependents, CategoryRemoval, CategoryUpdate, Table};

use super::{parse_id, record};
use crate::app::errors::{OpError, OpResult};
use crate::app::services::AppServices;
use crate::authz::guard_role;
use crate::context::RequestContext;

/// Refresh the caller and require `action`. Returns the refreshed principal.
fn admin(services: &AppServices, ctx: &RequestContext, action: Action) -> OpResult<Principal> {
    let principal = services.refresh(ctx.principal())?;
    guard_role(&principal, action)?;
    Ok(principal)
}

// ─────────────────────────────────────────────────────────────────────────────
// Team members
// ─────────────────────────────────────────────────────────────────────────────

pub fn list_team_members(
    services: &AppServices,
    ctx: &RequestContext,
) -> OpResult<Vec<TeamMember>> {
    guard_role(ctx.principal(), Action::TeamMember(AdminAction::Read))?;
    let mut members = services.store.team.list()?;
    members.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(members)
}

pub fn create_team_member(
    services: &AppServices,
    ctx: &RequestContext,
    input: TeamMemberInput,
) -> OpResult<TeamMember> {
    let member = input.into_member(services.now())?;
    let principal = admin(services, ctx, Action::TeamMember(AdminAction::Create))?;

    services.store.insert_team_member(member.clone())?;
    info!(member_id = %member.id, "team member created");
    record(
        services,
        ctx,
        &principal,
        NewActivity::new("create", EntityType::TeamMember)
            .entity(member.id)
            .details(format!("Created team member: {}", member.name)),
    );
    Ok(member)
}

pub fn update_team_member(
    services: &AppServices,
    ctx: &RequestContext,
    member_id: &str,
    patch: TeamMemberPatch,
) -> OpResult<TeamMember> {
    let patch = patch.validate()?;
    let principal = admin(services, ctx, Action::TeamMember(AdminAction::Update))?;
    let id: TeamMemberId = parse_id(member_id)?;

    if let Some(email) = &patch.email {
        if !services.store.team_email_free(email, &id)? {
            return Err(OpError::Conflict("email is already in use".into()));
        }
    }

    let member = services
        .store
        .team
        .modify(&id, |member: &mut TeamMember| {
            patch.apply(member);
            Ok::<_, OpError>(member.clone())
        })?
        .ok_or(OpError::NotFound)?;

    record(
        services,
        ctx,
        &principal,
        NewActivity::new("update", EntityType::TeamMember)
            .entity(member.id)
            .details(format!("Updated team member: {}", member.name)),
    );
    Ok(member)
}

pub fn delete_team_member(
    services: &AppServices,
    ctx: &RequestContext,
    member_id: &str,
) -> OpResult<()> {
    let principal = admin(services, ctx, Action::TeamMember(AdminAction::Delete))?;
    let id: TeamMemberId = parse_id(member_id)?;

    let member = services.store.team.remove(&id)?.ok_or(OpError::NotFound)?;
    record(
        services,
        ctx,
        &principal,
        NewActivity::new("delete", EntityType::TeamMember)
            .entity(member.id)
            .details(format!("Deleted team member: {}", member.name)),
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

pub fn list_users(services: &AppServices, ctx: &RequestContext) -> OpResult<Vec<UserAccount>> {
    guard_role(ctx.principal(), Action::User(UserAction::Read))?;
    let mut users = services.store.users.list()?;
    users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(users)
}

/// Edit a user's profile. The role is not part of this input.
pub fn update_user(
    services: &AppServices,
    ctx: &RequestContext,
    user_id: &str,
    input: UpdateUserInput,
) -> OpResult<UserAccount> {
    let patch = input.validate()?;
    let principal = admin(services, ctx, Action::User(UserAction::Update))?;
    let id: UserId = parse_id(user_id)?;

    let user = services.store.update_user(&id, &patch)?.ok_or(OpError::NotFound)?;
    record(
        services,
        ctx,
        &principal,
        NewActivity::new("update", EntityType::User)
            .entity(user.id)
            .details(format!("Updated user: {}", user.email)),
    );
    Ok(user)
}

/// Change a user's role. `new_role` must be `user`, `staff` or `admin`.
pub fn update_user_role(
    services: &AppServices,
    ctx: &RequestContext,
    user_id: &str,
    new_role: &str,
) -> OpResult<UserAccount> {
    let role = Role::parse_assignable(new_role.trim())?;
    let principal = admin(services, ctx, Action::User(UserAction::UpdateRole))?;
    let id: UserId = parse_id(user_id)?;

    let previous = services.store.set_user_role(&id, role)?.ok_or(OpError::NotFound)?;
    let user = services.store.users.get(&id)?.ok_or(OpError::NotFound)?;

    info!(user_id = %id, from = previous.as_str(), to = role.as_str(), "user role changed");
    record(
        services,
        ctx,
        &principal,
        NewActivity::new("update_role", EntityType::User)
            .entity(id)
            .details(format!("Changed role from {} to {}", previous.as_str(), role.as_str())),
    );
    Ok(user)
}

/// Delete a user with their tickets, and end their sessions.
pub fn delete_user(services: &AppServices, ctx: &RequestContext, user_id: &str) -> OpResult<()> {
    let principal = admin(services, ctx, Action::User(UserAction::Delete))?;
    let id: UserId = parse_id(user_id)?;

    let user = services.store.delete_user(&id)?.ok_or(OpError::NotFound)?;
    services.sessions.revoke_user(&id)?;

    record(
        services,
        ctx,
        &principal,
        NewActivity::new("delete", EntityType::User)
            .entity(id)
            .details(format!("Deleted user: {}", user.email)),
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingInput {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub category: Option<String>,
}

pub fn list_settings(
    services: &AppServices,
    ctx: &RequestContext,
    category: Option<&str>,
) -> OpResult<Vec<Setting>> {
    guard_role(ctx.principal(), Action::Setting(AdminAction::Read))?;
    let category = category.map(str::trim).filter(|c| !c.is_empty());
    Ok(services.store.settings_in(category)?)
}

/// Upsert the setting stored under `key`.
pub fn update_setting(
    services: &AppServices,
    ctx: &RequestContext,
    input: SettingInput,
) -> OpResult<Setting> {
    let key = DomainError::require_text("key", &input.key)?;
    let category = input
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(Setting::DEFAULT_CATEGORY)
        .to_string();
    let principal = admin(services, ctx, Action::Setting(AdminAction::Update))?;

    let setting = services
        .store
        .upsert_setting(&key, &input.value, &category, services.now())?;
    record(
        services,
        ctx,
        &principal,
        NewActivity::new("update", EntityType::Setting)
            .entity(setting.id)
            .details(format!("Updated setting: {}", setting.key)),
    );
    Ok(setting)
}

pub fn delete_setting(
    services: &AppServices,
    ctx: &RequestContext,
    setting_id: &str,
) -> OpResult<()> {
    let principal = admin(services, ctx, Action::Setting(AdminAction::Delete))?;
    let id: SettingId = parse_id(setting_id)?;

    let setting = services.store.settings.remove(&id)?.ok_or(OpError::NotFound)?;
    record(
        services,
        ctx,
        &principal,
        NewActivity::new("delete", EntityType::Setting)
            .entity(setting.id)
            .details(format!("Deleted setting: {}", setting.key)),
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Email templates
// ─────────────────────────────────────────────────────────────────────────────

pub fn list_email_templates(
    services: &AppServices,
    ctx: &RequestContext,
) -> OpResult<Vec<EmailTemplate>> {
    guard_role(ctx.principal(), Action::EmailTemplate(AdminAction::Read))?;
    let mut templates = services.store.templates.list()?;
    templates.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(templates)
}

pub fn get_email_template(
    services: &AppServices,
    ctx: &RequestContext,
    template_id: &str,
) -> OpResult<EmailTemplate> {
    guard_role(ctx.principal(), Action::EmailTemplate(AdminAction::Read))?;
    let id: EmailTemplateId = parse_id(template_id)?;
    services.store.templates.get(&id)?.ok_or(OpError::NotFound)
}

pub fn create_email_template(
    services: &AppServices,
    ctx: &RequestContext,
    input: EmailTemplateInput,
) -> OpResult<EmailTemplate> {
    let template = input.into_template(services.now())?;
    let principal = admin(services, ctx, Action::EmailTemplate(AdminAction::Create))?;

    services.store.insert_template(template.clone())?;
    record(
        services,
        ctx,
        &principal,
        NewActivity::new("create", EntityType::EmailTemplate)
            .entity(template.id)
            .details(format!("Created template: {}", template.name)),
    );
    Ok(template)
}

pub fn update_email_template(
    services: &AppServices,
    ctx: &RequestContext,
    template_id: &str,
    patch: EmailTemplatePatch,
) -> OpResult<EmailTemplate> {
    patch.validate()?;
    let principal = admin(services, ctx, Action::EmailTemplate(AdminAction::Update))?;
    let id: EmailTemplateId = parse_id(template_id)?;
    let now = services.now();

    if let Some(name) = patch.name.as_deref().map(str::trim) {
        let taken = services
            .store
            .templates
            .find(|t: &EmailTemplate| t.name == name && t.id != id)?;
        if !taken.is_empty() {
            return Err(OpError::Conflict("template name is already in use".into()));
        }
    }

    let template = services
        .store
        .templates
        .modify(&id, |template: &mut EmailTemplate| {
            patch.apply(template, now);
            Ok::<_, OpError>(template.clone())
        })?
        .ok_or(OpError::NotFound)?;

    record(
        services,
        ctx,
        &principal,
        NewActivity::new("update", EntityType::EmailTemplate)
            .entity(template.id)
            .details(format!("Updated template: {}", template.name)),
    );
    Ok(template)
}

pub fn delete_email_template(
    services: &AppServices,
    ctx: &RequestContext,
    template_id: &str,
) -> OpResult<()> {
    let principal = admin(services, ctx, Action::EmailTemplate(AdminAction::Delete))?;
    let id: EmailTemplateId = parse_id(template_id)?;

    let template = services.store.templates.remove(&id)?.ok_or(OpError::NotFound)?;
    record(
        services,
        ctx,
        &principal,
        NewActivity::new("delete", EntityType::EmailTemplate)
            .entity(template.id)
            .details(format!("Deleted template: {}", template.name)),
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Categories
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryUsage {
    #[serde(flatten)]
    pub category: Category,
    pub dependents: CategoryDependents,
}

pub fn list_categories_with_usage(
    services: &AppServices,
    ctx: &RequestContext,
) -> OpResult<Vec<CategoryUsage>> {
    guard_role(ctx.principal(), Action::Category(AdminAction::Read))?;
    services
        .store
        .categories_by_name()?
        .into_iter()
        .map(|category| {
            let dependents = services.store.category_dependents(&category.id)?;
            Ok(CategoryUsage {
                category,
                dependents,
            })
        })
        .collect()
}

pub fn create_category(
    services: &AppServices,
    ctx: &RequestContext,
    input: CategoryInput,
) -> OpResult<Category> {
    let name = input.validate()?;
    let principal = admin(services, ctx, Action::Category(AdminAction::Create))?;

    let category = Category {
        id: CategoryId::new(),
        name,
        parent_id: input.parent_id,
    };
    if !services.store.insert_category(category.clone())? {
        return Err(OpError::validation("parent_id is invalid"));
    }
    record(
        services,
        ctx,
        &principal,
        NewActivity::new("create", EntityType::Category)
            .entity(category.id)
            .details(format!("Created category: {}", category.name)),
    );
    Ok(category)
}

pub fn update_category(
    services: &AppServices,
    ctx: &RequestContext,
    category_id: &str,
    patch: CategoryPatch,
) -> OpResult<Category> {
    let id: CategoryId = parse_id(category_id)?;
    patch.validate(id)?;
    let principal = admin(services, ctx, Action::Category(AdminAction::Update))?;

    let category = match services.store.update_category(&id, &patch)? {
        CategoryUpdate::Updated(category) => category,
        CategoryUpdate::InvalidParent => return Err(OpError::validation("parent_id is invalid")),
        CategoryUpdate::Missing => return Err(OpError::NotFound),
    };

    record(
        services,
        ctx,
        &principal,
        NewActivity::new("update", EntityType::Category)
            .entity(category.id)
            .details(format!("Updated category: {}", category.name)),
    );
    Ok(category)
}

/// Delete a category that nothing references. Categories still attached to
/// tickets, articles or child categories are a conflict.
pub fn delete_category(
    services: &AppServices,
    ctx: &RequestContext,
    category_id: &str,
) -> OpResult<()> {
    let principal = admin(services, ctx, Action::Category(AdminAction::Delete))?;
    let id: CategoryId = parse_id(category_id)?;

    let category = match services.store.remove_category_if_unused(&id)? {
        CategoryRemoval::Removed(category) => category,
        CategoryRemoval::Missing => return Err(OpError::NotFound),
        CategoryRemoval::InUse(dependents) => {
            return Err(OpError::Conflict(format!(
                "Cannot delete category with {} ticket(s), {} article(s) and {} subcategory(ies)",
                dependents.tickets, dependents.articles, dependents.children
            )));
        }
    };

    record(
        services,
        ctx,
        &principal,
        NewActivity::new("delete", EntityType::Category)
            .entity(category.id)
            .details(format!("Deleted category: {}", category.name)),
    );
    Ok(())
}
