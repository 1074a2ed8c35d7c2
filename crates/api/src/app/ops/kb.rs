//! Knowledge base: public reading and staff authoring.

use serde::Serialize;
use tracing::info;

use nesk_auth::{Action, KbAction, ResourceDescriptor, authorize};
use nesk_core::{CategoryId, KbArticleId};
use nesk_desk::{ArticleInput, Category, EntityType, KbArticle, NewActivity};
use nesk_infra::Table;

use super::{parse_id, parse_ref, record};
use crate::app::errors::{OpError, OpResult};
use crate::app::services::AppServices;
use crate::authz::guard_role;
use crate::context::RequestContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KbCategory {
    #[serde(flatten)]
    pub category: Category,
    pub article_count: usize,
}

pub fn list_published_articles(
    services: &AppServices,
    category_id: Option<&str>,
    search: Option<&str>,
) -> OpResult<Vec<KbArticle>> {
    let category: Option<CategoryId> = parse_ref("category_id", category_id)?;
    let search = search.map(str::trim).filter(|s| !s.is_empty());
    Ok(services.store.published_articles(category, search)?)
}

/// A published article. Drafts are `NotFound` to anyone below staff.
pub fn get_published_article(
    services: &AppServices,
    ctx: &RequestContext,
    article_id: &str,
) -> OpResult<KbArticle> {
    let id: KbArticleId = parse_id(article_id)?;
    let article = services.store.articles.get(&id)?.ok_or(OpError::NotFound)?;

    let resource = ResourceDescriptor::article(article.published);
    let read = Action::KbArticle(KbAction::ReadPublished);
    if !authorize(ctx.principal(), read, &resource).is_allowed() {
        return Err(OpError::NotFound);
    }
    Ok(article)
}

pub fn list_kb_categories(services: &AppServices) -> OpResult<Vec<KbCategory>> {
    Ok(services
        .store
        .kb_categories()?
        .into_iter()
        .map(|(category, article_count)| KbCategory {
            category,
            article_count,
        })
        .collect())
}

/// Every article, drafts included, most recently updated first.
pub fn list_articles_for_staff(
    services: &AppServices,
    ctx: &RequestContext,
    search: Option<&str>,
) -> OpResult<Vec<KbArticle>> {
    guard_role(ctx.principal(), Action::KbArticle(KbAction::ReadAny))?;
    let search = search.map(str::trim).unwrap_or_default();

    let mut articles = services.store.articles.find(|a: &KbArticle| a.matches(search))?;
    articles.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(articles)
}

pub fn get_article_for_staff(
    services: &AppServices,
    ctx: &RequestContext,
    article_id: &str,
) -> OpResult<KbArticle> {
    guard_role(ctx.principal(), Action::KbArticle(KbAction::ReadAny))?;
    let id: KbArticleId = parse_id(article_id)?;
    services.store.articles.get(&id)?.ok_or(OpError::NotFound)
}

/// Create an article authored by the caller's team-member record, which is
/// created on first use.
pub fn create_article(
    services: &AppServices,
    ctx: &RequestContext,
    input: ArticleInput,
) -> OpResult<KbArticle> {
    let valid = input.validate()?;
    let principal = services.refresh(ctx.principal())?;
    guard_role(&principal, Action::KbArticle(KbAction::Create))?;

    let email = principal.email().ok_or(OpError::Unauthorized)?;
    let now = services.now();
    let store = &services.store;

    let name = match principal.id() {
        Some(id) => store.users.get(&id)?.and_then(|u| u.name),
        None => None,
    }
    .unwrap_or_else(|| email.as_str().to_string());
    let author = store.ensure_team_member(email, &name, principal.role(), now)?;

    let article = KbArticle::draft(author.id, &valid, now);
    store
        .with_category(valid.category_id, || store.articles.insert(article.clone()))?
        .ok_or_else(invalid_category)?;
    info!(article_id = %article.id, published = article.published, "kb article created");

    record(
        services,
        ctx,
        &principal,
        NewActivity::new("create", EntityType::KbArticle)
            .entity(article.id)
            .details(format!("Created article: {}", article.title)),
    );
    Ok(article)
}

pub fn update_article(
    services: &AppServices,
    ctx: &RequestContext,
    article_id: &str,
    input: ArticleInput,
) -> OpResult<KbArticle> {
    let valid = input.validate()?;
    let principal = services.refresh(ctx.principal())?;
    guard_role(&principal, Action::KbArticle(KbAction::Update))?;
    if valid.published {
        guard_role(&principal, Action::KbArticle(KbAction::Publish))?;
    }

    let id: KbArticleId = parse_id(article_id)?;
    let now = services.now();
    let store = &services.store;
    let article = store
        .with_category(valid.category_id, || {
            store.articles.modify(&id, |article: &mut KbArticle| {
                article.apply(&valid, now);
                Ok::<_, OpError>(article.clone())
            })
        })?
        .ok_or_else(invalid_category)?
        .ok_or(OpError::NotFound)?;

    record(
        services,
        ctx,
        &principal,
        NewActivity::new("update", EntityType::KbArticle)
            .entity(article.id)
            .details(format!("Updated article: {}", article.title)),
    );
    Ok(article)
}

pub fn delete_article(
    services: &AppServices,
    ctx: &RequestContext,
    article_id: &str,
) -> OpResult<()> {
    let principal = services.refresh(ctx.principal())?;
    guard_role(&principal, Action::KbArticle(KbAction::Delete))?;
    let id: KbArticleId = parse_id(article_id)?;

    let article = services.store.articles.remove(&id)?.ok_or(OpError::NotFound)?;
    record(
        services,
        ctx,
        &principal,
        NewActivity::new("delete", EntityType::KbArticle)
            .entity(article.id)
            .details(format!("Deleted article: {}", article.title)),
    );
    Ok(())
}

pub fn toggle_published(
    services: &AppServices,
    ctx: &RequestContext,
    article_id: &str,
) -> OpResult<KbArticle> {
    let principal = services.refresh(ctx.principal())?;
    guard_role(&principal, Action::KbArticle(KbAction::Publish))?;
    let id: KbArticleId = parse_id(article_id)?;
    let now = services.now();

    let article = services
        .store
        .articles
        .modify(&id, |article: &mut KbArticle| {
            article.toggle_published(now);
            Ok::<_, OpError>(article.clone())
        })?
        .ok_or(OpError::NotFound)?;

    let verb = if article.published { "publish" } else { "unpublish" };
    record(
        services,
        ctx,
        &principal,
        NewActivity::new(verb, EntityType::KbArticle).entity(article.id),
    );
    Ok(article)
}

fn invalid_category() -> OpError {
    OpError::validation("category is invalid")
}
