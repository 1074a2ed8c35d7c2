//! `/admin` section.

use std::sync::Arc;

use axum::{
    Extension, Router,
    body::Bytes,
    extract::{Path, Query, rejection::QueryRejection},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};
use serde::Deserialize;

use super::{json_body, query};
use crate::app::errors::{respond, respond_with};
use crate::app::ops::{admin, reports};
use crate::app::services::AppServices;
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/team", get(list_team).post(create_team_member))
        .route(
            "/team/:id",
            axum::routing::put(update_team_member).delete(delete_team_member),
        )
        .route("/users", get(list_users))
        .route("/users/:id", axum::routing::put(update_user).delete(delete_user))
        .route("/users/:id/role", post(update_user_role))
        .route("/settings", get(list_settings).put(update_setting))
        .route("/settings/:id", axum::routing::delete(delete_setting))
        .route("/templates", get(list_templates).post(create_template))
        .route(
            "/templates/:id",
            get(get_template).put(update_template).delete(delete_template),
        )
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            axum::routing::put(update_category).delete(delete_category),
        )
        .route("/reports/dashboard", get(dashboard))
        .route("/reports/tickets", get(ticket_stats))
        .route("/activity", get(activity))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RoleChange {
    role: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CategoryFilter {
    category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StatsQuery {
    days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FeedQuery {
    limit: Option<usize>,
}

type Services = Extension<Arc<AppServices>>;
type Ctx = Extension<RequestContext>;

// ── team ────────────────────────────────────────────────────────────────────

async fn list_team(Extension(services): Services, Extension(ctx): Ctx) -> Response {
    respond(admin::list_team_members(&services, &ctx))
}

async fn create_team_member(
    Extension(services): Services,
    Extension(ctx): Ctx,
    body: Bytes,
) -> Response {
    let result = json_body(&body)
        .and_then(|input| admin::create_team_member(&services, &ctx, input));
    respond_with(StatusCode::CREATED, result)
}

async fn update_team_member(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    respond(
        json_body(&body)
            .and_then(|patch| admin::update_team_member(&services, &ctx, &id, patch)),
    )
}

async fn delete_team_member(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
) -> Response {
    respond(admin::delete_team_member(&services, &ctx, &id))
}

// ── users ───────────────────────────────────────────────────────────────────

async fn list_users(Extension(services): Services, Extension(ctx): Ctx) -> Response {
    respond(admin::list_users(&services, &ctx))
}

async fn update_user(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    respond(json_body(&body).and_then(|input| admin::update_user(&services, &ctx, &id, input)))
}

async fn update_user_role(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    respond(
        json_body::<RoleChange>(&body)
            .and_then(|change| admin::update_user_role(&services, &ctx, &id, &change.role)),
    )
}

async fn delete_user(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
) -> Response {
    respond(admin::delete_user(&services, &ctx, &id))
}

// ── settings ────────────────────────────────────────────────────────────────

async fn list_settings(
    Extension(services): Services,
    Extension(ctx): Ctx,
    params: Result<Query<CategoryFilter>, QueryRejection>,
) -> Response {
    respond(
        query(params)
            .and_then(|q| admin::list_settings(&services, &ctx, q.category.as_deref())),
    )
}

async fn update_setting(
    Extension(services): Services,
    Extension(ctx): Ctx,
    body: Bytes,
) -> Response {
    respond(json_body(&body).and_then(|input| admin::update_setting(&services, &ctx, input)))
}

async fn delete_setting(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
) -> Response {
    respond(admin::delete_setting(&services, &ctx, &id))
}

// ── email templates ─────────────────────────────────────────────────────────

async fn list_templates(Extension(services): Services, Extension(ctx): Ctx) -> Response {
    respond(admin::list_email_templates(&services, &ctx))
}

async fn get_template(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
) -> Response {
    respond(admin::get_email_template(&services, &ctx, &id))
}

async fn create_template(
    Extension(services): Services,
    Extension(ctx): Ctx,
    body: Bytes,
) -> Response {
    let result = json_body(&body)
        .and_then(|input| admin::create_email_template(&services, &ctx, input));
    respond_with(StatusCode::CREATED, result)
}

async fn update_template(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    respond(
        json_body(&body)
            .and_then(|patch| admin::update_email_template(&services, &ctx, &id, patch)),
    )
}

async fn delete_template(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
) -> Response {
    respond(admin::delete_email_template(&services, &ctx, &id))
}

// ── categories ──────────────────────────────────────────────────────────────

async fn list_categories(Extension(services): Services, Extension(ctx): Ctx) -> Response {
    respond(admin::list_categories_with_usage(&services, &ctx))
}

async fn create_category(
    Extension(services): Services,
    Extension(ctx): Ctx,
    body: Bytes,
) -> Response {
    let result = json_body(&body)
        .and_then(|input| admin::create_category(&services, &ctx, input));
    respond_with(StatusCode::CREATED, result)
}

async fn update_category(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    respond(
        json_body(&body)
            .and_then(|patch| admin::update_category(&services, &ctx, &id, patch)),
    )
}

async fn delete_category(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
) -> Response {
    respond(admin::delete_category(&services, &ctx, &id))
}

// ── reports ─────────────────────────────────────────────────────────────────

async fn dashboard(Extension(services): Services, Extension(ctx): Ctx) -> Response {
    respond(reports::dashboard_stats(&services, &ctx))
}

async fn ticket_stats(
    Extension(services): Services,
    Extension(ctx): Ctx,
    params: Result<Query<StatsQuery>, QueryRejection>,
) -> Response {
    respond(query(params).and_then(|q| reports::ticket_stats(&services, &ctx, q.days)))
}

async fn activity(
    Extension(services): Services,
    Extension(ctx): Ctx,
    params: Result<Query<FeedQuery>, QueryRejection>,
) -> Response {
    respond(query(params).and_then(|q| reports::recent_activity(&services, &ctx, q.limit)))
}
