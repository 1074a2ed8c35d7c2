//! `/staff` section: ticket desk and knowledge-base authoring.

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

use nesk_desk::TicketFilters;

use super::{json_body, query};
use crate::app::errors::{respond, respond_with};
use crate::app::ops::{kb, staff};
use crate::app::services::AppServices;
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/tickets", get(list_tickets))
        .route("/tickets/:id", get(get_ticket))
        .route("/tickets/:id/status", post(update_status))
        .route("/tickets/:id/priority", post(update_priority))
        .route("/tickets/:id/category", post(update_category))
        .route("/tickets/:id/assign", post(assign))
        .route("/tickets/:id/replies", post(add_reply))
        .route("/kb/articles", get(list_articles).post(create_article))
        .route(
            "/kb/articles/:id",
            get(get_article).put(update_article).delete(delete_article),
        )
        .route("/kb/articles/:id/toggle", post(toggle_article))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StatusChange {
    status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PriorityChange {
    #[serde(default)]
    priority_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CategoryChange {
    #[serde(default)]
    category_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Assignment {
    #[serde(default)]
    assigned_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchQuery {
    search: Option<String>,
}

type Services = Extension<Arc<AppServices>>;
type Ctx = Extension<RequestContext>;

async fn list_tickets(
    Extension(services): Services,
    Extension(ctx): Ctx,
    filters: Result<Query<TicketFilters>, QueryRejection>,
) -> Response {
    respond(query(filters).and_then(|f| staff::list_tickets_for_staff(&services, &ctx, f)))
}

async fn get_ticket(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
) -> Response {
    respond(staff::get_ticket_for_staff(&services, &ctx, &id))
}

async fn update_status(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    respond(
        json_body::<StatusChange>(&body)
            .and_then(|c| staff::update_ticket_status(&services, &ctx, &id, &c.status)),
    )
}

async fn update_priority(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    respond(json_body::<PriorityChange>(&body).and_then(|c| {
        staff::update_ticket_priority(&services, &ctx, &id, c.priority_id.as_deref())
    }))
}

async fn update_category(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    respond(json_body::<CategoryChange>(&body).and_then(|c| {
        staff::update_ticket_category(&services, &ctx, &id, c.category_id.as_deref())
    }))
}

async fn assign(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    respond(
        json_body::<Assignment>(&body)
            .and_then(|a| staff::assign_ticket(&services, &ctx, &id, a.assigned_to.as_deref())),
    )
}

async fn add_reply(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let result = json_body(&body)
        .and_then(|input| staff::add_ticket_reply(&services, &ctx, &id, input));
    respond_with(StatusCode::CREATED, result)
}

async fn list_articles(
    Extension(services): Services,
    Extension(ctx): Ctx,
    params: Result<Query<SearchQuery>, QueryRejection>,
) -> Response {
    respond(
        query(params)
            .and_then(|q| kb::list_articles_for_staff(&services, &ctx, q.search.as_deref())),
    )
}

async fn get_article(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
) -> Response {
    respond(kb::get_article_for_staff(&services, &ctx, &id))
}

async fn create_article(
    Extension(services): Services,
    Extension(ctx): Ctx,
    body: Bytes,
) -> Response {
    let result = json_body(&body).and_then(|input| kb::create_article(&services, &ctx, input));
    respond_with(StatusCode::CREATED, result)
}

async fn update_article(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    respond(json_body(&body).and_then(|input| kb::update_article(&services, &ctx, &id, input)))
}

async fn delete_article(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
) -> Response {
    respond(kb::delete_article(&services, &ctx, &id))
}

async fn toggle_article(
    Extension(services): Services,
    Extension(ctx): Ctx,
    Path(id): Path<String>,
) -> Response {
    respond(kb::toggle_published(&services, &ctx, &id))
}
