//! Public help-desk endpoints: ticket submission and lookup, knowledge base.

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

use nesk_desk::ReplyInput;

use super::{json_body, query};
use crate::app::errors::{respond, respond_with};
use crate::app::ops::{kb, tickets};
use crate::app::services::AppServices;
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/priorities", get(list_priorities))
        .route("/tickets", post(create_ticket))
        .route("/tickets/status", post(ticket_status))
        .route("/tickets/:id/replies", post(customer_reply))
        .route("/kb/articles", get(list_articles))
        .route("/kb/articles/:id", get(get_article))
        .route("/kb/categories", get(kb_categories))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StatusLookup {
    ticket_id: String,
    email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CustomerReply {
    email: String,
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArticleQuery {
    pub category_id: Option<String>,
    pub search: Option<String>,
}

async fn list_categories(Extension(services): Extension<Arc<AppServices>>) -> Response {
    respond(tickets::list_categories(&services))
}

async fn list_priorities(Extension(services): Extension<Arc<AppServices>>) -> Response {
    respond(tickets::list_priorities(&services))
}

/// POST /tickets
async fn create_ticket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    body: Bytes,
) -> Response {
    let result =
        json_body(&body).and_then(|input| tickets::create_ticket(&services, &ctx, input));
    respond_with(StatusCode::CREATED, result)
}

/// POST /tickets/status. Id and email travel in the body, not the URL.
async fn ticket_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    body: Bytes,
) -> Response {
    respond(json_body::<StatusLookup>(&body).and_then(|lookup| {
        tickets::get_ticket_status(&services, &ctx, &lookup.ticket_id, &lookup.email)
    }))
}

/// POST /tickets/:id/replies
async fn customer_reply(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(ticket_id): Path<String>,
    body: Bytes,
) -> Response {
    let result = json_body::<CustomerReply>(&body).and_then(|reply| {
        let input = ReplyInput {
            message: reply.message,
            is_internal: false,
        };
        tickets::add_customer_reply(&services, &ctx, &ticket_id, &reply.email, input)
    });
    respond_with(StatusCode::CREATED, result)
}

async fn list_articles(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<ArticleQuery>, QueryRejection>,
) -> Response {
    respond(query(params).and_then(|q| {
        kb::list_published_articles(&services, q.category_id.as_deref(), q.search.as_deref())
    }))
}

async fn get_article(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(article_id): Path<String>,
) -> Response {
    respond(kb::get_published_article(&services, &ctx, &article_id))
}

async fn kb_categories(Extension(services): Extension<Arc<AppServices>>) -> Response {
    respond(kb::list_kb_categories(&services))
}
