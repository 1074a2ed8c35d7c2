//! `/auth` endpoints. Sign-in belongs to the credential provider; this side
//! only ends sessions.

use std::sync::Arc;

use axum::{
    Extension, Router,
    http::{HeaderValue, header},
    response::Response,
    routing::post,
};
use tracing::info;

use crate::app::errors::{OpResult, respond};
use crate::app::services::AppServices;
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new().route("/signout", post(sign_out))
}

/// POST /auth/signout. Revokes the presented session and clears the cookie.
/// Signing out without a session succeeds.
async fn sign_out(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Response {
    let result: OpResult<bool> = match ctx.session_token() {
        Some(token) => services.sessions.revoke(token).map_err(Into::into),
        None => Ok(false),
    };
    if let Ok(true) = result {
        info!(user_id = ?ctx.principal().id(), "signed out");
    }

    let mut response =
        respond(result.map(|revoked| serde_json::json!({ "revoked": revoked })));
    let expired = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        services.config.session_cookie
    );
    if let Ok(value) = HeaderValue::from_str(&expired) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}
