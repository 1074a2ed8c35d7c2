use axum::{Extension, Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::context::RequestContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// The caller as the policy engine sees them.
pub async fn whoami(Extension(ctx): Extension<RequestContext>) -> impl IntoResponse {
    let principal = ctx.principal();
    Json(json!({
        "success": true,
        "data": {
            "user_id": principal.id().map(|id| id.to_string()),
            "email": principal.email().map(|e| e.as_str().to_string()),
            "role": principal.role().as_str(),
        }
    }))
}
