use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, error};

use nesk_auth::{RequestCredentials, Role, at_least};

use crate::app::errors::json_error;
use crate::app::services::AppServices;
use crate::context::RequestContext;

pub const SIGN_IN_PATH: &str = "/auth/signin";

/// Resolve the caller's session and attach a [`RequestContext`].
///
/// Missing or invalid credentials resolve to the anonymous principal. Only a
/// backend failure ends the request here.
pub async fn session_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: Request,
    next: Next,
) -> Response {
    let headers = req.headers();
    let credentials = RequestCredentials {
        session_cookie: extract_cookie(headers, &services.config.session_cookie),
        bearer_token: extract_bearer(headers),
    };
    let ip_address = client_ip(headers);

    let (principal, token) = match services.resolver.resolve_session(&credentials) {
        Ok((principal, token)) => (principal, token.map(str::to_string)),
        Err(err) => {
            error!(error = %err, "failed to resolve session");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong");
        }
    };
    debug!(role = principal.role().as_str(), "session resolved");

    req.extensions_mut()
        .insert(RequestContext::new(principal, ip_address, token));
    next.run(req).await
}

/// Gate for `/staff/*`.
pub async fn require_staff(req: Request, next: Next) -> Response {
    gate(Role::Staff, req, next).await
}

/// Gate for `/admin/*`.
pub async fn require_admin(req: Request, next: Next) -> Response {
    gate(Role::Admin, req, next).await
}

/// Anonymous callers go to sign-in; signed-in callers without the role go
/// home.
async fn gate(minimum: Role, req: Request, next: Next) -> Response {
    let Some(principal) = req
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.principal().clone())
    else {
        return Redirect::to(SIGN_IN_PATH).into_response();
    };

    if at_least(&principal, minimum) {
        return next.run(req).await;
    }
    debug!(
        role = principal.role().as_str(),
        required = minimum.as_str(),
        path = %req.uri().path(),
        "section gate redirect"
    );
    if principal.is_anonymous() {
        Redirect::to(SIGN_IN_PATH).into_response()
    } else {
        Redirect::to("/").into_response()
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// First hop of `x-forwarded-for`, else `x-real-ip`.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    forwarded.or_else(real).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; nesk_session=abc123; lang=en"),
        );
        assert_eq!(extract_cookie(&headers, "nesk_session").as_deref(), Some("abc123"));
        assert_eq!(extract_cookie(&headers, "missing"), None);
    }

    #[test]
    fn bearer_requires_scheme_and_value() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(extract_bearer(&headers).as_deref(), Some("tok"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic tok"));
        assert_eq!(extract_bearer(&headers), None);
    }

    #[test]
    fn client_ip_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_ip(&headers).as_deref(), Some("10.0.0.9"));

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.7"));
    }
}
