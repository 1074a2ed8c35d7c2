//! HTTP application wiring.
//!
//! - `services.rs`: data layer, sessions, audit log and notification bus
//! - `ops/`: guarded operations, callable without HTTP
//! - `routes/`: axum handlers, one file per section
//! - `errors.rs`: the operation error taxonomy and response envelope

use std::sync::Arc;

use axum::{Extension, Router, middleware::from_fn, middleware::from_fn_with_state, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod errors;
pub mod ops;
pub mod routes;
pub mod services;

/// Build the full HTTP router over `services`.
///
/// Every request first passes the session middleware; `/staff` and `/admin`
/// add their role gates on top.
pub fn build_app(services: Arc<AppServices>) -> Router {
    let staff = routes::staff::router().layer(from_fn(middleware::require_staff));
    let admin = routes::admin::router().layer(from_fn(middleware::require_admin));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/whoami", get(routes::system::whoami))
        .merge(routes::public::router())
        .nest("/auth", routes::auth::router())
        .nest("/staff", staff)
        .nest("/admin", admin)
        .layer(
            ServiceBuilder::new()
                .layer(Extension(services.clone()))
                .layer(from_fn_with_state(services, middleware::session_middleware)),
        )
}

pub use services::AppServices;
