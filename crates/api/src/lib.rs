//! Help-desk HTTP API: guarded operations, session middleware and routes.

pub mod app;
pub mod authz;
pub mod context;
pub mod middleware;

pub use app::{AppServices, build_app};
