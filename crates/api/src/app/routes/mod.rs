//! HTTP routes. Handlers parse input, call the guarded operation and render
//! the result envelope; they make no authorization decisions of their own.

use axum::extract::Query;
use axum::extract::rejection::QueryRejection;
use serde::de::DeserializeOwned;

use crate::app::errors::{OpError, OpResult};

pub mod admin;
pub mod auth;
pub mod public;
pub mod staff;
pub mod system;

/// Decode a JSON request body. An empty body is an empty object.
pub(crate) fn json_body<T: DeserializeOwned>(body: &[u8]) -> OpResult<T> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body)
        .map_err(|err| OpError::validation(format!("invalid request: {err}")))
}

pub(crate) fn query<T>(query: Result<Query<T>, QueryRejection>) -> OpResult<T> {
    query
        .map(|Query(q)| q)
        .map_err(|err| OpError::validation(err.body_text()))
}
