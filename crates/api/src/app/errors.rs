//! Operation outcome: `{"success": true, "data": ...}` or `{"error": "..."}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use nesk_auth::SessionError;
use nesk_core::DomainError;
use nesk_infra::{AuditError, StoreError};

pub type OpResult<T> = Result<T, OpError>;

/// Every way a guarded operation can fail.
///
/// Messages for `Unauthorized`, `NotFound` and `Internal` are fixed so they
/// cannot leak policy or storage detail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OpError {
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("Something went wrong")]
    Internal,
}

impl OpError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            OpError::Validation(_) => StatusCode::BAD_REQUEST,
            OpError::Unauthorized => StatusCode::FORBIDDEN,
            OpError::NotFound => StatusCode::NOT_FOUND,
            OpError::Conflict(_) => StatusCode::CONFLICT,
            OpError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for OpError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => OpError::Validation(msg),
            DomainError::NotFound => OpError::NotFound,
            DomainError::Conflict(msg) => OpError::Conflict(msg),
            DomainError::Unauthorized => OpError::Unauthorized,
            DomainError::InvalidId(msg) => OpError::Validation(msg),
        }
    }
}

impl From<StoreError> for OpError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => OpError::Conflict(msg),
            StoreError::Unavailable(detail) => {
                error!(%detail, "data layer failure");
                OpError::Internal
            }
        }
    }
}

impl From<SessionError> for OpError {
    fn from(err: SessionError) -> Self {
        error!(error = %err, "session backend failure");
        OpError::Internal
    }
}

impl From<AuditError> for OpError {
    fn from(err: AuditError) -> Self {
        error!(error = %err, "activity store failure");
        OpError::Internal
    }
}

impl IntoResponse for OpError {
    fn into_response(self) -> Response {
        json_error(self.status(), self.to_string())
    }
}

/// Render an operation result with the uniform envelope.
pub fn respond<T: Serialize>(result: OpResult<T>) -> Response {
    respond_with(StatusCode::OK, result)
}

pub fn respond_with<T: Serialize>(status: StatusCode, result: OpResult<T>) -> Response {
    match result {
        Ok(data) => (status, axum::Json(json!({ "success": true, "data": data }))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, axum::Json(json!({ "error": message.into() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_onto_operation_errors() {
        assert_eq!(
            OpError::from(DomainError::validation("subject is required")),
            OpError::Validation("subject is required".into())
        );
        assert_eq!(OpError::from(DomainError::Unauthorized), OpError::Unauthorized);
        assert_eq!(OpError::from(DomainError::NotFound), OpError::NotFound);
    }

    #[test]
    fn backend_detail_is_not_exposed() {
        let err = OpError::from(StoreError::Unavailable("ticket table lock poisoned".into()));
        assert_eq!(err, OpError::Internal);
        assert_eq!(err.to_string(), "Something went wrong");
    }

    #[test]
    fn statuses_follow_error_class() {
        assert_eq!(OpError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(OpError::Unauthorized.status(), StatusCode::FORBIDDEN);
        assert_eq!(OpError::Conflict("x".into()).status(), StatusCode::CONFLICT);
    }
}
