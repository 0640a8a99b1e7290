//! API error types with HTTP response mapping.
//!
//! Every response body carries the stable machine-readable `kind` from the
//! domain taxonomy plus a human-readable message, so clients can tell
//! "try a smaller quantity" apart from "try again later" without parsing
//! prose.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// The caller's identity headers are missing or malformed.
    Unauthorized(String),
    /// Bad request from the client (unparseable path or body fields).
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg),
            ApiError::Domain(err) => {
                let status = domain_status(&err);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %err, "internal server error");
                }
                (status, err.kind(), err.to_string())
            }
        };

        metrics::counter!("api_errors_total", "kind" => kind).increment(1);

        let body = serde_json::json!({
            "error": { "kind": kind, "message": message }
        });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::InsufficientStock { .. } => StatusCode::CONFLICT,
        DomainError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        DomainError::InvalidTransition { .. } => StatusCode::CONFLICT,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}
