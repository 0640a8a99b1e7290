//! Caller identity extraction.
//!
//! The excluded auth layer terminates tokens upstream and hands the verified
//! identity to this core via the `x-user-id` and `x-user-role` headers. The
//! extractor is the only place a user id enters a handler; client-supplied
//! ids in request bodies are never consulted.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;
use domain::{Actor, Role};
use uuid::Uuid;

use crate::error::ApiError;

const USER_ID_HEADER: &str = "x-user-id";
const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller, extracted from the identity headers.
pub struct Identity(pub Actor);

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header"))
            })?;
        let user_id = Uuid::parse_str(raw)
            .map(UserId::from_uuid)
            .map_err(|e| ApiError::Unauthorized(format!("invalid {USER_ID_HEADER} header: {e}")))?;

        let role = match parts.headers.get(USER_ROLE_HEADER) {
            None => Role::Customer,
            Some(value) => match value.to_str() {
                Ok(s) if s.eq_ignore_ascii_case("admin") => Role::Admin,
                Ok(s) if s.eq_ignore_ascii_case("customer") => Role::Customer,
                _ => {
                    return Err(ApiError::Unauthorized(format!(
                        "unrecognized {USER_ROLE_HEADER} header"
                    )));
                }
            },
        };

        Ok(Identity(Actor { user_id, role }))
    }
}
