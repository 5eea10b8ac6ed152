//! Caller identity from request headers.
//!
//! Authentication happens upstream; by the time a request reaches us the
//! gateway has put the user's id in `x-user-id` and, for staff, their role in
//! `x-user-role`.

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use domains::{Actor, Role};
use uuid::Uuid;

use super::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller. Extracting `Caller` rejects anonymous requests
/// with 401; extract `Option<Caller>` where anonymous access is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub Actor);

fn actor_from_headers(headers: &HeaderMap) -> Result<Option<Actor>, ApiError> {
    let Some(raw_id) = headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };
    let id = raw_id
        .to_str()
        .ok()
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("{USER_ID_HEADER} must be a UUID")))?;

    let role = match headers.get(USER_ROLE_HEADER) {
        None => Role::User,
        Some(raw) => raw
            .to_str()
            .ok()
            .and_then(|s| s.parse::<Role>().ok())
            .ok_or_else(|| ApiError::Unauthorized(format!("{USER_ROLE_HEADER} is not a known role")))?,
    };

    Ok(Some(Actor { id, role }))
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers)?
            .map(Caller)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))
    }
}

impl<S> OptionalFromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Option<Self>, Self::Rejection> {
        Ok(actor_from_headers(&parts.headers)?.map(Caller))
    }
}
