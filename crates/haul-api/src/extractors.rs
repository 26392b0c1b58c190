//! # Request Extractors
//!
//! JSON body extraction with errors mapped to [`AppError`], and the owner
//! context every `/v1/*` handler is scoped to.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::Json;
use uuid::Uuid;

use haul_core::OwnerId;

use crate::error::AppError;

/// Header naming the account a request acts for.
pub const OWNER_HEADER: &str = "x-owner-id";

/// Extract a JSON body, mapping deserialization failures to
/// [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// The owning account, read from the `x-owner-id` header.
///
/// Missing or malformed headers are rejected with 401; records owned by
/// anyone else read as not found further down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerContext(pub OwnerId);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for OwnerContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(OWNER_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("missing {OWNER_HEADER} header")))?;
        let owner = raw
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<Uuid>().ok())
            .ok_or_else(|| AppError::Unauthorized(format!("{OWNER_HEADER} must be a UUID")))?;
        Ok(Self(OwnerId::from_uuid(owner)))
    }
}
