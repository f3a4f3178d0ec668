//! Holder identity extractor
//!
//! Authentication happens upstream; the gateway forwards the end user's
//! identity in `X-Holder-Id`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;

use super::ApiResponse;
use crate::domain::HolderId;

pub const HOLDER_HEADER: &str = "x-holder-id";

/// The requesting holder, taken from the `X-Holder-Id` header.
#[derive(Debug, Clone)]
pub struct Holder(pub HolderId);

impl<S> FromRequestParts<S> for Holder
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiResponse<()>>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(HOLDER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        match value {
            Some(id) => Ok(Holder(HolderId::new(id))),
            None => Err((
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error("Missing X-Holder-Id header")),
            )),
        }
    }
}
