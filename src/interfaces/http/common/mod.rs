//! Pieces shared by every HTTP module: the response envelope, error
//! mapping and request extractors.

mod holder;
mod validated_json;

pub use holder::{Holder, HOLDER_HEADER};
pub use validated_json::{ValidatedJson, ValidatedJsonRejection};

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::DomainError;

/// Standard API response envelope
///
/// On success: `{"success": true, "data": {...}}`,
/// on failure: `{"success": false, "data": null, "error": "..."}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// `true` if the request succeeded
    pub success: bool,
    /// Payload. `null` on error
    pub data: Option<T>,
    /// Error description. Absent on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Seats that could not be locked; set only for seat conflicts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable_seats: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            unavailable_seats: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            unavailable_seats: None,
        }
    }
}

/// Error half of a handler result; errors never carry data
pub type ApiError = (StatusCode, Json<ApiResponse<()>>);

/// Handler result: enveloped payload or status + enveloped error
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn status_for(err: &DomainError) -> StatusCode {
    match err {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::InvalidSeats(_) | DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::SeatUnavailable(_) | DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::Expired(_) => StatusCode::GONE,
        DomainError::PaymentIncomplete(_) => StatusCode::PAYMENT_REQUIRED,
        DomainError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Map a domain error onto its HTTP status and envelope.
pub fn api_error(err: DomainError) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    }
    let mut body = ApiResponse::error(err.to_string());
    if let DomainError::SeatUnavailable(seats) = &err {
        body.unavailable_seats = Some(seats.iter().map(|s| s.to_string()).collect());
    }
    (status, Json(body))
}

/// Reject a request before it reaches the core.
pub fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message)))
}
