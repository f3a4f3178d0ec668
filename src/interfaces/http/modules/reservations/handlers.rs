//! Reservation HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use super::dto::*;
use crate::application::ReservationCoordinator;
use crate::domain::{Reservation, ReservationId, SeatId, ShowingId};
use crate::interfaces::http::common::{
    api_error, bad_request, ApiError, ApiResponse, ApiResult, Holder, ValidatedJson,
};
use crate::shared::clock::SharedClock;
use crate::shared::retry::{retry_transient, RetryConfig};

/// Application state for reservation handlers.
#[derive(Clone)]
pub struct ReservationAppState {
    pub coordinator: Arc<ReservationCoordinator>,
    pub clock: SharedClock,
    pub retry: RetryConfig,
}

impl ReservationAppState {
    fn dto(&self, r: &Reservation) -> ReservationDto {
        ReservationDto::from_domain(r, self.clock.now())
    }
}

pub(crate) fn parse_reservation_id(raw: &str) -> Result<ReservationId, ApiError> {
    raw.parse()
        .map_err(|_| bad_request(format!("Invalid reservation id: {}", raw)))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations",
    tag = "Reservations",
    security(("holder_id" = [])),
    request_body = LockSeatsRequest,
    responses(
        (status = 200, description = "Seats locked, reservation pending", body = ApiResponse<ReservationDto>),
        (status = 400, description = "Unknown seats or invalid request"),
        (status = 404, description = "Showing not found"),
        (status = 409, description = "Seats already locked or booked")
    )
)]
pub async fn lock_seats(
    State(state): State<ReservationAppState>,
    Holder(holder): Holder,
    ValidatedJson(request): ValidatedJson<LockSeatsRequest>,
) -> ApiResult<ReservationDto> {
    let showing_id = ShowingId::new(request.showing_id);
    let seat_ids: Vec<SeatId> = request.seat_ids.into_iter().map(SeatId::new).collect();

    let reservation = retry_transient(&state.retry, "lock_seats", || {
        state.coordinator.lock_seats(&showing_id, &holder, &seat_ids)
    })
    .await
    .map_err(api_error)?;

    Ok(Json(ApiResponse::success(state.dto(&reservation))))
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations",
    tag = "Reservations",
    security(("holder_id" = [])),
    responses(
        (status = 200, description = "The caller's reservations, newest first", body = ApiResponse<Vec<ReservationDto>>)
    )
)]
pub async fn list_reservations(
    State(state): State<ReservationAppState>,
    Holder(holder): Holder,
) -> ApiResult<Vec<ReservationDto>> {
    let reservations = retry_transient(&state.retry, "list_reservations", || {
        state.coordinator.list_reservations(&holder)
    })
    .await
    .map_err(api_error)?;

    Ok(Json(ApiResponse::success(
        reservations.iter().map(|r| state.dto(r)).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/{reservation_id}",
    tag = "Reservations",
    security(("holder_id" = [])),
    params(("reservation_id" = String, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation", body = ApiResponse<ReservationDto>),
        (status = 403, description = "Reservation belongs to another holder"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    State(state): State<ReservationAppState>,
    Holder(holder): Holder,
    Path(reservation_id): Path<String>,
) -> ApiResult<ReservationDto> {
    let reservation_id = parse_reservation_id(&reservation_id)?;
    let reservation = retry_transient(&state.retry, "get_reservation", || {
        state.coordinator.get_reservation(reservation_id, &holder)
    })
    .await
    .map_err(api_error)?;

    Ok(Json(ApiResponse::success(state.dto(&reservation))))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{reservation_id}/confirm",
    tag = "Reservations",
    security(("holder_id" = [])),
    params(("reservation_id" = String, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation confirmed, seats booked", body = ApiResponse<ReservationDto>),
        (status = 402, description = "Payment not completed"),
        (status = 403, description = "Reservation belongs to another holder"),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation already confirmed or cancelled"),
        (status = 410, description = "Hold deadline passed")
    )
)]
pub async fn confirm_reservation(
    State(state): State<ReservationAppState>,
    Holder(holder): Holder,
    Path(reservation_id): Path<String>,
) -> ApiResult<ReservationDto> {
    let reservation_id = parse_reservation_id(&reservation_id)?;
    let reservation = retry_transient(&state.retry, "confirm_reservation", || {
        state.coordinator.confirm_reservation(reservation_id, &holder)
    })
    .await
    .map_err(api_error)?;

    Ok(Json(ApiResponse::success(state.dto(&reservation))))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{reservation_id}/cancel",
    tag = "Reservations",
    security(("holder_id" = [])),
    params(("reservation_id" = String, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation cancelled (or already finished)", body = ApiResponse<ReservationDto>),
        (status = 403, description = "Reservation belongs to another holder"),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation already confirmed")
    )
)]
pub async fn cancel_reservation(
    State(state): State<ReservationAppState>,
    Holder(holder): Holder,
    Path(reservation_id): Path<String>,
) -> ApiResult<ReservationDto> {
    let reservation_id = parse_reservation_id(&reservation_id)?;
    let reservation = retry_transient(&state.retry, "cancel_reservation", || {
        state.coordinator.cancel_reservation(reservation_id, &holder)
    })
    .await
    .map_err(api_error)?;

    Ok(Json(ApiResponse::success(state.dto(&reservation))))
}
