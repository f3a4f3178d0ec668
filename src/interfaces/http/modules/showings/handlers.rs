//! Showing HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use super::dto::*;
use crate::application::ShowingCatalog;
use crate::domain::{NewShowing, ShowingId};
use crate::interfaces::http::common::{api_error, bad_request, ApiResponse, ApiResult, ValidatedJson};
use crate::shared::retry::{retry_transient, RetryConfig};

#[derive(Clone)]
pub struct ShowingAppState {
    pub catalog: Arc<ShowingCatalog>,
    pub retry: RetryConfig,
}

#[utoipa::path(
    get,
    path = "/api/v1/showings",
    tag = "Showings",
    responses(
        (status = 200, description = "Scheduled showings", body = ApiResponse<Vec<ShowingDto>>)
    )
)]
pub async fn list_showings(State(state): State<ShowingAppState>) -> ApiResult<Vec<ShowingDto>> {
    let showings = retry_transient(&state.retry, "list_showings", || {
        state.catalog.list_showings()
    })
    .await
    .map_err(api_error)?;

    Ok(Json(ApiResponse::success(
        showings.iter().map(ShowingDto::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/showings/{showing_id}/seats",
    tag = "Showings",
    params(("showing_id" = String, Path, description = "Showing ID")),
    responses(
        (status = 200, description = "Seat map with current status", body = ApiResponse<SeatMapDto>),
        (status = 404, description = "Showing not found")
    )
)]
pub async fn get_seat_map(
    State(state): State<ShowingAppState>,
    Path(showing_id): Path<String>,
) -> ApiResult<SeatMapDto> {
    let showing_id = ShowingId::new(showing_id);
    let showing = retry_transient(&state.retry, "seat_map", || {
        state.catalog.seat_map(&showing_id)
    })
    .await
    .map_err(api_error)?;

    Ok(Json(ApiResponse::success(SeatMapDto::from(&showing))))
}

#[utoipa::path(
    post,
    path = "/api/v1/showings",
    tag = "Showings",
    request_body = CreateShowingRequest,
    responses(
        (status = 200, description = "Showing created", body = ApiResponse<SeatMapDto>),
        (status = 400, description = "Invalid layout or time"),
        (status = 409, description = "Showing already exists")
    )
)]
pub async fn create_showing(
    State(state): State<ShowingAppState>,
    ValidatedJson(request): ValidatedJson<CreateShowingRequest>,
) -> ApiResult<SeatMapDto> {
    let show_time = request
        .parse_time()
        .ok_or_else(|| bad_request("show_time must be HH:MM"))?;

    let new = NewShowing {
        id: ShowingId::new(request.id.clone()),
        movie_id: request.movie_id.clone(),
        theatre_id: request.theatre_id.clone(),
        screen_number: request.screen_number,
        show_date: request.show_date,
        show_time,
        layout: request.layout(),
    };
    let showing = state.catalog.create_showing(new).await.map_err(api_error)?;

    Ok(Json(ApiResponse::success(SeatMapDto::from(&showing))))
}
