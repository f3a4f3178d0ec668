//! Payment HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use super::dto::*;
use crate::application::PaymentService;
use crate::domain::{PaymentId, PaymentMethod, PaymentVerdict};
use crate::interfaces::http::common::{
    api_error, bad_request, ApiError, ApiResponse, ApiResult, Holder, ValidatedJson,
};
use crate::interfaces::http::modules::reservations::handlers::parse_reservation_id;
use crate::interfaces::http::modules::reservations::ReservationDto;
use crate::shared::clock::SharedClock;
use crate::shared::retry::{retry_transient, RetryConfig};

#[derive(Clone)]
pub struct PaymentAppState {
    pub payments: Arc<PaymentService>,
    pub clock: SharedClock,
    pub retry: RetryConfig,
}

fn parse_method(raw: &str) -> Result<PaymentMethod, ApiError> {
    PaymentMethod::parse(raw).ok_or_else(|| bad_request(format!("Unknown payment method: {}", raw)))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments",
    tag = "Payments",
    security(("holder_id" = [])),
    request_body = InitiatePaymentRequest,
    responses(
        (status = 200, description = "Payment attempt opened", body = ApiResponse<PaymentDto>),
        (status = 400, description = "Invalid reservation id or method"),
        (status = 403, description = "Reservation belongs to another holder"),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation not payable"),
        (status = 410, description = "Hold deadline passed")
    )
)]
pub async fn initiate_payment(
    State(state): State<PaymentAppState>,
    Holder(holder): Holder,
    ValidatedJson(request): ValidatedJson<InitiatePaymentRequest>,
) -> ApiResult<PaymentDto> {
    let reservation_id = parse_reservation_id(&request.reservation_id)?;
    let method = parse_method(&request.method)?;

    let payment = retry_transient(&state.retry, "initiate_payment", || {
        state
            .payments
            .initiate_payment(reservation_id, &holder, method)
    })
    .await
    .map_err(api_error)?;

    Ok(Json(ApiResponse::success(PaymentDto::from(&payment))))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/process",
    tag = "Payments",
    security(("holder_id" = [])),
    request_body = ProcessPaymentRequest,
    responses(
        (status = 200, description = "Verdict recorded", body = ApiResponse<ReservationDto>),
        (status = 403, description = "Reservation belongs to another holder"),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation not payable or already paid"),
        (status = 410, description = "Hold deadline passed, seats released")
    )
)]
pub async fn process_payment(
    State(state): State<PaymentAppState>,
    Holder(holder): Holder,
    ValidatedJson(request): ValidatedJson<ProcessPaymentRequest>,
) -> ApiResult<ReservationDto> {
    let reservation_id = parse_reservation_id(&request.reservation_id)?;
    let verdict = match (request.success, request.reason) {
        (true, _) => PaymentVerdict::Approved,
        (false, Some(reason)) if !reason.trim().is_empty() => PaymentVerdict::Declined { reason },
        (false, _) => PaymentVerdict::from_success(false),
    };

    let reservation = retry_transient(&state.retry, "record_payment", || {
        state
            .payments
            .record_payment(reservation_id, &holder, &verdict)
    })
    .await
    .map_err(api_error)?;

    Ok(Json(ApiResponse::success(ReservationDto::from_domain(
        &reservation,
        state.clock.now(),
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/checkout",
    tag = "Payments",
    security(("holder_id" = [])),
    request_body = InitiatePaymentRequest,
    responses(
        (status = 200, description = "Charged through the gateway and recorded", body = ApiResponse<CheckoutDto>),
        (status = 403, description = "Reservation belongs to another holder"),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation not payable"),
        (status = 410, description = "Hold deadline passed")
    )
)]
pub async fn checkout(
    State(state): State<PaymentAppState>,
    Holder(holder): Holder,
    ValidatedJson(request): ValidatedJson<InitiatePaymentRequest>,
) -> ApiResult<CheckoutDto> {
    let reservation_id = parse_reservation_id(&request.reservation_id)?;
    let method = parse_method(&request.method)?;

    // Not retried: a replay would open a second attempt and charge again.
    let settled = state
        .payments
        .pay(reservation_id, &holder, method)
        .await
        .map_err(api_error)?;

    Ok(Json(ApiResponse::success(CheckoutDto {
        payment: PaymentDto::from(&settled.payment),
        reservation: ReservationDto::from_domain(&settled.reservation, state.clock.now()),
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/{payment_id}",
    tag = "Payments",
    security(("holder_id" = [])),
    params(("payment_id" = String, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment attempt", body = ApiResponse<PaymentDto>),
        (status = 403, description = "Payment belongs to another holder"),
        (status = 404, description = "Payment not found")
    )
)]
pub async fn get_payment(
    State(state): State<PaymentAppState>,
    Holder(holder): Holder,
    Path(payment_id): Path<String>,
) -> ApiResult<PaymentDto> {
    let payment_id: PaymentId = payment_id
        .parse()
        .map_err(|_| bad_request(format!("Invalid payment id: {}", payment_id)))?;

    let payment = retry_transient(&state.retry, "get_payment", || {
        state.payments.get_payment(payment_id, &holder)
    })
    .await
    .map_err(api_error)?;

    Ok(Json(ApiResponse::success(PaymentDto::from(&payment))))
}
