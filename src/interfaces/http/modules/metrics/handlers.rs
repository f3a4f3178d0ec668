//! Prometheus scrape endpoint
//!
//! Reads from the global `metrics-exporter-prometheus` recorder installed
//! at startup.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct MetricsState {
    pub handle: PrometheusHandle,
}

/// Register help text for every series the service emits.
pub fn describe_metrics() {
    describe_counter!(
        "reservations_locked_total",
        "Reservations created by a successful seat lock"
    );
    describe_counter!(
        "reservations_confirmed_total",
        "Reservations confirmed after payment"
    );
    describe_counter!(
        "reservations_cancelled_total",
        "Pending reservations cancelled by their holder"
    );
    describe_counter!(
        "reservations_expired_total",
        "Reservations expired by the reclaimer or a late payment"
    );
    describe_counter!(
        "seat_lock_conflicts_total",
        "Lock requests rejected because a seat was already taken"
    );
    describe_counter!(
        "payments_recorded_total",
        "Payment verdicts recorded, by verdict"
    );
    describe_counter!("http_requests_total", "HTTP requests by route and status");
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request latency by route"
    );
}

/// `GET /metrics`, unauthenticated
pub async fn prometheus_metrics(State(state): State<MetricsState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        state.handle.render(),
    )
}
