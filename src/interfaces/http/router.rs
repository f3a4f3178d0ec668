//! API router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::{PaymentService, ReservationCoordinator, ShowingCatalog};
use crate::shared::clock::SharedClock;
use crate::shared::retry::RetryConfig;

use super::common::{ApiResponse, HOLDER_HEADER};
use super::modules::health::{self, HealthState};
use super::modules::metrics::{self as metrics_api, http_metrics_middleware, MetricsState};
use super::modules::payments::{self, PaymentAppState};
use super::modules::request_id::request_id_middleware;
use super::modules::reservations::{self, ReservationAppState};
use super::modules::showings::{self, ShowingAppState};

/// Everything the API handlers need. Each handler extracts its own slice
/// through `FromRef`.
#[derive(Clone)]
pub struct ApiState {
    pub catalog: Arc<ShowingCatalog>,
    pub coordinator: Arc<ReservationCoordinator>,
    pub payments: Arc<PaymentService>,
    pub clock: SharedClock,
    pub retry: RetryConfig,
    /// `None` when running on the in-memory store
    pub db: Option<DatabaseConnection>,
    pub started_at: Arc<Instant>,
}

impl FromRef<ApiState> for ShowingAppState {
    fn from_ref(s: &ApiState) -> Self {
        ShowingAppState {
            catalog: Arc::clone(&s.catalog),
            retry: s.retry.clone(),
        }
    }
}

impl FromRef<ApiState> for ReservationAppState {
    fn from_ref(s: &ApiState) -> Self {
        ReservationAppState {
            coordinator: Arc::clone(&s.coordinator),
            clock: Arc::clone(&s.clock),
            retry: s.retry.clone(),
        }
    }
}

impl FromRef<ApiState> for PaymentAppState {
    fn from_ref(s: &ApiState) -> Self {
        PaymentAppState {
            payments: Arc::clone(&s.payments),
            clock: Arc::clone(&s.clock),
            retry: s.retry.clone(),
        }
    }
}

impl FromRef<ApiState> for HealthState {
    fn from_ref(s: &ApiState) -> Self {
        HealthState {
            db: s.db.clone(),
            started_at: Arc::clone(&s.started_at),
        }
    }
}

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "holder_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    HOLDER_HEADER,
                    "Identity of the end user, forwarded by the gateway",
                ))),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        showings::list_showings,
        showings::get_seat_map,
        showings::create_showing,
        reservations::lock_seats,
        reservations::list_reservations,
        reservations::get_reservation,
        reservations::confirm_reservation,
        reservations::cancel_reservation,
        payments::initiate_payment,
        payments::process_payment,
        payments::checkout,
        payments::get_payment,
    ),
    components(
        schemas(
            ApiResponse<String>,
            health::HealthResponse,
            health::ComponentHealth,
            showings::ShowingDto,
            showings::SeatDto,
            showings::SeatMapDto,
            showings::SeatCategoryDto,
            showings::CreateShowingRequest,
            reservations::LockSeatsRequest,
            reservations::ReservationDto,
            reservations::ReservedSeatDto,
            payments::InitiatePaymentRequest,
            payments::ProcessPaymentRequest,
            payments::PaymentDto,
            payments::CheckoutDto,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Showings", description = "Showings and their seat maps"),
        (name = "Reservations", description = "Seat holds: lock, confirm, cancel"),
        (name = "Payments", description = "Payment attempts and gateway verdicts"),
    ),
    info(
        title = "Showtime Booking API",
        version = "1.0.0",
        description = "Seat reservation and checkout for theatre showings",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Build the REST router. `metrics` is `None` when no Prometheus recorder
/// is installed (tests), in which case `/metrics` is not mounted.
pub fn create_api_router(state: ApiState, metrics: Option<PrometheusHandle>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route(
            "/showings",
            get(showings::list_showings).post(showings::create_showing),
        )
        .route("/showings/{showing_id}/seats", get(showings::get_seat_map))
        .route(
            "/reservations",
            get(reservations::list_reservations).post(reservations::lock_seats),
        )
        .route(
            "/reservations/{reservation_id}",
            get(reservations::get_reservation),
        )
        .route(
            "/reservations/{reservation_id}/confirm",
            post(reservations::confirm_reservation),
        )
        .route(
            "/reservations/{reservation_id}/cancel",
            post(reservations::cancel_reservation),
        )
        .route("/payments", post(payments::initiate_payment))
        .route("/payments/process", post(payments::process_payment))
        .route("/payments/checkout", post(payments::checkout))
        .route("/payments/{payment_id}", get(payments::get_payment));

    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api)
        .with_state(state);

    if let Some(handle) = metrics {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics_api::prometheus_metrics))
                .with_state(MetricsState { handle }),
        );
    }

    router
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
}
