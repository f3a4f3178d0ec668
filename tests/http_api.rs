//! REST surface over the in-memory store, driven with `oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use showtime::application::SimulatedPaymentOracle;
use showtime::config::AppConfig;
use showtime::create_api_router;
use showtime::infrastructure::InMemoryStore;
use showtime::server::Services;
use showtime::shared::clock::ManualClock;

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
}

async fn app() -> TestApp {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 11, 1, 12, 0, 0).unwrap(),
    ));
    let services = Services::new(
        Arc::new(InMemoryStore::new()),
        clock.clone(),
        Arc::new(SimulatedPaymentOracle::approving()),
        &AppConfig::default(),
    );
    let router = create_api_router(services.api_state(None), None);

    let app = TestApp { router, clock };
    let (status, _) = app
        .send(
            "POST",
            "/api/v1/showings",
            None,
            Some(json!({
                "id": "show-1",
                "movie_id": "movie-1",
                "theatre_id": "theatre-1",
                "show_date": "2026-11-02",
                "show_time": "19:30"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    app
}

impl TestApp {
    async fn send(
        &self,
        method: &str,
        uri: &str,
        holder: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(holder) = holder {
            builder = builder.header("x-holder-id", holder);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn lock(&self, holder: &str, seats: &[&str]) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/v1/reservations",
            Some(holder),
            Some(json!({ "showing_id": "show-1", "seat_ids": seats })),
        )
        .await
    }
}

fn reservation_id(body: &Value) -> String {
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn lists_showings_and_seat_map() {
    let app = app().await;

    let (status, body) = app.send("GET", "/api/v1/showings", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], "show-1");
    assert_eq!(body["data"][0]["show_time"], "19:30");
    assert_eq!(body["data"][0]["available_seats"], 100);

    let (status, body) = app
        .send("GET", "/api/v1/showings/show-1/seats", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["seats"][0]["seat_id"], "A1");
    assert_eq!(body["data"]["seats"][0]["status"], "available");

    let (status, _) = app
        .send("GET", "/api/v1/showings/nope/seats", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reservation_routes_need_a_holder() {
    let app = app().await;
    let (status, body) = app
        .send(
            "POST",
            "/api/v1/reservations",
            None,
            Some(json!({ "showing_id": "show-1", "seat_ids": ["A1"] })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn lock_pay_confirm() {
    let app = app().await;

    let (status, body) = app.lock("user-1", &["A1", "A2"]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["booking_status"], "pending");
    assert_eq!(body["data"]["total_amount"], 500);
    assert_eq!(body["data"]["seconds_left"], 300);
    let id = reservation_id(&body);

    let (status, body) = app
        .send(
            "POST",
            &format!("/api/v1/reservations/{id}/confirm"),
            Some("user-1"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/payments",
            Some("user-1"),
            Some(json!({ "reservation_id": id, "method": "upi" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "initiated");
    assert!(body["data"]["transaction_ref"]
        .as_str()
        .unwrap()
        .starts_with("TXN"));
    let payment_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/payments/process",
            Some("user-1"),
            Some(json!({ "reservation_id": id, "success": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["payment_status"], "completed");

    let (status, body) = app
        .send(
            "POST",
            &format!("/api/v1/reservations/{id}/confirm"),
            Some("user-1"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["booking_status"], "confirmed");
    assert_eq!(body["data"]["seconds_left"], 0);

    let (status, body) = app
        .send(
            "GET",
            &format!("/api/v1/payments/{payment_id}"),
            Some("user-1"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "completed");

    let (_, body) = app
        .send("GET", "/api/v1/showings/show-1/seats", None, None)
        .await;
    assert_eq!(body["data"]["seats"][0]["status"], "booked");
}

#[tokio::test]
async fn checkout_charges_through_the_gateway() {
    let app = app().await;
    let (_, body) = app.lock("user-1", &["C3"]).await;
    let id = reservation_id(&body);

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/payments/checkout",
            Some("user-1"),
            Some(json!({ "reservation_id": id, "method": "wallet" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["payment"]["state"], "completed");
    assert_eq!(body["data"]["reservation"]["payment_status"], "completed");
}

#[tokio::test]
async fn taken_seats_are_reported() {
    let app = app().await;
    let (status, _) = app.lock("alice", &["B1", "B2"]).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.lock("bob", &["B2", "B3"]).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["unavailable_seats"], json!(["B2"]));

    let (status, body) = app.lock("bob", &["B3", "Z9"]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Z9"));
}

#[tokio::test]
async fn bad_requests_are_rejected() {
    let app = app().await;

    let (status, _) = app.lock("user-1", &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.lock("user-1", &["A1", "A1"]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send("GET", "/api/v1/reservations/not-a-uuid", Some("user-1"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.lock("user-1", &["D1"]).await;
    let id = reservation_id(&body);
    let (status, body) = app
        .send(
            "POST",
            "/api/v1/payments",
            Some("user-1"),
            Some(json!({ "reservation_id": id, "method": "cash" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("cash"));
}

#[tokio::test]
async fn ownership_is_enforced() {
    let app = app().await;
    let (_, body) = app.lock("alice", &["E5"]).await;
    let id = reservation_id(&body);

    let (status, _) = app
        .send(
            "GET",
            &format!("/api/v1/reservations/{id}"),
            Some("mallory"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            "POST",
            &format!("/api/v1/reservations/{id}/cancel"),
            Some("mallory"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send("GET", "/api/v1/reservations", Some("mallory"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn late_payment_is_gone() {
    let app = app().await;
    let (_, body) = app.lock("user-1", &["F1"]).await;
    let id = reservation_id(&body);

    app.clock.advance(chrono::Duration::minutes(6));

    let (status, _) = app
        .send(
            "POST",
            "/api/v1/payments/process",
            Some("user-1"),
            Some(json!({ "reservation_id": id, "success": true })),
        )
        .await;
    assert_eq!(status, StatusCode::GONE);

    let (_, body) = app
        .send(
            "GET",
            &format!("/api/v1/reservations/{id}"),
            Some("user-1"),
            None,
        )
        .await;
    assert_eq!(body["data"]["booking_status"], "expired");
    assert_eq!(body["data"]["payment_status"], "failed");
}

#[tokio::test]
async fn cancel_then_cancel_again() {
    let app = app().await;
    let (_, body) = app.lock("user-1", &["H1"]).await;
    let id = reservation_id(&body);
    let uri = format!("/api/v1/reservations/{id}/cancel");

    let (status, body) = app.send("POST", &uri, Some("user-1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["booking_status"], "cancelled");

    let (status, body) = app.send("POST", &uri, Some("user-1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["booking_status"], "cancelled");

    let (status, _) = app.lock("user-2", &["H1"]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn health_reports_memory_store() {
    let app = app().await;
    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
}
