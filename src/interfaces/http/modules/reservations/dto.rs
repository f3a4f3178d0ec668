//! Reservation DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::{Reservation, ReservedSeat};

/// Request to hold seats for the calling holder
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LockSeatsRequest {
    #[validate(length(min = 1))]
    pub showing_id: String,
    /// Seat labels such as `A1`; must be unique
    #[validate(length(min = 1, message = "at least one seat is required"))]
    pub seat_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReservedSeatDto {
    pub seat_id: String,
    pub category: String,
    pub price: i64,
}

impl From<&ReservedSeat> for ReservedSeatDto {
    fn from(s: &ReservedSeat) -> Self {
        Self {
            seat_id: s.seat_id.to_string(),
            category: s.category.clone(),
            price: s.price,
        }
    }
}

/// Reservation details in API responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReservationDto {
    pub id: String,
    pub showing_id: String,
    pub seats: Vec<ReservedSeatDto>,
    pub total_amount: i64,
    /// `pending`, `confirmed`, `cancelled` or `expired`
    pub booking_status: String,
    /// `pending`, `completed` or `failed`
    pub payment_status: String,
    pub expires_at: DateTime<Utc>,
    /// Seconds until the hold lapses; 0 once past the deadline
    pub seconds_left: i64,
    pub payment_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReservationDto {
    pub fn from_domain(r: &Reservation, now: DateTime<Utc>) -> Self {
        Self {
            id: r.id.to_string(),
            showing_id: r.showing_id.to_string(),
            seats: r.seats.iter().map(ReservedSeatDto::from).collect(),
            total_amount: r.total_amount,
            booking_status: r.booking_status.as_str().to_string(),
            payment_status: r.payment_status.as_str().to_string(),
            expires_at: r.expires_at,
            seconds_left: if r.is_pending() {
                r.time_left(now).num_seconds()
            } else {
                0
            },
            payment_ref: r.payment_ref.map(|p| p.to_string()),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
