use thiserror::Error;

use crate::domain::{ReservationId, SeatId};

#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Unknown seats: {}", join_seats(.0))]
    InvalidSeats(Vec<SeatId>),

    #[error("Seats already locked or booked: {}", join_seats(.0))]
    SeatUnavailable(Vec<SeatId>),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Reservation {0} has expired")]
    Expired(ReservationId),

    #[error("Payment not completed for reservation {0}")]
    PaymentIncomplete(ReservationId),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        Self::NotFound {
            entity,
            field,
            value: value.to_string(),
        }
    }

    /// Whether this error is likely transient (e.g. DB connection lost,
    /// commit conflict) and the whole operation may succeed if retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::Storage(_))
    }
}

fn join_seats(seats: &[SeatId]) -> String {
    seats
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        DomainError::Storage(e.to_string())
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
