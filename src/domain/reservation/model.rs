//! Reservation domain entity

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::showing::Seat;
use crate::domain::{HolderId, PaymentId, ReservationId, SeatId, ShowingId};

/// Booking lifecycle: `pending` moves once to one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seat claimed by a reservation, with the price snapshotted at lock time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedSeat {
    pub seat_id: SeatId,
    pub category: String,
    pub price: i64,
}

impl From<&Seat> for ReservedSeat {
    fn from(seat: &Seat) -> Self {
        Self {
            seat_id: seat.seat_id.clone(),
            category: seat.category.clone(),
            price: seat.price,
        }
    }
}

/// Seat hold / booking record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub holder_id: HolderId,
    pub showing_id: ShowingId,
    pub seats: Vec<ReservedSeat>,
    /// Sum of seat prices at lock time
    pub total_amount: i64,
    pub booking_status: BookingStatus,
    pub payment_status: PaymentStatus,
    /// Hold deadline, fixed at creation
    pub expires_at: DateTime<Utc>,
    pub payment_ref: Option<PaymentId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// New pending hold over `seats`, expiring `hold` after `now`.
    ///
    /// A deadline past the representable range saturates instead of
    /// overflowing.
    pub fn hold(
        id: ReservationId,
        holder_id: HolderId,
        showing_id: ShowingId,
        seats: &[Seat],
        now: DateTime<Utc>,
        hold: Duration,
    ) -> Self {
        let seats: Vec<ReservedSeat> = seats.iter().map(ReservedSeat::from).collect();
        let total_amount = seats.iter().map(|s| s.price).sum();
        Self {
            id,
            holder_id,
            showing_id,
            seats,
            total_amount,
            booking_status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            expires_at: now.checked_add_signed(hold).unwrap_or(DateTime::<Utc>::MAX_UTC),
            payment_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn seat_ids(&self) -> impl Iterator<Item = &SeatId> {
        self.seats.iter().map(|s| &s.seat_id)
    }

    pub fn is_pending(&self) -> bool {
        self.booking_status == BookingStatus::Pending
    }

    /// Deadline passed: `now > expires_at`
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Pending and past its deadline; the reclaimer's predicate.
    pub fn is_reclaimable(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.expires_at < now
    }

    pub fn is_owned_by(&self, holder: &HolderId) -> bool {
        &self.holder_id == holder
    }

    /// Status pair an update of this snapshot must still find in storage.
    pub fn expectation(&self) -> ExpectedStatus {
        ExpectedStatus {
            booking: self.booking_status,
            payment: self.payment_status,
        }
    }

    /// Remaining hold time, zero once the deadline has passed.
    pub fn time_left(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

/// Optimistic-concurrency guard for reservation writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedStatus {
    pub booking: BookingStatus,
    pub payment: PaymentStatus,
}

/// Field changes a ledger update may carry. `expires_at`, seats and
/// amounts are immutable and have no variant here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationUpdate {
    Confirm,
    Cancel,
    /// Deadline passed; `payment_failed` also marks the payment failed
    Expire { payment_failed: bool },
    /// Oracle verdict recorded
    Payment(PaymentStatus),
    /// A payment attempt was associated
    AttachPayment(PaymentId),
}

impl ReservationUpdate {
    pub fn apply(&self, reservation: &mut Reservation, now: DateTime<Utc>) {
        match self {
            Self::Confirm => reservation.booking_status = BookingStatus::Confirmed,
            Self::Cancel => reservation.booking_status = BookingStatus::Cancelled,
            Self::Expire { payment_failed } => {
                reservation.booking_status = BookingStatus::Expired;
                if *payment_failed {
                    reservation.payment_status = PaymentStatus::Failed;
                }
            }
            Self::Payment(status) => reservation.payment_status = *status,
            Self::AttachPayment(id) => reservation.payment_ref = Some(*id),
        }
        reservation.updated_at = now;
    }
}

// ── Tests ──────────────────────────────────────────────────────
