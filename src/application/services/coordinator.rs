//! Reservation coordinator
//!
//! Lock, confirm and cancel protocols. Every protocol runs inside one
//! atomic unit: the seat transitions and the reservation write either all
//! commit or none do.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};

use super::{abort_with, release_claimed_seats};
use crate::domain::{
    AtomicUnit, BookingStatus, DomainError, DomainResult, HolderId, PaymentStatus, Reservation,
    ReservationId, ReservationUpdate, SeatId, SeatStatus, SeatTransition, ShowingId,
    TransitionOutcome, UnitOfWork,
};
use crate::shared::clock::SharedClock;

/// Hold parameters supplied by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationPolicy {
    /// Time a locked seat stays reserved before the reclaimer may take it back
    pub hold_duration: Duration,
}

impl Default for ReservationPolicy {
    fn default() -> Self {
        Self {
            hold_duration: Duration::minutes(5),
        }
    }
}

pub struct ReservationCoordinator {
    uow: Arc<dyn UnitOfWork>,
    clock: SharedClock,
    policy: ReservationPolicy,
}

impl ReservationCoordinator {
    pub fn new(uow: Arc<dyn UnitOfWork>, clock: SharedClock, policy: ReservationPolicy) -> Self {
        Self { uow, clock, policy }
    }

    pub fn policy(&self) -> ReservationPolicy {
        self.policy
    }

    /// Lock `seat_ids` for `holder_id` and open a pending reservation.
    pub async fn lock_seats(
        &self,
        showing_id: &ShowingId,
        holder_id: &HolderId,
        seat_ids: &[SeatId],
    ) -> DomainResult<Reservation> {
        validate_seat_request(seat_ids)?;

        let unit = self.uow.begin().await?;
        let seats = unit.inventory().find_seats(showing_id, seat_ids).await?;

        if seats.len() != seat_ids.len() {
            let found: HashSet<&SeatId> = seats.iter().map(|s| &s.seat_id).collect();
            let missing: Vec<SeatId> = seat_ids
                .iter()
                .filter(|id| !found.contains(id))
                .cloned()
                .collect();
            return abort_with(unit, DomainError::InvalidSeats(missing)).await;
        }

        let taken: Vec<SeatId> = seats
            .iter()
            .filter(|s| !s.is_available())
            .map(|s| s.seat_id.clone())
            .collect();
        if !taken.is_empty() {
            metrics::counter!("seat_lock_conflicts_total").increment(1);
            debug!(showing_id = %showing_id, seats = ?taken, "Requested seats already taken");
            return abort_with(unit, DomainError::SeatUnavailable(taken)).await;
        }

        let now = self.clock.now();
        let reservation_id = ReservationId::generate();
        let lock = SeatTransition::Lock {
            holder_id: holder_id.clone(),
            reservation_id,
            at: now,
        };

        let mut lost = Vec::new();
        for seat in &seats {
            let outcome = unit
                .inventory()
                .apply_transition(showing_id, &seat.seat_id, &lock)
                .await?;
            if outcome == TransitionOutcome::Rejected {
                lost.push(seat.seat_id.clone());
            }
        }
        if !lost.is_empty() {
            metrics::counter!("seat_lock_conflicts_total").increment(1);
            warn!(showing_id = %showing_id, seats = ?lost, "Lost seat lock race");
            return abort_with(unit, DomainError::SeatUnavailable(lost)).await;
        }

        let reservation = Reservation::hold(
            reservation_id,
            holder_id.clone(),
            showing_id.clone(),
            &seats,
            now,
            self.policy.hold_duration,
        );
        unit.ledger().create(&reservation).await?;
        unit.commit().await?;

        metrics::counter!("reservations_locked_total").increment(1);
        info!(
            reservation_id = %reservation.id,
            showing_id = %showing_id,
            holder_id = %holder_id,
            seats = reservation.seats.len(),
            total_amount = reservation.total_amount,
            expires_at = %reservation.expires_at,
            "🎟️ Seats locked"
        );
        Ok(reservation)
    }

    /// Turn a paid, still-valid hold into a booking.
    pub async fn confirm_reservation(
        &self,
        reservation_id: ReservationId,
        holder_id: &HolderId,
    ) -> DomainResult<Reservation> {
        let unit = self.uow.begin().await?;
        let mut reservation = match load_owned(&*unit, reservation_id, holder_id).await {
            Ok(r) => r,
            Err(e) => return abort_with(unit, e).await,
        };

        match reservation.booking_status {
            BookingStatus::Pending => {}
            BookingStatus::Expired => {
                return abort_with(unit, DomainError::Expired(reservation_id)).await
            }
            status @ (BookingStatus::Confirmed | BookingStatus::Cancelled) => {
                return abort_with(
                    unit,
                    DomainError::Conflict(format!("Reservation is already {}", status)),
                )
                .await
            }
        }

        let now = self.clock.now();
        if reservation.is_past_deadline(now) {
            // Expiry bookkeeping belongs to the reclaimer.
            return abort_with(unit, DomainError::Expired(reservation_id)).await;
        }
        if reservation.payment_status != PaymentStatus::Completed {
            return abort_with(unit, DomainError::PaymentIncomplete(reservation_id)).await;
        }

        let book = SeatTransition::Book {
            holder_id: reservation.holder_id.clone(),
            reservation_id,
        };
        for seat_id in reservation.seat_ids() {
            let outcome = unit
                .inventory()
                .apply_transition(&reservation.showing_id, seat_id, &book)
                .await?;
            if outcome == TransitionOutcome::Rejected {
                warn!(
                    reservation_id = %reservation_id,
                    seat_id = %seat_id,
                    "Seat no longer locked for reservation"
                );
                return abort_with(
                    unit,
                    DomainError::Conflict(format!("Seat {} is no longer held", seat_id)),
                )
                .await;
            }
        }

        let update = ReservationUpdate::Confirm;
        let outcome = unit
            .ledger()
            .update(reservation_id, &update, reservation.expectation(), now)
            .await?;
        if outcome == TransitionOutcome::Rejected {
            return abort_with(
                unit,
                DomainError::Conflict("Reservation changed concurrently".to_string()),
            )
            .await;
        }
        unit.commit().await?;

        update.apply(&mut reservation, now);
        metrics::counter!("reservations_confirmed_total").increment(1);
        info!(
            reservation_id = %reservation_id,
            holder_id = %holder_id,
            total_amount = reservation.total_amount,
            "✅ Reservation confirmed"
        );
        Ok(reservation)
    }

    /// Cancel a pending reservation and free its seats.
    ///
    /// Cancelling an already cancelled or expired reservation returns it
    /// unchanged. A confirmed reservation cannot be cancelled.
    pub async fn cancel_reservation(
        &self,
        reservation_id: ReservationId,
        holder_id: &HolderId,
    ) -> DomainResult<Reservation> {
        let unit = self.uow.begin().await?;
        let mut reservation = match load_owned(&*unit, reservation_id, holder_id).await {
            Ok(r) => r,
            Err(e) => return abort_with(unit, e).await,
        };

        match reservation.booking_status {
            BookingStatus::Pending => {}
            BookingStatus::Cancelled | BookingStatus::Expired => {
                debug!(
                    reservation_id = %reservation_id,
                    status = %reservation.booking_status,
                    "Cancel on finished reservation is a no-op"
                );
                unit.abort().await?;
                return Ok(reservation);
            }
            BookingStatus::Confirmed => {
                return abort_with(
                    unit,
                    DomainError::Conflict("Confirmed reservations cannot be cancelled".to_string()),
                )
                .await
            }
        }

        let now = self.clock.now();
        let released = release_claimed_seats(
            &*unit,
            &reservation,
            &[SeatStatus::Locked, SeatStatus::Booked],
        )
        .await?;

        let update = ReservationUpdate::Cancel;
        let outcome = unit
            .ledger()
            .update(reservation_id, &update, reservation.expectation(), now)
            .await?;
        if outcome == TransitionOutcome::Rejected {
            return abort_with(
                unit,
                DomainError::Conflict("Reservation changed concurrently".to_string()),
            )
            .await;
        }
        unit.commit().await?;

        update.apply(&mut reservation, now);
        metrics::counter!("reservations_cancelled_total").increment(1);
        info!(
            reservation_id = %reservation_id,
            holder_id = %holder_id,
            seats_released = released,
            "🗑️ Reservation cancelled"
        );
        Ok(reservation)
    }

    pub async fn get_reservation(
        &self,
        reservation_id: ReservationId,
        holder_id: &HolderId,
    ) -> DomainResult<Reservation> {
        let unit = self.uow.begin().await?;
        let result = load_owned(&*unit, reservation_id, holder_id).await;
        unit.abort().await?;
        result
    }

    /// The holder's reservations, newest first.
    pub async fn list_reservations(&self, holder_id: &HolderId) -> DomainResult<Vec<Reservation>> {
        let unit = self.uow.begin().await?;
        let result = unit.ledger().list_for_holder(holder_id).await;
        unit.abort().await?;
        result
    }
}

/// Non-empty, no duplicates.
fn validate_seat_request(seat_ids: &[SeatId]) -> DomainResult<()> {
    if seat_ids.is_empty() {
        return Err(DomainError::Validation(
            "At least one seat must be requested".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    let duplicates: Vec<&str> = seat_ids
        .iter()
        .filter(|id| !seen.insert(*id))
        .map(|id| id.as_str())
        .collect();
    if !duplicates.is_empty() {
        return Err(DomainError::Validation(format!(
            "Duplicate seats in request: {}",
            duplicates.join(", ")
        )));
    }
    Ok(())
}

/// Fetch a reservation and check that `holder_id` owns it.
pub(super) async fn load_owned(
    unit: &dyn AtomicUnit,
    reservation_id: ReservationId,
    holder_id: &HolderId,
) -> DomainResult<Reservation> {
    let reservation = unit
        .ledger()
        .get(reservation_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Reservation", "id", reservation_id))?;
    if !reservation.is_owned_by(holder_id) {
        return Err(DomainError::Forbidden(
            "Reservation belongs to another holder".to_string(),
        ));
    }
    Ok(reservation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::{clock, seeded_store, SHOWING};
    use crate::domain::{Seat, SeatState, UnitOfWork};
    use crate::infrastructure::InMemoryStore;
    use crate::shared::clock::{Clock, ManualClock};

    struct Fixture {
        store: Arc<InMemoryStore>,
        clock: Arc<ManualClock>,
        coordinator: ReservationCoordinator,
    }

    async fn fixture() -> Fixture {
        let store = seeded_store().await;
        let clock = clock();
        let coordinator = ReservationCoordinator::new(
            store.clone(),
            clock.clone(),
            ReservationPolicy::default(),
        );
        Fixture {
            store,
            clock,
            coordinator,
        }
    }

    fn seats(ids: &[&str]) -> Vec<SeatId> {
        ids.iter().map(|s| SeatId::from(*s)).collect()
    }

    fn holder(name: &str) -> HolderId {
        HolderId::from(name)
    }

    fn showing() -> ShowingId {
        ShowingId::from(SHOWING)
    }

    async fn seat(store: &InMemoryStore, id: &str) -> Seat {
        let unit = store.begin().await.unwrap();
        let mut found = unit
            .inventory()
            .find_seats(&showing(), &seats(&[id]))
            .await
            .unwrap();
        found.remove(0)
    }

    async fn mark_paid(store: &InMemoryStore, reservation: &Reservation) {
        let unit = store.begin().await.unwrap();
        let outcome = unit
            .ledger()
            .update(
                reservation.id,
                &ReservationUpdate::Payment(PaymentStatus::Completed),
                reservation.expectation(),
                reservation.created_at,
            )
            .await
            .unwrap();
        assert!(outcome.is_applied());
        unit.commit().await.unwrap();
    }

    #[tokio::test]
    async fn lock_then_confirm_books_both_seats() {
        let f = fixture().await;
        let reservation = f
            .coordinator
            .lock_seats(&showing(), &holder("alice"), &seats(&["A1", "A2"]))
            .await
            .unwrap();

        assert_eq!(reservation.total_amount, 400);
        assert_eq!(reservation.booking_status, BookingStatus::Pending);
        assert_eq!(
            reservation.expires_at,
            f.clock.now() + Duration::minutes(5)
        );
        assert_eq!(seat(&f.store, "A1").await.status(), SeatStatus::Locked);

        mark_paid(&f.store, &reservation).await;
        let confirmed = f
            .coordinator
            .confirm_reservation(reservation.id, &holder("alice"))
            .await
            .unwrap();

        assert_eq!(confirmed.booking_status, BookingStatus::Confirmed);
        for id in ["A1", "A2"] {
            assert_eq!(
                seat(&f.store, id).await.state,
                SeatState::Booked {
                    holder_id: holder("alice"),
                    reservation_id: reservation.id,
                }
            );
        }
    }

    #[tokio::test]
    async fn concurrent_locks_on_one_seat_have_one_winner() {
        let f = fixture().await;
        let coordinator = Arc::new(f.coordinator);

        let attempts = ["alice", "bob"].map(|name| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .lock_seats(&showing(), &holder(name), &seats(&["A1"]))
                    .await
            })
        });

        let mut won = 0;
        let mut lost = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => won += 1,
                Err(DomainError::SeatUnavailable(taken)) => {
                    assert_eq!(taken, seats(&["A1"]));
                    lost += 1;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!((won, lost), (1, 1));
    }

    #[tokio::test]
    async fn failed_lock_leaves_everything_untouched() {
        let f = fixture().await;
        f.coordinator
            .lock_seats(&showing(), &holder("alice"), &seats(&["A2"]))
            .await
            .unwrap();

        let err = f
            .coordinator
            .lock_seats(&showing(), &holder("bob"), &seats(&["A1", "A2", "A3"]))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::SeatUnavailable(ref s) if *s == seats(&["A2"])));
        assert!(seat(&f.store, "A1").await.is_available());
        assert!(seat(&f.store, "A3").await.is_available());
        assert!(f
            .coordinator
            .list_reservations(&holder("bob"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn unknown_seats_are_named() {
        let f = fixture().await;
        let err = f
            .coordinator
            .lock_seats(&showing(), &holder("alice"), &seats(&["A1", "Z9", "Q1"]))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::InvalidSeats(ref s) if *s == seats(&["Z9", "Q1"])));
        assert!(seat(&f.store, "A1").await.is_available());
    }

    #[tokio::test]
    async fn lock_rejects_bad_requests() {
        let f = fixture().await;

        let err = f
            .coordinator
            .lock_seats(&showing(), &holder("alice"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = f
            .coordinator
            .lock_seats(&showing(), &holder("alice"), &seats(&["A1", "A1"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = f
            .coordinator
            .lock_seats(&"nope".into(), &holder("alice"), &seats(&["A1"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "Showing", .. }));
    }

    #[tokio::test]
    async fn confirm_requires_completed_payment() {
        let f = fixture().await;
        let reservation = f
            .coordinator
            .lock_seats(&showing(), &holder("alice"), &seats(&["B1"]))
            .await
            .unwrap();

        let err = f
            .coordinator
            .confirm_reservation(reservation.id, &holder("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::PaymentIncomplete(id) if id == reservation.id));
        assert_eq!(seat(&f.store, "B1").await.status(), SeatStatus::Locked);
    }

    #[tokio::test]
    async fn confirm_after_deadline_is_refused_without_cleanup() {
        let f = fixture().await;
        let reservation = f
            .coordinator
            .lock_seats(&showing(), &holder("alice"), &seats(&["B1"]))
            .await
            .unwrap();
        mark_paid(&f.store, &reservation).await;

        f.clock.advance(Duration::minutes(5));
        assert!(f
            .coordinator
            .confirm_reservation(reservation.id, &holder("alice"))
            .await
            .is_ok());

        let second = f
            .coordinator
            .lock_seats(&showing(), &holder("alice"), &seats(&["B2"]))
            .await
            .unwrap();
        mark_paid(&f.store, &second).await;
        f.clock.advance(Duration::minutes(5) + Duration::seconds(1));

        let err = f
            .coordinator
            .confirm_reservation(second.id, &holder("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Expired(_)));

        let stored = f
            .coordinator
            .get_reservation(second.id, &holder("alice"))
            .await
            .unwrap();
        assert_eq!(stored.booking_status, BookingStatus::Pending);
        assert_eq!(seat(&f.store, "B2").await.status(), SeatStatus::Locked);
    }

    #[tokio::test]
    async fn double_confirm_is_a_conflict() {
        let f = fixture().await;
        let reservation = f
            .coordinator
            .lock_seats(&showing(), &holder("alice"), &seats(&["C1"]))
            .await
            .unwrap();
        mark_paid(&f.store, &reservation).await;

        f.coordinator
            .confirm_reservation(reservation.id, &holder("alice"))
            .await
            .unwrap();
        let err = f
            .coordinator
            .confirm_reservation(reservation.id, &holder("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn cancel_releases_seats_and_repeats_are_no_ops() {
        let f = fixture().await;
        let reservation = f
            .coordinator
            .lock_seats(&showing(), &holder("alice"), &seats(&["C1", "C2"]))
            .await
            .unwrap();

        let cancelled = f
            .coordinator
            .cancel_reservation(reservation.id, &holder("alice"))
            .await
            .unwrap();
        assert_eq!(cancelled.booking_status, BookingStatus::Cancelled);
        assert!(seat(&f.store, "C1").await.is_available());
        assert!(seat(&f.store, "C2").await.is_available());

        // Someone else grabs C1; a repeated cancel must not free it.
        let other = f
            .coordinator
            .lock_seats(&showing(), &holder("bob"), &seats(&["C1"]))
            .await
            .unwrap();
        let again = f
            .coordinator
            .cancel_reservation(reservation.id, &holder("alice"))
            .await
            .unwrap();
        assert_eq!(again, cancelled);
        assert!(seat(&f.store, "C1").await.state.is_claimed_by(&holder("bob"), other.id));
    }

    #[tokio::test]
    async fn confirmed_reservations_cannot_be_cancelled() {
        let f = fixture().await;
        let reservation = f
            .coordinator
            .lock_seats(&showing(), &holder("alice"), &seats(&["A4"]))
            .await
            .unwrap();
        mark_paid(&f.store, &reservation).await;
        f.coordinator
            .confirm_reservation(reservation.id, &holder("alice"))
            .await
            .unwrap();

        let err = f
            .coordinator
            .cancel_reservation(reservation.id, &holder("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(seat(&f.store, "A4").await.status(), SeatStatus::Booked);
    }

    #[tokio::test]
    async fn other_holders_are_forbidden() {
        let f = fixture().await;
        let reservation = f
            .coordinator
            .lock_seats(&showing(), &holder("alice"), &seats(&["A3"]))
            .await
            .unwrap();

        for result in [
            f.coordinator
                .get_reservation(reservation.id, &holder("mallory"))
                .await,
            f.coordinator
                .confirm_reservation(reservation.id, &holder("mallory"))
                .await,
            f.coordinator
                .cancel_reservation(reservation.id, &holder("mallory"))
                .await,
        ] {
            assert!(matches!(result, Err(DomainError::Forbidden(_))));
        }
        assert_eq!(seat(&f.store, "A3").await.status(), SeatStatus::Locked);

        let err = f
            .coordinator
            .get_reservation(ReservationId::generate(), &holder("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "Reservation", .. }));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let f = fixture().await;
        let first = f
            .coordinator
            .lock_seats(&showing(), &holder("alice"), &seats(&["A1"]))
            .await
            .unwrap();
        f.clock.advance(Duration::seconds(10));
        let second = f
            .coordinator
            .lock_seats(&showing(), &holder("alice"), &seats(&["A2"]))
            .await
            .unwrap();

        let listed = f
            .coordinator
            .list_reservations(&holder("alice"))
            .await
            .unwrap();
        let ids: Vec<_> = listed.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
