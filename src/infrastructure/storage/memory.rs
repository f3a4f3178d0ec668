//! In-memory storage implementation
//!
//! Each atomic unit works on a staged copy of the whole state and swaps it
//! in on commit. Units are serialised by an async mutex, so the expected-state
//! checks never observe a half-applied unit.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::domain::{
    AtomicUnit, DomainError, DomainResult, ExpectedStatus, HolderId, Payment, PaymentId,
    PaymentState, PaymentStore, Reservation, ReservationId, ReservationLedger, ReservationUpdate,
    Seat, SeatId, SeatTransition, Showing, ShowingId, ShowingInventory,
    TransitionOutcome, UnitOfWork,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    showings: BTreeMap<ShowingId, Showing>,
    reservations: HashMap<ReservationId, Reservation>,
    payments: HashMap<PaymentId, Payment>,
}

/// In-memory storage for development and testing
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<AsyncMutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UnitOfWork for InMemoryStore {
    async fn begin(&self) -> DomainResult<Box<dyn AtomicUnit>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryUnit {
            guard,
            staged: Mutex::new(staged),
        }))
    }
}

struct InMemoryUnit {
    guard: OwnedMutexGuard<MemoryState>,
    staged: Mutex<MemoryState>,
}

impl InMemoryUnit {
    fn with_state<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        let mut state = self.staged.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut state)
    }
}

#[async_trait]
impl AtomicUnit for InMemoryUnit {
    fn inventory(&self) -> &dyn ShowingInventory {
        self
    }

    fn ledger(&self) -> &dyn ReservationLedger {
        self
    }

    fn payments(&self) -> &dyn PaymentStore {
        self
    }

    async fn commit(self: Box<Self>) -> DomainResult<()> {
        let InMemoryUnit { mut guard, staged } = *self;
        *guard = staged.into_inner().unwrap_or_else(|p| p.into_inner());
        Ok(())
    }

    async fn abort(self: Box<Self>) -> DomainResult<()> {
        debug!("Discarding staged in-memory unit");
        Ok(())
    }
}

#[async_trait]
impl ShowingInventory for InMemoryUnit {
    async fn find_showing(&self, showing_id: &ShowingId) -> DomainResult<Option<Showing>> {
        Ok(self.with_state(|s| s.showings.get(showing_id).cloned()))
    }

    async fn find_seats(
        &self,
        showing_id: &ShowingId,
        seat_ids: &[SeatId],
    ) -> DomainResult<Vec<Seat>> {
        self.with_state(|s| {
            let showing = s
                .showings
                .get(showing_id)
                .ok_or_else(|| DomainError::not_found("Showing", "id", showing_id))?;
            Ok(seat_ids
                .iter()
                .filter_map(|id| showing.seat(id).cloned())
                .collect())
        })
    }

    async fn apply_transition(
        &self,
        showing_id: &ShowingId,
        seat_id: &SeatId,
        transition: &SeatTransition,
    ) -> DomainResult<TransitionOutcome> {
        self.with_state(|s| {
            let seat = s
                .showings
                .get_mut(showing_id)
                .and_then(|showing| showing.seat_mut(seat_id));
            let Some(seat) = seat else {
                return Ok(TransitionOutcome::Rejected);
            };
            match transition.apply(&seat.state) {
                Some(next) => {
                    seat.state = next;
                    Ok(TransitionOutcome::Applied)
                }
                None => Ok(TransitionOutcome::Rejected),
            }
        })
    }

    async fn insert_showing(&self, showing: &Showing) -> DomainResult<()> {
        self.with_state(|s| {
            if s.showings.contains_key(&showing.id) {
                return Err(DomainError::Conflict(format!(
                    "Showing {} already exists",
                    showing.id
                )));
            }
            s.showings.insert(showing.id.clone(), showing.clone());
            Ok(())
        })
    }

    async fn list_showings(&self) -> DomainResult<Vec<Showing>> {
        let mut showings: Vec<Showing> =
            self.with_state(|s| s.showings.values().cloned().collect());
        showings.sort_by_key(|s| (s.show_date, s.show_time));
        Ok(showings)
    }
}

#[async_trait]
impl ReservationLedger for InMemoryUnit {
    async fn create(&self, reservation: &Reservation) -> DomainResult<()> {
        self.with_state(|s| {
            if s.reservations.contains_key(&reservation.id) {
                return Err(DomainError::Conflict(format!(
                    "Reservation {} already exists",
                    reservation.id
                )));
            }
            s.reservations.insert(reservation.id, reservation.clone());
            Ok(())
        })
    }

    async fn get(&self, id: ReservationId) -> DomainResult<Option<Reservation>> {
        Ok(self.with_state(|s| s.reservations.get(&id).cloned()))
    }

    async fn update(
        &self,
        id: ReservationId,
        update: &ReservationUpdate,
        expected: ExpectedStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<TransitionOutcome> {
        self.with_state(|s| {
            let Some(reservation) = s.reservations.get_mut(&id) else {
                return Err(DomainError::not_found("Reservation", "id", id));
            };
            if reservation.expectation() != expected {
                return Ok(TransitionOutcome::Rejected);
            }
            update.apply(reservation, now);
            Ok(TransitionOutcome::Applied)
        })
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>> {
        let mut expired: Vec<Reservation> = self.with_state(|s| {
            s.reservations
                .values()
                .filter(|r| r.is_reclaimable(now))
                .cloned()
                .collect()
        });
        expired.sort_by_key(|r| r.expires_at);
        Ok(expired)
    }

    async fn list_for_holder(&self, holder_id: &HolderId) -> DomainResult<Vec<Reservation>> {
        let mut list: Vec<Reservation> = self.with_state(|s| {
            s.reservations
                .values()
                .filter(|r| r.is_owned_by(holder_id))
                .cloned()
                .collect()
        });
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }
}

#[async_trait]
impl PaymentStore for InMemoryUnit {
    async fn create(&self, payment: &Payment) -> DomainResult<()> {
        self.with_state(|s| {
            s.payments.insert(payment.id, payment.clone());
        });
        Ok(())
    }

    async fn get(&self, id: PaymentId) -> DomainResult<Option<Payment>> {
        Ok(self.with_state(|s| s.payments.get(&id).cloned()))
    }

    async fn open_for_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> DomainResult<Vec<Payment>> {
        Ok(self.with_state(|s| {
            let mut open: Vec<Payment> = s
                .payments
                .values()
                .filter(|p| p.reservation_id == reservation_id)
                .filter(|p| p.state == PaymentState::Initiated)
                .cloned()
                .collect();
            open.sort_by_key(|p| p.created_at);
            open
        }))
    }

    async fn settle(
        &self,
        payment: &Payment,
        expected: PaymentState,
    ) -> DomainResult<TransitionOutcome> {
        self.with_state(|s| match s.payments.get_mut(&payment.id) {
            Some(stored) if stored.state == expected => {
                stored.state = payment.state;
                stored.paid_at = payment.paid_at;
                stored.gateway_message = payment.gateway_message.clone();
                Ok(TransitionOutcome::Applied)
            }
            Some(_) => Ok(TransitionOutcome::Rejected),
            None => Err(DomainError::not_found("Payment", "id", payment.id)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewShowing, SeatLayout, SeatState};
    use chrono::{NaiveDate, NaiveTime};

    fn showing() -> Showing {
        NewShowing {
            id: "show-1".into(),
            movie_id: "movie-1".into(),
            theatre_id: "theatre-1".into(),
            screen_number: 1,
            show_date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            show_time: NaiveTime::from_hms_opt(19, 30, 0).unwrap(),
            layout: SeatLayout::standard(),
        }
        .into_showing()
    }

    fn lock(holder: &str) -> SeatTransition {
        SeatTransition::Lock {
            holder_id: holder.into(),
            reservation_id: ReservationId::generate(),
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn committed_writes_are_visible_to_later_units() {
        let store = InMemoryStore::new();
        let unit = store.begin().await.unwrap();
        unit.inventory().insert_showing(&showing()).await.unwrap();
        unit.commit().await.unwrap();

        let unit = store.begin().await.unwrap();
        let found = unit.inventory().find_showing(&"show-1".into()).await.unwrap();
        assert_eq!(found.unwrap().seats.len(), 100);
    }

    #[tokio::test]
    async fn aborted_writes_are_discarded() {
        let store = InMemoryStore::new();
        let unit = store.begin().await.unwrap();
        unit.inventory().insert_showing(&showing()).await.unwrap();
        unit.commit().await.unwrap();

        let unit = store.begin().await.unwrap();
        let outcome = unit
            .inventory()
            .apply_transition(&"show-1".into(), &"A1".into(), &lock("u1"))
            .await
            .unwrap();
        assert!(outcome.is_applied());
        unit.abort().await.unwrap();

        let unit = store.begin().await.unwrap();
        let seats = unit
            .inventory()
            .find_seats(&"show-1".into(), &["A1".into()])
            .await
            .unwrap();
        assert_eq!(seats[0].state, SeatState::Available);
    }

    #[tokio::test]
    async fn dropped_unit_counts_as_abort() {
        let store = InMemoryStore::new();
        {
            let unit = store.begin().await.unwrap();
            unit.inventory().insert_showing(&showing()).await.unwrap();
        }
        let unit = store.begin().await.unwrap();
        assert!(unit.inventory().list_showings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn transition_on_unknown_seat_is_rejected() {
        let store = InMemoryStore::new();
        let unit = store.begin().await.unwrap();
        unit.inventory().insert_showing(&showing()).await.unwrap();

        let outcome = unit
            .inventory()
            .apply_transition(&"show-1".into(), &"Z99".into(), &lock("u1"))
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Rejected);
    }

    #[tokio::test]
    async fn find_seats_requires_showing() {
        let store = InMemoryStore::new();
        let unit = store.begin().await.unwrap();
        let err = unit
            .inventory()
            .find_seats(&"missing".into(), &["A1".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "Showing", .. }));
    }
}
