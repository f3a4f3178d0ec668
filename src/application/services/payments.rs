//! Payment association
//!
//! Payments are recorded in their own atomic units, separate from the
//! lock. The oracle is consulted between units so a slow gateway never
//! holds a transaction open.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::coordinator::load_owned;
use super::{abort_with, release_claimed_seats, PaymentOracle};
use crate::domain::{
    AtomicUnit, BookingStatus, DomainError, DomainResult, HolderId, Payment, PaymentId,
    PaymentMethod, PaymentState, PaymentStatus, PaymentVerdict, Reservation, ReservationId,
    ReservationUpdate, SeatStatus, TransitionOutcome, UnitOfWork,
};
use crate::shared::clock::SharedClock;

/// Result of a full oracle-backed checkout
#[derive(Debug, Clone)]
pub struct SettledPayment {
    pub payment: Payment,
    pub reservation: Reservation,
}

pub struct PaymentService {
    uow: Arc<dyn UnitOfWork>,
    clock: SharedClock,
    oracle: Arc<dyn PaymentOracle>,
}

impl PaymentService {
    pub fn new(
        uow: Arc<dyn UnitOfWork>,
        clock: SharedClock,
        oracle: Arc<dyn PaymentOracle>,
    ) -> Self {
        Self { uow, clock, oracle }
    }

    /// Open a payment attempt against a pending, unpaid reservation.
    ///
    /// Any attempt still open for the reservation is failed as superseded,
    /// so at most one attempt is `initiated` at a time.
    pub async fn initiate_payment(
        &self,
        reservation_id: ReservationId,
        holder_id: &HolderId,
        method: PaymentMethod,
    ) -> DomainResult<Payment> {
        let unit = self.uow.begin().await?;
        let reservation = match load_payable(&*unit, reservation_id, holder_id).await {
            Ok(r) => r,
            Err(e) => return abort_with(unit, e).await,
        };

        let now = self.clock.now();
        if reservation.is_past_deadline(now) {
            return abort_with(unit, DomainError::Expired(reservation_id)).await;
        }

        let superseded = PaymentVerdict::Declined {
            reason: "Superseded by a new payment attempt".to_string(),
        };
        let superseded = settle_open(&*unit, reservation_id, &superseded, now).await?;
        for previous in &superseded {
            debug!(payment_id = %previous.id, "Payment attempt superseded");
        }

        let payment = Payment::initiate(
            reservation_id,
            holder_id.clone(),
            reservation.total_amount,
            method,
            now,
        );
        unit.payments().create(&payment).await?;

        let outcome = unit
            .ledger()
            .update(
                reservation_id,
                &ReservationUpdate::AttachPayment(payment.id),
                reservation.expectation(),
                now,
            )
            .await?;
        if outcome == TransitionOutcome::Rejected {
            return abort_with(
                unit,
                DomainError::Conflict("Reservation changed concurrently".to_string()),
            )
            .await;
        }
        unit.commit().await?;

        info!(
            payment_id = %payment.id,
            reservation_id = %reservation_id,
            transaction_ref = %payment.transaction_ref,
            amount = payment.amount,
            "💳 Payment initiated"
        );
        Ok(payment)
    }

    /// Record the oracle's verdict for a reservation.
    ///
    /// A declined verdict keeps the hold so the holder can retry until the
    /// deadline. If the deadline has already passed the reservation is
    /// expired and its seats released before `Expired` is returned.
    pub async fn record_payment(
        &self,
        reservation_id: ReservationId,
        holder_id: &HolderId,
        verdict: &PaymentVerdict,
    ) -> DomainResult<Reservation> {
        self.record_verdict(reservation_id, holder_id, verdict)
            .await
            .map(|(reservation, _)| reservation)
    }

    /// Initiate, charge through the oracle, then record the verdict.
    pub async fn pay(
        &self,
        reservation_id: ReservationId,
        holder_id: &HolderId,
        method: PaymentMethod,
    ) -> DomainResult<SettledPayment> {
        let payment = self
            .initiate_payment(reservation_id, holder_id, method)
            .await?;
        let verdict = self.oracle.charge(&payment).await;
        let (reservation, settled) = self
            .record_verdict(reservation_id, holder_id, &verdict)
            .await?;
        Ok(SettledPayment {
            payment: settled.unwrap_or(payment),
            reservation,
        })
    }

    pub async fn get_payment(
        &self,
        payment_id: PaymentId,
        holder_id: &HolderId,
    ) -> DomainResult<Payment> {
        let unit = self.uow.begin().await?;
        let payment = unit.payments().get(payment_id).await;
        unit.abort().await?;

        let payment = payment?.ok_or_else(|| DomainError::not_found("Payment", "id", payment_id))?;
        if &payment.holder_id != holder_id {
            return Err(DomainError::Forbidden(
                "Payment belongs to another holder".to_string(),
            ));
        }
        Ok(payment)
    }

    async fn record_verdict(
        &self,
        reservation_id: ReservationId,
        holder_id: &HolderId,
        verdict: &PaymentVerdict,
    ) -> DomainResult<(Reservation, Option<Payment>)> {
        let unit = self.uow.begin().await?;
        let mut reservation = match load_payable(&*unit, reservation_id, holder_id).await {
            Ok(r) => r,
            Err(e) => return abort_with(unit, e).await,
        };

        let now = self.clock.now();
        if reservation.is_past_deadline(now) {
            let released =
                release_claimed_seats(&*unit, &reservation, &[SeatStatus::Locked]).await?;
            let expired = PaymentVerdict::Declined {
                reason: "Reservation expired".to_string(),
            };
            settle_open(&*unit, reservation_id, &expired, now).await?;
            let outcome = unit
                .ledger()
                .update(
                    reservation_id,
                    &ReservationUpdate::Expire {
                        payment_failed: true,
                    },
                    reservation.expectation(),
                    now,
                )
                .await?;
            if outcome == TransitionOutcome::Rejected {
                return abort_with(
                    unit,
                    DomainError::Conflict("Reservation changed concurrently".to_string()),
                )
                .await;
            }
            unit.commit().await?;

            metrics::counter!("reservations_expired_total").increment(1);
            info!(
                reservation_id = %reservation_id,
                seats_released = released,
                "⏰ Payment arrived after deadline, reservation expired"
            );
            return Err(DomainError::Expired(reservation_id));
        }

        let status = if verdict.is_approved() {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Failed
        };
        let update = ReservationUpdate::Payment(status);
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
        let settled = settle_open(&*unit, reservation_id, verdict, now).await?.pop();
        unit.commit().await?;

        update.apply(&mut reservation, now);
        metrics::counter!("payments_recorded_total", "verdict" => verdict.label()).increment(1);
        info!(
            reservation_id = %reservation_id,
            verdict = verdict.label(),
            payment_status = %reservation.payment_status,
            "💳 Payment verdict recorded"
        );
        Ok((reservation, settled))
    }
}

/// Owned, pending and not yet paid.
async fn load_payable(
    unit: &dyn AtomicUnit,
    reservation_id: ReservationId,
    holder_id: &HolderId,
) -> DomainResult<Reservation> {
    let reservation = load_owned(unit, reservation_id, holder_id).await?;
    match reservation.booking_status {
        BookingStatus::Pending => {}
        BookingStatus::Expired => return Err(DomainError::Expired(reservation_id)),
        status => {
            return Err(DomainError::Conflict(format!(
                "Reservation is already {}",
                status
            )))
        }
    }
    if reservation.payment_status == PaymentStatus::Completed {
        return Err(DomainError::Conflict(
            "Payment already completed".to_string(),
        ));
    }
    Ok(reservation)
}

/// Settle every attempt still open for the reservation with `verdict`.
async fn settle_open(
    unit: &dyn AtomicUnit,
    reservation_id: ReservationId,
    verdict: &PaymentVerdict,
    now: chrono::DateTime<chrono::Utc>,
) -> DomainResult<Vec<Payment>> {
    let mut settled = Vec::new();
    for mut payment in unit.payments().open_for_reservation(reservation_id).await? {
        payment.settle(verdict, now);
        let outcome = unit
            .payments()
            .settle(&payment, PaymentState::Initiated)
            .await?;
        if outcome == TransitionOutcome::Rejected {
            warn!(payment_id = %payment.id, "Payment settled concurrently");
            return Err(DomainError::Conflict(
                "Payment settled concurrently".to_string(),
            ));
        }
        settled.push(payment);
    }
    Ok(settled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::{clock, seeded_store, SHOWING};
    use crate::application::services::{
        ReservationCoordinator, ReservationPolicy, SimulatedPaymentOracle,
    };
    use crate::domain::{SeatId, ShowingId};
    use crate::infrastructure::InMemoryStore;
    use crate::shared::clock::ManualClock;
    use chrono::Duration;

    struct Fixture {
        store: Arc<InMemoryStore>,
        clock: Arc<ManualClock>,
        coordinator: ReservationCoordinator,
        payments: PaymentService,
    }

    async fn fixture(oracle: SimulatedPaymentOracle) -> Fixture {
        let store = seeded_store().await;
        let clock = clock();
        Fixture {
            coordinator: ReservationCoordinator::new(
                store.clone(),
                clock.clone(),
                ReservationPolicy::default(),
            ),
            payments: PaymentService::new(store.clone(), clock.clone(), Arc::new(oracle)),
            store,
            clock,
        }
    }

    fn alice() -> HolderId {
        HolderId::from("alice")
    }

    async fn hold(f: &Fixture, seat: &str) -> Reservation {
        f.coordinator
            .lock_seats(&ShowingId::from(SHOWING), &alice(), &[SeatId::from(seat)])
            .await
            .unwrap()
    }

    async fn seat_status(f: &Fixture, seat: &str) -> SeatStatus {
        let unit = f.store.begin().await.unwrap();
        let seats = unit
            .inventory()
            .find_seats(&ShowingId::from(SHOWING), &[SeatId::from(seat)])
            .await
            .unwrap();
        seats[0].status()
    }

    #[tokio::test]
    async fn initiate_links_payment_to_reservation() {
        let f = fixture(SimulatedPaymentOracle::approving()).await;
        let reservation = hold(&f, "A1").await;

        let payment = f
            .payments
            .initiate_payment(reservation.id, &alice(), PaymentMethod::Upi)
            .await
            .unwrap();
        assert_eq!(payment.amount, 200);
        assert_eq!(payment.state, PaymentState::Initiated);

        let stored = f
            .coordinator
            .get_reservation(reservation.id, &alice())
            .await
            .unwrap();
        assert_eq!(stored.payment_ref, Some(payment.id));
    }

    #[tokio::test]
    async fn new_attempt_supersedes_the_open_one() {
        let f = fixture(SimulatedPaymentOracle::approving()).await;
        let reservation = hold(&f, "A4").await;

        let first = f
            .payments
            .initiate_payment(reservation.id, &alice(), PaymentMethod::Upi)
            .await
            .unwrap();
        let second = f
            .payments
            .initiate_payment(reservation.id, &alice(), PaymentMethod::Wallet)
            .await
            .unwrap();

        let first = f.payments.get_payment(first.id, &alice()).await.unwrap();
        assert_eq!(first.state, PaymentState::Failed);
        assert_eq!(
            first.gateway_message.as_deref(),
            Some("Superseded by a new payment attempt")
        );

        let settled = f
            .payments
            .record_payment(reservation.id, &alice(), &PaymentVerdict::Approved)
            .await
            .unwrap();
        assert_eq!(settled.payment_ref, Some(second.id));
        let second = f.payments.get_payment(second.id, &alice()).await.unwrap();
        assert_eq!(second.state, PaymentState::Completed);

        let unit = f.store.begin().await.unwrap();
        let open = unit
            .payments()
            .open_for_reservation(reservation.id)
            .await
            .unwrap();
        assert!(open.is_empty());
    }

    #[tokio::test]
    async fn declined_payment_keeps_the_hold() {
        let f = fixture(SimulatedPaymentOracle::declining()).await;
        let reservation = hold(&f, "A1").await;

        let settled = f
            .payments
            .pay(reservation.id, &alice(), PaymentMethod::CreditCard)
            .await
            .unwrap();
        assert_eq!(settled.payment.state, PaymentState::Failed);
        assert_eq!(settled.reservation.payment_status, PaymentStatus::Failed);
        assert_eq!(settled.reservation.booking_status, BookingStatus::Pending);
        assert_eq!(seat_status(&f, "A1").await, SeatStatus::Locked);

        // Retry succeeds before the deadline.
        let retried = f
            .payments
            .record_payment(reservation.id, &alice(), &PaymentVerdict::Approved)
            .await
            .unwrap();
        assert_eq!(retried.payment_status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn approved_checkout_allows_confirmation() {
        let f = fixture(SimulatedPaymentOracle::approving()).await;
        let reservation = hold(&f, "B2").await;

        let settled = f
            .payments
            .pay(reservation.id, &alice(), PaymentMethod::Wallet)
            .await
            .unwrap();
        assert_eq!(settled.payment.state, PaymentState::Completed);
        assert!(settled.payment.paid_at.is_some());

        let confirmed = f
            .coordinator
            .confirm_reservation(reservation.id, &alice())
            .await
            .unwrap();
        assert_eq!(confirmed.booking_status, BookingStatus::Confirmed);
        assert_eq!(seat_status(&f, "B2").await, SeatStatus::Booked);
    }

    #[tokio::test]
    async fn late_verdict_expires_and_releases() {
        let f = fixture(SimulatedPaymentOracle::approving()).await;
        let reservation = hold(&f, "C3").await;
        let payment = f
            .payments
            .initiate_payment(reservation.id, &alice(), PaymentMethod::Upi)
            .await
            .unwrap();

        f.clock.advance(Duration::minutes(6));
        let err = f
            .payments
            .record_payment(reservation.id, &alice(), &PaymentVerdict::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Expired(_)));

        let stored = f
            .coordinator
            .get_reservation(reservation.id, &alice())
            .await
            .unwrap();
        assert_eq!(stored.booking_status, BookingStatus::Expired);
        assert_eq!(stored.payment_status, PaymentStatus::Failed);
        assert_eq!(seat_status(&f, "C3").await, SeatStatus::Available);

        let payment = f.payments.get_payment(payment.id, &alice()).await.unwrap();
        assert_eq!(payment.state, PaymentState::Failed);

        let err = f
            .payments
            .record_payment(reservation.id, &alice(), &PaymentVerdict::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Expired(_)));
    }

    #[tokio::test]
    async fn paid_reservations_reject_more_payments() {
        let f = fixture(SimulatedPaymentOracle::approving()).await;
        let reservation = hold(&f, "A2").await;
        f.payments
            .record_payment(reservation.id, &alice(), &PaymentVerdict::Approved)
            .await
            .unwrap();

        let err = f
            .payments
            .initiate_payment(reservation.id, &alice(), PaymentMethod::Upi)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let err = f
            .payments
            .record_payment(reservation.id, &alice(), &PaymentVerdict::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn payments_are_private_to_their_holder() {
        let f = fixture(SimulatedPaymentOracle::approving()).await;
        let reservation = hold(&f, "A3").await;
        let payment = f
            .payments
            .initiate_payment(reservation.id, &alice(), PaymentMethod::NetBanking)
            .await
            .unwrap();

        let err = f
            .payments
            .get_payment(payment.id, &HolderId::from("bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let err = f
            .payments
            .record_payment(reservation.id, &HolderId::from("bob"), &PaymentVerdict::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let err = f
            .payments
            .get_payment(PaymentId::generate(), &alice())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "Payment", .. }));
    }
}
