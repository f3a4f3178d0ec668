//! Application services

mod catalog;
mod coordinator;
mod payment_oracle;
mod payments;
mod reservation_expiry;

pub use catalog::ShowingCatalog;
pub use coordinator::{ReservationCoordinator, ReservationPolicy};
pub use payment_oracle::{PaymentOracle, SimulatedPaymentOracle};
pub use payments::{PaymentService, SettledPayment};
pub use reservation_expiry::{ExpiryReclaimer, SweepReport};

use tracing::warn;

use crate::domain::{
    AtomicUnit, DomainError, DomainResult, Reservation, SeatStatus, SeatTransition,
};

/// Roll `unit` back and surface `err`.
async fn abort_with<T>(unit: Box<dyn AtomicUnit>, err: DomainError) -> DomainResult<T> {
    if let Err(e) = unit.abort().await {
        warn!(error = %e, "Failed to roll back atomic unit");
    }
    Err(err)
}

/// Release every seat still claimed by `reservation` in one of `from`
/// states. Seats found in any other state are left alone. Returns the
/// number of seats released.
async fn release_claimed_seats(
    unit: &dyn AtomicUnit,
    reservation: &Reservation,
    from: &[SeatStatus],
) -> DomainResult<usize> {
    let mut released = 0;
    for seat_id in reservation.seat_ids() {
        for status in from {
            let transition = SeatTransition::Release {
                holder_id: reservation.holder_id.clone(),
                reservation_id: reservation.id,
                from: *status,
            };
            let outcome = unit
                .inventory()
                .apply_transition(&reservation.showing_id, seat_id, &transition)
                .await?;
            if outcome.is_applied() {
                released += 1;
                break;
            }
        }
    }
    Ok(released)
}
