//! Background task that periodically expires overdue reservations.
//!
//! Every tick looks for pending reservations whose hold deadline has
//! passed, releases the seats they still hold and marks them `expired`.
//! Each reservation is handled in its own atomic unit.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{abort_with, release_claimed_seats};
use crate::domain::{
    DomainError, DomainResult, Reservation, ReservationUpdate, SeatStatus, TransitionOutcome,
    UnitOfWork,
};
use crate::shared::clock::SharedClock;
use crate::shared::shutdown::ShutdownSignal;

/// Counts from one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Candidates found past their deadline
    pub examined: usize,
    /// Reservations moved to `expired`
    pub expired: usize,
    pub seats_released: usize,
    /// Reservations whose unit failed; picked up again next sweep
    pub failed: usize,
}

pub struct ExpiryReclaimer {
    uow: Arc<dyn UnitOfWork>,
    clock: SharedClock,
    interval: Duration,
}

impl ExpiryReclaimer {
    pub fn new(uow: Arc<dyn UnitOfWork>, clock: SharedClock, interval: Duration) -> Self {
        Self {
            uow,
            clock,
            interval,
        }
    }

    /// Start the reclaimer loop; it stops when `shutdown` fires.
    pub fn start(self: Arc<Self>, shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                check_interval = self.interval.as_secs(),
                "📅 Reservation expiry task started"
            );

            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match self.sweep().await {
                            Ok(report) if report.examined > 0 => {
                                info!(
                                    examined = report.examined,
                                    expired = report.expired,
                                    seats_released = report.seats_released,
                                    failed = report.failed,
                                    "Expiry sweep finished"
                                );
                            }
                            Ok(_) => {}
                            Err(e) => warn!(error = %e, "Reservation expiry check error"),
                        }
                    }
                    _ = shutdown.wait() => {
                        info!("📅 Reservation expiry task shutting down");
                        break;
                    }
                }
            }

            info!("📅 Reservation expiry task stopped");
        })
    }

    /// One pass over every pending reservation past its deadline.
    ///
    /// Only the candidate query can fail the sweep as a whole; a failing
    /// reservation is logged and counted.
    pub async fn sweep(&self) -> DomainResult<SweepReport> {
        let now = self.clock.now();
        let candidates = {
            let unit = self.uow.begin().await?;
            let found = unit.ledger().find_expired(now).await;
            unit.abort().await?;
            found?
        };

        let mut report = SweepReport {
            examined: candidates.len(),
            ..SweepReport::default()
        };
        if candidates.is_empty() {
            return Ok(report);
        }

        info!(count = candidates.len(), "Expiring overdue reservations");

        for reservation in candidates {
            match self.expire_one(&reservation).await {
                Ok(Some(released)) => {
                    report.expired += 1;
                    report.seats_released += released;
                }
                Ok(None) => {}
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        reservation_id = %reservation.id,
                        error = %e,
                        "Failed to expire reservation"
                    );
                }
            }
        }

        if report.expired > 0 {
            metrics::counter!("reservations_expired_total").increment(report.expired as u64);
        }
        Ok(report)
    }

    /// Returns the number of seats released, or `None` if another protocol
    /// already settled the reservation.
    async fn expire_one(&self, candidate: &Reservation) -> DomainResult<Option<usize>> {
        let now = self.clock.now();
        let unit = self.uow.begin().await?;

        let current = match unit.ledger().get(candidate.id).await? {
            Some(r) if r.is_reclaimable(now) => r,
            _ => {
                debug!(reservation_id = %candidate.id, "Reservation settled before expiry");
                unit.abort().await?;
                return Ok(None);
            }
        };

        let released = release_claimed_seats(&*unit, &current, &[SeatStatus::Locked]).await?;
        let outcome = unit
            .ledger()
            .update(
                current.id,
                &ReservationUpdate::Expire {
                    payment_failed: false,
                },
                current.expectation(),
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
            reservation_id = %current.id,
            holder_id = %current.holder_id,
            seats_released = released,
            "⏰ Reservation expired"
        );
        Ok(Some(released))
    }
}
