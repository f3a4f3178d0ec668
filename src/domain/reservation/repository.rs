//! Reservation ledger interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{ExpectedStatus, Reservation, ReservationUpdate};
use crate::domain::showing::TransitionOutcome;
use crate::domain::{HolderId, ReservationId};
use crate::shared::errors::DomainResult;

/// Reservation records inside an atomic unit.
///
/// Every write is conditioned on the status pair the caller last read, so a
/// confirm racing an expiry (or two confirms) cannot both land.
#[async_trait]
pub trait ReservationLedger: Send + Sync {
    /// Insert a new reservation
    async fn create(&self, reservation: &Reservation) -> DomainResult<()>;

    /// Find reservation by ID
    async fn get(&self, id: ReservationId) -> DomainResult<Option<Reservation>>;

    /// Apply `update` if the stored statuses still equal `expected`.
    async fn update(
        &self,
        id: ReservationId,
        update: &ReservationUpdate,
        expected: ExpectedStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<TransitionOutcome>;

    /// Pending reservations with `expires_at < now`, oldest deadline first
    async fn find_expired(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>>;

    /// All reservations of a holder, newest first
    async fn list_for_holder(&self, holder_id: &HolderId) -> DomainResult<Vec<Reservation>>;
}
