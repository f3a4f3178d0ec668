//! Payment store interface

use async_trait::async_trait;

use super::model::{Payment, PaymentState};
use crate::domain::showing::TransitionOutcome;
use crate::domain::{PaymentId, ReservationId};
use crate::shared::errors::DomainResult;

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn create(&self, payment: &Payment) -> DomainResult<()>;

    async fn get(&self, id: PaymentId) -> DomainResult<Option<Payment>>;

    /// Attempts for a reservation still in `initiated`, oldest first
    async fn open_for_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> DomainResult<Vec<Payment>>;

    /// Persist the settled fields of `payment` if it is still in `expected`.
    async fn settle(&self, payment: &Payment, expected: PaymentState)
        -> DomainResult<TransitionOutcome>;
}
