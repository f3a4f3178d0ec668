//! Atomic unit abstraction
//!
//! Contains:
//! - `AtomicUnit`: one begin/commit/abort scope exposing inventory, ledger
//!   and payment access
//! - `UnitOfWork`: opens atomic units against a storage backend

use async_trait::async_trait;

use super::payment::PaymentStore;
use super::reservation::ReservationLedger;
use super::showing::ShowingInventory;
use crate::shared::errors::DomainResult;

/// A group of reads and writes that commit or abort together.
///
/// Dropping a unit without calling [`commit`](AtomicUnit::commit) discards
/// its writes.
///
/// ```ignore
/// let unit = uow.begin().await?;
/// let showing = unit.inventory().find_showing(&showing_id).await?;
/// unit.ledger().create(&reservation).await?;
/// unit.commit().await?;
/// ```
#[async_trait]
pub trait AtomicUnit: Send + Sync {
    fn inventory(&self) -> &dyn ShowingInventory;
    fn ledger(&self) -> &dyn ReservationLedger;
    fn payments(&self) -> &dyn PaymentStore;

    async fn commit(self: Box<Self>) -> DomainResult<()>;
    async fn abort(self: Box<Self>) -> DomainResult<()>;
}

/// Storage backend able to open atomic units.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> DomainResult<Box<dyn AtomicUnit>>;
}
