//! Showing inventory interface

use async_trait::async_trait;

use super::model::{Seat, SeatTransition, Showing, TransitionOutcome};
use crate::domain::{SeatId, ShowingId};
use crate::shared::errors::DomainResult;

/// Seat-map access inside an atomic unit.
///
/// Writes are only visible to other units once the enclosing unit commits.
#[async_trait]
pub trait ShowingInventory: Send + Sync {
    /// Find a showing with its full seat map
    async fn find_showing(&self, showing_id: &ShowingId) -> DomainResult<Option<Showing>>;

    /// Resolve seat ids against a showing's seat map.
    ///
    /// Returns the seats that exist, in request order; unknown ids are
    /// simply absent from the result. Fails with `NotFound` if the showing
    /// does not exist.
    async fn find_seats(&self, showing_id: &ShowingId, seat_ids: &[SeatId])
        -> DomainResult<Vec<Seat>>;

    /// Compare-and-swap a single seat.
    ///
    /// Applies `transition` only if the seat is currently in the state the
    /// transition expects; otherwise leaves it untouched and returns
    /// [`TransitionOutcome::Rejected`].
    async fn apply_transition(
        &self,
        showing_id: &ShowingId,
        seat_id: &SeatId,
        transition: &SeatTransition,
    ) -> DomainResult<TransitionOutcome>;

    /// Catalog write: store a new showing and its seats.
    async fn insert_showing(&self, showing: &Showing) -> DomainResult<()>;

    /// Catalog read: all showings ordered by date and time.
    async fn list_showings(&self) -> DomainResult<Vec<Showing>>;
}
