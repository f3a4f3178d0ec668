//! SeaORM implementation of the atomic unit
//!
//! One unit wraps one database transaction. Seat, reservation and payment
//! writes are conditional `UPDATE … WHERE <expected state>` statements; a
//! statement that touches zero rows means another writer got there first.
//!
//! SQLite admits one writer at a time and reports `database is locked` to a
//! deferred transaction that tries to upgrade while another holds the write
//! lock. Units opened by the same [`SeaOrmUnitOfWork`] therefore take an
//! in-process writer lock for their whole lifetime, so contention surfaces
//! as a rejected conditional update rather than a storage error.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::domain::{
    AtomicUnit, BookingStatus, DomainError, DomainResult, ExpectedStatus, HolderId, Payment,
    PaymentId, PaymentMethod, PaymentState, PaymentStatus, PaymentStore, Reservation,
    ReservationId, ReservationLedger, ReservationUpdate, ReservedSeat, Seat, SeatId, SeatState,
    SeatStatus, SeatTransition, Showing, ShowingId, ShowingInventory, TransitionOutcome,
    UnitOfWork,
};
use crate::infrastructure::database::entities::{payment, reservation, seat, showing};

/// Opens [`SeaOrmAtomicUnit`]s on a connection pool
#[derive(Clone)]
pub struct SeaOrmUnitOfWork {
    db: DatabaseConnection,
    writer: Arc<AsyncMutex<()>>,
}

impl SeaOrmUnitOfWork {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            writer: Arc::new(AsyncMutex::new(())),
        }
    }
}

#[async_trait]
impl UnitOfWork for SeaOrmUnitOfWork {
    async fn begin(&self) -> DomainResult<Box<dyn AtomicUnit>> {
        let writer = self.writer.clone().lock_owned().await;
        let txn = self.db.begin().await?;
        Ok(Box::new(SeaOrmAtomicUnit {
            txn,
            _writer: writer,
        }))
    }
}

/// Field order matters: the transaction is finished before the writer lock
/// is released on drop.
pub struct SeaOrmAtomicUnit {
    txn: DatabaseTransaction,
    _writer: OwnedMutexGuard<()>,
}

#[async_trait]
impl AtomicUnit for SeaOrmAtomicUnit {
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
        self.txn.commit().await?;
        Ok(())
    }

    async fn abort(self: Box<Self>) -> DomainResult<()> {
        debug!("Rolling back transaction");
        self.txn.rollback().await?;
        Ok(())
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn corrupt(entity: &str, detail: impl std::fmt::Display) -> DomainError {
    DomainError::Storage(format!("Corrupt {} row: {}", entity, detail))
}

fn parse_uuid<T: std::str::FromStr>(entity: &str, raw: &str) -> DomainResult<T> {
    raw.parse()
        .map_err(|_| corrupt(entity, format!("invalid id {}", raw)))
}

/// Column values encoding `state`: status, holder, reservation, held_at.
fn state_columns(
    state: &SeatState,
) -> (
    &'static str,
    Option<String>,
    Option<String>,
    Option<DateTime<Utc>>,
) {
    (
        state.status().as_str(),
        state.holder_id().map(|h| h.to_string()),
        state.reservation_id().map(|r| r.to_string()),
        state.held_at(),
    )
}

fn seat_to_domain(m: seat::Model) -> DomainResult<Seat> {
    let status =
        SeatStatus::parse(&m.status).ok_or_else(|| corrupt("seat", format!("status {}", m.status)))?;
    let claim = || -> DomainResult<(HolderId, ReservationId)> {
        match (&m.holder_id, &m.reservation_id) {
            (Some(holder), Some(reservation)) => Ok((
                HolderId::new(holder.clone()),
                parse_uuid("seat", reservation)?,
            )),
            _ => Err(corrupt("seat", format!("{} {} without holder", m.seat_id, m.status))),
        }
    };
    let state = match status {
        SeatStatus::Available => SeatState::Available,
        SeatStatus::Locked => {
            let (holder_id, reservation_id) = claim()?;
            let held_at = m
                .held_at
                .ok_or_else(|| corrupt("seat", format!("{} locked without held_at", m.seat_id)))?;
            SeatState::Locked {
                holder_id,
                reservation_id,
                held_at,
            }
        }
        SeatStatus::Booked => {
            let (holder_id, reservation_id) = claim()?;
            SeatState::Booked {
                holder_id,
                reservation_id,
            }
        }
    };
    Ok(Seat {
        seat_id: SeatId::new(m.seat_id),
        row: m.row_label,
        column: m.column_number as u32,
        category: m.category,
        price: m.price,
        state,
    })
}

fn seat_to_active(showing_id: &ShowingId, position: usize, s: &Seat) -> seat::ActiveModel {
    let (status, holder_id, reservation_id, held_at) = state_columns(&s.state);
    seat::ActiveModel {
        showing_id: Set(showing_id.to_string()),
        seat_id: Set(s.seat_id.to_string()),
        position: Set(position as i32),
        row_label: Set(s.row.clone()),
        column_number: Set(s.column as i32),
        category: Set(s.category.clone()),
        price: Set(s.price),
        status: Set(status.to_string()),
        holder_id: Set(holder_id),
        reservation_id: Set(reservation_id),
        held_at: Set(held_at),
    }
}

fn showing_to_domain(m: showing::Model, seats: Vec<seat::Model>) -> DomainResult<Showing> {
    Ok(Showing {
        id: ShowingId::new(m.id),
        movie_id: m.movie_id,
        theatre_id: m.theatre_id,
        screen_number: m.screen_number as u32,
        show_date: m.show_date,
        show_time: m.show_time,
        seats: seats
            .into_iter()
            .map(seat_to_domain)
            .collect::<DomainResult<_>>()?,
    })
}

fn reservation_to_domain(m: reservation::Model) -> DomainResult<Reservation> {
    let seats: Vec<ReservedSeat> =
        serde_json::from_str(&m.seats).map_err(|e| corrupt("reservation", e))?;
    Ok(Reservation {
        id: parse_uuid("reservation", &m.id)?,
        holder_id: HolderId::new(m.holder_id),
        showing_id: ShowingId::new(m.showing_id),
        seats,
        total_amount: m.total_amount,
        booking_status: BookingStatus::parse(&m.booking_status)
            .ok_or_else(|| corrupt("reservation", format!("status {}", m.booking_status)))?,
        payment_status: PaymentStatus::parse(&m.payment_status)
            .ok_or_else(|| corrupt("reservation", format!("payment {}", m.payment_status)))?,
        expires_at: m.expires_at,
        payment_ref: m
            .payment_ref
            .as_deref()
            .map(|raw| parse_uuid("reservation", raw))
            .transpose()?,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn payment_to_domain(m: payment::Model) -> DomainResult<Payment> {
    Ok(Payment {
        id: parse_uuid("payment", &m.id)?,
        reservation_id: parse_uuid("payment", &m.reservation_id)?,
        holder_id: HolderId::new(m.holder_id),
        amount: m.amount,
        method: PaymentMethod::parse(&m.method)
            .ok_or_else(|| corrupt("payment", format!("method {}", m.method)))?,
        state: PaymentState::parse(&m.state)
            .ok_or_else(|| corrupt("payment", format!("state {}", m.state)))?,
        transaction_ref: m.transaction_ref,
        gateway_message: m.gateway_message,
        paid_at: m.paid_at,
        created_at: m.created_at,
    })
}

fn outcome(rows_affected: u64) -> TransitionOutcome {
    if rows_affected > 0 {
        TransitionOutcome::Applied
    } else {
        TransitionOutcome::Rejected
    }
}

impl SeaOrmAtomicUnit {
    async fn seats_of(&self, showing_ids: &[String]) -> DomainResult<Vec<seat::Model>> {
        Ok(seat::Entity::find()
            .filter(seat::Column::ShowingId.is_in(showing_ids.iter().cloned()))
            .order_by_asc(seat::Column::ShowingId)
            .order_by_asc(seat::Column::Position)
            .all(&self.txn)
            .await?)
    }
}

// ── ShowingInventory impl ───────────────────────────────────────

#[async_trait]
impl ShowingInventory for SeaOrmAtomicUnit {
    async fn find_showing(&self, showing_id: &ShowingId) -> DomainResult<Option<Showing>> {
        let Some(model) = showing::Entity::find_by_id(showing_id.to_string())
            .one(&self.txn)
            .await?
        else {
            return Ok(None);
        };
        let seats = self.seats_of(&[model.id.clone()]).await?;
        showing_to_domain(model, seats).map(Some)
    }

    async fn find_seats(
        &self,
        showing_id: &ShowingId,
        seat_ids: &[SeatId],
    ) -> DomainResult<Vec<Seat>> {
        let exists = showing::Entity::find_by_id(showing_id.to_string())
            .one(&self.txn)
            .await?
            .is_some();
        if !exists {
            return Err(DomainError::not_found("Showing", "id", showing_id));
        }

        let models = seat::Entity::find()
            .filter(seat::Column::ShowingId.eq(showing_id.as_str()))
            .filter(seat::Column::SeatId.is_in(seat_ids.iter().map(|s| s.to_string())))
            .all(&self.txn)
            .await?;
        let mut by_id: HashMap<String, Seat> = HashMap::new();
        for m in models {
            let seat = seat_to_domain(m)?;
            by_id.insert(seat.seat_id.to_string(), seat);
        }
        Ok(seat_ids
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).cloned())
            .collect())
    }

    async fn apply_transition(
        &self,
        showing_id: &ShowingId,
        seat_id: &SeatId,
        transition: &SeatTransition,
    ) -> DomainResult<TransitionOutcome> {
        let (status, holder_id, reservation_id, held_at) =
            state_columns(&transition.target_state());

        let mut update = seat::Entity::update_many()
            .col_expr(seat::Column::Status, Expr::value(status))
            .col_expr(seat::Column::HolderId, Expr::value(holder_id))
            .col_expr(seat::Column::ReservationId, Expr::value(reservation_id))
            .col_expr(seat::Column::HeldAt, Expr::value(held_at))
            .filter(seat::Column::ShowingId.eq(showing_id.as_str()))
            .filter(seat::Column::SeatId.eq(seat_id.as_str()))
            .filter(seat::Column::Status.eq(transition.expected_status().as_str()));
        if let Some((holder, reservation)) = transition.expected_claim() {
            update = update
                .filter(seat::Column::HolderId.eq(holder.as_str()))
                .filter(seat::Column::ReservationId.eq(reservation.to_string()));
        }

        let result = update.exec(&self.txn).await?;
        debug!(
            showing_id = %showing_id,
            seat_id = %seat_id,
            target = %transition.target_status(),
            rows = result.rows_affected,
            "Seat transition"
        );
        Ok(outcome(result.rows_affected))
    }

    async fn insert_showing(&self, s: &Showing) -> DomainResult<()> {
        let existing = showing::Entity::find_by_id(s.id.to_string())
            .one(&self.txn)
            .await?;
        if existing.is_some() {
            return Err(DomainError::Conflict(format!("Showing {} already exists", s.id)));
        }

        showing::ActiveModel {
            id: Set(s.id.to_string()),
            movie_id: Set(s.movie_id.clone()),
            theatre_id: Set(s.theatre_id.clone()),
            screen_number: Set(s.screen_number as i32),
            show_date: Set(s.show_date),
            show_time: Set(s.show_time),
            created_at: Set(Utc::now()),
        }
        .insert(&self.txn)
        .await?;

        if !s.seats.is_empty() {
            let seats = s
                .seats
                .iter()
                .enumerate()
                .map(|(i, seat)| seat_to_active(&s.id, i, seat));
            seat::Entity::insert_many(seats).exec(&self.txn).await?;
        }
        Ok(())
    }

    async fn list_showings(&self) -> DomainResult<Vec<Showing>> {
        let models = showing::Entity::find()
            .order_by_asc(showing::Column::ShowDate)
            .order_by_asc(showing::Column::ShowTime)
            .all(&self.txn)
            .await?;
        let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();

        let mut seats: HashMap<String, Vec<seat::Model>> = HashMap::new();
        for s in self.seats_of(&ids).await? {
            seats.entry(s.showing_id.clone()).or_default().push(s);
        }

        models
            .into_iter()
            .map(|m| {
                let seats = seats.remove(&m.id).unwrap_or_default();
                showing_to_domain(m, seats)
            })
            .collect()
    }
}

// ── ReservationLedger impl ──────────────────────────────────────

#[async_trait]
impl ReservationLedger for SeaOrmAtomicUnit {
    async fn create(&self, r: &Reservation) -> DomainResult<()> {
        debug!("Saving reservation: {}", r.id);

        let seats = serde_json::to_string(&r.seats)
            .map_err(|e| DomainError::Storage(format!("Failed to encode seats: {}", e)))?;
        reservation::ActiveModel {
            id: Set(r.id.to_string()),
            holder_id: Set(r.holder_id.to_string()),
            showing_id: Set(r.showing_id.to_string()),
            seats: Set(seats),
            total_amount: Set(r.total_amount),
            booking_status: Set(r.booking_status.as_str().to_string()),
            payment_status: Set(r.payment_status.as_str().to_string()),
            expires_at: Set(r.expires_at),
            payment_ref: Set(r.payment_ref.map(|p| p.to_string())),
            created_at: Set(r.created_at),
            updated_at: Set(r.updated_at),
        }
        .insert(&self.txn)
        .await?;
        Ok(())
    }

    async fn get(&self, id: ReservationId) -> DomainResult<Option<Reservation>> {
        reservation::Entity::find_by_id(id.to_string())
            .one(&self.txn)
            .await?
            .map(reservation_to_domain)
            .transpose()
    }

    async fn update(
        &self,
        id: ReservationId,
        change: &ReservationUpdate,
        expected: ExpectedStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<TransitionOutcome> {
        let mut update = reservation::Entity::update_many()
            .col_expr(reservation::Column::UpdatedAt, Expr::value(now))
            .filter(reservation::Column::Id.eq(id.to_string()))
            .filter(reservation::Column::BookingStatus.eq(expected.booking.as_str()))
            .filter(reservation::Column::PaymentStatus.eq(expected.payment.as_str()));

        let booking = |status: BookingStatus| Expr::value(status.as_str());
        let payment = |status: PaymentStatus| Expr::value(status.as_str());
        update = match change {
            ReservationUpdate::Confirm => {
                update.col_expr(reservation::Column::BookingStatus, booking(BookingStatus::Confirmed))
            }
            ReservationUpdate::Cancel => {
                update.col_expr(reservation::Column::BookingStatus, booking(BookingStatus::Cancelled))
            }
            ReservationUpdate::Expire { payment_failed } => {
                let update = update
                    .col_expr(reservation::Column::BookingStatus, booking(BookingStatus::Expired));
                if *payment_failed {
                    update.col_expr(reservation::Column::PaymentStatus, payment(PaymentStatus::Failed))
                } else {
                    update
                }
            }
            ReservationUpdate::Payment(status) => {
                update.col_expr(reservation::Column::PaymentStatus, payment(*status))
            }
            ReservationUpdate::AttachPayment(payment_id) => update.col_expr(
                reservation::Column::PaymentRef,
                Expr::value(payment_id.to_string()),
            ),
        };

        let result = update.exec(&self.txn).await?;
        if result.rows_affected == 0 && ReservationLedger::get(self, id).await?.is_none() {
            return Err(DomainError::not_found("Reservation", "id", id));
        }
        Ok(outcome(result.rows_affected))
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>> {
        reservation::Entity::find()
            .filter(reservation::Column::BookingStatus.eq(BookingStatus::Pending.as_str()))
            .filter(reservation::Column::ExpiresAt.lt(now))
            .order_by_asc(reservation::Column::ExpiresAt)
            .all(&self.txn)
            .await?
            .into_iter()
            .map(reservation_to_domain)
            .collect()
    }

    async fn list_for_holder(&self, holder_id: &HolderId) -> DomainResult<Vec<Reservation>> {
        reservation::Entity::find()
            .filter(reservation::Column::HolderId.eq(holder_id.as_str()))
            .order_by_desc(reservation::Column::CreatedAt)
            .all(&self.txn)
            .await?
            .into_iter()
            .map(reservation_to_domain)
            .collect()
    }
}

// ── PaymentStore impl ───────────────────────────────────────────

#[async_trait]
impl PaymentStore for SeaOrmAtomicUnit {
    async fn create(&self, p: &Payment) -> DomainResult<()> {
        debug!("Saving payment: {} ({})", p.id, p.transaction_ref);

        payment::ActiveModel {
            id: Set(p.id.to_string()),
            reservation_id: Set(p.reservation_id.to_string()),
            holder_id: Set(p.holder_id.to_string()),
            amount: Set(p.amount),
            method: Set(p.method.as_str().to_string()),
            state: Set(p.state.as_str().to_string()),
            transaction_ref: Set(p.transaction_ref.clone()),
            gateway_message: Set(p.gateway_message.clone()),
            paid_at: Set(p.paid_at),
            created_at: Set(p.created_at),
        }
        .insert(&self.txn)
        .await?;
        Ok(())
    }

    async fn get(&self, id: PaymentId) -> DomainResult<Option<Payment>> {
        payment::Entity::find_by_id(id.to_string())
            .one(&self.txn)
            .await?
            .map(payment_to_domain)
            .transpose()
    }

    async fn open_for_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> DomainResult<Vec<Payment>> {
        payment::Entity::find()
            .filter(payment::Column::ReservationId.eq(reservation_id.to_string()))
            .filter(payment::Column::State.eq(PaymentState::Initiated.as_str()))
            .order_by_asc(payment::Column::CreatedAt)
            .all(&self.txn)
            .await?
            .into_iter()
            .map(payment_to_domain)
            .collect()
    }

    async fn settle(&self, p: &Payment, expected: PaymentState) -> DomainResult<TransitionOutcome> {
        let result = payment::Entity::update_many()
            .col_expr(payment::Column::State, Expr::value(p.state.as_str()))
            .col_expr(payment::Column::PaidAt, Expr::value(p.paid_at))
            .col_expr(
                payment::Column::GatewayMessage,
                Expr::value(p.gateway_message.clone()),
            )
            .filter(payment::Column::Id.eq(p.id.to_string()))
            .filter(payment::Column::State.eq(expected.as_str()))
            .exec(&self.txn)
            .await?;

        if result.rows_affected == 0 && PaymentStore::get(self, p.id).await?.is_none() {
            return Err(DomainError::not_found("Payment", "id", p.id));
        }
        Ok(outcome(result.rows_affected))
    }
}
