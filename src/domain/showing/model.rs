//! Showing and seat entities
//!
//! A seat's status and its holder live in one tagged value, [`SeatState`],
//! so an available seat cannot carry a holder and a locked seat cannot
//! lack a hold timestamp. Every mutation goes through a [`SeatTransition`]
//! that names the state it expects to find.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{HolderId, ReservationId, SeatId, ShowingId};

/// Seat status discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    Available,
    Locked,
    Booked,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Locked => "locked",
            Self::Booked => "booked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(Self::Available),
            "locked" => Some(Self::Locked),
            "booked" => Some(Self::Booked),
            _ => None,
        }
    }
}

impl std::fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-seat state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SeatState {
    Available,
    /// Held for `reservation_id` until payment or expiry
    Locked {
        holder_id: HolderId,
        reservation_id: ReservationId,
        held_at: DateTime<Utc>,
    },
    /// Sold; `holder_id` is the buyer
    Booked {
        holder_id: HolderId,
        reservation_id: ReservationId,
    },
}

impl SeatState {
    pub fn status(&self) -> SeatStatus {
        match self {
            Self::Available => SeatStatus::Available,
            Self::Locked { .. } => SeatStatus::Locked,
            Self::Booked { .. } => SeatStatus::Booked,
        }
    }

    pub fn holder_id(&self) -> Option<&HolderId> {
        match self {
            Self::Available => None,
            Self::Locked { holder_id, .. } | Self::Booked { holder_id, .. } => Some(holder_id),
        }
    }

    pub fn reservation_id(&self) -> Option<ReservationId> {
        match self {
            Self::Available => None,
            Self::Locked { reservation_id, .. } | Self::Booked { reservation_id, .. } => {
                Some(*reservation_id)
            }
        }
    }

    pub fn held_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Locked { held_at, .. } => Some(*held_at),
            _ => None,
        }
    }

    /// Whether this seat is currently claimed by the given reservation.
    pub fn is_claimed_by(&self, holder: &HolderId, reservation: ReservationId) -> bool {
        self.holder_id() == Some(holder) && self.reservation_id() == Some(reservation)
    }
}

/// A single seat in a showing's seat map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub seat_id: SeatId,
    pub row: String,
    pub column: u32,
    pub category: String,
    /// Price in minor currency units
    pub price: i64,
    pub state: SeatState,
}

impl Seat {
    pub fn available(
        seat_id: impl Into<SeatId>,
        row: impl Into<String>,
        column: u32,
        category: impl Into<String>,
        price: i64,
    ) -> Self {
        Self {
            seat_id: seat_id.into(),
            row: row.into(),
            column,
            category: category.into(),
            price,
            state: SeatState::Available,
        }
    }

    pub fn status(&self) -> SeatStatus {
        self.state.status()
    }

    pub fn is_available(&self) -> bool {
        self.state == SeatState::Available
    }
}

/// Scheduled showing with its ordered seat map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Showing {
    pub id: ShowingId,
    pub movie_id: String,
    pub theatre_id: String,
    pub screen_number: u32,
    pub show_date: NaiveDate,
    pub show_time: NaiveTime,
    pub seats: Vec<Seat>,
}

impl Showing {
    pub fn seat(&self, seat_id: &SeatId) -> Option<&Seat> {
        self.seats.iter().find(|s| &s.seat_id == seat_id)
    }

    pub fn seat_mut(&mut self, seat_id: &SeatId) -> Option<&mut Seat> {
        self.seats.iter_mut().find(|s| &s.seat_id == seat_id)
    }

    pub fn count_with_status(&self, status: SeatStatus) -> usize {
        self.seats.iter().filter(|s| s.status() == status).count()
    }
}

/// Input for creating a showing; seats come from a [`SeatLayout`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShowing {
    pub id: ShowingId,
    pub movie_id: String,
    pub theatre_id: String,
    pub screen_number: u32,
    pub show_date: NaiveDate,
    pub show_time: NaiveTime,
    pub layout: SeatLayout,
}

impl NewShowing {
    pub fn into_showing(self) -> Showing {
        let seats = self.layout.generate_seats();
        Showing {
            id: self.id,
            movie_id: self.movie_id,
            theatre_id: self.theatre_id,
            screen_number: self.screen_number,
            show_date: self.show_date,
            show_time: self.show_time,
            seats,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatCategory {
    pub name: String,
    pub price: i64,
    pub rows: Vec<String>,
}

/// Screen layout: every category covers whole rows of `columns` seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatLayout {
    pub columns: u32,
    pub categories: Vec<SeatCategory>,
}

impl SeatLayout {
    pub fn generate_seats(&self) -> Vec<Seat> {
        let mut seats = Vec::new();
        for category in &self.categories {
            for row in &category.rows {
                for column in 1..=self.columns {
                    seats.push(Seat::available(
                        format!("{}{}", row, column),
                        row.clone(),
                        column,
                        category.name.clone(),
                        category.price,
                    ));
                }
            }
        }
        seats
    }

    /// Ten columns, premium / executive / normal rows.
    pub fn standard() -> Self {
        let rows = |rs: &[&str]| rs.iter().map(|r| r.to_string()).collect::<Vec<_>>();
        Self {
            columns: 10,
            categories: vec![
                SeatCategory {
                    name: "Premium".into(),
                    price: 250,
                    rows: rows(&["A", "B"]),
                },
                SeatCategory {
                    name: "Executive".into(),
                    price: 200,
                    rows: rows(&["C", "D", "E", "F"]),
                },
                SeatCategory {
                    name: "Normal".into(),
                    price: 150,
                    rows: rows(&["G", "H", "I", "J"]),
                },
            ],
        }
    }
}

// ── Transitions ───────────────────────────────────────────────

/// Guarded seat state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatTransition {
    /// `available → locked`
    Lock {
        holder_id: HolderId,
        reservation_id: ReservationId,
        at: DateTime<Utc>,
    },
    /// `locked(holder, reservation) → booked`
    Book {
        holder_id: HolderId,
        reservation_id: ReservationId,
    },
    /// `from(holder, reservation) → available`, `from` is locked or booked
    Release {
        holder_id: HolderId,
        reservation_id: ReservationId,
        from: SeatStatus,
    },
}

/// Outcome of a guarded transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    /// Seat was not in the expected state; nothing changed.
    Rejected,
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

impl SeatTransition {
    pub fn expected_status(&self) -> SeatStatus {
        match self {
            Self::Lock { .. } => SeatStatus::Available,
            Self::Book { .. } => SeatStatus::Locked,
            Self::Release { from, .. } => *from,
        }
    }

    pub fn target_status(&self) -> SeatStatus {
        match self {
            Self::Lock { .. } => SeatStatus::Locked,
            Self::Book { .. } => SeatStatus::Booked,
            Self::Release { .. } => SeatStatus::Available,
        }
    }

    /// Holder and reservation the current state must carry, if any.
    pub fn expected_claim(&self) -> Option<(&HolderId, ReservationId)> {
        match self {
            Self::Lock { .. } => None,
            Self::Book {
                holder_id,
                reservation_id,
            }
            | Self::Release {
                holder_id,
                reservation_id,
                ..
            } => Some((holder_id, *reservation_id)),
        }
    }

    /// Whether `current` satisfies this transition's precondition.
    pub fn accepts(&self, current: &SeatState) -> bool {
        if current.status() != self.expected_status() {
            return false;
        }
        match self.expected_claim() {
            None => true,
            Some((holder, reservation)) => current.is_claimed_by(holder, reservation),
        }
    }

    /// State the seat holds once this transition has been applied.
    pub fn target_state(&self) -> SeatState {
        match self {
            Self::Lock {
                holder_id,
                reservation_id,
                at,
            } => SeatState::Locked {
                holder_id: holder_id.clone(),
                reservation_id: *reservation_id,
                held_at: *at,
            },
            Self::Book {
                holder_id,
                reservation_id,
            } => SeatState::Booked {
                holder_id: holder_id.clone(),
                reservation_id: *reservation_id,
            },
            Self::Release { .. } => SeatState::Available,
        }
    }

    /// The state after this transition, or `None` if the precondition fails.
    pub fn apply(&self, current: &SeatState) -> Option<SeatState> {
        self.accepts(current).then(|| self.target_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locked(holder: &str, reservation: ReservationId) -> SeatState {
        SeatState::Locked {
            holder_id: HolderId::from(holder),
            reservation_id: reservation,
            held_at: Utc::now(),
        }
    }

    #[test]
    fn layout_generates_row_column_labels() {
        let layout = SeatLayout {
            columns: 3,
            categories: vec![
                SeatCategory {
                    name: "Premium".into(),
                    price: 250,
                    rows: vec!["A".into()],
                },
                SeatCategory {
                    name: "Normal".into(),
                    price: 150,
                    rows: vec!["B".into(), "C".into()],
                },
            ],
        };

        let seats = layout.generate_seats();
        assert_eq!(seats.len(), 9);
        assert_eq!(seats[0].seat_id.as_str(), "A1");
        assert_eq!(seats[0].price, 250);
        assert_eq!(seats[8].seat_id.as_str(), "C3");
        assert_eq!(seats[8].category, "Normal");
        assert!(seats.iter().all(Seat::is_available));
    }

    #[test]
    fn standard_layout_has_one_hundred_seats() {
        assert_eq!(SeatLayout::standard().generate_seats().len(), 100);
    }

    #[test]
    fn lock_requires_available() {
        let r = ReservationId::generate();
        let lock = SeatTransition::Lock {
            holder_id: "u1".into(),
            reservation_id: r,
            at: Utc::now(),
        };

        let next = lock.apply(&SeatState::Available).expect("available seat locks");
        assert!(next.is_claimed_by(&"u1".into(), r));
        assert!(next.held_at().is_some());

        assert!(lock.apply(&locked("u2", ReservationId::generate())).is_none());
    }

    #[test]
    fn book_requires_matching_lock() {
        let r = ReservationId::generate();
        let book = SeatTransition::Book {
            holder_id: "u1".into(),
            reservation_id: r,
        };

        let booked = book.apply(&locked("u1", r)).expect("own lock books");
        assert_eq!(booked.status(), SeatStatus::Booked);
        assert_eq!(booked.held_at(), None);
        assert_eq!(booked.holder_id(), Some(&HolderId::from("u1")));

        assert!(book.apply(&locked("u2", r)).is_none());
        assert!(book.apply(&locked("u1", ReservationId::generate())).is_none());
        assert!(book.apply(&SeatState::Available).is_none());
    }

    #[test]
    fn release_never_touches_other_claims() {
        let r = ReservationId::generate();
        let release = SeatTransition::Release {
            holder_id: "u1".into(),
            reservation_id: r,
            from: SeatStatus::Locked,
        };

        assert_eq!(release.apply(&locked("u1", r)), Some(SeatState::Available));
        assert!(release.apply(&locked("u1", ReservationId::generate())).is_none());
        assert!(release.apply(&SeatState::Available).is_none());
        assert!(release
            .apply(&SeatState::Booked {
                holder_id: "u1".into(),
                reservation_id: r
            })
            .is_none());
    }

    #[test]
    fn seat_status_parse_roundtrip() {
        for status in [SeatStatus::Available, SeatStatus::Locked, SeatStatus::Booked] {
            assert_eq!(SeatStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SeatStatus::parse("sold"), None);
    }
}
