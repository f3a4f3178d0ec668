//! Reservation aggregate
//!
//! Contains the Reservation entity, its status machine, and the ledger
//! interface.

pub mod model;
pub mod repository;

pub use model::{
    BookingStatus, ExpectedStatus, PaymentStatus, Reservation, ReservationUpdate, ReservedSeat,
};
pub use repository::ReservationLedger;
