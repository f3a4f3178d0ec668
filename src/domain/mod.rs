pub mod ids;
pub mod payment;
pub mod repositories;
pub mod reservation;
pub mod showing;

// Re-export commonly used types
pub use ids::{HolderId, PaymentId, ReservationId, SeatId, ShowingId};
pub use payment::{Payment, PaymentMethod, PaymentState, PaymentStore, PaymentVerdict};
pub use repositories::{AtomicUnit, UnitOfWork};
pub use reservation::{
    BookingStatus, ExpectedStatus, PaymentStatus, Reservation, ReservationLedger,
    ReservationUpdate, ReservedSeat,
};
pub use showing::{
    NewShowing, Seat, SeatCategory, SeatLayout, SeatState, SeatStatus, SeatTransition, Showing,
    ShowingInventory, TransitionOutcome,
};

// Re-export DomainError from shared for convenience
pub use crate::shared::errors::{DomainError, DomainResult};
