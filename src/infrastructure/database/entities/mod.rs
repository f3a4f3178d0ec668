//! Database entities module

pub mod payment;
pub mod reservation;
pub mod seat;
pub mod showing;

pub use payment::Entity as Payment;
pub use reservation::Entity as Reservation;
pub use seat::Entity as Seat;
pub use showing::Entity as Showing;
