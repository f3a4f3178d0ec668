//! Application layer: the reservation protocols and the expiry reclaimer

pub mod services;

pub use services::{
    ExpiryReclaimer, PaymentOracle, PaymentService, ReservationCoordinator, ReservationPolicy,
    SettledPayment, ShowingCatalog, SimulatedPaymentOracle, SweepReport,
};
