//! Payment aggregate
//!
//! Payment attempts recorded against a pending reservation. Card
//! processing itself happens behind the payment oracle port.

pub mod model;
pub mod repository;

pub use model::{Payment, PaymentMethod, PaymentState, PaymentVerdict};
pub use repository::PaymentStore;
