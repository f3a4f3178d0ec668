//! Database repository implementations
//!
//! A single SeaORM atomic unit serves showings, reservations and payments
//! so that one database transaction spans all three.

pub mod unit_of_work;

pub use unit_of_work::{SeaOrmAtomicUnit, SeaOrmUnitOfWork};
