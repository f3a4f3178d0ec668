//! Seat holds: lock, confirm, cancel and lookups

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
