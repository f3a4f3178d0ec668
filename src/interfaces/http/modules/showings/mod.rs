//! Showing listing and seat maps

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
