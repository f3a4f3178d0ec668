//! Payment attempts and gateway verdicts

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
