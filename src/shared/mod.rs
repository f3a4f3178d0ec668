//! Cross-cutting helpers: errors, time, retries, shutdown

pub mod clock;
pub mod errors;
pub mod retry;
pub mod shutdown;

pub use errors::{DomainError, DomainResult};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
