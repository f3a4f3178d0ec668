//! # Showtime booking
//!
//! Seat reservation and checkout engine for theatre showings.
//!
//! ## Architecture
//!
//! - **domain**: showings, seats, reservations, payments and the storage traits
//! - **application**: reservation coordinator, payment service, expiry reclaimer
//! - **infrastructure**: SeaORM (SQLite) storage and the in-memory store
//! - **interfaces**: REST API with Swagger documentation
//! - **shared**: error taxonomy, clock, retry, graceful shutdown
//! - **config** / **server**: TOML configuration and process bootstrap

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

// Re-export storage backends for easy access
pub use infrastructure::{init_database, DatabaseConfig, InMemoryStore, SeaOrmUnitOfWork};

// Re-export API router
pub use interfaces::http::{create_api_router, ApiState};
