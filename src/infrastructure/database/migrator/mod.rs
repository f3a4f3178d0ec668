//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20241001_000001_create_showings;
mod m20241001_000002_create_seats;
mod m20241001_000003_create_reservations;
mod m20241001_000004_create_payments;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241001_000001_create_showings::Migration),
            Box::new(m20241001_000002_create_seats::Migration),
            Box::new(m20241001_000003_create_reservations::Migration),
            Box::new(m20241001_000004_create_payments::Migration),
        ]
    }
}
