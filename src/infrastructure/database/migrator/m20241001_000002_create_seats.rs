//! Create seats table
//!
//! One row per seat of a showing; status changes are conditional updates
//! on this table.

use sea_orm_migration::prelude::*;

use super::m20241001_000001_create_showings::Showings;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Seats::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Seats::ShowingId).string().not_null())
                    .col(ColumnDef::new(Seats::SeatId).string().not_null())
                    .col(ColumnDef::new(Seats::Position).integer().not_null())
                    .col(ColumnDef::new(Seats::RowLabel).string().not_null())
                    .col(ColumnDef::new(Seats::ColumnNumber).integer().not_null())
                    .col(ColumnDef::new(Seats::Category).string().not_null())
                    .col(ColumnDef::new(Seats::Price).big_integer().not_null())
                    .col(
                        ColumnDef::new(Seats::Status)
                            .string()
                            .not_null()
                            .default("available"),
                    )
                    .col(ColumnDef::new(Seats::HolderId).string())
                    .col(ColumnDef::new(Seats::ReservationId).string())
                    .col(ColumnDef::new(Seats::HeldAt).timestamp_with_time_zone())
                    .primary_key(
                        Index::create()
                            .name("pk_seats")
                            .col(Seats::ShowingId)
                            .col(Seats::SeatId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_seats_showing")
                            .from(Seats::Table, Seats::ShowingId)
                            .to(Showings::Table, Showings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_seats_reservation")
                    .table(Seats::Table)
                    .col(Seats::ReservationId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Seats::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Seats {
    Table,
    ShowingId,
    SeatId,
    Position,
    RowLabel,
    ColumnNumber,
    Category,
    Price,
    Status,
    HolderId,
    ReservationId,
    HeldAt,
}
