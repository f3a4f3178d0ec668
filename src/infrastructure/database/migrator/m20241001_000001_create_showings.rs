//! Create showings table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Showings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Showings::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Showings::MovieId).string().not_null())
                    .col(ColumnDef::new(Showings::TheatreId).string().not_null())
                    .col(
                        ColumnDef::new(Showings::ScreenNumber)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Showings::ShowDate).date().not_null())
                    .col(ColumnDef::new(Showings::ShowTime).time().not_null())
                    .col(
                        ColumnDef::new(Showings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_showings_schedule")
                    .table(Showings::Table)
                    .col(Showings::ShowDate)
                    .col(Showings::ShowTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Showings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Showings {
    Table,
    Id,
    MovieId,
    TheatreId,
    ScreenNumber,
    ShowDate,
    ShowTime,
    CreatedAt,
}
