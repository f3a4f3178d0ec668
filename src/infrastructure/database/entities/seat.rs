//! Seat entity
//!
//! One row per seat of a showing. `holder_id`, `reservation_id` and
//! `held_at` are only set while the seat is locked or booked.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "seats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub showing_id: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub seat_id: String,

    /// Order within the seat map
    pub position: i32,

    pub row_label: String,
    pub column_number: i32,
    pub category: String,
    pub price: i64,

    /// Seat status: available, locked, booked
    pub status: String,

    #[sea_orm(nullable)]
    pub holder_id: Option<String>,

    #[sea_orm(nullable)]
    pub reservation_id: Option<String>,

    #[sea_orm(nullable)]
    pub held_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::showing::Entity",
        from = "Column::ShowingId",
        to = "super::showing::Column::Id"
    )]
    Showing,
}

impl Related<super::showing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Showing.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
