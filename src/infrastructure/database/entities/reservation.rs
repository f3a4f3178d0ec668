//! Reservation entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub holder_id: String,
    pub showing_id: String,

    /// JSON array of `{seat_id, category, price}`
    #[sea_orm(column_type = "Text")]
    pub seats: String,

    pub total_amount: i64,

    /// Booking status: pending, confirmed, cancelled, expired
    pub booking_status: String,

    /// Payment status: pending, completed, failed
    pub payment_status: String,

    pub expires_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub payment_ref: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
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
