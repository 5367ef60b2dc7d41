use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry of an issuing line's binding allocation plan: how much was
/// drawn from which lot, at what cost, in plan order. Fixed at document
/// creation time and never recomputed afterwards.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_out_allocations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub stock_out_item_id: Uuid,
    pub batch_lot_id: Uuid,
    /// Snapshot of the lot's batch number at draw time.
    pub batch_number: String,
    /// Position within the line's plan; restoration replays in this order.
    pub sequence: i32,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub cost_price: rust_decimal::Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_out_item::Entity",
        from = "Column::StockOutItemId",
        to = "super::stock_out_item::Column::Id"
    )]
    StockOutItem,
    #[sea_orm(
        belongs_to = "super::batch_lot::Entity",
        from = "Column::BatchLotId",
        to = "super::batch_lot::Column::Id"
    )]
    BatchLot,
}

impl Related<super::stock_out_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockOutItem.def()
    }
}

impl Related<super::batch_lot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BatchLot.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
