use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One received lot of a product, tracked separately for expiry and costing.
///
/// `remaining_quantity` only moves inside the allocator, stock-out
/// cancellation restore, reconciliation approval and the batch admin update;
/// nothing else writes it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "batch_lots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub batch_number: String,
    pub product_id: Uuid,
    pub supplier_id: Uuid,
    /// Receiving document that materialized this lot.
    pub stock_in_id: Uuid,
    pub manufacturing_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub initial_quantity: i32,
    pub remaining_quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub cost_price: rust_decimal::Decimal,
    /// FIFO ordering key (with `id` as tie-break).
    pub received_at: DateTime<Utc>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::Id"
    )]
    Supplier,
    #[sea_orm(
        belongs_to = "super::stock_in::Entity",
        from = "Column::StockInId",
        to = "super::stock_in::Column::Id"
    )]
    StockIn,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::stock_in::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockIn.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Lot lifecycle status. `Depleted` and `Expired` are derived states,
/// reapplied after every mutation; `Damaged` is set manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    Active,
    Depleted,
    Expired,
    Damaged,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Active => "active",
            BatchStatus::Depleted => "depleted",
            BatchStatus::Expired => "expired",
            BatchStatus::Damaged => "damaged",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(BatchStatus::Active),
            "depleted" => Some(BatchStatus::Depleted),
            "expired" => Some(BatchStatus::Expired),
            "damaged" => Some(BatchStatus::Damaged),
            _ => None,
        }
    }
}

impl Model {
    pub fn is_depleted(&self) -> bool {
        self.remaining_quantity == 0
    }

    pub fn quantity_used(&self) -> i32 {
        self.initial_quantity - self.remaining_quantity
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.map(|d| d < today).unwrap_or(false)
    }

    /// Derived status for the current quantities and date. An `active` lot
    /// that hits zero becomes `depleted`; an `active` lot past its expiry
    /// date becomes `expired`. A `depleted` lot whose remaining quantity was
    /// restored reopens (to `active`, or straight to `expired` when the date
    /// has passed). `damaged` and `expired` are sticky.
    pub fn derived_status(&self, today: NaiveDate) -> BatchStatus {
        match BatchStatus::from_str(&self.status) {
            Some(BatchStatus::Damaged) => BatchStatus::Damaged,
            Some(BatchStatus::Expired) => BatchStatus::Expired,
            Some(BatchStatus::Active) | Some(BatchStatus::Depleted) | None => {
                if self.remaining_quantity == 0 {
                    BatchStatus::Depleted
                } else if self.is_expired(today) {
                    BatchStatus::Expired
                } else {
                    BatchStatus::Active
                }
            }
        }
    }
}
