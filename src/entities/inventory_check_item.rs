use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One counted line of a reconciliation document. `system_quantity` is the
/// snapshot taken at creation; `difference` and `status` are recomputed on
/// every count save.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_check_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub inventory_check_id: Uuid,
    pub product_id: Uuid,
    /// Set when this line counts a specific lot instead of the product total.
    pub batch_lot_id: Option<Uuid>,
    pub batch_number: Option<String>,
    pub manufacturing_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub system_quantity: i32,
    pub actual_quantity: i32,
    pub difference: i32,
    pub status: String,
    pub discrepancy_reason: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub cost_price: rust_decimal::Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_check::Entity",
        from = "Column::InventoryCheckId",
        to = "super::inventory_check::Column::Id"
    )]
    InventoryCheck,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::batch_lot::Entity",
        from = "Column::BatchLotId",
        to = "super::batch_lot::Column::Id"
    )]
    BatchLot,
}

impl Related<super::inventory_check::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryCheck.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::batch_lot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BatchLot.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Per-line count classification against the system snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountStatus {
    Matched,
    Excess,
    Shortage,
}

impl CountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountStatus::Matched => "matched",
            CountStatus::Excess => "excess",
            CountStatus::Shortage => "shortage",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "matched" => Some(CountStatus::Matched),
            "excess" => Some(CountStatus::Excess),
            "shortage" => Some(CountStatus::Shortage),
            _ => None,
        }
    }

    /// Classification for a signed count difference.
    pub fn for_difference(difference: i32) -> Self {
        match difference {
            0 => CountStatus::Matched,
            d if d > 0 => CountStatus::Excess,
            _ => CountStatus::Shortage,
        }
    }
}

/// Why a counted quantity deviated from the system quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscrepancyReason {
    Damaged,
    Lost,
    Mistake,
    Expired,
    Other,
}

impl DiscrepancyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscrepancyReason::Damaged => "damaged",
            DiscrepancyReason::Lost => "lost",
            DiscrepancyReason::Mistake => "mistake",
            DiscrepancyReason::Expired => "expired",
            DiscrepancyReason::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "damaged" => Some(DiscrepancyReason::Damaged),
            "lost" => Some(DiscrepancyReason::Lost),
            "mistake" => Some(DiscrepancyReason::Mistake),
            "expired" => Some(DiscrepancyReason::Expired),
            "other" => Some(DiscrepancyReason::Other),
            _ => None,
        }
    }
}
