use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuing document header. Lines live in `stock_out_items`, the binding
/// allocation plan in `stock_out_allocations`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_outs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub code: String,
    pub issue_type: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_amount: rust_decimal::Decimal,
    pub issue_date: DateTime<Utc>,
    pub status: String,
    pub created_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stock_out_item::Entity")]
    Items,
}

impl Related<super::stock_out_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Why stock is leaving the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueType {
    Sale,
    InternalUse,
    Damaged,
    Expired,
    ReturnToSupplier,
    Other,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Sale => "sale",
            IssueType::InternalUse => "internal_use",
            IssueType::Damaged => "damaged",
            IssueType::Expired => "expired",
            IssueType::ReturnToSupplier => "return_to_supplier",
            IssueType::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sale" => Some(IssueType::Sale),
            "internal_use" => Some(IssueType::InternalUse),
            "damaged" => Some(IssueType::Damaged),
            "expired" => Some(IssueType::Expired),
            "return_to_supplier" => Some(IssueType::ReturnToSupplier),
            "other" => Some(IssueType::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockOutStatus {
    Pending,
    Completed,
    Cancelled,
}

impl StockOutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockOutStatus::Pending => "pending",
            StockOutStatus::Completed => "completed",
            StockOutStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(StockOutStatus::Pending),
            "completed" => Some(StockOutStatus::Completed),
            "cancelled" => Some(StockOutStatus::Cancelled),
            _ => None,
        }
    }
}
