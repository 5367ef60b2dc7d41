use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reconciliation (physical count) document header.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_checks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub code: String,
    pub title: String,
    pub check_date: DateTime<Utc>,
    pub scope: String,
    pub category_id: Option<Uuid>,
    pub status: String,
    pub notes: Option<String>,
    pub total_items: i32,
    pub matched_count: i32,
    pub excess_count: i32,
    pub shortage_count: i32,
    pub created_by: Uuid,
    /// The only actor allowed to record counts and submit.
    pub assignee: Option<Uuid>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_check_item::Entity")]
    Items,
}

impl Related<super::inventory_check_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckScope {
    All,
    Category,
    Product,
}

impl CheckScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckScope::All => "all",
            CheckScope::Category => "category",
            CheckScope::Product => "product",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "all" => Some(CheckScope::All),
            "category" => Some(CheckScope::Category),
            "product" => Some(CheckScope::Product),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    InProgress,
    Submitted,
    Completed,
    Cancelled,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::InProgress => "in_progress",
            CheckStatus::Submitted => "submitted",
            CheckStatus::Completed => "completed",
            CheckStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(CheckStatus::InProgress),
            "submitted" => Some(CheckStatus::Submitted),
            "completed" => Some(CheckStatus::Completed),
            "cancelled" => Some(CheckStatus::Cancelled),
            _ => None,
        }
    }
}
