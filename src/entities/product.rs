use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub unit: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub cost_price: rust_decimal::Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub selling_price: rust_decimal::Decimal,
    pub current_stock: i32,
    pub min_stock: i32,
    pub status: String,
    pub default_supplier_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::DefaultSupplierId",
        to = "super::supplier::Column::Id"
    )]
    Supplier,
    #[sea_orm(has_many = "super::batch_lot::Entity")]
    BatchLots,
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::batch_lot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BatchLots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Product lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductStatus {
    Active,
    Inactive,
    OutOfStock,
    Discontinued,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
            ProductStatus::OutOfStock => "out_of_stock",
            ProductStatus::Discontinued => "discontinued",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ProductStatus::Active),
            "inactive" => Some(ProductStatus::Inactive),
            "out_of_stock" => Some(ProductStatus::OutOfStock),
            "discontinued" => Some(ProductStatus::Discontinued),
            _ => None,
        }
    }

    /// Status after a stock write. Zero stock forces `out_of_stock`; a
    /// product that was `out_of_stock` reopens to `active` when stock rises.
    /// `inactive` and `discontinued` are manual states and never change here.
    pub fn after_stock_change(current: &str, stock: i32) -> Self {
        let current = Self::from_str(current).unwrap_or(ProductStatus::Active);
        match current {
            ProductStatus::Inactive | ProductStatus::Discontinued => current,
            _ if stock == 0 => ProductStatus::OutOfStock,
            ProductStatus::OutOfStock => ProductStatus::Active,
            other => other,
        }
    }
}

impl Model {
    pub fn status_enum(&self) -> Option<ProductStatus> {
        ProductStatus::from_str(&self.status)
    }

    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.min_stock
    }
}
