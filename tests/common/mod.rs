#![allow(dead_code)]

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use std::sync::Arc;
use uuid::Uuid;
use warehouse_api::{
    config::AppConfig,
    db::{self, DbConfig},
    entities::{product, supplier},
    events::EventSender,
    models::{Actor, Role},
    services::{NewStockIn, NewStockInItem, StockInDocument},
    AppState,
};

/// A fresh in-memory database per test: one pooled connection keeps the
/// SQLite memory database alive for the whole test.
pub async fn setup_state() -> AppState {
    let db_cfg = DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    let pool = db::establish_connection_with_config(&db_cfg)
        .await
        .expect("Failed to create DB pool");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let (event_sender, rx) = EventSender::channel(256);
    // Events are fire-and-forget; tests don't consume them.
    drop(rx);

    AppState::new(Arc::new(pool), AppConfig::default(), Arc::new(event_sender))
}

pub fn admin() -> Actor {
    Actor::new(Uuid::new_v4(), Role::Admin)
}

pub fn manager() -> Actor {
    Actor::new(Uuid::new_v4(), Role::WarehouseManager)
}

pub fn staff() -> Actor {
    Actor::new(Uuid::new_v4(), Role::WarehouseStaff)
}

pub fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

pub async fn seed_supplier(state: &AppState, code: &str) -> supplier::Model {
    let now = Utc::now();
    supplier::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(code.to_string()),
        name: Set(format!("Supplier {}", code)),
        phone: Set(None),
        email: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(state.db.as_ref())
    .await
    .expect("Failed to seed supplier")
}

pub async fn seed_product(state: &AppState, sku: &str, cost_price: i64) -> product::Model {
    let now = Utc::now();
    product::ActiveModel {
        id: Set(Uuid::new_v4()),
        sku: Set(sku.to_string()),
        name: Set(format!("Product {}", sku)),
        unit: Set("unit".to_string()),
        cost_price: Set(dec(cost_price)),
        selling_price: Set(dec(cost_price * 2)),
        current_stock: Set(0),
        min_stock: Set(10),
        status: Set("active".to_string()),
        default_supplier_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(state.db.as_ref())
    .await
    .expect("Failed to seed product")
}

/// Receive and approve one batch of a product, `days_ago` days back (the
/// import date becomes the lot's FIFO ordering key).
pub async fn receive_approved_batch(
    state: &AppState,
    supplier_id: Uuid,
    product_id: Uuid,
    batch_number: &str,
    quantity: i32,
    cost_price: i64,
    days_ago: i64,
) -> StockInDocument {
    let doc = state
        .services
        .stock_in
        .create(
            staff(),
            NewStockIn {
                supplier_id,
                import_date: Some(Utc::now() - Duration::days(days_ago)),
                items: vec![NewStockInItem {
                    product_id,
                    quantity,
                    unit_price: Some(dec(cost_price)),
                    batch_number: Some(batch_number.to_string()),
                    manufacturing_date: None,
                    expiry_date: None,
                }],
            },
        )
        .await
        .expect("Failed to create receiving document");

    state
        .services
        .stock_in
        .approve(doc.stock_in.id, manager())
        .await
        .expect("Failed to approve receiving document")
}
