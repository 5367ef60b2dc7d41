//! Warehouse API Library
//!
//! Inventory ledger core for a warehouse management backend: the batch-lot
//! store and FIFO/FEFO allocator, the receiving / issuing / reconciliation
//! approval workflows, and the product-stock aggregate with its repair
//! operation. The crate's boundary is in-process service calls — HTTP
//! routing, authentication and report rendering live with the callers.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod migrator;
pub mod models;
pub mod services;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use services::{
    ActivitySink, BatchLotService, InventoryCheckService, ProductStockService, ReversalCleanup,
    StockInService, StockOutService, TracingActivitySink,
};

/// The wired-up service graph over one connection pool.
#[derive(Clone)]
pub struct AppServices {
    pub product_stock: Arc<ProductStockService>,
    pub batch_lots: Arc<BatchLotService>,
    pub stock_in: Arc<StockInService>,
    pub stock_out: Arc<StockOutService>,
    pub inventory_check: Arc<InventoryCheckService>,
}

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub services: AppServices,
}

impl AppState {
    /// Wire the full service graph with the default (tracing) activity sink
    /// and no reversal-cleanup hook.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: Arc<events::EventSender>,
    ) -> Self {
        Self::with_collaborators(db, config, event_sender, Arc::new(TracingActivitySink), None)
    }

    /// Wire the service graph with caller-supplied collaborator
    /// capabilities: the best-effort activity sink and the optional
    /// side-channel cleanup invoked on document reversal.
    pub fn with_collaborators(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: Arc<events::EventSender>,
        activity: Arc<dyn ActivitySink>,
        cleanup: Option<Arc<dyn ReversalCleanup>>,
    ) -> Self {
        let product_stock = Arc::new(ProductStockService::new(db.clone(), event_sender.clone()));
        let batch_lots = Arc::new(BatchLotService::new(
            db.clone(),
            event_sender.clone(),
            product_stock.clone(),
        ));
        let stock_in = Arc::new(StockInService::new(
            db.clone(),
            event_sender.clone(),
            batch_lots.clone(),
            product_stock.clone(),
            activity.clone(),
            cleanup.clone(),
        ));
        let stock_out = Arc::new(StockOutService::new(
            db.clone(),
            event_sender.clone(),
            batch_lots.clone(),
            product_stock.clone(),
            activity.clone(),
            cleanup,
        ));
        let inventory_check = Arc::new(InventoryCheckService::new(
            db.clone(),
            event_sender.clone(),
            batch_lots.clone(),
            product_stock.clone(),
            activity,
        ));

        Self {
            db,
            config,
            event_sender,
            services: AppServices {
                product_stock,
                batch_lots,
                stock_in,
                stock_out,
                inventory_check,
            },
        }
    }
}

pub mod prelude {
    pub use crate::db::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::models::*;
    pub use crate::services::*;
    pub use crate::{AppServices, AppState};
}
