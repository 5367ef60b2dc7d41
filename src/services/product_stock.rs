use crate::{
    db::DbPool,
    entities::{
        batch_lot::{self, BatchStatus, Entity as BatchLot},
        product::{self, Entity as Product, ProductStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use dashmap::DashMap;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, instrument};
use uuid::Uuid;

/// Per-product mutex registry. Every mutation of a product's on-hand
/// quantity or of its batches runs under that product's lock; this is the
/// minimum serialization needed to keep the aggregate invariant from being
/// corrupted by concurrent requests.
#[derive(Debug, Default)]
pub struct ProductLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl ProductLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, product_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let entry = self
                .locks
                .entry(product_id)
                .or_insert_with(|| Arc::new(Mutex::new(())));
            entry.value().clone()
        };
        lock.lock_owned().await
    }
}

/// Which batch statuses participate in a recompute sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeScope {
    ActiveOnly,
    AllStatuses,
}

/// Owner of the denormalized on-hand quantity. The workflows never touch
/// `products.current_stock` directly; they go through the bounded operations
/// here, which also reapply the product's stock-driven status transition.
#[derive(Clone)]
pub struct ProductStockService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    locks: Arc<ProductLocks>,
}

impl ProductStockService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
            locks: Arc::new(ProductLocks::new()),
        }
    }

    /// Acquire this product's mutation lock. Workflows hold the guard across
    /// compound sections (check + allocate + decrement).
    pub async fn lock(&self, product_id: Uuid) -> OwnedMutexGuard<()> {
        self.locks.acquire(product_id).await
    }

    pub async fn get(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(product_id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Write a new on-hand quantity, reapplying the status transition.
    /// Caller must hold the product lock.
    async fn write_quantity_locked(
        &self,
        current: product::Model,
        new_quantity: i32,
    ) -> Result<product::Model, ServiceError> {
        if new_quantity < 0 {
            return Err(ServiceError::IntegrityViolation(format!(
                "Stock for product {} would become negative ({})",
                current.id, new_quantity
            )));
        }

        let old_quantity = current.current_stock;
        let next_status = ProductStatus::after_stock_change(&current.status, new_quantity);
        let product_id = current.id;

        let mut active: product::ActiveModel = current.into();
        active.current_stock = Set(new_quantity);
        active.status = Set(next_status.as_str().to_string());
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        self.event_sender
            .emit(Event::ProductStockChanged {
                product_id,
                old_quantity,
                new_quantity,
            })
            .await;

        Ok(updated)
    }

    /// Apply a signed delta under the caller-held product lock.
    pub async fn apply_delta_locked(
        &self,
        product_id: Uuid,
        delta: i32,
    ) -> Result<product::Model, ServiceError> {
        let product = self.get(product_id).await?;
        let new_quantity = product.current_stock + delta;
        self.write_quantity_locked(product, new_quantity).await
    }

    /// Increase on-hand quantity (receiving approval, issuing cancellation).
    #[instrument(skip(self))]
    pub async fn increase(
        &self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<product::Model, ServiceError> {
        let _guard = self.lock(product_id).await;
        self.apply_delta_locked(product_id, quantity).await
    }

    /// Decrease on-hand quantity after re-verifying sufficiency (issuing
    /// approval's defensive re-check).
    #[instrument(skip(self))]
    pub async fn decrease_checked(
        &self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<product::Model, ServiceError> {
        let _guard = self.lock(product_id).await;
        let product = self.get(product_id).await?;
        if product.current_stock < quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "Product {} has {} on hand, {} requested",
                product_id, product.current_stock, quantity
            )));
        }
        let new_quantity = product.current_stock - quantity;
        self.write_quantity_locked(product, new_quantity).await
    }

    /// Overwrite on-hand quantity with a counted value (reconciliation
    /// approval of a batch-less item). Caller must hold the product lock.
    pub async fn overwrite_locked(
        &self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<product::Model, ServiceError> {
        let product = self.get(product_id).await?;
        self.write_quantity_locked(product, quantity).await
    }

    /// Recompute the aggregate from batch truth and overwrite the product's
    /// on-hand quantity. Safe to call at any time; this is the repair
    /// operation for drift left behind by partial failures.
    #[instrument(skip(self))]
    pub async fn recompute(
        &self,
        product_id: Uuid,
        scope: RecomputeScope,
    ) -> Result<i32, ServiceError> {
        let _guard = self.lock(product_id).await;
        self.recompute_locked(product_id, scope).await
    }

    /// Recompute under a caller-held product lock.
    pub async fn recompute_locked(
        &self,
        product_id: Uuid,
        scope: RecomputeScope,
    ) -> Result<i32, ServiceError> {
        let mut query = BatchLot::find().filter(batch_lot::Column::ProductId.eq(product_id));
        if scope == RecomputeScope::ActiveOnly {
            query = query.filter(batch_lot::Column::Status.eq(BatchStatus::Active.as_str()));
        }

        let batches = query
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let total: i32 = batches.iter().map(|b| b.remaining_quantity).sum();

        let product = self.get(product_id).await?;
        self.write_quantity_locked(product, total).await?;

        info!(
            product_id = %product_id,
            quantity = total,
            "Recomputed product stock from batch truth"
        );
        self.event_sender
            .emit(Event::ProductStockRecomputed {
                product_id,
                quantity: total,
            })
            .await;

        Ok(total)
    }

    /// Products at or below their minimum-stock threshold.
    #[instrument(skip(self))]
    pub async fn low_stock(&self) -> Result<Vec<product::Model>, ServiceError> {
        let products = Product::find()
            .filter(product::Column::Status.ne(ProductStatus::Discontinued.as_str()))
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(products.into_iter().filter(|p| p.is_low_stock()).collect())
    }
}
