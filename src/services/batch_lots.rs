use crate::{
    db::DbPool,
    entities::batch_lot::{self, BatchStatus, Entity as BatchLot},
    errors::ServiceError,
    events::{Event, EventSender},
    services::product_stock::{ProductStockService, RecomputeScope},
};
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// One draw within an allocation plan.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationEntry {
    pub batch_lot_id: Uuid,
    pub batch_number: String,
    pub quantity: i32,
    pub cost_price: Decimal,
    pub expiry_date: Option<NaiveDate>,
}

/// Ordered consumption plan for one product and one requested quantity.
///
/// The allocator never fails on exhaustion — it under-allocates and leaves
/// `allocated() < requested`. Callers own the sufficiency check.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationPlan {
    pub product_id: Uuid,
    pub requested: i32,
    pub entries: Vec<AllocationEntry>,
}

impl AllocationPlan {
    pub fn allocated(&self) -> i32 {
        self.entries.iter().map(|e| e.quantity).sum()
    }

    pub fn is_satisfied(&self) -> bool {
        self.allocated() == self.requested
    }

    pub fn shortfall(&self) -> i32 {
        self.requested - self.allocated()
    }

    /// Σ(qty × cost) / Σ(qty), zero when nothing was drawn. Becomes the
    /// line's unit cost when the caller did not supply an explicit price.
    pub fn weighted_average_cost(&self) -> Decimal {
        let drawn = self.allocated();
        if drawn == 0 {
            return Decimal::ZERO;
        }
        let weighted: Decimal = self
            .entries
            .iter()
            .map(|e| Decimal::from(e.quantity) * e.cost_price)
            .sum();
        weighted / Decimal::from(drawn)
    }
}

/// Fields a batch admin correction may change.
#[derive(Debug, Clone, Default)]
pub struct BatchUpdate {
    pub remaining_quantity: Option<i32>,
    pub cost_price: Option<Decimal>,
    pub expiry_date: Option<NaiveDate>,
    pub manufacturing_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Store and allocator for received lots.
///
/// Allocation order is a documented contract, not an accident of the
/// persistence layer: batches are consumed FIFO by `(received_at ASC,
/// id ASC)` — the id tie-break keeps the walk deterministic when two lots
/// share a received timestamp. The FEFO variant `(expiry_date ASC, id ASC)`
/// is advisory only and never feeds a binding plan.
#[derive(Clone)]
pub struct BatchLotService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    product_stock: Arc<ProductStockService>,
}

impl BatchLotService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        product_stock: Arc<ProductStockService>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            product_stock,
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<batch_lot::Model, ServiceError> {
        BatchLot::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch lot {} not found", id)))
    }

    /// Open lots of a product in FIFO order.
    async fn fifo_candidates(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<batch_lot::Model>, ServiceError> {
        BatchLot::find()
            .filter(batch_lot::Column::ProductId.eq(product_id))
            .filter(batch_lot::Column::Status.eq(BatchStatus::Active.as_str()))
            .filter(batch_lot::Column::RemainingQuantity.gt(0))
            .order_by_asc(batch_lot::Column::ReceivedAt)
            .order_by_asc(batch_lot::Column::Id)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Build and apply a FIFO consumption plan: each drawn batch's remaining
    /// quantity is decremented immediately, flipping to `depleted` exactly
    /// when it reaches zero. Stops when the request is satisfied or the
    /// batches run out — exhaustion is the caller's problem to detect via
    /// `AllocationPlan::is_satisfied`.
    ///
    /// Callers must hold the product's mutation lock.
    #[instrument(skip(self))]
    pub async fn allocate(
        &self,
        product_id: Uuid,
        requested: i32,
    ) -> Result<AllocationPlan, ServiceError> {
        if requested <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "Requested quantity must be positive, got {}",
                requested
            )));
        }

        let mut plan = AllocationPlan {
            product_id,
            requested,
            entries: Vec::new(),
        };
        let mut left = requested;
        let today = Utc::now().date_naive();

        for lot in self.fifo_candidates(product_id).await? {
            if left <= 0 {
                break;
            }
            let draw = left.min(lot.remaining_quantity);

            plan.entries.push(AllocationEntry {
                batch_lot_id: lot.id,
                batch_number: lot.batch_number.clone(),
                quantity: draw,
                cost_price: lot.cost_price,
                expiry_date: lot.expiry_date,
            });

            let remaining = lot.remaining_quantity - draw;
            let lot_id = lot.id;
            let mut probe = lot.clone();
            probe.remaining_quantity = remaining;
            let next_status = probe.derived_status(today);

            let mut active: batch_lot::ActiveModel = lot.into();
            active.remaining_quantity = Set(remaining);
            active.status = Set(next_status.as_str().to_string());
            active.updated_at = Set(Utc::now());
            active
                .update(self.db_pool.as_ref())
                .await
                .map_err(ServiceError::db_error)?;

            if next_status == BatchStatus::Depleted {
                self.event_sender
                    .emit(Event::BatchDepleted {
                        batch_lot_id: lot_id,
                        product_id,
                    })
                    .await;
            }

            left -= draw;
        }

        info!(
            product_id = %product_id,
            requested,
            allocated = plan.allocated(),
            batches = plan.entries.len(),
            "Allocated stock across batches"
        );

        Ok(plan)
    }

    /// Advisory FEFO walk: same draw logic ordered by expiry date, over lots
    /// that have one, without touching any quantity. Used for expiry
    /// reporting only.
    #[instrument(skip(self))]
    pub async fn fefo_preview(
        &self,
        product_id: Uuid,
        requested: i32,
    ) -> Result<AllocationPlan, ServiceError> {
        if requested <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "Requested quantity must be positive, got {}",
                requested
            )));
        }

        let lots = BatchLot::find()
            .filter(batch_lot::Column::ProductId.eq(product_id))
            .filter(batch_lot::Column::Status.eq(BatchStatus::Active.as_str()))
            .filter(batch_lot::Column::RemainingQuantity.gt(0))
            .filter(batch_lot::Column::ExpiryDate.is_not_null())
            .order_by_asc(batch_lot::Column::ExpiryDate)
            .order_by_asc(batch_lot::Column::Id)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let mut plan = AllocationPlan {
            product_id,
            requested,
            entries: Vec::new(),
        };
        let mut left = requested;

        for lot in lots {
            if left <= 0 {
                break;
            }
            let draw = left.min(lot.remaining_quantity);
            plan.entries.push(AllocationEntry {
                batch_lot_id: lot.id,
                batch_number: lot.batch_number,
                quantity: draw,
                cost_price: lot.cost_price,
                expiry_date: lot.expiry_date,
            });
            left -= draw;
        }

        Ok(plan)
    }

    /// Reverse a plan's draws in plan order: remaining += drawn, reopening a
    /// `depleted` lot whose quantity became positive. Callers must hold the
    /// product's mutation lock and have validated the referenced lots.
    pub async fn restore(&self, draws: &[(Uuid, i32)]) -> Result<(), ServiceError> {
        let today = Utc::now().date_naive();

        for &(batch_lot_id, quantity) in draws {
            if quantity <= 0 {
                continue;
            }
            let lot = self.get(batch_lot_id).await?;

            let restored = lot.remaining_quantity + quantity;
            let mut probe = lot.clone();
            probe.remaining_quantity = restored;
            let next_status = probe.derived_status(today);

            let mut active: batch_lot::ActiveModel = lot.into();
            active.remaining_quantity = Set(restored);
            active.status = Set(next_status.as_str().to_string());
            active.updated_at = Set(Utc::now());
            active
                .update(self.db_pool.as_ref())
                .await
                .map_err(ServiceError::db_error)?;
        }

        Ok(())
    }

    /// Active lots expiring within `days` from today, soonest first.
    #[instrument(skip(self))]
    pub async fn find_near_expiry(&self, days: i64) -> Result<Vec<batch_lot::Model>, ServiceError> {
        let today = Utc::now().date_naive();
        let horizon = today + Duration::days(days);

        BatchLot::find()
            .filter(batch_lot::Column::Status.eq(BatchStatus::Active.as_str()))
            .filter(batch_lot::Column::RemainingQuantity.gt(0))
            .filter(batch_lot::Column::ExpiryDate.gte(today))
            .filter(batch_lot::Column::ExpiryDate.lte(horizon))
            .order_by_asc(batch_lot::Column::ExpiryDate)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Cost of a lot looked up by its natural key.
    #[instrument(skip(self))]
    pub async fn batch_cost(
        &self,
        product_id: Uuid,
        batch_number: &str,
    ) -> Result<Decimal, ServiceError> {
        let lot = BatchLot::find()
            .filter(batch_lot::Column::ProductId.eq(product_id))
            .filter(batch_lot::Column::BatchNumber.eq(batch_number))
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Batch {} of product {} not found",
                    batch_number, product_id
                ))
            })?;

        Ok(lot.cost_price)
    }

    /// Manual lot correction. Rejects a negative remaining quantity; a
    /// counted remaining above the initial quantity raises the initial to
    /// match, so `0 ≤ remaining ≤ initial` keeps holding. The owning
    /// product's stock is recomputed from batch truth afterwards.
    #[instrument(skip(self, update))]
    pub async fn update_batch(
        &self,
        id: Uuid,
        update: BatchUpdate,
    ) -> Result<batch_lot::Model, ServiceError> {
        if let Some(remaining) = update.remaining_quantity {
            if remaining < 0 {
                return Err(ServiceError::ValidationError(
                    "Remaining quantity cannot be negative".to_string(),
                ));
            }
        }

        let lot = self.get(id).await?;
        let product_id = lot.product_id;
        let _guard = self.product_stock.lock(product_id).await;

        // Re-read under the lock; another mutation may have landed.
        let lot = self.get(id).await?;
        let today = Utc::now().date_naive();

        let mut probe = lot.clone();
        if let Some(remaining) = update.remaining_quantity {
            probe.remaining_quantity = remaining;
            if remaining > probe.initial_quantity {
                probe.initial_quantity = remaining;
            }
        }
        if let Some(expiry) = update.expiry_date {
            probe.expiry_date = Some(expiry);
        }
        let next_status = probe.derived_status(today);

        let mut active: batch_lot::ActiveModel = lot.into();
        if let Some(remaining) = update.remaining_quantity {
            active.remaining_quantity = Set(remaining);
            active.initial_quantity = Set(probe.initial_quantity);
        }
        if let Some(cost) = update.cost_price {
            active.cost_price = Set(cost);
        }
        if let Some(expiry) = update.expiry_date {
            active.expiry_date = Set(Some(expiry));
        }
        if let Some(mfg) = update.manufacturing_date {
            active.manufacturing_date = Set(Some(mfg));
        }
        if let Some(notes) = update.notes {
            active.notes = Set(Some(notes));
        }
        active.status = Set(next_status.as_str().to_string());
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        // The original recomputes over every batch regardless of status here.
        self.product_stock
            .recompute_locked(product_id, RecomputeScope::AllStatuses)
            .await?;

        Ok(updated)
    }

    /// Lots created by a receiving document for one product.
    pub async fn find_by_stock_in(
        &self,
        stock_in_id: Uuid,
        product_id: Uuid,
    ) -> Result<Vec<batch_lot::Model>, ServiceError> {
        BatchLot::find()
            .filter(batch_lot::Column::StockInId.eq(stock_in_id))
            .filter(batch_lot::Column::ProductId.eq(product_id))
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Delete the lots a receiving document created for one product.
    pub async fn delete_for_stock_in(
        &self,
        stock_in_id: Uuid,
        product_id: Uuid,
    ) -> Result<u64, ServiceError> {
        let result = BatchLot::delete_many()
            .filter(batch_lot::Column::StockInId.eq(stock_in_id))
            .filter(batch_lot::Column::ProductId.eq(product_id))
            .exec(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(result.rows_affected)
    }
}
