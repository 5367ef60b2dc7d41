use crate::{
    db::DbPool,
    entities::{
        product::Entity as Product,
        stock_out::{self, Entity as StockOut, IssueType, StockOutStatus},
        stock_out_allocation::{self, Entity as StockOutAllocation},
        stock_out_item::{self, Entity as StockOutItem},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::Actor,
    services::{
        activity::{purge_refs_best_effort, record_activity, ActivityEntry, ActivitySink, ReversalCleanup},
        batch_lots::{AllocationPlan, BatchLotService},
        codes,
        product_stock::ProductStockService,
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Line of an issuing document being created.
#[derive(Debug, Clone)]
pub struct NewStockOutItem {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Defaults to the allocation plan's weighted-average cost when absent.
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct NewStockOut {
    pub issue_type: IssueType,
    pub issue_date: Option<DateTime<Utc>>,
    pub items: Vec<NewStockOutItem>,
}

/// Replacement payload for a pending document. Replacing the lines releases
/// the old allocation plan and builds a fresh one.
#[derive(Debug, Clone, Default)]
pub struct StockOutUpdate {
    pub issue_type: Option<IssueType>,
    pub issue_date: Option<DateTime<Utc>>,
    pub items: Option<Vec<NewStockOutItem>>,
}

/// Issuing document with its lines and each line's allocation plan.
#[derive(Debug, Clone)]
pub struct StockOutDocument {
    pub stock_out: stock_out::Model,
    pub items: Vec<StockOutLine>,
}

#[derive(Debug, Clone)]
pub struct StockOutLine {
    pub item: stock_out_item::Model,
    pub allocations: Vec<stock_out_allocation::Model>,
}

/// Issuing workflow: `pending → completed | cancelled`.
///
/// The allocation plan is binding and built at creation time — batches are
/// decremented when the document is created, the product aggregate when it
/// is approved. This asymmetry against the receiving workflow is
/// intentional and preserved.
#[derive(Clone)]
pub struct StockOutService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    batch_lots: Arc<BatchLotService>,
    product_stock: Arc<ProductStockService>,
    activity: Arc<dyn ActivitySink>,
    cleanup: Option<Arc<dyn ReversalCleanup>>,
}

impl StockOutService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        batch_lots: Arc<BatchLotService>,
        product_stock: Arc<ProductStockService>,
        activity: Arc<dyn ActivitySink>,
        cleanup: Option<Arc<dyn ReversalCleanup>>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            batch_lots,
            product_stock,
            activity,
            cleanup,
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<StockOutDocument, ServiceError> {
        let db = self.db_pool.as_ref();
        let stock_out = StockOut::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Issuing document {} not found", id)))?;

        let item_models = StockOutItem::find()
            .filter(stock_out_item::Column::StockOutId.eq(id))
            .order_by_asc(stock_out_item::Column::LineNo)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut items = Vec::with_capacity(item_models.len());
        for item in item_models {
            let allocations = StockOutAllocation::find()
                .filter(stock_out_allocation::Column::StockOutItemId.eq(item.id))
                .order_by_asc(stock_out_allocation::Column::Sequence)
                .all(db)
                .await
                .map_err(ServiceError::db_error)?;
            items.push(StockOutLine { item, allocations });
        }

        Ok(StockOutDocument { stock_out, items })
    }

    async fn next_code(&self) -> Result<String, ServiceError> {
        let prefix = codes::month_prefix(codes::STOCK_OUT_PREFIX, Utc::now());
        let last = StockOut::find()
            .filter(stock_out::Column::Code.starts_with(prefix.as_str()))
            .order_by_desc(stock_out::Column::Code)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(codes::next_in_sequence(
            &prefix,
            last.as_ref().map(|d| d.code.as_str()),
        ))
    }

    async fn validate_items(&self, items: &[NewStockOutItem]) -> Result<(), ServiceError> {
        if items.is_empty() {
            return Err(ServiceError::ValidationError(
                "An issuing document needs at least one line".to_string(),
            ));
        }
        for item in items {
            if item.quantity < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "Line quantity must be at least 1, got {}",
                    item.quantity
                )));
            }
            let product = Product::find_by_id(item.product_id)
                .one(self.db_pool.as_ref())
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", item.product_id))
                })?;
            if product.current_stock < item.quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "Product {} has {} on hand, {} requested",
                    product.id, product.current_stock, item.quantity
                )));
            }
        }
        Ok(())
    }

    /// Allocate one line under its product lock. If batch truth comes up
    /// short of the aggregate (drift), the draws are rolled back and the
    /// line is rejected without state change.
    async fn allocate_line(
        &self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<AllocationPlan, ServiceError> {
        let _guard = self.product_stock.lock(product_id).await;

        let product = self.product_stock.get(product_id).await?;
        if product.current_stock < quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "Product {} has {} on hand, {} requested",
                product_id, product.current_stock, quantity
            )));
        }

        let plan = self.batch_lots.allocate(product_id, quantity).await?;
        if !plan.is_satisfied() {
            let draws: Vec<(Uuid, i32)> = plan
                .entries
                .iter()
                .map(|e| (e.batch_lot_id, e.quantity))
                .collect();
            self.batch_lots.restore(&draws).await?;
            return Err(ServiceError::IntegrityViolation(format!(
                "Batches of product {} cover only {} of {} requested; \
                 aggregate and batch truth have drifted — recompute the product stock",
                product_id,
                plan.allocated(),
                quantity
            )));
        }

        Ok(plan)
    }

    /// Create an issuing document in `pending`, building and recording the
    /// binding allocation plan per line.
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        actor: Actor,
        input: NewStockOut,
    ) -> Result<StockOutDocument, ServiceError> {
        self.validate_items(&input.items).await?;

        let now = Utc::now();
        let id = Uuid::new_v4();
        let code = self.next_code().await?;
        let issue_date = input.issue_date.unwrap_or(now);
        let db = self.db_pool.as_ref();

        // Batches are drawn line by line; each draw commits independently.
        let mut plans: Vec<AllocationPlan> = Vec::with_capacity(input.items.len());
        for (idx, item) in input.items.iter().enumerate() {
            match self.allocate_line(item.product_id, item.quantity).await {
                Ok(plan) => plans.push(plan),
                Err(e) if idx == 0 => return Err(e),
                Err(e) => {
                    error!(
                        stock_out_code = %code,
                        failed_item = idx,
                        "Partial failure while allocating issuing document: {}",
                        e
                    );
                    return Err(ServiceError::PartialFailure {
                        applied: (0..idx).collect(),
                        total: input.items.len(),
                        message: format!("line {} failed: {}", idx, e),
                    });
                }
            }
        }

        let mut total_amount = Decimal::ZERO;
        let mut item_models = Vec::with_capacity(input.items.len());
        let mut allocation_models = Vec::new();

        for (line_no, (item, plan)) in input.items.iter().zip(&plans).enumerate() {
            let unit_price = item
                .unit_price
                .unwrap_or_else(|| plan.weighted_average_cost().round_dp(2));
            let total_price = Decimal::from(item.quantity) * unit_price;
            total_amount += total_price;

            let item_id = Uuid::new_v4();
            item_models.push(stock_out_item::ActiveModel {
                id: Set(item_id),
                stock_out_id: Set(id),
                line_no: Set(line_no as i32),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                unit_price: Set(unit_price),
                total_price: Set(total_price),
                created_at: Set(now),
            });

            for (sequence, entry) in plan.entries.iter().enumerate() {
                allocation_models.push(stock_out_allocation::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    stock_out_item_id: Set(item_id),
                    batch_lot_id: Set(entry.batch_lot_id),
                    batch_number: Set(entry.batch_number.clone()),
                    sequence: Set(sequence as i32),
                    quantity: Set(entry.quantity),
                    cost_price: Set(entry.cost_price),
                    expiry_date: Set(entry.expiry_date),
                    created_at: Set(now),
                });
            }
        }

        let header = stock_out::ActiveModel {
            id: Set(id),
            code: Set(code.clone()),
            issue_type: Set(input.issue_type.as_str().to_string()),
            total_amount: Set(total_amount),
            issue_date: Set(issue_date),
            status: Set(StockOutStatus::Pending.as_str().to_string()),
            created_by: Set(actor.id),
            approved_by: Set(None),
            approved_at: Set(None),
            cancelled_by: Set(None),
            cancelled_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        // The draws above are already committed; a failure persisting the
        // document surfaces as a partial failure, with recompute as the
        // remediation.
        let persist = async {
            header.insert(db).await.map_err(ServiceError::db_error)?;
            StockOutItem::insert_many(item_models)
                .exec(db)
                .await
                .map_err(ServiceError::db_error)?;
            if !allocation_models.is_empty() {
                StockOutAllocation::insert_many(allocation_models)
                    .exec(db)
                    .await
                    .map_err(ServiceError::db_error)?;
            }
            Ok::<_, ServiceError>(())
        };
        if let Err(e) = persist.await {
            error!(
                stock_out_code = %code,
                "Failed to persist issuing document after batches were drawn: {}",
                e
            );
            return Err(ServiceError::PartialFailure {
                applied: (0..input.items.len()).collect(),
                total: input.items.len(),
                message: format!("document persist failed: {}", e),
            });
        }

        info!(stock_out_id = %id, code = %code, "Created issuing document");
        self.event_sender.emit(Event::StockOutCreated(id)).await;
        record_activity(
            &self.activity,
            ActivityEntry::new(
                Some(actor.id),
                "create_stock_out",
                "StockOut",
                id,
                format!("Created issuing document {}", code),
            )
            .with_meta(json!({
                "code": code,
                "total_amount": total_amount,
                "issue_type": input.issue_type.as_str(),
            })),
        )
        .await;

        self.get(id).await
    }

    /// Release every batch drawn for this document, in plan order.
    async fn release_allocations(&self, doc: &StockOutDocument) -> Result<(), ServiceError> {
        for line in &doc.items {
            let _guard = self.product_stock.lock(line.item.product_id).await;
            let draws: Vec<(Uuid, i32)> = line
                .allocations
                .iter()
                .map(|a| (a.batch_lot_id, a.quantity))
                .collect();
            self.batch_lots.restore(&draws).await?;
        }
        Ok(())
    }

    /// Replace a pending document's type, date or lines. New lines release
    /// the old plan first, then allocate afresh.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        id: Uuid,
        actor: Actor,
        update: StockOutUpdate,
    ) -> Result<StockOutDocument, ServiceError> {
        let doc = self.get(id).await?;
        if doc.stock_out.status != StockOutStatus::Pending.as_str() {
            return Err(ServiceError::InvalidStatus(
                "Only a pending issuing document can be updated".to_string(),
            ));
        }

        let mut total_amount = doc.stock_out.total_amount;

        if let Some(items) = &update.items {
            // Validate referenced lots before releasing anything.
            self.validate_plan_batches(&doc).await?;
            self.release_allocations(&doc).await?;

            for line in &doc.items {
                StockOutAllocation::delete_many()
                    .filter(stock_out_allocation::Column::StockOutItemId.eq(line.item.id))
                    .exec(self.db_pool.as_ref())
                    .await
                    .map_err(ServiceError::db_error)?;
            }
            StockOutItem::delete_many()
                .filter(stock_out_item::Column::StockOutId.eq(id))
                .exec(self.db_pool.as_ref())
                .await
                .map_err(ServiceError::db_error)?;

            self.validate_items(items).await?;

            let now = Utc::now();
            total_amount = Decimal::ZERO;
            for (line_no, item) in items.iter().enumerate() {
                let plan = self.allocate_line(item.product_id, item.quantity).await?;
                let unit_price = item
                    .unit_price
                    .unwrap_or_else(|| plan.weighted_average_cost().round_dp(2));
                let total_price = Decimal::from(item.quantity) * unit_price;
                total_amount += total_price;

                let item_id = Uuid::new_v4();
                stock_out_item::ActiveModel {
                    id: Set(item_id),
                    stock_out_id: Set(id),
                    line_no: Set(line_no as i32),
                    product_id: Set(item.product_id),
                    quantity: Set(item.quantity),
                    unit_price: Set(unit_price),
                    total_price: Set(total_price),
                    created_at: Set(now),
                }
                .insert(self.db_pool.as_ref())
                .await
                .map_err(ServiceError::db_error)?;

                for (sequence, entry) in plan.entries.iter().enumerate() {
                    stock_out_allocation::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        stock_out_item_id: Set(item_id),
                        batch_lot_id: Set(entry.batch_lot_id),
                        batch_number: Set(entry.batch_number.clone()),
                        sequence: Set(sequence as i32),
                        quantity: Set(entry.quantity),
                        cost_price: Set(entry.cost_price),
                        expiry_date: Set(entry.expiry_date),
                        created_at: Set(now),
                    }
                    .insert(self.db_pool.as_ref())
                    .await
                    .map_err(ServiceError::db_error)?;
                }
            }
        }

        let mut active: stock_out::ActiveModel = doc.stock_out.clone().into();
        if let Some(issue_type) = update.issue_type {
            active.issue_type = Set(issue_type.as_str().to_string());
        }
        if let Some(issue_date) = update.issue_date {
            active.issue_date = Set(issue_date);
        }
        active.total_amount = Set(total_amount);
        active.updated_at = Set(Utc::now());
        active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        self.get(id).await
    }

    /// Approve a pending document: claims the status transition, re-verifies
    /// stock per line (defensive), and applies the aggregate decrement.
    #[instrument(skip(self))]
    pub async fn approve(&self, id: Uuid, actor: Actor) -> Result<StockOutDocument, ServiceError> {
        if !actor.role.can_approve() {
            return Err(ServiceError::Forbidden(
                "Only a warehouse manager or admin can approve an issuing document".to_string(),
            ));
        }

        let doc = self.get(id).await?;
        let now = Utc::now();

        // Conditional claim: exactly one concurrent approval wins.
        let claim = StockOut::update_many()
            .col_expr(
                stock_out::Column::Status,
                Expr::value(StockOutStatus::Completed.as_str()),
            )
            .col_expr(stock_out::Column::ApprovedBy, Expr::value(actor.id))
            .col_expr(stock_out::Column::ApprovedAt, Expr::value(now))
            .col_expr(stock_out::Column::UpdatedAt, Expr::value(now))
            .filter(stock_out::Column::Id.eq(id))
            .filter(stock_out::Column::Status.eq(StockOutStatus::Pending.as_str()))
            .exec(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        if claim.rows_affected == 0 {
            return Err(ServiceError::Conflict(
                "Issuing document has already been processed or cancelled".to_string(),
            ));
        }

        let total = doc.items.len();
        for (idx, line) in doc.items.iter().enumerate() {
            if let Err(e) = self
                .product_stock
                .decrease_checked(line.item.product_id, line.item.quantity)
                .await
            {
                error!(
                    stock_out_id = %id,
                    failed_item = idx,
                    "Partial failure while approving issuing document: {}",
                    e
                );
                return Err(ServiceError::PartialFailure {
                    applied: (0..idx).collect(),
                    total,
                    message: format!("line {} failed: {}", idx, e),
                });
            }
        }

        info!(stock_out_id = %id, approver = %actor.id, "Approved issuing document");
        self.event_sender
            .emit(Event::StockOutApproved {
                stock_out_id: id,
                approved_by: actor.id,
            })
            .await;
        record_activity(
            &self.activity,
            ActivityEntry::new(
                Some(actor.id),
                "approve_stock_out",
                "StockOut",
                id,
                format!("Approved issuing document {}", doc.stock_out.code),
            ),
        )
        .await;

        self.get(id).await
    }

    /// Every plan entry must reference an existing lot of the line's
    /// product before a reversal is allowed to start.
    async fn validate_plan_batches(&self, doc: &StockOutDocument) -> Result<(), ServiceError> {
        for line in &doc.items {
            for allocation in &line.allocations {
                let lot = match self.batch_lots.get(allocation.batch_lot_id).await {
                    Ok(lot) => lot,
                    Err(ServiceError::NotFound(_)) => {
                        return Err(ServiceError::NotFound(format!(
                            "Batch {} (lot {}) referenced by the plan no longer exists",
                            allocation.batch_number, allocation.batch_lot_id
                        )))
                    }
                    Err(e) => return Err(e),
                };
                if lot.product_id != line.item.product_id {
                    return Err(ServiceError::Conflict(format!(
                        "Batch {} does not belong to product {}",
                        allocation.batch_number, line.item.product_id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Cancel a pending or completed document: restores every drawn batch in
    /// plan order, then the product aggregates, then marks the document
    /// cancelled. Item-level failure aborts further mutation for that item
    /// and surfaces which items already restored.
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: Uuid, actor: Actor) -> Result<StockOutDocument, ServiceError> {
        if !actor.role.can_approve() {
            return Err(ServiceError::Forbidden(
                "Only a warehouse manager or admin can cancel an issuing document".to_string(),
            ));
        }

        let doc = self.get(id).await?;
        let was_completed = doc.stock_out.status == StockOutStatus::Completed.as_str();
        match StockOutStatus::from_str(&doc.stock_out.status) {
            Some(StockOutStatus::Pending) | Some(StockOutStatus::Completed) => {}
            _ => {
                return Err(ServiceError::InvalidStatus(
                    "Issuing document is not cancellable from its current status".to_string(),
                ))
            }
        }

        // Validation pass before any write.
        self.validate_plan_batches(&doc).await?;

        // Restoration pass: independent writes, in sequence.
        let total = doc.items.len();
        for (idx, line) in doc.items.iter().enumerate() {
            let step = async {
                let _guard = self.product_stock.lock(line.item.product_id).await;
                let draws: Vec<(Uuid, i32)> = line
                    .allocations
                    .iter()
                    .map(|a| (a.batch_lot_id, a.quantity))
                    .collect();
                self.batch_lots.restore(&draws).await?;

                // A pending document never decremented the aggregate.
                if was_completed {
                    self.product_stock
                        .apply_delta_locked(line.item.product_id, line.item.quantity)
                        .await?;
                }
                Ok::<_, ServiceError>(())
            };
            if let Err(e) = step.await {
                error!(
                    stock_out_id = %id,
                    failed_item = idx,
                    "Partial failure while cancelling issuing document: {}",
                    e
                );
                return Err(ServiceError::PartialFailure {
                    applied: (0..idx).collect(),
                    total,
                    message: format!("line {} failed: {}", idx, e),
                });
            }
        }

        purge_refs_best_effort(&self.cleanup, id).await;

        let now = Utc::now();
        let mut active: stock_out::ActiveModel = doc.stock_out.clone().into();
        active.status = Set(StockOutStatus::Cancelled.as_str().to_string());
        active.cancelled_by = Set(Some(actor.id));
        active.cancelled_at = Set(Some(now));
        active.updated_at = Set(now);
        active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        info!(stock_out_id = %id, canceller = %actor.id, "Cancelled issuing document");
        self.event_sender
            .emit(Event::StockOutCancelled {
                stock_out_id: id,
                cancelled_by: actor.id,
            })
            .await;
        record_activity(
            &self.activity,
            ActivityEntry::new(
                Some(actor.id),
                "cancel_stock_out",
                "StockOut",
                id,
                format!("Cancelled issuing document {}", doc.stock_out.code),
            ),
        )
        .await;

        self.get(id).await
    }

    /// Delete a pending or cancelled document. A pending document's binding
    /// plan is released first so its draws are not leaked.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, actor: Actor) -> Result<(), ServiceError> {
        if !actor.role.can_approve() {
            return Err(ServiceError::Forbidden(
                "Only a warehouse manager or admin can delete an issuing document".to_string(),
            ));
        }

        let doc = self.get(id).await?;
        match StockOutStatus::from_str(&doc.stock_out.status) {
            Some(StockOutStatus::Pending) => {
                self.validate_plan_batches(&doc).await?;
                self.release_allocations(&doc).await?;
            }
            Some(StockOutStatus::Cancelled) => {}
            _ => {
                return Err(ServiceError::InvalidStatus(
                    "Only a pending or cancelled issuing document can be deleted".to_string(),
                ))
            }
        }

        for line in &doc.items {
            StockOutAllocation::delete_many()
                .filter(stock_out_allocation::Column::StockOutItemId.eq(line.item.id))
                .exec(self.db_pool.as_ref())
                .await
                .map_err(ServiceError::db_error)?;
        }
        StockOutItem::delete_many()
            .filter(stock_out_item::Column::StockOutId.eq(id))
            .exec(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        StockOut::delete_by_id(id)
            .exec(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        info!(stock_out_id = %id, "Deleted issuing document");
        Ok(())
    }
}
