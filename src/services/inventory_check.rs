use crate::{
    db::DbPool,
    entities::{
        inventory_check::{self, CheckScope, CheckStatus, Entity as InventoryCheck},
        inventory_check_item::{self, CountStatus, DiscrepancyReason, Entity as InventoryCheckItem},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::Actor,
    services::{
        activity::{record_activity, ActivityEntry, ActivitySink},
        batch_lots::BatchLotService,
        codes,
        product_stock::{ProductStockService, RecomputeScope},
    },
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionError,
    TransactionTrait,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// One product (or product+lot) to count.
#[derive(Debug, Clone)]
pub struct NewCheckItem {
    pub product_id: Uuid,
    /// Count a specific lot instead of the product total.
    pub batch_lot_id: Option<Uuid>,
    pub actual_quantity: Option<i32>,
    pub discrepancy_reason: Option<DiscrepancyReason>,
}

#[derive(Debug, Clone)]
pub struct NewInventoryCheck {
    pub title: String,
    pub scope: Option<CheckScope>,
    pub category_id: Option<Uuid>,
    pub assignee: Option<Uuid>,
    pub notes: Option<String>,
    pub items: Vec<NewCheckItem>,
}

/// A counted quantity being recorded against one document line.
#[derive(Debug, Clone)]
pub struct CountUpdate {
    pub item_id: Uuid,
    pub actual_quantity: i32,
    pub notes: Option<String>,
    pub discrepancy_reason: Option<DiscrepancyReason>,
}

/// Reconciliation document with its lines.
#[derive(Debug, Clone)]
pub struct InventoryCheckDocument {
    pub check: inventory_check::Model,
    pub items: Vec<inventory_check_item::Model>,
}

/// Reconciliation workflow: `in_progress → submitted → completed`, or
/// `in_progress → cancelled`. Counts are recorded by the assignee only;
/// approval overwrites system quantities with counted ones and is the
/// canonical resync point for the aggregate invariant.
#[derive(Clone)]
pub struct InventoryCheckService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    batch_lots: Arc<BatchLotService>,
    product_stock: Arc<ProductStockService>,
    activity: Arc<dyn ActivitySink>,
}

impl InventoryCheckService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        batch_lots: Arc<BatchLotService>,
        product_stock: Arc<ProductStockService>,
        activity: Arc<dyn ActivitySink>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            batch_lots,
            product_stock,
            activity,
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<InventoryCheckDocument, ServiceError> {
        let db = self.db_pool.as_ref();
        let check = InventoryCheck::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Reconciliation document {} not found", id))
            })?;

        let items = InventoryCheckItem::find()
            .filter(inventory_check_item::Column::InventoryCheckId.eq(id))
            .order_by_asc(inventory_check_item::Column::CreatedAt)
            .order_by_asc(inventory_check_item::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(InventoryCheckDocument { check, items })
    }

    async fn next_code(&self) -> Result<String, ServiceError> {
        let prefix = codes::month_prefix(codes::INVENTORY_CHECK_PREFIX, Utc::now());
        let last = InventoryCheck::find()
            .filter(inventory_check::Column::Code.starts_with(prefix.as_str()))
            .order_by_desc(inventory_check::Column::Code)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(codes::next_in_sequence(
            &prefix,
            last.as_ref().map(|d| d.code.as_str()),
        ))
    }

    fn summary(items: &[(i32, CountStatus)]) -> (i32, i32, i32, i32) {
        let mut matched = 0;
        let mut excess = 0;
        let mut shortage = 0;
        for (_, status) in items {
            match status {
                CountStatus::Matched => matched += 1,
                CountStatus::Excess => excess += 1,
                CountStatus::Shortage => shortage += 1,
            }
        }
        (items.len() as i32, matched, excess, shortage)
    }

    /// Create a reconciliation document, snapshotting each line's system
    /// quantity (product on-hand, or lot remaining when a lot is named).
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        actor: Actor,
        input: NewInventoryCheck,
    ) -> Result<InventoryCheckDocument, ServiceError> {
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "A reconciliation needs at least one product to count".to_string(),
            ));
        }
        if input.title.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "A reconciliation needs a title".to_string(),
            ));
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        let code = self.next_code().await?;
        let scope = input.scope.unwrap_or(CheckScope::Product);

        let mut item_models = Vec::with_capacity(input.items.len());
        let mut classified = Vec::with_capacity(input.items.len());

        for item in &input.items {
            let product = self.product_stock.get(item.product_id).await?;

            let (system_quantity, batch_number, manufacturing_date, expiry_date, cost_price) =
                match item.batch_lot_id {
                    Some(batch_lot_id) => {
                        let lot = self.batch_lots.get(batch_lot_id).await?;
                        if lot.product_id != item.product_id {
                            return Err(ServiceError::Conflict(format!(
                                "Batch {} does not belong to product {}",
                                lot.batch_number, item.product_id
                            )));
                        }
                        (
                            lot.remaining_quantity,
                            Some(lot.batch_number),
                            lot.manufacturing_date,
                            lot.expiry_date,
                            lot.cost_price,
                        )
                    }
                    None => (product.current_stock, None, None, None, product.cost_price),
                };

            let actual_quantity = item.actual_quantity.unwrap_or(0);
            if actual_quantity < 0 {
                return Err(ServiceError::ValidationError(
                    "A counted quantity cannot be negative".to_string(),
                ));
            }
            let difference = actual_quantity - system_quantity;
            let status = CountStatus::for_difference(difference);
            classified.push((difference, status));

            item_models.push(inventory_check_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                inventory_check_id: Set(id),
                product_id: Set(item.product_id),
                batch_lot_id: Set(item.batch_lot_id),
                batch_number: Set(batch_number),
                manufacturing_date: Set(manufacturing_date),
                expiry_date: Set(expiry_date),
                system_quantity: Set(system_quantity),
                actual_quantity: Set(actual_quantity),
                difference: Set(difference),
                status: Set(status.as_str().to_string()),
                discrepancy_reason: Set(item
                    .discrepancy_reason
                    .map(|r| r.as_str().to_string())),
                cost_price: Set(cost_price),
                notes: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            });
        }

        let (total_items, matched, excess, shortage) = Self::summary(&classified);

        let header = inventory_check::ActiveModel {
            id: Set(id),
            code: Set(code.clone()),
            title: Set(input.title.trim().to_string()),
            check_date: Set(now),
            scope: Set(scope.as_str().to_string()),
            category_id: Set(input.category_id),
            status: Set(CheckStatus::InProgress.as_str().to_string()),
            notes: Set(input.notes.clone()),
            total_items: Set(total_items),
            matched_count: Set(matched),
            excess_count: Set(excess),
            shortage_count: Set(shortage),
            created_by: Set(actor.id),
            assignee: Set(input.assignee),
            approved_by: Set(None),
            approved_at: Set(None),
            submitted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        self.db_pool
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    header.insert(txn).await.map_err(ServiceError::db_error)?;
                    InventoryCheckItem::insert_many(item_models)
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    Ok(())
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(check_id = %id, code = %code, "Created reconciliation document");
        self.event_sender.emit(Event::InventoryCheckCreated(id)).await;

        self.get(id).await
    }

    fn ensure_assignee(check: &inventory_check::Model, actor: Actor) -> Result<(), ServiceError> {
        match check.assignee {
            Some(assignee) if assignee == actor.id => Ok(()),
            Some(_) => Err(ServiceError::Forbidden(
                "Only the assigned user can work this reconciliation".to_string(),
            )),
            None => Err(ServiceError::Forbidden(
                "Reconciliation has no assignee yet".to_string(),
            )),
        }
    }

    /// Record counted quantities. Assignee-only, while `in_progress`.
    /// Differences, classifications and the document summary are recomputed
    /// on every save.
    #[instrument(skip(self, updates))]
    pub async fn record_counts(
        &self,
        id: Uuid,
        actor: Actor,
        updates: Vec<CountUpdate>,
    ) -> Result<InventoryCheckDocument, ServiceError> {
        let doc = self.get(id).await?;
        if doc.check.status != CheckStatus::InProgress.as_str() {
            return Err(ServiceError::InvalidStatus(
                "Counts can only be recorded while the reconciliation is in progress".to_string(),
            ));
        }
        Self::ensure_assignee(&doc.check, actor)?;

        let now = Utc::now();
        for update in &updates {
            if update.actual_quantity < 0 {
                return Err(ServiceError::ValidationError(
                    "A counted quantity cannot be negative".to_string(),
                ));
            }
        }

        for update in updates {
            // Unknown item ids are skipped, matching the tolerant save of
            // the count sheet.
            let Some(item) = doc.items.iter().find(|i| i.id == update.item_id) else {
                warn!(check_id = %id, item_id = %update.item_id, "Ignoring count for unknown item");
                continue;
            };

            let difference = update.actual_quantity - item.system_quantity;
            let status = CountStatus::for_difference(difference);

            let mut active: inventory_check_item::ActiveModel = item.clone().into();
            active.actual_quantity = Set(update.actual_quantity);
            active.difference = Set(difference);
            active.status = Set(status.as_str().to_string());
            if let Some(notes) = update.notes {
                active.notes = Set(Some(notes));
            }
            if let Some(reason) = update.discrepancy_reason {
                active.discrepancy_reason = Set(Some(reason.as_str().to_string()));
            }
            active.updated_at = Set(now);
            active
                .update(self.db_pool.as_ref())
                .await
                .map_err(ServiceError::db_error)?;
        }

        self.refresh_summary(id).await
    }

    /// Recompute and persist the document-level classification counters.
    async fn refresh_summary(&self, id: Uuid) -> Result<InventoryCheckDocument, ServiceError> {
        let doc = self.get(id).await?;
        let classified: Vec<(i32, CountStatus)> = doc
            .items
            .iter()
            .map(|i| {
                (
                    i.difference,
                    CountStatus::from_str(&i.status).unwrap_or(CountStatus::Matched),
                )
            })
            .collect();
        let (total_items, matched, excess, shortage) = Self::summary(&classified);

        let mut active: inventory_check::ActiveModel = doc.check.clone().into();
        active.total_items = Set(total_items);
        active.matched_count = Set(matched);
        active.excess_count = Set(excess);
        active.shortage_count = Set(shortage);
        active.updated_at = Set(Utc::now());
        active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        self.get(id).await
    }

    /// The assignee submits the counted sheet for approval.
    #[instrument(skip(self))]
    pub async fn submit(
        &self,
        id: Uuid,
        actor: Actor,
    ) -> Result<InventoryCheckDocument, ServiceError> {
        let doc = self.get(id).await?;
        if doc.check.status != CheckStatus::InProgress.as_str() {
            return Err(ServiceError::InvalidStatus(
                "Only an in-progress reconciliation can be submitted".to_string(),
            ));
        }
        Self::ensure_assignee(&doc.check, actor)?;

        let now = Utc::now();
        let mut active: inventory_check::ActiveModel = doc.check.clone().into();
        active.status = Set(CheckStatus::Submitted.as_str().to_string());
        active.submitted_at = Set(Some(now));
        active.updated_at = Set(now);
        active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        info!(check_id = %id, "Reconciliation submitted for approval");
        self.event_sender
            .emit(Event::InventoryCheckSubmitted {
                check_id: id,
                submitted_by: actor.id,
            })
            .await;
        record_activity(
            &self.activity,
            ActivityEntry::new(
                Some(actor.id),
                "submit_inventory_check",
                "InventoryCheck",
                id,
                format!("Submitted reconciliation {}", doc.check.code),
            ),
        )
        .await;

        self.get(id).await
    }

    /// Approve a submitted reconciliation: overwrite lot quantities with
    /// counted ones and resync each owning product from its active batches,
    /// or overwrite the product directly for batch-less lines. Every
    /// adjustment is reported with before/after values.
    #[instrument(skip(self))]
    pub async fn approve(
        &self,
        id: Uuid,
        actor: Actor,
    ) -> Result<InventoryCheckDocument, ServiceError> {
        if !actor.role.can_approve() {
            return Err(ServiceError::Forbidden(
                "Only a warehouse manager or admin can approve a reconciliation".to_string(),
            ));
        }

        let doc = self.get(id).await?;
        if doc.check.status != CheckStatus::Submitted.as_str() {
            return Err(ServiceError::InvalidStatus(
                "Only a submitted reconciliation can be approved".to_string(),
            ));
        }

        for item in &doc.items {
            // A product deleted since the snapshot is skipped, not fatal.
            let Ok(product) = self.product_stock.get(item.product_id).await else {
                warn!(
                    check_id = %id,
                    product_id = %item.product_id,
                    "Skipping adjustment for missing product"
                );
                continue;
            };

            let difference = item.actual_quantity - item.system_quantity;

            match item.batch_lot_id {
                Some(batch_lot_id) => {
                    let Ok(lot) = self.batch_lots.get(batch_lot_id).await else {
                        warn!(
                            check_id = %id,
                            batch_lot_id = %batch_lot_id,
                            "Skipping adjustment for missing lot"
                        );
                        continue;
                    };
                    let before = lot.remaining_quantity;

                    self.batch_lots
                        .update_batch(
                            batch_lot_id,
                            crate::services::batch_lots::BatchUpdate {
                                remaining_quantity: Some(item.actual_quantity),
                                ..Default::default()
                            },
                        )
                        .await?;

                    // The canonical resync: product on-hand becomes the sum
                    // over its active batches.
                    let resynced = self
                        .product_stock
                        .recompute(item.product_id, RecomputeScope::ActiveOnly)
                        .await?;

                    record_activity(
                        &self.activity,
                        ActivityEntry::new(
                            Some(actor.id),
                            "approve_inventory_check",
                            "BatchLot",
                            batch_lot_id,
                            format!(
                                "Reconciliation {}: batch {} of {} adjusted {} → {}",
                                doc.check.code,
                                lot.batch_number,
                                product.name,
                                before,
                                item.actual_quantity
                            ),
                        )
                        .with_meta(json!({
                            "before": before,
                            "after": item.actual_quantity,
                            "product_id": item.product_id,
                            "product_stock": resynced,
                            "check_id": id,
                            "reason": item.discrepancy_reason,
                        })),
                    )
                    .await;
                }
                None => {
                    let before = product.current_stock;
                    let _guard = self.product_stock.lock(item.product_id).await;
                    self.product_stock
                        .overwrite_locked(item.product_id, item.actual_quantity)
                        .await?;
                    drop(_guard);

                    record_activity(
                        &self.activity,
                        ActivityEntry::new(
                            Some(actor.id),
                            "approve_inventory_check",
                            "Product",
                            item.product_id,
                            format!(
                                "Reconciliation {}: product {} adjusted {} → {}",
                                doc.check.code, product.name, before, item.actual_quantity
                            ),
                        )
                        .with_meta(json!({
                            "before": before,
                            "after": item.actual_quantity,
                            "check_id": id,
                            "reason": item.discrepancy_reason,
                        })),
                    )
                    .await;
                }
            }

            let mut item_active: inventory_check_item::ActiveModel = item.clone().into();
            item_active.difference = Set(difference);
            item_active.status =
                Set(CountStatus::for_difference(difference).as_str().to_string());
            item_active.updated_at = Set(Utc::now());
            item_active
                .update(self.db_pool.as_ref())
                .await
                .map_err(ServiceError::db_error)?;
        }

        let now = Utc::now();
        let mut active: inventory_check::ActiveModel = doc.check.clone().into();
        active.status = Set(CheckStatus::Completed.as_str().to_string());
        active.approved_by = Set(Some(actor.id));
        active.approved_at = Set(Some(now));
        active.updated_at = Set(now);
        active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        info!(check_id = %id, approver = %actor.id, "Approved reconciliation");
        self.event_sender
            .emit(Event::InventoryCheckApproved {
                check_id: id,
                approved_by: actor.id,
            })
            .await;

        self.refresh_summary(id).await
    }

    /// Cancel an in-progress reconciliation. No quantities change.
    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        id: Uuid,
        actor: Actor,
    ) -> Result<InventoryCheckDocument, ServiceError> {
        if !actor.role.can_approve() {
            return Err(ServiceError::Forbidden(
                "Only a warehouse manager or admin can cancel a reconciliation".to_string(),
            ));
        }

        let doc = self.get(id).await?;
        if doc.check.status != CheckStatus::InProgress.as_str() {
            return Err(ServiceError::InvalidStatus(
                "Only an in-progress reconciliation can be cancelled".to_string(),
            ));
        }

        let mut active: inventory_check::ActiveModel = doc.check.clone().into();
        active.status = Set(CheckStatus::Cancelled.as_str().to_string());
        active.updated_at = Set(Utc::now());
        active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        self.event_sender
            .emit(Event::InventoryCheckCancelled(id))
            .await;

        self.get(id).await
    }

    /// Delete an in-progress reconciliation and its lines.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, actor: Actor) -> Result<(), ServiceError> {
        if !actor.role.can_approve() {
            return Err(ServiceError::Forbidden(
                "Only a warehouse manager or admin can delete a reconciliation".to_string(),
            ));
        }

        let doc = self.get(id).await?;
        if doc.check.status != CheckStatus::InProgress.as_str() {
            return Err(ServiceError::InvalidStatus(
                "Only an in-progress reconciliation can be deleted".to_string(),
            ));
        }

        InventoryCheckItem::delete_many()
            .filter(inventory_check_item::Column::InventoryCheckId.eq(id))
            .exec(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        InventoryCheck::delete_by_id(id)
            .exec(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        info!(check_id = %id, "Deleted reconciliation document");
        Ok(())
    }
}
