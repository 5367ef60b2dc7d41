use crate::{
    db::DbPool,
    entities::{
        batch_lot,
        product::{self, Entity as Product},
        stock_in::{self, Entity as StockIn, StockInStatus},
        stock_in_item::{self, Entity as StockInItem},
        supplier::Entity as Supplier,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::Actor,
    services::{
        activity::{purge_refs_best_effort, record_activity, ActivityEntry, ActivitySink, ReversalCleanup},
        batch_lots::BatchLotService,
        codes,
        product_stock::ProductStockService,
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionError, TransactionTrait,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Line of a receiving document being created.
#[derive(Debug, Clone)]
pub struct NewStockInItem {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Defaults to the product's cost price when absent.
    pub unit_price: Option<Decimal>,
    /// A line with a batch number materializes a lot at creation time.
    pub batch_number: Option<String>,
    pub manufacturing_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct NewStockIn {
    pub supplier_id: Uuid,
    pub import_date: Option<DateTime<Utc>>,
    pub items: Vec<NewStockInItem>,
}

/// Replacement payload for a pending document.
#[derive(Debug, Clone, Default)]
pub struct StockInUpdate {
    pub supplier_id: Option<Uuid>,
    pub import_date: Option<DateTime<Utc>>,
    pub items: Option<Vec<NewStockInItem>>,
}

/// Receiving document with its lines.
#[derive(Debug, Clone)]
pub struct StockInDocument {
    pub stock_in: stock_in::Model,
    pub items: Vec<stock_in_item::Model>,
}

/// Receiving workflow: `pending → completed | cancelled`.
///
/// Lots are materialized at creation time, but the on-hand quantity effect
/// is applied only on approval — a pending document's lots exist without
/// counting toward stock.
#[derive(Clone)]
pub struct StockInService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    batch_lots: Arc<BatchLotService>,
    product_stock: Arc<ProductStockService>,
    activity: Arc<dyn ActivitySink>,
    cleanup: Option<Arc<dyn ReversalCleanup>>,
}

impl StockInService {
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

    pub async fn get(&self, id: Uuid) -> Result<StockInDocument, ServiceError> {
        let db = self.db_pool.as_ref();
        let stock_in = StockIn::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Receiving document {} not found", id)))?;

        let items = StockInItem::find()
            .filter(stock_in_item::Column::StockInId.eq(id))
            .order_by_asc(stock_in_item::Column::LineNo)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(StockInDocument { stock_in, items })
    }

    async fn next_code(&self) -> Result<String, ServiceError> {
        let prefix = codes::month_prefix(codes::STOCK_IN_PREFIX, Utc::now());
        let last = StockIn::find()
            .filter(stock_in::Column::Code.starts_with(prefix.as_str()))
            .order_by_desc(stock_in::Column::Code)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(codes::next_in_sequence(
            &prefix,
            last.as_ref().map(|d| d.code.as_str()),
        ))
    }

    /// Validates the lines and returns the referenced products by id.
    async fn validate_items(
        &self,
        items: &[NewStockInItem],
    ) -> Result<HashMap<Uuid, product::Model>, ServiceError> {
        if items.is_empty() {
            return Err(ServiceError::ValidationError(
                "A receiving document needs at least one line".to_string(),
            ));
        }

        let mut products = HashMap::new();
        for item in items {
            if item.quantity < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "Line quantity must be at least 1, got {}",
                    item.quantity
                )));
            }
            if !products.contains_key(&item.product_id) {
                let p = Product::find_by_id(item.product_id)
                    .one(self.db_pool.as_ref())
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Product {} not found", item.product_id))
                    })?;
                products.insert(item.product_id, p);
            }
        }
        Ok(products)
    }

    fn build_item_models(
        stock_in_id: Uuid,
        items: &[NewStockInItem],
        products: &HashMap<Uuid, product::Model>,
        now: DateTime<Utc>,
    ) -> (Vec<stock_in_item::ActiveModel>, Decimal) {
        let mut total_amount = Decimal::ZERO;
        let models = items
            .iter()
            .enumerate()
            .map(|(line_no, item)| {
                let unit_price = item
                    .unit_price
                    .unwrap_or_else(|| products[&item.product_id].cost_price);
                let total_price = Decimal::from(item.quantity) * unit_price;
                total_amount += total_price;

                stock_in_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    stock_in_id: Set(stock_in_id),
                    line_no: Set(line_no as i32),
                    product_id: Set(item.product_id),
                    quantity: Set(item.quantity),
                    unit_price: Set(unit_price),
                    total_price: Set(total_price),
                    batch_number: Set(item
                        .batch_number
                        .as_ref()
                        .map(|b| b.trim().to_uppercase())),
                    manufacturing_date: Set(item.manufacturing_date),
                    expiry_date: Set(item.expiry_date),
                    batch_lot_id: Set(None),
                    created_at: Set(now),
                }
            })
            .collect();
        (models, total_amount)
    }

    /// Materialize one lot per persisted line that carries a batch number.
    /// A line whose lot cannot be created (duplicate batch number, say) is
    /// logged and skipped; the document itself stands.
    async fn materialize_batches(
        &self,
        stock_in: &stock_in::Model,
        actor: Actor,
    ) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        let items = StockInItem::find()
            .filter(stock_in_item::Column::StockInId.eq(stock_in.id))
            .order_by_asc(stock_in_item::Column::LineNo)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let now = Utc::now();
        for item in items {
            let Some(batch_number) = item.batch_number.clone() else {
                continue;
            };
            if item.quantity <= 0 {
                continue;
            }

            let lot = batch_lot::ActiveModel {
                id: Set(Uuid::new_v4()),
                batch_number: Set(batch_number.clone()),
                product_id: Set(item.product_id),
                supplier_id: Set(stock_in.supplier_id),
                stock_in_id: Set(stock_in.id),
                manufacturing_date: Set(item.manufacturing_date),
                expiry_date: Set(item.expiry_date),
                initial_quantity: Set(item.quantity),
                remaining_quantity: Set(item.quantity),
                cost_price: Set(item.unit_price),
                received_at: Set(stock_in.import_date),
                status: Set(batch_lot::BatchStatus::Active.as_str().to_string()),
                notes: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            };

            match lot.insert(db).await {
                Ok(created) => {
                    let mut item_update: stock_in_item::ActiveModel = item.into();
                    item_update.batch_lot_id = Set(Some(created.id));
                    item_update.update(db).await.map_err(ServiceError::db_error)?;
                }
                Err(e) => {
                    error!(
                        stock_in_id = %stock_in.id,
                        batch_number = %batch_number,
                        actor = %actor.id,
                        "Failed to materialize lot for receiving line: {}",
                        e
                    );
                }
            }
        }
        Ok(())
    }

    /// Create a receiving document in `pending`. Lots are materialized
    /// immediately; stock moves only on approval.
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        actor: Actor,
        input: NewStockIn,
    ) -> Result<StockInDocument, ServiceError> {
        let products = self.validate_items(&input.items).await?;

        Supplier::find_by_id(input.supplier_id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Supplier {} not found", input.supplier_id))
            })?;

        let now = Utc::now();
        let id = Uuid::new_v4();
        let code = self.next_code().await?;
        let import_date = input.import_date.unwrap_or(now);

        let (item_models, total_amount) =
            Self::build_item_models(id, &input.items, &products, now);

        let header = stock_in::ActiveModel {
            id: Set(id),
            code: Set(code.clone()),
            supplier_id: Set(input.supplier_id),
            total_amount: Set(total_amount),
            import_date: Set(import_date),
            status: Set(StockInStatus::Pending.as_str().to_string()),
            created_by: Set(actor.id),
            approved_by: Set(None),
            approved_at: Set(None),
            cancelled_by: Set(None),
            cancelled_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        self.db_pool
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    header.insert(txn).await.map_err(ServiceError::db_error)?;
                    StockInItem::insert_many(item_models)
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

        let stock_in = StockIn::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::InternalError("Receiving document vanished".into()))?;

        self.materialize_batches(&stock_in, actor).await?;

        info!(stock_in_id = %id, code = %code, "Created receiving document");
        self.event_sender.emit(Event::StockInCreated(id)).await;
        record_activity(
            &self.activity,
            ActivityEntry::new(
                Some(actor.id),
                "create_stock_in",
                "StockIn",
                id,
                format!("Created receiving document {}", code),
            )
            .with_meta(json!({ "code": code, "total_amount": total_amount })),
        )
        .await;

        self.get(id).await
    }

    /// Replace a pending document's supplier, date or lines. Replacing lines
    /// also replaces the lots materialized for them, which requires every
    /// existing lot to still be untouched.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        id: Uuid,
        actor: Actor,
        update: StockInUpdate,
    ) -> Result<StockInDocument, ServiceError> {
        let doc = self.get(id).await?;
        if doc.stock_in.status != StockInStatus::Pending.as_str() {
            return Err(ServiceError::InvalidStatus(
                "Only a pending receiving document can be updated".to_string(),
            ));
        }

        let supplier_id = match update.supplier_id {
            Some(supplier_id) => {
                Supplier::find_by_id(supplier_id)
                    .one(self.db_pool.as_ref())
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Supplier {} not found", supplier_id))
                    })?;
                supplier_id
            }
            None => doc.stock_in.supplier_id,
        };

        let mut total_amount = doc.stock_in.total_amount;

        if let Some(items) = &update.items {
            let products = self.validate_items(items).await?;

            // Existing lots must be intact before they can be replaced.
            for item in &doc.items {
                let lots = self
                    .batch_lots
                    .find_by_stock_in(id, item.product_id)
                    .await?;
                if let Some(touched) = lots
                    .iter()
                    .find(|l| l.initial_quantity != l.remaining_quantity)
                {
                    return Err(ServiceError::Conflict(format!(
                        "Batch {} has already been partially issued",
                        touched.batch_number
                    )));
                }
            }
            for item in &doc.items {
                self.batch_lots
                    .delete_for_stock_in(id, item.product_id)
                    .await?;
            }
            StockInItem::delete_many()
                .filter(stock_in_item::Column::StockInId.eq(id))
                .exec(self.db_pool.as_ref())
                .await
                .map_err(ServiceError::db_error)?;

            let now = Utc::now();
            let (item_models, new_total) = Self::build_item_models(id, items, &products, now);
            StockInItem::insert_many(item_models)
                .exec(self.db_pool.as_ref())
                .await
                .map_err(ServiceError::db_error)?;
            total_amount = new_total;
        }

        let mut active: stock_in::ActiveModel = doc.stock_in.clone().into();
        active.supplier_id = Set(supplier_id);
        if let Some(import_date) = update.import_date {
            active.import_date = Set(import_date);
        }
        active.total_amount = Set(total_amount);
        active.updated_at = Set(Utc::now());
        let stock_in = active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        if update.items.is_some() {
            self.materialize_batches(&stock_in, actor).await?;
        }

        self.get(id).await
    }

    /// Approve a pending document: claims the status transition, then
    /// applies each line's quantity to the product aggregate.
    #[instrument(skip(self))]
    pub async fn approve(&self, id: Uuid, actor: Actor) -> Result<StockInDocument, ServiceError> {
        if !actor.role.can_approve() {
            return Err(ServiceError::Forbidden(
                "Only a warehouse manager or admin can approve a receiving document".to_string(),
            ));
        }

        let doc = self.get(id).await?;
        let now = Utc::now();

        // Conditional claim: exactly one concurrent approval wins.
        let claim = StockIn::update_many()
            .col_expr(
                stock_in::Column::Status,
                Expr::value(StockInStatus::Completed.as_str()),
            )
            .col_expr(stock_in::Column::ApprovedBy, Expr::value(actor.id))
            .col_expr(stock_in::Column::ApprovedAt, Expr::value(now))
            .col_expr(stock_in::Column::UpdatedAt, Expr::value(now))
            .filter(stock_in::Column::Id.eq(id))
            .filter(stock_in::Column::Status.eq(StockInStatus::Pending.as_str()))
            .exec(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        if claim.rows_affected == 0 {
            return Err(ServiceError::Conflict(
                "Receiving document has already been processed or cancelled".to_string(),
            ));
        }

        let total = doc.items.len();
        for (idx, item) in doc.items.iter().enumerate() {
            if let Err(e) = self
                .product_stock
                .increase(item.product_id, item.quantity)
                .await
            {
                error!(
                    stock_in_id = %id,
                    failed_item = idx,
                    "Partial failure while approving receiving document: {}",
                    e
                );
                return Err(ServiceError::PartialFailure {
                    applied: (0..idx).collect(),
                    total,
                    message: format!("line {} failed: {}", idx, e),
                });
            }
        }

        info!(stock_in_id = %id, approver = %actor.id, "Approved receiving document");
        self.event_sender
            .emit(Event::StockInApproved {
                stock_in_id: id,
                approved_by: actor.id,
            })
            .await;
        record_activity(
            &self.activity,
            ActivityEntry::new(
                Some(actor.id),
                "approve_stock_in",
                "StockIn",
                id,
                format!("Approved receiving document {}", doc.stock_in.code),
            ),
        )
        .await;

        self.get(id).await
    }

    /// Cancel a pending or completed document: rejected outright when any of
    /// its lots was partially consumed or when the reversal would push a
    /// product's stock negative; otherwise deletes the lots, reverses the
    /// quantity effect, and marks the document cancelled.
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: Uuid, actor: Actor) -> Result<StockInDocument, ServiceError> {
        if !actor.role.can_approve() {
            return Err(ServiceError::Forbidden(
                "Only a warehouse manager or admin can cancel a receiving document".to_string(),
            ));
        }

        let doc = self.get(id).await?;
        match StockInStatus::from_str(&doc.stock_in.status) {
            Some(StockInStatus::Pending) | Some(StockInStatus::Completed) => {}
            _ => {
                return Err(ServiceError::InvalidStatus(
                    "Receiving document is not cancellable from its current status".to_string(),
                ))
            }
        }

        // Validation pass before any write.
        for item in &doc.items {
            let product = self.product_stock.get(item.product_id).await?;
            if product.current_stock - item.quantity < 0 {
                return Err(ServiceError::IntegrityViolation(format!(
                    "Cancelling would make stock negative for product {}",
                    item.product_id
                )));
            }

            let lots = self.batch_lots.find_by_stock_in(id, item.product_id).await?;
            if let Some(touched) = lots
                .iter()
                .find(|l| l.initial_quantity != l.remaining_quantity)
            {
                return Err(ServiceError::Conflict(format!(
                    "Batch {} has already been partially issued",
                    touched.batch_number
                )));
            }
        }

        // Reversal pass: independent writes, in sequence.
        let total = doc.items.len();
        for (idx, item) in doc.items.iter().enumerate() {
            let step = async {
                self.batch_lots
                    .delete_for_stock_in(id, item.product_id)
                    .await?;
                let _guard = self.product_stock.lock(item.product_id).await;
                self.product_stock
                    .apply_delta_locked(item.product_id, -item.quantity)
                    .await?;
                Ok::<_, ServiceError>(())
            };
            if let Err(e) = step.await {
                error!(
                    stock_in_id = %id,
                    failed_item = idx,
                    "Partial failure while cancelling receiving document: {}",
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
        let mut active: stock_in::ActiveModel = doc.stock_in.clone().into();
        active.status = Set(StockInStatus::Cancelled.as_str().to_string());
        active.cancelled_by = Set(Some(actor.id));
        active.cancelled_at = Set(Some(now));
        active.updated_at = Set(now);
        active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        info!(stock_in_id = %id, canceller = %actor.id, "Cancelled receiving document");
        self.event_sender
            .emit(Event::StockInCancelled {
                stock_in_id: id,
                cancelled_by: actor.id,
            })
            .await;
        record_activity(
            &self.activity,
            ActivityEntry::new(
                Some(actor.id),
                "cancel_stock_in",
                "StockIn",
                id,
                format!("Cancelled receiving document {}", doc.stock_in.code),
            ),
        )
        .await;

        self.get(id).await
    }

    /// Delete a pending or cancelled document together with its lines and
    /// any still-intact lots it materialized.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, actor: Actor) -> Result<(), ServiceError> {
        if !actor.role.can_approve() {
            return Err(ServiceError::Forbidden(
                "Only a warehouse manager or admin can delete a receiving document".to_string(),
            ));
        }

        let doc = self.get(id).await?;
        match StockInStatus::from_str(&doc.stock_in.status) {
            Some(StockInStatus::Pending) | Some(StockInStatus::Cancelled) => {}
            _ => {
                return Err(ServiceError::InvalidStatus(
                    "Only a pending or cancelled receiving document can be deleted".to_string(),
                ))
            }
        }

        // A pending document still owns its pre-created lots.
        if doc.stock_in.status == StockInStatus::Pending.as_str() {
            for item in &doc.items {
                let lots = self.batch_lots.find_by_stock_in(id, item.product_id).await?;
                if let Some(touched) = lots
                    .iter()
                    .find(|l| l.initial_quantity != l.remaining_quantity)
                {
                    return Err(ServiceError::Conflict(format!(
                        "Batch {} has already been partially issued",
                        touched.batch_number
                    )));
                }
            }
            for item in &doc.items {
                self.batch_lots
                    .delete_for_stock_in(id, item.product_id)
                    .await?;
            }
        }

        StockInItem::delete_many()
            .filter(stock_in_item::Column::StockInId.eq(id))
            .exec(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        StockIn::delete_by_id(id)
            .exec(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        info!(stock_in_id = %id, "Deleted receiving document");
        Ok(())
    }
}
