mod common;

use assert_matches::assert_matches;
use common::*;
use rust_decimal_macros::dec as rdec;
use uuid::Uuid;
use warehouse_api::{
    entities::{
        batch_lot::Entity as BatchLot,
        stock_out::IssueType,
    },
    errors::ServiceError,
    services::{NewStockOut, NewStockOutItem},
};
use sea_orm::EntityTrait;

fn issue(product_id: Uuid, quantity: i32) -> NewStockOut {
    NewStockOut {
        issue_type: IssueType::Sale,
        issue_date: None,
        items: vec![NewStockOutItem {
            product_id,
            quantity,
            unit_price: None,
        }],
    }
}

async fn lot_state(state: &warehouse_api::AppState, lot_id: Uuid) -> (i32, String) {
    let lot = BatchLot::find_by_id(lot_id)
        .one(state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    (lot.remaining_quantity, lot.status)
}

#[tokio::test]
async fn fifo_allocation_walks_oldest_batches_first() {
    // Scenario A: B1 (day 1, remaining 5) and B2 (day 2, remaining 10);
    // issuing 8 takes 5 from B1 (depleted) and 3 from B2 (remaining 7).
    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let product = seed_product(&state, "SKU-001", 10).await;

    let r1 = receive_approved_batch(&state, supplier.id, product.id, "B1", 5, 10, 2).await;
    let r2 = receive_approved_batch(&state, supplier.id, product.id, "B2", 10, 10, 1).await;
    let b1 = r1.items[0].batch_lot_id.unwrap();
    let b2 = r2.items[0].batch_lot_id.unwrap();

    let doc = state
        .services
        .stock_out
        .create(staff(), issue(product.id, 8))
        .await
        .unwrap();

    assert!(doc.stock_out.code.starts_with("ISS"));
    let plan = &doc.items[0].allocations;
    assert_eq!(plan.len(), 2);
    assert_eq!((plan[0].batch_lot_id, plan[0].quantity), (b1, 5));
    assert_eq!((plan[1].batch_lot_id, plan[1].quantity), (b2, 3));

    assert_eq!(lot_state(&state, b1).await, (0, "depleted".to_string()));
    assert_eq!(lot_state(&state, b2).await, (7, "active".to_string()));

    // Batches moved at creation; the aggregate only moves on approval.
    assert_eq!(
        state.services.product_stock.get(product.id).await.unwrap().current_stock,
        15
    );

    state
        .services
        .stock_out
        .approve(doc.stock_out.id, manager())
        .await
        .unwrap();
    assert_eq!(
        state.services.product_stock.get(product.id).await.unwrap().current_stock,
        7
    );
}

#[tokio::test]
async fn missing_unit_price_defaults_to_weighted_average_cost() {
    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let product = seed_product(&state, "SKU-001", 10).await;

    receive_approved_batch(&state, supplier.id, product.id, "B1", 5, 10, 2).await;
    receive_approved_batch(&state, supplier.id, product.id, "B2", 10, 20, 1).await;

    let doc = state
        .services
        .stock_out
        .create(staff(), issue(product.id, 8))
        .await
        .unwrap();

    // (5×10 + 3×20) / 8 = 13.75
    assert_eq!(doc.items[0].item.unit_price, rdec!(13.75));
    assert_eq!(doc.items[0].item.total_price, rdec!(110.00));
    assert_eq!(doc.stock_out.total_amount, rdec!(110.00));
}

#[tokio::test]
async fn insufficient_stock_is_rejected_before_any_write() {
    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let product = seed_product(&state, "SKU-001", 10).await;

    let r = receive_approved_batch(&state, supplier.id, product.id, "B1", 5, 10, 0).await;
    let b1 = r.items[0].batch_lot_id.unwrap();

    let err = state
        .services
        .stock_out
        .create(staff(), issue(product.id, 6))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    assert_eq!(lot_state(&state, b1).await, (5, "active".to_string()));
    assert_eq!(
        state.services.product_stock.get(product.id).await.unwrap().current_stock,
        5
    );
}

#[tokio::test]
async fn create_then_cancel_is_an_exact_round_trip() {
    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let product = seed_product(&state, "SKU-001", 10).await;

    let r1 = receive_approved_batch(&state, supplier.id, product.id, "B1", 5, 10, 2).await;
    let r2 = receive_approved_batch(&state, supplier.id, product.id, "B2", 10, 10, 1).await;
    let b1 = r1.items[0].batch_lot_id.unwrap();
    let b2 = r2.items[0].batch_lot_id.unwrap();

    let doc = state
        .services
        .stock_out
        .create(staff(), issue(product.id, 8))
        .await
        .unwrap();

    let cancelled = state
        .services
        .stock_out
        .cancel(doc.stock_out.id, manager())
        .await
        .unwrap();
    assert_eq!(cancelled.stock_out.status, "cancelled");

    // Every touched lot and the aggregate are back to pre-creation values,
    // including the depleted lot reopening.
    assert_eq!(lot_state(&state, b1).await, (5, "active".to_string()));
    assert_eq!(lot_state(&state, b2).await, (10, "active".to_string()));
    assert_eq!(
        state.services.product_stock.get(product.id).await.unwrap().current_stock,
        15
    );
}

#[tokio::test]
async fn cancelling_a_completed_document_restores_the_aggregate_too() {
    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let product = seed_product(&state, "SKU-001", 10).await;

    let r1 = receive_approved_batch(&state, supplier.id, product.id, "B1", 15, 10, 0).await;
    let b1 = r1.items[0].batch_lot_id.unwrap();

    let doc = state
        .services
        .stock_out
        .create(staff(), issue(product.id, 8))
        .await
        .unwrap();
    state
        .services
        .stock_out
        .approve(doc.stock_out.id, manager())
        .await
        .unwrap();
    assert_eq!(
        state.services.product_stock.get(product.id).await.unwrap().current_stock,
        7
    );

    state
        .services
        .stock_out
        .cancel(doc.stock_out.id, manager())
        .await
        .unwrap();

    assert_eq!(lot_state(&state, b1).await, (15, "active".to_string()));
    assert_eq!(
        state.services.product_stock.get(product.id).await.unwrap().current_stock,
        15
    );
}

#[tokio::test]
async fn allocating_everything_empties_every_batch() {
    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let product = seed_product(&state, "SKU-001", 10).await;

    let r1 = receive_approved_batch(&state, supplier.id, product.id, "B1", 5, 10, 2).await;
    let r2 = receive_approved_batch(&state, supplier.id, product.id, "B2", 10, 10, 1).await;

    let doc = state
        .services
        .stock_out
        .create(staff(), issue(product.id, 15))
        .await
        .unwrap();

    let plan = &doc.items[0].allocations;
    assert_eq!(plan.iter().map(|a| a.quantity).sum::<i32>(), 15);

    for lot_id in [
        r1.items[0].batch_lot_id.unwrap(),
        r2.items[0].batch_lot_id.unwrap(),
    ] {
        assert_eq!(lot_state(&state, lot_id).await, (0, "depleted".to_string()));
    }
}

#[tokio::test]
async fn concurrent_double_approval_decrements_exactly_once() {
    // Scenario E: the second approval must fail with a conflict, never
    // double-decrement.
    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let product = seed_product(&state, "SKU-001", 10).await;

    receive_approved_batch(&state, supplier.id, product.id, "B1", 15, 10, 0).await;
    let doc = state
        .services
        .stock_out
        .create(staff(), issue(product.id, 8))
        .await
        .unwrap();

    let first = state.services.stock_out.approve(doc.stock_out.id, manager());
    let second = state.services.stock_out.approve(doc.stock_out.id, manager());
    let (a, b) = tokio::join!(first, second);

    let (oks, conflicts): (Vec<_>, Vec<_>) = [a, b].into_iter().partition(|r| r.is_ok());
    assert_eq!(oks.len(), 1);
    assert_eq!(conflicts.len(), 1);
    assert_matches!(
        conflicts.into_iter().next().unwrap().unwrap_err(),
        ServiceError::Conflict(_)
    );

    assert_eq!(
        state.services.product_stock.get(product.id).await.unwrap().current_stock,
        7
    );
}

#[tokio::test]
async fn concurrent_creates_cannot_oversubscribe_a_product() {
    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let product = seed_product(&state, "SKU-001", 10).await;

    receive_approved_batch(&state, supplier.id, product.id, "B1", 10, 10, 0).await;

    let first = state.services.stock_out.create(staff(), issue(product.id, 8));
    let second = state.services.stock_out.create(staff(), issue(product.id, 8));
    let (a, b) = tokio::join!(first, second);

    // The per-product lock forces one of them to see the drained batches.
    let results = [a, b];
    let ok_count = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok_count, 1);

    let lots = BatchLot::find().all(state.db.as_ref()).await.unwrap();
    let total_remaining: i32 = lots.iter().map(|l| l.remaining_quantity).sum();
    assert_eq!(total_remaining, 2);
}

#[tokio::test]
async fn allocation_is_deterministic_for_identical_state() {
    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let product = seed_product(&state, "SKU-001", 10).await;

    receive_approved_batch(&state, supplier.id, product.id, "B1", 5, 10, 2).await;
    receive_approved_batch(&state, supplier.id, product.id, "B2", 10, 10, 1).await;

    let first = state
        .services
        .stock_out
        .create(staff(), issue(product.id, 8))
        .await
        .unwrap();
    let first_plan: Vec<(Uuid, i32)> = first.items[0]
        .allocations
        .iter()
        .map(|a| (a.batch_lot_id, a.quantity))
        .collect();

    // Cancelling restores the exact pre-allocation state…
    state
        .services
        .stock_out
        .cancel(first.stock_out.id, manager())
        .await
        .unwrap();

    // …so the same request must produce the same plan again.
    let second = state
        .services
        .stock_out
        .create(staff(), issue(product.id, 8))
        .await
        .unwrap();
    let second_plan: Vec<(Uuid, i32)> = second.items[0]
        .allocations
        .iter()
        .map(|a| (a.batch_lot_id, a.quantity))
        .collect();

    assert_eq!(first_plan, second_plan);
}

#[tokio::test]
async fn deleting_a_pending_document_releases_its_plan() {
    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let product = seed_product(&state, "SKU-001", 10).await;

    let r = receive_approved_batch(&state, supplier.id, product.id, "B1", 10, 10, 0).await;
    let b1 = r.items[0].batch_lot_id.unwrap();

    let doc = state
        .services
        .stock_out
        .create(staff(), issue(product.id, 4))
        .await
        .unwrap();
    assert_eq!(lot_state(&state, b1).await.0, 6);

    state
        .services
        .stock_out
        .delete(doc.stock_out.id, manager())
        .await
        .unwrap();

    assert_eq!(lot_state(&state, b1).await.0, 10);
    let err = state.services.stock_out.get(doc.stock_out.id).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn mid_sequence_failure_reports_applied_items_and_recompute_repairs() {
    use sea_orm::{ActiveModelTrait, Set};
    use warehouse_api::entities::product;
    use warehouse_api::services::RecomputeScope;

    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let product_a = seed_product(&state, "SKU-A", 10).await;
    let product_b = seed_product(&state, "SKU-B", 10).await;

    receive_approved_batch(&state, supplier.id, product_a.id, "A1", 10, 10, 0).await;
    receive_approved_batch(&state, supplier.id, product_b.id, "B1", 10, 10, 0).await;

    let doc = state
        .services
        .stock_out
        .create(
            staff(),
            NewStockOut {
                issue_type: IssueType::Sale,
                issue_date: None,
                items: vec![
                    NewStockOutItem {
                        product_id: product_a.id,
                        quantity: 4,
                        unit_price: None,
                    },
                    NewStockOutItem {
                        product_id: product_b.id,
                        quantity: 4,
                        unit_price: None,
                    },
                ],
            },
        )
        .await
        .unwrap();

    // Sabotage line 2's defensive re-check: drain product B's aggregate
    // behind the workflow's back.
    let b = state.services.product_stock.get(product_b.id).await.unwrap();
    let mut active: product::ActiveModel = b.into();
    active.current_stock = Set(0);
    active.update(state.db.as_ref()).await.unwrap();

    let err = state
        .services
        .stock_out
        .approve(doc.stock_out.id, manager())
        .await
        .unwrap_err();
    let ServiceError::PartialFailure { applied, total, .. } = err else {
        panic!("expected a partial failure");
    };
    assert_eq!(applied, vec![0]);
    assert_eq!(total, 2);

    // Line 1 applied, line 2 did not; the document is left completed.
    assert_eq!(
        state.services.product_stock.get(product_a.id).await.unwrap().current_stock,
        6
    );
    let refreshed = state.services.stock_out.get(doc.stock_out.id).await.unwrap();
    assert_eq!(refreshed.stock_out.status, "completed");

    // The documented remediation brings both aggregates back to batch truth.
    for product_id in [product_a.id, product_b.id] {
        state
            .services
            .product_stock
            .recompute(product_id, RecomputeScope::ActiveOnly)
            .await
            .unwrap();
    }
    assert_eq!(
        state.services.product_stock.get(product_a.id).await.unwrap().current_stock,
        6
    );
    assert_eq!(
        state.services.product_stock.get(product_b.id).await.unwrap().current_stock,
        6
    );
}

#[tokio::test]
async fn fefo_preview_orders_by_expiry_and_mutates_nothing() {
    use chrono::{Duration, Utc};
    use warehouse_api::services::NewStockIn;
    use warehouse_api::services::NewStockInItem;

    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let product = seed_product(&state, "SKU-001", 10).await;

    // Older receipt with the LATER expiry; FEFO must pick the earlier-expiring
    // lot first even though FIFO would not.
    let mk_item = |qty: i32, batch: &str, expiry_days: i64| NewStockInItem {
        product_id: product.id,
        quantity: qty,
        unit_price: Some(dec(10)),
        batch_number: Some(batch.to_string()),
        manufacturing_date: None,
        expiry_date: Some((Utc::now() + Duration::days(expiry_days)).date_naive()),
    };

    let r1 = state
        .services
        .stock_in
        .create(
            staff(),
            NewStockIn {
                supplier_id: supplier.id,
                import_date: Some(Utc::now() - Duration::days(5)),
                items: vec![mk_item(5, "LATE", 90)],
            },
        )
        .await
        .unwrap();
    state.services.stock_in.approve(r1.stock_in.id, manager()).await.unwrap();

    let r2 = state
        .services
        .stock_in
        .create(
            staff(),
            NewStockIn {
                supplier_id: supplier.id,
                import_date: Some(Utc::now() - Duration::days(1)),
                items: vec![mk_item(5, "SOON", 10)],
            },
        )
        .await
        .unwrap();
    state.services.stock_in.approve(r2.stock_in.id, manager()).await.unwrap();

    let soon = r2.items[0].batch_lot_id.unwrap();

    let preview = state
        .services
        .batch_lots
        .fefo_preview(product.id, 6)
        .await
        .unwrap();

    assert_eq!(preview.entries[0].batch_lot_id, soon);
    assert_eq!(preview.entries[0].quantity, 5);
    assert_eq!(preview.entries[1].quantity, 1);

    // Advisory only: nothing moved
    assert_eq!(lot_state(&state, soon).await.0, 5);
}
