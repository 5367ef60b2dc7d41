mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use common::*;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use warehouse_api::{
    entities::{
        batch_lot::{self, Entity as BatchLot},
        product,
        stock_out::IssueType,
    },
    errors::ServiceError,
    services::{BatchUpdate, NewStockIn, NewStockInItem, NewStockOut, NewStockOutItem, RecomputeScope},
};

async fn active_batch_sum(state: &warehouse_api::AppState, product_id: uuid::Uuid) -> i32 {
    BatchLot::find()
        .filter(batch_lot::Column::ProductId.eq(product_id))
        .filter(batch_lot::Column::Status.eq("active"))
        .all(state.db.as_ref())
        .await
        .unwrap()
        .iter()
        .map(|l| l.remaining_quantity)
        .sum()
}

#[tokio::test]
async fn aggregate_invariant_holds_after_mixed_workflows() {
    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let product = seed_product(&state, "SKU-001", 10).await;

    receive_approved_batch(&state, supplier.id, product.id, "B1", 5, 10, 3).await;
    receive_approved_batch(&state, supplier.id, product.id, "B2", 10, 12, 2).await;
    receive_approved_batch(&state, supplier.id, product.id, "B3", 7, 9, 1).await;

    let issue = state
        .services
        .stock_out
        .create(
            staff(),
            NewStockOut {
                issue_type: IssueType::InternalUse,
                issue_date: None,
                items: vec![NewStockOutItem {
                    product_id: product.id,
                    quantity: 9,
                    unit_price: None,
                }],
            },
        )
        .await
        .unwrap();
    state
        .services
        .stock_out
        .approve(issue.stock_out.id, manager())
        .await
        .unwrap();

    let on_hand = state
        .services
        .product_stock
        .get(product.id)
        .await
        .unwrap()
        .current_stock;
    assert_eq!(on_hand, 13);
    assert_eq!(on_hand, active_batch_sum(&state, product.id).await);

    // Batch bounds hold everywhere
    let lots = BatchLot::find().all(state.db.as_ref()).await.unwrap();
    for lot in lots {
        assert!(lot.remaining_quantity >= 0);
        assert!(lot.remaining_quantity <= lot.initial_quantity);
    }
}

#[tokio::test]
async fn recompute_repairs_a_drifted_aggregate() {
    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let product = seed_product(&state, "SKU-001", 10).await;
    receive_approved_batch(&state, supplier.id, product.id, "B1", 20, 10, 0).await;

    // Simulate drift: a stray write skews the denormalized value
    let skewed = state.services.product_stock.get(product.id).await.unwrap();
    let mut active: product::ActiveModel = skewed.into();
    active.current_stock = Set(3);
    active.update(state.db.as_ref()).await.unwrap();

    let repaired = state
        .services
        .product_stock
        .recompute(product.id, RecomputeScope::ActiveOnly)
        .await
        .unwrap();
    assert_eq!(repaired, 20);
    assert_eq!(
        state.services.product_stock.get(product.id).await.unwrap().current_stock,
        20
    );
}

#[tokio::test]
async fn recompute_to_zero_marks_the_product_out_of_stock() {
    let state = setup_state().await;
    let product = seed_product(&state, "SKU-001", 10).await;

    let quantity = state
        .services
        .product_stock
        .recompute(product.id, RecomputeScope::ActiveOnly)
        .await
        .unwrap();
    assert_eq!(quantity, 0);

    let refreshed = state.services.product_stock.get(product.id).await.unwrap();
    assert_eq!(refreshed.status, "out_of_stock");
}

#[tokio::test]
async fn manual_batch_update_recomputes_the_owning_product() {
    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let product = seed_product(&state, "SKU-001", 10).await;
    let r = receive_approved_batch(&state, supplier.id, product.id, "B1", 20, 10, 0).await;
    let lot_id = r.items[0].batch_lot_id.unwrap();

    let err = state
        .services
        .batch_lots
        .update_batch(
            lot_id,
            BatchUpdate {
                remaining_quantity: Some(-1),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let updated = state
        .services
        .batch_lots
        .update_batch(
            lot_id,
            BatchUpdate {
                remaining_quantity: Some(8),
                cost_price: Some(dec(11)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.remaining_quantity, 8);
    assert_eq!(updated.cost_price, dec(11));

    assert_eq!(
        state.services.product_stock.get(product.id).await.unwrap().current_stock,
        8
    );
}

#[tokio::test]
async fn batch_cost_is_looked_up_by_natural_key() {
    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let product = seed_product(&state, "SKU-001", 10).await;
    receive_approved_batch(&state, supplier.id, product.id, "B1", 20, 17, 0).await;

    let cost = state
        .services
        .batch_lots
        .batch_cost(product.id, "B1")
        .await
        .unwrap();
    assert_eq!(cost, dec(17));

    let err = state
        .services
        .batch_lots
        .batch_cost(product.id, "NOPE")
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn near_expiry_report_is_fefo_ordered() {
    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let product = seed_product(&state, "SKU-001", 10).await;

    let mk = |batch: &str, expiry_days: i64| NewStockIn {
        supplier_id: supplier.id,
        import_date: None,
        items: vec![NewStockInItem {
            product_id: product.id,
            quantity: 5,
            unit_price: Some(dec(10)),
            batch_number: Some(batch.to_string()),
            manufacturing_date: None,
            expiry_date: Some((Utc::now() + Duration::days(expiry_days)).date_naive()),
        }],
    };

    for (batch, days) in [("FAR", 60), ("NEAR", 7), ("MID", 20)] {
        let doc = state.services.stock_in.create(staff(), mk(batch, days)).await.unwrap();
        state.services.stock_in.approve(doc.stock_in.id, manager()).await.unwrap();
    }

    let report = state.services.batch_lots.find_near_expiry(30).await.unwrap();
    let batches: Vec<&str> = report.iter().map(|l| l.batch_number.as_str()).collect();
    assert_eq!(batches, vec!["NEAR", "MID"]);
}

#[tokio::test]
async fn low_stock_reports_products_at_their_threshold() {
    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let low = seed_product(&state, "SKU-LOW", 10).await;
    let high = seed_product(&state, "SKU-HIGH", 10).await;

    // min_stock is 10 for both; one ends below it, one above
    receive_approved_batch(&state, supplier.id, low.id, "L1", 4, 10, 0).await;
    receive_approved_batch(&state, supplier.id, high.id, "H1", 40, 10, 0).await;

    let report = state.services.product_stock.low_stock().await.unwrap();
    let skus: Vec<&str> = report.iter().map(|p| p.sku.as_str()).collect();
    assert!(skus.contains(&"SKU-LOW"));
    assert!(!skus.contains(&"SKU-HIGH"));
}
