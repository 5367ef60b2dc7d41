mod common;

use assert_matches::assert_matches;
use common::*;
use uuid::Uuid;
use warehouse_api::{
    entities::{batch_lot::Entity as BatchLot, inventory_check_item::DiscrepancyReason},
    errors::ServiceError,
    models::Actor,
    models::Role,
    services::{CountUpdate, NewCheckItem, NewInventoryCheck},
};
use sea_orm::EntityTrait;

fn check_of(product_id: Uuid, assignee: Option<Uuid>) -> NewInventoryCheck {
    NewInventoryCheck {
        title: "Cycle count".to_string(),
        scope: None,
        category_id: None,
        assignee,
        notes: None,
        items: vec![NewCheckItem {
            product_id,
            batch_lot_id: None,
            actual_quantity: None,
            discrepancy_reason: None,
        }],
    }
}

#[tokio::test]
async fn create_snapshots_the_system_quantity() {
    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let product = seed_product(&state, "SKU-001", 10).await;
    let r = receive_approved_batch(&state, supplier.id, product.id, "B1", 45, 10, 0).await;
    let lot_id = r.items[0].batch_lot_id.unwrap();

    let counter = staff();
    let doc = state
        .services
        .inventory_check
        .create(
            manager(),
            NewInventoryCheck {
                title: "Quarterly count".to_string(),
                scope: None,
                category_id: None,
                assignee: Some(counter.id),
                notes: None,
                items: vec![
                    NewCheckItem {
                        product_id: product.id,
                        batch_lot_id: None,
                        actual_quantity: None,
                        discrepancy_reason: None,
                    },
                    NewCheckItem {
                        product_id: product.id,
                        batch_lot_id: Some(lot_id),
                        actual_quantity: Some(45),
                        discrepancy_reason: None,
                    },
                ],
            },
        )
        .await
        .unwrap();

    assert!(doc.check.code.starts_with("CHK"));
    assert_eq!(doc.check.status, "in_progress");
    assert_eq!(doc.check.total_items, 2);

    // Product-level line snapshots on-hand; lot line snapshots remaining
    assert_eq!(doc.items[0].system_quantity, 45);
    assert_eq!(doc.items[0].actual_quantity, 0);
    assert_eq!(doc.items[0].status, "shortage");
    assert_eq!(doc.items[1].system_quantity, 45);
    assert_eq!(doc.items[1].batch_number.as_deref(), Some("B1"));
    assert_eq!(doc.items[1].status, "matched");
}

#[tokio::test]
async fn only_the_assignee_records_counts() {
    let state = setup_state().await;
    let product = seed_product(&state, "SKU-001", 10).await;
    let counter = staff();

    let doc = state
        .services
        .inventory_check
        .create(manager(), check_of(product.id, Some(counter.id)))
        .await
        .unwrap();

    let update = vec![CountUpdate {
        item_id: doc.items[0].id,
        actual_quantity: 5,
        notes: None,
        discrepancy_reason: Some(DiscrepancyReason::Mistake),
    }];

    // A different staff member is rejected
    let err = state
        .services
        .inventory_check
        .record_counts(doc.check.id, staff(), update.clone())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));

    // The assignee gets through; classification and summary update
    let updated = state
        .services
        .inventory_check
        .record_counts(doc.check.id, counter, update)
        .await
        .unwrap();
    assert_eq!(updated.items[0].actual_quantity, 5);
    assert_eq!(updated.items[0].difference, 5);
    assert_eq!(updated.items[0].status, "excess");
    assert_eq!(updated.check.excess_count, 1);
    assert_eq!(updated.check.matched_count, 0);
}

#[tokio::test]
async fn a_check_without_assignee_rejects_counting() {
    let state = setup_state().await;
    let product = seed_product(&state, "SKU-001", 10).await;

    let doc = state
        .services
        .inventory_check
        .create(manager(), check_of(product.id, None))
        .await
        .unwrap();

    let err = state
        .services
        .inventory_check
        .record_counts(
            doc.check.id,
            staff(),
            vec![CountUpdate {
                item_id: doc.items[0].id,
                actual_quantity: 1,
                notes: None,
                discrepancy_reason: None,
            }],
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn approval_overwrites_product_stock_directly() {
    // Scenario D: counted 50 against system 45 (excess +5); approval
    // overwrites on-hand to 50 for the batch-less item.
    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let product = seed_product(&state, "SKU-001", 10).await;
    receive_approved_batch(&state, supplier.id, product.id, "B1", 45, 10, 0).await;

    let counter = staff();
    let doc = state
        .services
        .inventory_check
        .create(manager(), check_of(product.id, Some(counter.id)))
        .await
        .unwrap();

    state
        .services
        .inventory_check
        .record_counts(
            doc.check.id,
            counter,
            vec![CountUpdate {
                item_id: doc.items[0].id,
                actual_quantity: 50,
                notes: None,
                discrepancy_reason: Some(DiscrepancyReason::Other),
            }],
        )
        .await
        .unwrap();

    // Submit by assignee, approve by manager
    let submitted = state
        .services
        .inventory_check
        .submit(doc.check.id, counter)
        .await
        .unwrap();
    assert_eq!(submitted.check.status, "submitted");

    let approved = state
        .services
        .inventory_check
        .approve(doc.check.id, manager())
        .await
        .unwrap();
    assert_eq!(approved.check.status, "completed");
    assert_eq!(approved.items[0].difference, 5);
    assert_eq!(approved.items[0].status, "excess");

    assert_eq!(
        state.services.product_stock.get(product.id).await.unwrap().current_stock,
        50
    );
}

#[tokio::test]
async fn approval_of_a_lot_line_resyncs_the_product_from_batches() {
    let state = setup_state().await;
    let supplier = seed_supplier(&state, "SUP-01").await;
    let product = seed_product(&state, "SKU-001", 10).await;
    let r1 = receive_approved_batch(&state, supplier.id, product.id, "B1", 20, 10, 1).await;
    receive_approved_batch(&state, supplier.id, product.id, "B2", 10, 10, 0).await;
    let lot_id = r1.items[0].batch_lot_id.unwrap();

    let counter = staff();
    let doc = state
        .services
        .inventory_check
        .create(
            manager(),
            NewInventoryCheck {
                title: "Lot count".to_string(),
                scope: None,
                category_id: None,
                assignee: Some(counter.id),
                notes: None,
                items: vec![NewCheckItem {
                    product_id: product.id,
                    batch_lot_id: Some(lot_id),
                    actual_quantity: None,
                    discrepancy_reason: None,
                }],
            },
        )
        .await
        .unwrap();

    state
        .services
        .inventory_check
        .record_counts(
            doc.check.id,
            counter,
            vec![CountUpdate {
                item_id: doc.items[0].id,
                actual_quantity: 12,
                notes: None,
                discrepancy_reason: Some(DiscrepancyReason::Lost),
            }],
        )
        .await
        .unwrap();
    state
        .services
        .inventory_check
        .submit(doc.check.id, counter)
        .await
        .unwrap();
    state
        .services
        .inventory_check
        .approve(doc.check.id, admin())
        .await
        .unwrap();

    let lot = BatchLot::find_by_id(lot_id)
        .one(state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lot.remaining_quantity, 12);

    // The aggregate is resynced to the active-batch sum: 12 + 10
    assert_eq!(
        state.services.product_stock.get(product.id).await.unwrap().current_stock,
        22
    );
}

#[tokio::test]
async fn approve_requires_submission_and_a_manager() {
    let state = setup_state().await;
    let product = seed_product(&state, "SKU-001", 10).await;
    let counter = staff();

    let doc = state
        .services
        .inventory_check
        .create(manager(), check_of(product.id, Some(counter.id)))
        .await
        .unwrap();

    // Not yet submitted
    let err = state
        .services
        .inventory_check
        .approve(doc.check.id, manager())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));

    state
        .services
        .inventory_check
        .submit(doc.check.id, counter)
        .await
        .unwrap();

    // Staff cannot approve
    let err = state
        .services
        .inventory_check
        .approve(doc.check.id, Actor::new(Uuid::new_v4(), Role::WarehouseStaff))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn cancel_and_delete_only_while_in_progress() {
    let state = setup_state().await;
    let product = seed_product(&state, "SKU-001", 10).await;
    let counter = staff();

    let doc = state
        .services
        .inventory_check
        .create(manager(), check_of(product.id, Some(counter.id)))
        .await
        .unwrap();
    state
        .services
        .inventory_check
        .submit(doc.check.id, counter)
        .await
        .unwrap();

    let err = state
        .services
        .inventory_check
        .cancel(doc.check.id, manager())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));
    let err = state
        .services
        .inventory_check
        .delete(doc.check.id, manager())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));

    // A fresh in-progress document can be cancelled and another deleted
    let doc2 = state
        .services
        .inventory_check
        .create(manager(), check_of(product.id, Some(counter.id)))
        .await
        .unwrap();
    let cancelled = state
        .services
        .inventory_check
        .cancel(doc2.check.id, manager())
        .await
        .unwrap();
    assert_eq!(cancelled.check.status, "cancelled");

    let doc3 = state
        .services
        .inventory_check
        .create(manager(), check_of(product.id, Some(counter.id)))
        .await
        .unwrap();
    state
        .services
        .inventory_check
        .delete(doc3.check.id, manager())
        .await
        .unwrap();
    let err = state.services.inventory_check.get(doc3.check.id).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}
