mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use botica_stock::audit::{AuditError, AuditSink};
use botica_stock::entities::{inventory_batch, stock_movement};
use botica_stock::events::EventSender;
use botica_stock::{
    MovementKind, MovementRequest, ReceiptRequest, StockDirection, StockError,
    StockMovementService,
};

use common::{expiry, seed_batch, seed_location, seed_product, seed_warehouse, TestContext};

fn movement(
    ctx: &TestContext,
    product_id: Uuid,
    warehouse_id: Uuid,
    quantity: i32,
    kind: MovementKind,
) -> MovementRequest {
    MovementRequest {
        product_id,
        warehouse_id,
        quantity,
        kind,
        direction: None,
        reason: Some("test movement".to_string()),
        actor_id: ctx.actor_id,
        batch_id: None,
    }
}

async fn reload_batch(ctx: &TestContext, id: Uuid) -> inventory_batch::Model {
    inventory_batch::Entity::find_by_id(id)
        .one(ctx.db.as_ref())
        .await
        .expect("query failed")
        .expect("batch missing")
}

async fn all_movements(ctx: &TestContext) -> Vec<stock_movement::Model> {
    stock_movement::Entity::find()
        .all(ctx.db.as_ref())
        .await
        .expect("query failed")
}

#[tokio::test]
async fn loss_reduces_quantity_and_appends_ledger_entry() {
    let ctx = TestContext::new().await;
    let location = seed_location(ctx.db.as_ref(), "Main Pharmacy").await;
    let warehouse = seed_warehouse(ctx.db.as_ref(), "W1", Some(location.id)).await;
    let product = seed_product(ctx.db.as_ref(), "PARACETAMOL-500", "Paracetamol 500mg").await;
    let batch = seed_batch(
        ctx.db.as_ref(),
        &product,
        &warehouse,
        "L1",
        expiry(2025, 6, 1),
        100,
    )
    .await;

    let outcome = ctx
        .movements
        .apply(movement(&ctx, product.id, warehouse.id, 30, MovementKind::Loss))
        .await
        .expect("movement failed");

    assert_eq!(outcome.batch_id, batch.id);
    assert_eq!(outcome.quantity_before, 100);
    assert_eq!(outcome.new_quantity, 70);
    assert_eq!(outcome.delta, -30);
    assert_eq!(reload_batch(&ctx, batch.id).await.quantity, 70);

    let entries = all_movements(&ctx).await;
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.batch_id, batch.id);
    assert_eq!(entry.movement_type, "LOSS");
    assert_eq!(entry.quantity_before, 100);
    assert_eq!(entry.quantity_after, 70);
    assert_eq!(entry.quantity_delta, -30);
    assert_eq!(entry.sku, "PARACETAMOL-500");
    assert_eq!(entry.location_id, Some(location.id));
    assert_eq!(entry.created_by, ctx.actor_id);
}

#[tokio::test]
async fn loss_exceeding_stock_is_rejected_without_side_effects() {
    let ctx = TestContext::new().await;
    let location = seed_location(ctx.db.as_ref(), "Main Pharmacy").await;
    let warehouse = seed_warehouse(ctx.db.as_ref(), "W1", Some(location.id)).await;
    let product = seed_product(ctx.db.as_ref(), "IBUPROFEN-400", "Ibuprofen 400mg").await;
    let batch = seed_batch(
        ctx.db.as_ref(),
        &product,
        &warehouse,
        "L1",
        expiry(2025, 6, 1),
        70,
    )
    .await;

    let err = ctx
        .movements
        .apply(movement(&ctx, product.id, warehouse.id, 100, MovementKind::Loss))
        .await
        .expect_err("movement should fail");

    assert_matches!(
        err,
        StockError::InsufficientStock {
            available: 70,
            requested: 100,
            ..
        }
    );
    assert!(!err.is_retryable());
    assert_eq!(reload_batch(&ctx, batch.id).await.quantity, 70);
    assert!(all_movements(&ctx).await.is_empty());
}

#[tokio::test]
async fn fifo_selects_batch_with_soonest_expiry() {
    let ctx = TestContext::new().await;
    let location = seed_location(ctx.db.as_ref(), "Main Pharmacy").await;
    let warehouse = seed_warehouse(ctx.db.as_ref(), "W1", Some(location.id)).await;
    let product = seed_product(ctx.db.as_ref(), "AMOXICILLIN-500", "Amoxicillin 500mg").await;
    let later = seed_batch(
        ctx.db.as_ref(),
        &product,
        &warehouse,
        "L-LATE",
        expiry(2026, 1, 1),
        40,
    )
    .await;
    let sooner = seed_batch(
        ctx.db.as_ref(),
        &product,
        &warehouse,
        "L-SOON",
        expiry(2025, 3, 1),
        40,
    )
    .await;

    let outcome = ctx
        .movements
        .apply(movement(&ctx, product.id, warehouse.id, 5, MovementKind::Sale))
        .await
        .expect("movement failed");

    assert_eq!(outcome.batch_id, sooner.id);
    assert_eq!(reload_batch(&ctx, sooner.id).await.quantity, 35);
    assert_eq!(reload_batch(&ctx, later.id).await.quantity, 40);
}

#[tokio::test]
async fn missing_batch_fails_with_no_batch_found() {
    let ctx = TestContext::new().await;
    let warehouse = seed_warehouse(ctx.db.as_ref(), "W1", None).await;
    let product = seed_product(ctx.db.as_ref(), "OMEPRAZOLE-20", "Omeprazole 20mg").await;

    let err = ctx
        .movements
        .apply(movement(&ctx, product.id, warehouse.id, 1, MovementKind::Sale))
        .await
        .expect_err("movement should fail");

    assert_matches!(err, StockError::NoBatchFound { .. });
}

#[tokio::test]
async fn explicit_batch_id_targets_that_batch() {
    let ctx = TestContext::new().await;
    let location = seed_location(ctx.db.as_ref(), "Main Pharmacy").await;
    let warehouse = seed_warehouse(ctx.db.as_ref(), "W1", Some(location.id)).await;
    let product = seed_product(ctx.db.as_ref(), "ASPIRIN-100", "Aspirin 100mg").await;
    let sooner = seed_batch(
        ctx.db.as_ref(),
        &product,
        &warehouse,
        "L-SOON",
        expiry(2025, 3, 1),
        40,
    )
    .await;
    let later = seed_batch(
        ctx.db.as_ref(),
        &product,
        &warehouse,
        "L-LATE",
        expiry(2026, 1, 1),
        40,
    )
    .await;

    let mut request = movement(&ctx, product.id, warehouse.id, 10, MovementKind::Loss);
    request.batch_id = Some(later.id);
    let outcome = ctx.movements.apply(request).await.expect("movement failed");
    assert_eq!(outcome.batch_id, later.id);
    assert_eq!(reload_batch(&ctx, sooner.id).await.quantity, 40);

    let mut request = movement(&ctx, product.id, warehouse.id, 10, MovementKind::Loss);
    request.batch_id = Some(Uuid::new_v4());
    let err = ctx
        .movements
        .apply(request)
        .await
        .expect_err("movement should fail");
    assert_matches!(err, StockError::BatchNotFound { .. });
}

#[tokio::test]
async fn negative_adjustment_records_stock_loss_audit_event() {
    let ctx = TestContext::new().await;
    let location = seed_location(ctx.db.as_ref(), "Main Pharmacy").await;
    let warehouse = seed_warehouse(ctx.db.as_ref(), "W1", Some(location.id)).await;
    let product = seed_product(ctx.db.as_ref(), "DICLOFENAC-50", "Diclofenac 50mg").await;
    seed_batch(
        ctx.db.as_ref(),
        &product,
        &warehouse,
        "L1",
        expiry(2025, 6, 1),
        25,
    )
    .await;

    let mut request = movement(&ctx, product.id, warehouse.id, 3, MovementKind::Adjustment);
    request.direction = Some(StockDirection::Outbound);
    request.reason = Some("cycle count shortfall".to_string());
    ctx.movements.apply(request).await.expect("movement failed");

    let records = ctx.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event_code, "STOCK_LOSS");
    assert_eq!(records[0].actor_id, ctx.actor_id);
    assert_eq!(records[0].details["delta"], serde_json::json!(-3));

    // An inbound adjustment is not a stock loss.
    let mut request = movement(&ctx, product.id, warehouse.id, 3, MovementKind::Adjustment);
    request.direction = Some(StockDirection::Inbound);
    ctx.movements.apply(request).await.expect("movement failed");
    assert_eq!(ctx.audit.records().len(), 1);
}

#[tokio::test]
async fn adjustment_without_direction_is_rejected() {
    let ctx = TestContext::new().await;
    let warehouse = seed_warehouse(ctx.db.as_ref(), "W1", None).await;
    let product = seed_product(ctx.db.as_ref(), "NAPROXEN-250", "Naproxen 250mg").await;

    let err = ctx
        .movements
        .apply(movement(
            &ctx,
            product.id,
            warehouse.id,
            5,
            MovementKind::Adjustment,
        ))
        .await
        .expect_err("movement should fail");

    assert_matches!(err, StockError::Validation(_));
    assert!(all_movements(&ctx).await.is_empty());
}

struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn record(&self, _: Uuid, _: &str, _: Value) -> Result<(), AuditError> {
        Err(AuditError::Unavailable("audit endpoint down".to_string()))
    }
}

#[tokio::test]
async fn audit_failure_does_not_roll_back_the_movement() {
    let ctx = TestContext::new().await;
    let (tx, _rx) = mpsc::channel(8);
    let movements = StockMovementService::new(
        ctx.db.clone(),
        Arc::new(EventSender::new(tx)),
        Arc::new(FailingAuditSink),
    );

    let location = seed_location(ctx.db.as_ref(), "Main Pharmacy").await;
    let warehouse = seed_warehouse(ctx.db.as_ref(), "W1", Some(location.id)).await;
    let product = seed_product(ctx.db.as_ref(), "LORATADINE-10", "Loratadine 10mg").await;
    let batch = seed_batch(
        ctx.db.as_ref(),
        &product,
        &warehouse,
        "L1",
        expiry(2025, 6, 1),
        25,
    )
    .await;

    let mut request = movement(&ctx, product.id, warehouse.id, 5, MovementKind::Adjustment);
    request.direction = Some(StockDirection::Outbound);
    let outcome = movements.apply(request).await.expect("movement failed");

    assert_eq!(outcome.new_quantity, 20);
    assert_eq!(reload_batch(&ctx, batch.id).await.quantity, 20);
    assert_eq!(all_movements(&ctx).await.len(), 1);
}

#[tokio::test]
async fn batch_at_zero_remains_and_can_receive_stock_again() {
    let ctx = TestContext::new().await;
    let location = seed_location(ctx.db.as_ref(), "Main Pharmacy").await;
    let warehouse = seed_warehouse(ctx.db.as_ref(), "W1", Some(location.id)).await;
    let product = seed_product(ctx.db.as_ref(), "CETIRIZINE-10", "Cetirizine 10mg").await;
    let batch = seed_batch(
        ctx.db.as_ref(),
        &product,
        &warehouse,
        "L1",
        expiry(2025, 6, 1),
        10,
    )
    .await;

    ctx.movements
        .apply(movement(&ctx, product.id, warehouse.id, 10, MovementKind::Sale))
        .await
        .expect("movement failed");
    assert_eq!(reload_batch(&ctx, batch.id).await.quantity, 0);

    let outcome = ctx
        .movements
        .apply(movement(
            &ctx,
            product.id,
            warehouse.id,
            4,
            MovementKind::Return,
        ))
        .await
        .expect("movement failed");
    assert_eq!(outcome.batch_id, batch.id);
    assert_eq!(outcome.new_quantity, 4);
}

#[tokio::test]
async fn receipt_creates_batch_then_merges_on_lot_identity() {
    let ctx = TestContext::new().await;
    let location = seed_location(ctx.db.as_ref(), "Main Pharmacy").await;
    let warehouse = seed_warehouse(ctx.db.as_ref(), "W1", Some(location.id)).await;
    let product = seed_product(ctx.db.as_ref(), "METFORMIN-850", "Metformin 850mg").await;

    let receipt = ReceiptRequest {
        product_id: product.id,
        warehouse_id: warehouse.id,
        lot_number: "L-2025-04".to_string(),
        expiry_date: expiry(2026, 4, 30),
        quantity: 60,
        kind: MovementKind::PurchaseEntry,
        unit_cost: None,
        unit_price: None,
        reason: Some("supplier delivery".to_string()),
        actor_id: ctx.actor_id,
    };
    let first = ctx
        .movements
        .receive(receipt.clone())
        .await
        .expect("receipt failed");
    assert_eq!(first.quantity_before, 0);
    assert_eq!(first.new_quantity, 60);

    let second = ctx.movements.receive(receipt).await.expect("receipt failed");
    assert_eq!(second.batch_id, first.batch_id);
    assert_eq!(second.new_quantity, 120);

    let batch = reload_batch(&ctx, first.batch_id).await;
    assert_eq!(batch.sku, "METFORMIN-850");
    assert_eq!(batch.location_id, Some(location.id));
    assert_eq!(all_movements(&ctx).await.len(), 2);
}

#[tokio::test]
async fn ledger_entries_reject_updates() {
    let ctx = TestContext::new().await;
    let location = seed_location(ctx.db.as_ref(), "Main Pharmacy").await;
    let warehouse = seed_warehouse(ctx.db.as_ref(), "W1", Some(location.id)).await;
    let product = seed_product(ctx.db.as_ref(), "SIMVASTATIN-20", "Simvastatin 20mg").await;
    seed_batch(
        ctx.db.as_ref(),
        &product,
        &warehouse,
        "L1",
        expiry(2025, 6, 1),
        50,
    )
    .await;

    ctx.movements
        .apply(movement(&ctx, product.id, warehouse.id, 5, MovementKind::Loss))
        .await
        .expect("movement failed");

    let entry = all_movements(&ctx).await.remove(0);
    let mut active: stock_movement::ActiveModel = entry.into();
    active.reason = Set(Some("rewritten".to_string()));
    let err = active.update(ctx.db.as_ref()).await;
    assert!(err.is_err(), "ledger update must be rejected");
}
