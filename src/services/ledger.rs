//! Low-level batch store primitives.
//!
//! Everything here takes an explicit `ConnectionTrait` handle so the caller
//! decides the unit of work; both the movement applier and the transfer
//! orchestrator drive the same `apply_delta` primitive inside their own
//! transactions. No function in this module opens or commits a transaction.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::entities::{
    inventory_batch::{self, Entity as InventoryBatch},
    product,
    stock_movement::{self, MovementKind},
};
use crate::errors::StockError;

/// Attribution and correlation metadata for a ledger entry.
#[derive(Debug, Clone)]
pub struct MovementContext {
    pub actor_id: Uuid,
    pub reason: Option<String>,
    pub location_id: Option<Uuid>,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<&'static str>,
}

/// Applies a signed delta to an already-locked batch and appends exactly one
/// ledger entry. Fails with `InsufficientStock` when the delta would drive
/// the quantity negative; nothing is written in that case.
pub(crate) async fn apply_delta<C: ConnectionTrait>(
    conn: &C,
    batch: inventory_batch::Model,
    kind: MovementKind,
    delta: i32,
    ctx: MovementContext,
) -> Result<(inventory_batch::Model, stock_movement::Model), StockError> {
    let before = batch.quantity;
    let after = before + delta;
    if after < 0 {
        return Err(StockError::InsufficientStock {
            sku: batch.sku.clone(),
            available: before,
            requested: delta.unsigned_abs() as i32,
        });
    }

    let batch_id = batch.id;
    let sku = batch.sku.clone();
    let product_name = batch.product_name.clone();

    let mut active: inventory_batch::ActiveModel = batch.into();
    active.quantity = Set(after);
    active.updated_at = Set(Utc::now());
    let updated = active.update(conn).await?;

    let entry = stock_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        batch_id: Set(batch_id),
        sku: Set(sku),
        product_name: Set(product_name),
        location_id: Set(ctx.location_id),
        movement_type: Set(kind.as_str().to_string()),
        quantity_delta: Set(delta),
        quantity_before: Set(before),
        quantity_after: Set(after),
        reference_id: Set(ctx.reference_id),
        reference_type: Set(ctx.reference_type.map(str::to_string)),
        reason: Set(ctx.reason),
        created_by: Set(ctx.actor_id),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    Ok((updated, entry))
}

/// Locks and fetches a specific batch at a warehouse.
pub(crate) async fn find_batch_for_update<C: ConnectionTrait>(
    conn: &C,
    batch_id: Uuid,
    warehouse_id: Uuid,
    product_id: Uuid,
) -> Result<Option<inventory_batch::Model>, StockError> {
    InventoryBatch::find()
        .filter(inventory_batch::Column::Id.eq(batch_id))
        .filter(inventory_batch::Column::WarehouseId.eq(warehouse_id))
        .filter(inventory_batch::Column::ProductId.eq(product_id))
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(StockError::from)
}

/// Locks and fetches the batch with the soonest expiry for a product at a
/// warehouse (FIFO-first selection).
pub(crate) async fn find_fifo_batch<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    warehouse_id: Uuid,
) -> Result<Option<inventory_batch::Model>, StockError> {
    InventoryBatch::find()
        .filter(inventory_batch::Column::ProductId.eq(product_id))
        .filter(inventory_batch::Column::WarehouseId.eq(warehouse_id))
        .order_by_asc(inventory_batch::Column::ExpiryDate)
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(StockError::from)
}

/// Locks and fetches the destination batch matching the lot identity key
/// (warehouse, product, lot number, expiry).
pub(crate) async fn find_matching_batch<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
    product_id: Uuid,
    lot_number: &str,
    expiry_date: NaiveDate,
) -> Result<Option<inventory_batch::Model>, StockError> {
    InventoryBatch::find()
        .filter(inventory_batch::Column::WarehouseId.eq(warehouse_id))
        .filter(inventory_batch::Column::ProductId.eq(product_id))
        .filter(inventory_batch::Column::LotNumber.eq(lot_number))
        .filter(inventory_batch::Column::ExpiryDate.eq(expiry_date))
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(StockError::from)
}

/// Creates an empty batch for a product from its reference data. Unit
/// economics default to the product's unless the caller overrides them.
pub(crate) async fn create_batch<C: ConnectionTrait>(
    conn: &C,
    product: &product::Model,
    warehouse_id: Uuid,
    location_id: Option<Uuid>,
    lot_number: String,
    expiry_date: NaiveDate,
    unit_cost: Option<rust_decimal::Decimal>,
    unit_price: Option<rust_decimal::Decimal>,
) -> Result<inventory_batch::Model, StockError> {
    let now = Utc::now();
    inventory_batch::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        warehouse_id: Set(warehouse_id),
        location_id: Set(location_id),
        sku: Set(product.sku.clone()),
        product_name: Set(product.name.clone()),
        lot_number: Set(lot_number),
        expiry_date: Set(expiry_date),
        quantity: Set(0),
        unit_cost: Set(unit_cost.unwrap_or(product.unit_cost)),
        unit_price: Set(unit_price.unwrap_or(product.unit_price)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(StockError::from)
}

/// Creates an empty batch at a warehouse carrying another batch's lot
/// identity and unit economics. The quantity arrives through `apply_delta`
/// so the creation itself adds no stock.
pub(crate) async fn create_sibling_batch<C: ConnectionTrait>(
    conn: &C,
    origin: &inventory_batch::Model,
    warehouse_id: Uuid,
    location_id: Option<Uuid>,
) -> Result<inventory_batch::Model, StockError> {
    let now = Utc::now();
    inventory_batch::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(origin.product_id),
        warehouse_id: Set(warehouse_id),
        location_id: Set(location_id),
        sku: Set(origin.sku.clone()),
        product_name: Set(origin.product_name.clone()),
        lot_number: Set(origin.lot_number.clone()),
        expiry_date: Set(origin.expiry_date),
        quantity: Set(0),
        unit_cost: Set(origin.unit_cost),
        unit_price: Set(origin.unit_price),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(StockError::from)
}
