//! Read-only lookups over the batch store and the ledger.
//!
//! Used by the platform's dashboards and forms; nothing here mutates state
//! or takes locks.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::entities::{
    inventory_batch::{self, Entity as InventoryBatch},
    stock_movement::{self, Entity as StockMovement},
};
use crate::errors::StockError;

pub async fn get_batch<C: ConnectionTrait>(
    conn: &C,
    batch_id: Uuid,
) -> Result<Option<inventory_batch::Model>, StockError> {
    InventoryBatch::find_by_id(batch_id)
        .one(conn)
        .await
        .map_err(StockError::from)
}

/// Batches of one product at one warehouse, soonest expiry first. This is
/// the order the applier's FIFO selection would consume them in.
pub async fn list_batches<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    warehouse_id: Uuid,
) -> Result<Vec<inventory_batch::Model>, StockError> {
    InventoryBatch::find()
        .filter(inventory_batch::Column::ProductId.eq(product_id))
        .filter(inventory_batch::Column::WarehouseId.eq(warehouse_id))
        .order_by_asc(inventory_batch::Column::ExpiryDate)
        .all(conn)
        .await
        .map_err(StockError::from)
}

/// Full movement history of one batch in commit order.
pub async fn movement_history<C: ConnectionTrait>(
    conn: &C,
    batch_id: Uuid,
) -> Result<Vec<stock_movement::Model>, StockError> {
    StockMovement::find()
        .filter(stock_movement::Column::BatchId.eq(batch_id))
        .order_by_asc(stock_movement::Column::CreatedAt)
        .all(conn)
        .await
        .map_err(StockError::from)
}
