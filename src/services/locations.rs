use sea_orm::{ConnectionTrait, EntityTrait};
use tracing::warn;
use uuid::Uuid;

use crate::entities::warehouse::Entity as Warehouse;
use crate::errors::StockError;

/// Resolves a warehouse to its owning physical location.
///
/// A missing mapping is attribution metadata loss, not a hard error: the
/// ledger entry is written with no location and a warning is logged. Only a
/// storage failure propagates.
pub async fn resolve_location<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
) -> Result<Option<Uuid>, StockError> {
    let warehouse = Warehouse::find_by_id(warehouse_id).one(conn).await?;

    match warehouse {
        Some(warehouse) => {
            if warehouse.location_id.is_none() {
                warn!(%warehouse_id, "warehouse has no owning location; ledger attribution omitted");
            }
            Ok(warehouse.location_id)
        }
        None => {
            warn!(%warehouse_id, "warehouse not found while resolving location; ledger attribution omitted");
            Ok(None)
        }
    }
}
