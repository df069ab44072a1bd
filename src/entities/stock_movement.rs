use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of stock movement with their signed semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementKind {
    Loss,
    Sale,
    TransferOut,
    Return,
    TransferIn,
    Receipt,
    PurchaseEntry,
    Adjustment,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Loss => "LOSS",
            MovementKind::Sale => "SALE",
            MovementKind::TransferOut => "TRANSFER_OUT",
            MovementKind::Return => "RETURN",
            MovementKind::TransferIn => "TRANSFER_IN",
            MovementKind::Receipt => "RECEIPT",
            MovementKind::PurchaseEntry => "PURCHASE_ENTRY",
            MovementKind::Adjustment => "ADJUSTMENT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "LOSS" => Some(MovementKind::Loss),
            "SALE" => Some(MovementKind::Sale),
            "TRANSFER_OUT" => Some(MovementKind::TransferOut),
            "RETURN" => Some(MovementKind::Return),
            "TRANSFER_IN" => Some(MovementKind::TransferIn),
            "RECEIPT" => Some(MovementKind::Receipt),
            "PURCHASE_ENTRY" => Some(MovementKind::PurchaseEntry),
            "ADJUSTMENT" => Some(MovementKind::Adjustment),
            _ => None,
        }
    }

    /// Sign applied to the requested magnitude. `None` for ADJUSTMENT, whose
    /// direction must come from the caller explicitly.
    pub fn sign(&self) -> Option<i32> {
        match self {
            MovementKind::Loss | MovementKind::Sale | MovementKind::TransferOut => Some(-1),
            MovementKind::Return
            | MovementKind::TransferIn
            | MovementKind::Receipt
            | MovementKind::PurchaseEntry => Some(1),
            MovementKind::Adjustment => None,
        }
    }
}

/// Explicit direction for ADJUSTMENT movements. All request quantities are
/// unsigned magnitudes; the direction is never inferred from the quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockDirection {
    Inbound,
    Outbound,
}

impl StockDirection {
    pub fn sign(&self) -> i32 {
        match self {
            StockDirection::Inbound => 1,
            StockDirection::Outbound => -1,
        }
    }
}

/// One immutable ledger fact: a single signed change to a batch's quantity.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub batch_id: Uuid,
    pub sku: String,
    pub product_name: String,
    pub location_id: Option<Uuid>,
    pub movement_type: String,
    pub quantity_delta: i32,
    pub quantity_before: i32,
    pub quantity_after: i32,
    /// Correlates paired entries; a transfer stamps the same id on its
    /// TRANSFER_OUT and TRANSFER_IN rows.
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<String>,
    pub reason: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_batch::Entity",
        from = "Column::BatchId",
        to = "super::inventory_batch::Column::Id"
    )]
    InventoryBatch,
}

impl Related<super::inventory_batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryBatch.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    /// The ledger is append-only at the store level, not by convention.
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            return Err(DbErr::Custom(
                "stock_movements is append-only; updates are not permitted".to_string(),
            ));
        }
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_kind_signs() {
        assert_eq!(MovementKind::Loss.sign(), Some(-1));
        assert_eq!(MovementKind::Sale.sign(), Some(-1));
        assert_eq!(MovementKind::TransferOut.sign(), Some(-1));
        assert_eq!(MovementKind::Return.sign(), Some(1));
        assert_eq!(MovementKind::TransferIn.sign(), Some(1));
        assert_eq!(MovementKind::Receipt.sign(), Some(1));
        assert_eq!(MovementKind::PurchaseEntry.sign(), Some(1));
        assert_eq!(MovementKind::Adjustment.sign(), None);
    }

    #[test]
    fn movement_kind_round_trips_through_str() {
        for kind in [
            MovementKind::Loss,
            MovementKind::Sale,
            MovementKind::TransferOut,
            MovementKind::Return,
            MovementKind::TransferIn,
            MovementKind::Receipt,
            MovementKind::PurchaseEntry,
            MovementKind::Adjustment,
        ] {
            assert_eq!(MovementKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(MovementKind::from_str("CYCLE_COUNT"), None);
    }
}
