use lazy_static::lazy_static;
use prometheus::IntCounter;
use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::audit::AuditSink;
use crate::db::DbPool;
use crate::entities::stock_movement::MovementKind;
use crate::errors::StockError;
use crate::events::{Event, EventSender};
use crate::services::ledger::{
    apply_delta, create_sibling_batch, find_batch_for_update, find_matching_batch, MovementContext,
};
use crate::services::locations::resolve_location;
use crate::services::{dispatch_effects, PostCommitEffect};

lazy_static! {
    static ref STOCK_TRANSFERS: IntCounter = IntCounter::new(
        "stock_transfers_total",
        "Total number of executed stock transfers"
    )
    .expect("metric can be created");
    static ref STOCK_TRANSFER_FAILURES: IntCounter = IntCounter::new(
        "stock_transfer_failures_total",
        "Total number of failed stock transfers"
    )
    .expect("metric can be created");
}

/// One line of a transfer. The origin lot must be named explicitly; the
/// transfer path performs no FIFO auto-selection, forcing a deliberate lot
/// choice for inter-warehouse moves.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransferItem {
    pub product_id: Uuid,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,

    pub lot_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransferRequest {
    pub origin_warehouse_id: Uuid,
    pub destination_warehouse_id: Uuid,

    #[validate(length(min = 1, message = "Transfer must contain at least one item"))]
    pub items: Vec<TransferItem>,

    pub actor_id: Uuid,

    pub notes: Option<String>,
}

/// Committed result of one transfer line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferLineOutcome {
    pub product_id: Uuid,
    pub origin_batch_id: Uuid,
    pub destination_batch_id: Uuid,
    pub quantity: i32,
    /// Whether the destination batch was created by this transfer rather
    /// than matched by lot identity.
    pub destination_created: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub transfer_id: Uuid,
    pub lines: Vec<TransferLineOutcome>,
}

const TRANSFER_REFERENCE: &str = "TRANSFER";

/// Transfer Orchestrator: moves stock between warehouses as a single
/// all-or-nothing operation, preserving batch identity (lot number, expiry)
/// and appending a paired TRANSFER_OUT/TRANSFER_IN ledger entry per item.
#[derive(Clone)]
pub struct TransferService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    audit: Arc<dyn AuditSink>,
}

impl TransferService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            audit,
        }
    }

    /// Executes a multi-item transfer. Any failure on any item rolls back
    /// every prior item's effects; a transfer is never partially applied.
    ///
    /// Locks are taken item-by-item in the caller-supplied order, so
    /// overlapping concurrent transfers can deadlock; the database reports
    /// that as a retryable `TransactionConflict`.
    #[instrument(skip(self))]
    pub async fn execute(&self, request: TransferRequest) -> Result<TransferOutcome, StockError> {
        request.validate().map_err(|e| {
            STOCK_TRANSFER_FAILURES.inc();
            StockError::from(e)
        })?;

        // Both preconditions are checked before any transaction is opened.
        if request.origin_warehouse_id == request.destination_warehouse_id {
            STOCK_TRANSFER_FAILURES.inc();
            return Err(StockError::InvalidTransfer(request.origin_warehouse_id));
        }
        for item in &request.items {
            item.validate().map_err(|e| {
                STOCK_TRANSFER_FAILURES.inc();
                StockError::from(e)
            })?;
            if item.lot_id.is_none() {
                STOCK_TRANSFER_FAILURES.inc();
                return Err(StockError::MissingLot {
                    product_id: item.product_id,
                });
            }
        }

        let transfer_id = Uuid::new_v4();
        let db = self.db_pool.as_ref();
        let req = request.clone();

        let result = db
            .transaction::<_, (TransferOutcome, Vec<PostCommitEffect>), StockError>(move |txn| {
                Box::pin(async move {
                    let origin_location =
                        resolve_location(txn, req.origin_warehouse_id).await?;
                    let destination_location =
                        resolve_location(txn, req.destination_warehouse_id).await?;

                    let mut lines = Vec::with_capacity(req.items.len());

                    for item in &req.items {
                        let lot_id = item.lot_id.ok_or(StockError::MissingLot {
                            product_id: item.product_id,
                        })?;

                        let origin_batch = find_batch_for_update(
                            txn,
                            lot_id,
                            req.origin_warehouse_id,
                            item.product_id,
                        )
                        .await?
                        .ok_or(StockError::BatchNotFound {
                            batch_id: lot_id,
                            warehouse_id: req.origin_warehouse_id,
                        })?;

                        let out_ctx = MovementContext {
                            actor_id: req.actor_id,
                            reason: req.notes.clone(),
                            location_id: origin_batch.location_id.or(origin_location),
                            reference_id: Some(transfer_id),
                            reference_type: Some(TRANSFER_REFERENCE),
                        };
                        let (origin_after, _) = apply_delta(
                            txn,
                            origin_batch,
                            MovementKind::TransferOut,
                            -item.quantity,
                            out_ctx,
                        )
                        .await?;

                        let existing = find_matching_batch(
                            txn,
                            req.destination_warehouse_id,
                            item.product_id,
                            &origin_after.lot_number,
                            origin_after.expiry_date,
                        )
                        .await?;
                        let destination_created = existing.is_none();
                        let destination_batch = match existing {
                            Some(batch) => batch,
                            None => {
                                create_sibling_batch(
                                    txn,
                                    &origin_after,
                                    req.destination_warehouse_id,
                                    destination_location,
                                )
                                .await?
                            }
                        };

                        let in_ctx = MovementContext {
                            actor_id: req.actor_id,
                            reason: req.notes.clone(),
                            location_id: destination_batch.location_id.or(destination_location),
                            reference_id: Some(transfer_id),
                            reference_type: Some(TRANSFER_REFERENCE),
                        };
                        let (destination_after, _) = apply_delta(
                            txn,
                            destination_batch,
                            MovementKind::TransferIn,
                            item.quantity,
                            in_ctx,
                        )
                        .await?;

                        lines.push(TransferLineOutcome {
                            product_id: item.product_id,
                            origin_batch_id: origin_after.id,
                            destination_batch_id: destination_after.id,
                            quantity: item.quantity,
                            destination_created,
                        });
                    }

                    let effects = vec![PostCommitEffect::Emit(Event::TransferExecuted {
                        transfer_id,
                        origin_warehouse_id: req.origin_warehouse_id,
                        destination_warehouse_id: req.destination_warehouse_id,
                        item_count: lines.len(),
                    })];

                    Ok((
                        TransferOutcome {
                            transfer_id,
                            lines,
                        },
                        effects,
                    ))
                })
            })
            .await;

        match result {
            Ok((outcome, effects)) => {
                dispatch_effects(&self.event_sender, self.audit.as_ref(), effects).await;
                STOCK_TRANSFERS.inc();
                info!(
                    transfer_id = %outcome.transfer_id,
                    origin = %request.origin_warehouse_id,
                    destination = %request.destination_warehouse_id,
                    items = outcome.lines.len(),
                    "transfer executed"
                );
                Ok(outcome)
            }
            Err(e) => {
                STOCK_TRANSFER_FAILURES.inc();
                Err(StockError::from(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_item_list_fails_validation() {
        let request = TransferRequest {
            origin_warehouse_id: Uuid::new_v4(),
            destination_warehouse_id: Uuid::new_v4(),
            items: vec![],
            actor_id: Uuid::new_v4(),
            notes: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn zero_quantity_item_fails_validation() {
        let item = TransferItem {
            product_id: Uuid::new_v4(),
            quantity: 0,
            lot_id: Some(Uuid::new_v4()),
        };
        assert!(item.validate().is_err());
    }
}
