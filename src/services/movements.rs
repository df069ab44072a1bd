use chrono::NaiveDate;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use sea_orm::{EntityTrait, TransactionTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::audit::AuditSink;
use crate::db::DbPool;
use crate::entities::product::Entity as Product;
use crate::entities::stock_movement::{MovementKind, StockDirection};
use crate::errors::StockError;
use crate::events::{Event, EventSender};
use crate::services::ledger::{
    apply_delta, create_batch, find_batch_for_update, find_fifo_batch, find_matching_batch,
    MovementContext,
};
use crate::services::locations::resolve_location;
use crate::services::{dispatch_effects, PostCommitEffect};

lazy_static! {
    static ref STOCK_MOVEMENTS: IntCounter = IntCounter::new(
        "stock_movements_applied_total",
        "Total number of applied stock movements"
    )
    .expect("metric can be created");
    static ref STOCK_MOVEMENT_FAILURES: IntCounter = IntCounter::new(
        "stock_movement_failures_total",
        "Total number of failed stock movements"
    )
    .expect("metric can be created");
}

/// A single-batch movement request.
///
/// `quantity` is always an unsigned magnitude; the sign comes from the
/// movement kind, or from `direction` for ADJUSTMENT. When `batch_id` is
/// omitted the batch with the soonest expiry is selected (FIFO-first).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MovementRequest {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,

    pub kind: MovementKind,

    /// Required for ADJUSTMENT, rejected for every other kind.
    pub direction: Option<StockDirection>,

    pub reason: Option<String>,

    pub actor_id: Uuid,

    pub batch_id: Option<Uuid>,
}

impl MovementRequest {
    fn signed_delta(&self) -> Result<i32, StockError> {
        match (self.kind.sign(), self.direction) {
            (Some(sign), None) => Ok(sign * self.quantity),
            (Some(_), Some(_)) => Err(StockError::Validation(
                "direction is only accepted for ADJUSTMENT movements".to_string(),
            )),
            (None, Some(direction)) => Ok(direction.sign() * self.quantity),
            (None, None) => Err(StockError::Validation(
                "ADJUSTMENT movements require an explicit direction".to_string(),
            )),
        }
    }
}

/// Stock received into a warehouse as a new (or merged) lot.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReceiptRequest {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,

    /// May be empty when the supplier provided no lot code.
    pub lot_number: String,

    pub expiry_date: NaiveDate,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,

    /// RECEIPT or PURCHASE_ENTRY.
    pub kind: MovementKind,

    pub unit_cost: Option<Decimal>,
    pub unit_price: Option<Decimal>,

    pub reason: Option<String>,

    pub actor_id: Uuid,
}

/// Committed result of a movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementOutcome {
    pub batch_id: Uuid,
    pub movement_id: Uuid,
    pub quantity_before: i32,
    pub new_quantity: i32,
    pub delta: i32,
}

/// Stock Movement Applier: validates a movement, resolves and locks the
/// target batch, enforces the non-negative invariant, updates the batch and
/// appends one ledger entry, all in one transaction.
#[derive(Clone)]
pub struct StockMovementService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    audit: Arc<dyn AuditSink>,
}

impl StockMovementService {
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

    /// Applies one movement against one batch.
    #[instrument(skip(self))]
    pub async fn apply(&self, request: MovementRequest) -> Result<MovementOutcome, StockError> {
        request.validate().map_err(|e| {
            STOCK_MOVEMENT_FAILURES.inc();
            StockError::from(e)
        })?;
        let delta = request.signed_delta().map_err(|e| {
            STOCK_MOVEMENT_FAILURES.inc();
            e
        })?;

        let db = self.db_pool.as_ref();
        let req = request.clone();

        let result = db
            .transaction::<_, (MovementOutcome, Vec<PostCommitEffect>), StockError>(move |txn| {
                Box::pin(async move {
                    let batch = match req.batch_id {
                        Some(batch_id) => {
                            find_batch_for_update(txn, batch_id, req.warehouse_id, req.product_id)
                                .await?
                                .ok_or(StockError::BatchNotFound {
                                    batch_id,
                                    warehouse_id: req.warehouse_id,
                                })?
                        }
                        None => find_fifo_batch(txn, req.product_id, req.warehouse_id)
                            .await?
                            .ok_or(StockError::NoBatchFound {
                                product_id: req.product_id,
                                warehouse_id: req.warehouse_id,
                            })?,
                    };

                    let location_id = match batch.location_id {
                        Some(id) => Some(id),
                        None => resolve_location(txn, req.warehouse_id).await?,
                    };

                    let ctx = MovementContext {
                        actor_id: req.actor_id,
                        reason: req.reason.clone(),
                        location_id,
                        reference_id: None,
                        reference_type: None,
                    };
                    let (updated, entry) = apply_delta(txn, batch, req.kind, delta, ctx).await?;

                    let mut effects = vec![PostCommitEffect::Emit(Event::MovementApplied {
                        batch_id: updated.id,
                        product_id: updated.product_id,
                        warehouse_id: updated.warehouse_id,
                        movement_type: req.kind.as_str().to_string(),
                        quantity_before: entry.quantity_before,
                        quantity_after: entry.quantity_after,
                    })];

                    // A negative manual adjustment is a stock-loss fact for
                    // the platform's audit system, recorded post-commit.
                    if req.kind == MovementKind::Adjustment && delta < 0 {
                        effects.push(PostCommitEffect::Audit {
                            actor_id: req.actor_id,
                            event_code: "STOCK_LOSS",
                            details: json!({
                                "batch_id": updated.id,
                                "sku": updated.sku.clone(),
                                "warehouse_id": updated.warehouse_id,
                                "delta": delta,
                                "quantity_before": entry.quantity_before,
                                "quantity_after": entry.quantity_after,
                                "reason": req.reason.clone(),
                            }),
                        });
                    }

                    Ok((
                        MovementOutcome {
                            batch_id: updated.id,
                            movement_id: entry.id,
                            quantity_before: entry.quantity_before,
                            new_quantity: entry.quantity_after,
                            delta,
                        },
                        effects,
                    ))
                })
            })
            .await;

        match result {
            Ok((outcome, effects)) => {
                dispatch_effects(&self.event_sender, self.audit.as_ref(), effects).await;
                STOCK_MOVEMENTS.inc();
                info!(
                    batch_id = %outcome.batch_id,
                    movement_type = request.kind.as_str(),
                    delta = outcome.delta,
                    new_quantity = outcome.new_quantity,
                    "stock movement applied"
                );
                Ok(outcome)
            }
            Err(e) => {
                STOCK_MOVEMENT_FAILURES.inc();
                Err(StockError::from(e))
            }
        }
    }

    /// Books incoming stock, creating the batch when the lot identity key
    /// (warehouse, product, lot number, expiry) has no existing row.
    #[instrument(skip(self))]
    pub async fn receive(&self, request: ReceiptRequest) -> Result<MovementOutcome, StockError> {
        request.validate().map_err(|e| {
            STOCK_MOVEMENT_FAILURES.inc();
            StockError::from(e)
        })?;
        if !matches!(
            request.kind,
            MovementKind::Receipt | MovementKind::PurchaseEntry
        ) {
            STOCK_MOVEMENT_FAILURES.inc();
            return Err(StockError::Validation(
                "receipts accept RECEIPT or PURCHASE_ENTRY movement types".to_string(),
            ));
        }

        let db = self.db_pool.as_ref();
        let req = request.clone();

        let result = db
            .transaction::<_, (MovementOutcome, Vec<PostCommitEffect>), StockError>(move |txn| {
                Box::pin(async move {
                    let existing = find_matching_batch(
                        txn,
                        req.warehouse_id,
                        req.product_id,
                        &req.lot_number,
                        req.expiry_date,
                    )
                    .await?;

                    let batch = match existing {
                        Some(batch) => batch,
                        None => {
                            let product = Product::find_by_id(req.product_id)
                                .one(txn)
                                .await
                                .map_err(StockError::from)?
                                .ok_or_else(|| {
                                    StockError::NotFound(format!(
                                        "product {} not found",
                                        req.product_id
                                    ))
                                })?;
                            let location_id = resolve_location(txn, req.warehouse_id).await?;
                            create_batch(
                                txn,
                                &product,
                                req.warehouse_id,
                                location_id,
                                req.lot_number.clone(),
                                req.expiry_date,
                                req.unit_cost,
                                req.unit_price,
                            )
                            .await?
                        }
                    };

                    let ctx = MovementContext {
                        actor_id: req.actor_id,
                        reason: req.reason.clone(),
                        location_id: batch.location_id,
                        reference_id: None,
                        reference_type: None,
                    };
                    let (updated, entry) =
                        apply_delta(txn, batch, req.kind, req.quantity, ctx).await?;

                    let effects = vec![PostCommitEffect::Emit(Event::MovementApplied {
                        batch_id: updated.id,
                        product_id: updated.product_id,
                        warehouse_id: updated.warehouse_id,
                        movement_type: req.kind.as_str().to_string(),
                        quantity_before: entry.quantity_before,
                        quantity_after: entry.quantity_after,
                    })];

                    Ok((
                        MovementOutcome {
                            batch_id: updated.id,
                            movement_id: entry.id,
                            quantity_before: entry.quantity_before,
                            new_quantity: entry.quantity_after,
                            delta: req.quantity,
                        },
                        effects,
                    ))
                })
            })
            .await;

        match result {
            Ok((outcome, effects)) => {
                dispatch_effects(&self.event_sender, self.audit.as_ref(), effects).await;
                STOCK_MOVEMENTS.inc();
                info!(
                    batch_id = %outcome.batch_id,
                    movement_type = request.kind.as_str(),
                    new_quantity = outcome.new_quantity,
                    "stock receipt booked"
                );
                Ok(outcome)
            }
            Err(e) => {
                STOCK_MOVEMENT_FAILURES.inc();
                Err(StockError::from(e))
            }
        }
    }
}
