//! Inventory batch ledger and transfer engine for the Botica pharmacy
//! operations platform.
//!
//! Tracks physical stock as discrete lots per warehouse, applies signed
//! quantity deltas under a strict non-negative invariant, and moves stock
//! between warehouses atomically while preserving batch identity (lot number
//! and expiry) and an append-only movement audit trail.
//!
//! The crate is a library-level transactional component: request handlers of
//! the wider platform (POS sale completion, loss/adjustment forms, transfer
//! requests) call [`StockMovementService`] and [`TransferService`] in-process
//! with an already-authenticated actor id. Authentication, dashboards, and
//! the rest of the platform live elsewhere.

pub mod audit;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod services;

pub use config::AppConfig;
pub use db::DbPool;
pub use entities::stock_movement::{MovementKind, StockDirection};
pub use errors::StockError;
pub use events::{Event, EventSender};
pub use services::movements::{
    MovementOutcome, MovementRequest, ReceiptRequest, StockMovementService,
};
pub use services::transfers::{
    TransferItem, TransferLineOutcome, TransferOutcome, TransferRequest, TransferService,
};
