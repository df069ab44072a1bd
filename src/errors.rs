use sea_orm::error::DbErr;
use sea_orm::TransactionError;
use thiserror::Error;
use uuid::Uuid;

/// Failure taxonomy of the batch ledger and transfer engine.
///
/// Business-rule violations are detected before commit and always roll the
/// whole unit of work back. `TransactionConflict` and `Persistence` are also
/// rolled back but are safe for the caller to retry a bounded number of
/// times; see [`StockError::is_retryable`].
#[derive(Debug, Error)]
pub enum StockError {
    #[error("origin and destination warehouse are the same: {0}")]
    InvalidTransfer(Uuid),

    #[error("transfer item for product {product_id} is missing a lot id")]
    MissingLot { product_id: Uuid },

    #[error("no batch found for product {product_id} in warehouse {warehouse_id}")]
    NoBatchFound {
        product_id: Uuid,
        warehouse_id: Uuid,
    },

    #[error("batch {batch_id} not found in warehouse {warehouse_id}")]
    BatchNotFound { batch_id: Uuid, warehouse_id: Uuid },

    #[error("insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i32,
        requested: i32,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("transaction conflict, safe to retry: {0}")]
    TransactionConflict(String),

    #[error("storage error: {0}")]
    Persistence(DbErr),
}

impl StockError {
    /// Whether retrying the whole operation may succeed without any caller
    /// intervention. Business-rule violations are never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StockError::TransactionConflict(_) | StockError::Persistence(_)
        )
    }
}

/// SQLSTATE fragments and message substrings that identify lock contention
/// rather than a storage fault. SeaORM does not expose a stable error kind
/// for these, so classification happens on the rendered error.
fn is_conflict(err: &DbErr) -> bool {
    let msg = err.to_string().to_lowercase();
    const CONFLICT_MARKERS: &[&str] = &[
        "40001",
        "40p01",
        "55p03",
        "deadlock",
        "could not serialize",
        "lock timeout",
        "lock_timeout",
        "database is locked",
    ];
    CONFLICT_MARKERS.iter().any(|marker| msg.contains(marker))
}

impl From<DbErr> for StockError {
    fn from(err: DbErr) -> Self {
        if is_conflict(&err) {
            StockError::TransactionConflict(err.to_string())
        } else {
            StockError::Persistence(err)
        }
    }
}

impl From<TransactionError<StockError>> for StockError {
    fn from(err: TransactionError<StockError>) -> Self {
        match err {
            TransactionError::Connection(db_err) => StockError::from(db_err),
            TransactionError::Transaction(stock_err) => stock_err,
        }
    }
}

impl From<validator::ValidationErrors> for StockError {
    fn from(err: validator::ValidationErrors) -> Self {
        StockError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadlocks_classify_as_conflict() {
        let err = DbErr::Custom("ERROR: deadlock detected (SQLSTATE 40P01)".to_string());
        assert!(matches!(
            StockError::from(err),
            StockError::TransactionConflict(_)
        ));
    }

    #[test]
    fn serialization_failures_classify_as_conflict() {
        let err = DbErr::Custom(
            "could not serialize access due to concurrent update (SQLSTATE 40001)".to_string(),
        );
        let stock_err = StockError::from(err);
        assert!(stock_err.is_retryable());
        assert!(matches!(stock_err, StockError::TransactionConflict(_)));
    }

    #[test]
    fn other_db_errors_are_persistence_failures() {
        let err = DbErr::Custom("connection reset by peer".to_string());
        let stock_err = StockError::from(err);
        assert!(matches!(stock_err, StockError::Persistence(_)));
        assert!(stock_err.is_retryable());
    }

    #[test]
    fn business_errors_are_not_retryable() {
        let err = StockError::InsufficientStock {
            sku: "PARACETAMOL-500".to_string(),
            available: 70,
            requested: 100,
        };
        assert!(!err.is_retryable());
    }
}
