use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Outbound audit-log sink.
///
/// The engine invokes this best-effort, strictly after commit: a sink failure
/// is logged by the caller and never rolls back or fails the stock mutation
/// it accompanies.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(
        &self,
        actor_id: Uuid,
        event_code: &str,
        details: Value,
    ) -> Result<(), AuditError>;
}

/// Production default: audit records go to the structured log stream.
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(
        &self,
        actor_id: Uuid,
        event_code: &str,
        details: Value,
    ) -> Result<(), AuditError> {
        info!(actor_id = %actor_id, event_code, %details, "audit event");
        Ok(())
    }
}

/// Captures audit records in memory for assertions in tests.
#[derive(Default)]
pub struct InMemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub actor_id: Uuid,
    pub event_code: String,
    pub details: Value,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().expect("audit sink lock poisoned").clone()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(
        &self,
        actor_id: Uuid,
        event_code: &str,
        details: Value,
    ) -> Result<(), AuditError> {
        self.records
            .lock()
            .expect("audit sink lock poisoned")
            .push(AuditRecord {
                actor_id,
                event_code: event_code.to_string(),
                details,
            });
        Ok(())
    }
}
