pub mod ledger;
pub mod locations;
pub mod movements;
pub mod queries;
pub mod transfers;

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::audit::AuditSink;
use crate::events::{Event, EventSender};

/// Side effect collected inside a transaction and dispatched only after it
/// commits. Dispatch failures are logged and never propagated; the committed
/// stock mutation stands regardless.
#[derive(Debug, Clone)]
pub(crate) enum PostCommitEffect {
    Emit(Event),
    Audit {
        actor_id: Uuid,
        event_code: &'static str,
        details: Value,
    },
}

pub(crate) async fn dispatch_effects(
    event_sender: &EventSender,
    audit: &dyn AuditSink,
    effects: Vec<PostCommitEffect>,
) {
    for effect in effects {
        match effect {
            PostCommitEffect::Emit(event) => {
                if let Err(e) = event_sender.send(event).await {
                    warn!(error = %e, "post-commit event dropped");
                }
            }
            PostCommitEffect::Audit {
                actor_id,
                event_code,
                details,
            } => {
                if let Err(e) = audit.record(actor_id, event_code, details).await {
                    warn!(error = %e, event_code, "audit sink rejected record; stock mutation stands");
                }
            }
        }
    }
}
