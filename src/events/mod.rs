use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Domain events emitted by the engine after a unit of work commits.
///
/// Emission is strictly post-commit: an event is never sent for a rolled-back
/// movement, and a failed send never affects the committed state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    MovementApplied {
        batch_id: Uuid,
        product_id: Uuid,
        warehouse_id: Uuid,
        movement_type: String,
        quantity_before: i32,
        quantity_after: i32,
    },
    TransferExecuted {
        transfer_id: Uuid,
        origin_warehouse_id: Uuid,
        destination_warehouse_id: Uuid,
        item_count: usize,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}
