use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

/// Events emitted by the core workflows. Consumers (notification fan-out,
/// report invalidation, and the like) subscribe on the receiving end of the
/// channel; emission is best-effort and never blocks or fails a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Receiving document events
    StockInCreated(Uuid),
    StockInApproved {
        stock_in_id: Uuid,
        approved_by: Uuid,
    },
    StockInCancelled {
        stock_in_id: Uuid,
        cancelled_by: Uuid,
    },

    // Issuing document events
    StockOutCreated(Uuid),
    StockOutApproved {
        stock_out_id: Uuid,
        approved_by: Uuid,
    },
    StockOutCancelled {
        stock_out_id: Uuid,
        cancelled_by: Uuid,
    },

    // Reconciliation events
    InventoryCheckCreated(Uuid),
    InventoryCheckSubmitted {
        check_id: Uuid,
        submitted_by: Uuid,
    },
    InventoryCheckApproved {
        check_id: Uuid,
        approved_by: Uuid,
    },
    InventoryCheckCancelled(Uuid),

    // Ledger events
    BatchDepleted {
        batch_lot_id: Uuid,
        product_id: Uuid,
    },
    ProductStockChanged {
        product_id: Uuid,
        old_quantity: i32,
        new_quantity: i32,
    },
    ProductStockRecomputed {
        product_id: Uuid,
        quantity: i32,
    },

    // Generic event for custom messages
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
        metadata: serde_json::Value,
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

    /// Builds a sender together with its receiving half.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Best-effort emission: a full or closed channel is logged and dropped.
    /// Workflow outcomes never depend on event delivery.
    pub async fn emit(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_survives_a_closed_channel() {
        let (sender, rx) = EventSender::channel(4);
        drop(rx);
        // Must not panic or error out
        sender.emit(Event::StockInCreated(Uuid::new_v4())).await;
    }

    #[tokio::test]
    async fn events_arrive_in_order() {
        let (sender, mut rx) = EventSender::channel(4);
        let id = Uuid::new_v4();
        sender.emit(Event::StockOutCreated(id)).await;
        sender
            .emit(Event::StockOutApproved {
                stock_out_id: id,
                approved_by: Uuid::new_v4(),
            })
            .await;

        assert!(matches!(rx.recv().await, Some(Event::StockOutCreated(got)) if got == id));
        assert!(matches!(
            rx.recv().await,
            Some(Event::StockOutApproved { stock_out_id, .. }) if stock_out_id == id
        ));
    }
}
