use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Domain events emitted by the services. The processing loop logs each one,
/// forming the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Cart events
    CartCreated(Uuid),
    CartItemAdded { cart_id: Uuid, product_id: Uuid },
    CartItemRemoved { cart_id: Uuid, product_id: Uuid },
    CartCleared(Uuid),

    // Order events
    OrderPlaced { order_id: Uuid, folio: String },
    OrderPaid { order_id: Uuid, amount: Decimal },
    OrderPaymentRejected { order_id: Uuid, status: i32 },
    OrderFlagged {
        order_id: Uuid,
        expected: Decimal,
        reported: Decimal,
    },
    OrderCancelled(Uuid),
    OrderFulfilmentUpdated(Uuid),

    // Catalog events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    LowStock { product_id: Uuid, remaining: i32 },

    // Support events
    TicketOpened { ticket_id: Uuid, folio: String },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, surfacing channel failures to the caller.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event; a full or closed channel is logged, never fatal.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Event dropped: {}", e);
        }
    }
}

/// Event processing loop, spawned once from `main`.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderFlagged {
                order_id,
                expected,
                reported,
            } => {
                error!(
                    %order_id,
                    %expected,
                    %reported,
                    "order flagged: provider-reported amount disagrees with stored total"
                );
            }
            Event::LowStock {
                product_id,
                remaining,
            } => {
                warn!(%product_id, remaining, "product stock running low");
            }
            other => info!("Event: {:?}", other),
        }
    }

    info!("Event channel closed; processing loop exiting");
}
