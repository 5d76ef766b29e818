use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::entities::{
    order::OrderStatus, service_booking::BookingStatus,
};

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

    /// Sends an event; a closed channel is logged and otherwise ignored so
    /// the originating request still succeeds.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            counter!("aquacare_events.dropped", 1, "event" => name);
            error!(event = name, error = %e, "failed to publish event");
        }
    }
}

/// Domain events published by the services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ProductCreated(Uuid),
    LowStock {
        product_id: Uuid,
        name: String,
        sku: String,
        stock_quantity: i32,
    },
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    ShipmentCreated {
        shipment_id: Uuid,
        order_id: Uuid,
    },
    ShipmentCancelled {
        shipment_id: Uuid,
        order_id: Uuid,
        /// Order status once the shipment was withdrawn
        order_status: OrderStatus,
    },
    BookingCreated(Uuid),
    BookingStatusChanged {
        booking_id: Uuid,
        old_status: BookingStatus,
        new_status: BookingStatus,
    },
    CallRequestCreated(Uuid),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ProductCreated(_) => "product_created",
            Event::LowStock { .. } => "low_stock",
            Event::OrderCreated(_) => "order_created",
            Event::OrderStatusChanged { .. } => "order_status_changed",
            Event::ShipmentCreated { .. } => "shipment_created",
            Event::ShipmentCancelled { .. } => "shipment_cancelled",
            Event::BookingCreated(_) => "booking_created",
            Event::BookingStatusChanged { .. } => "booking_status_changed",
            Event::CallRequestCreated(_) => "call_request_created",
        }
    }
}

/// Handlers process events asynchronously, off the request path.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: Event) -> Result<(), String>;
}

/// Drains the event channel, handing every event to `handler`. Handler
/// failures are logged and the loop keeps going.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, handler: Option<Arc<dyn EventHandler>>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        let name = event.name();
        debug!(event = name, "received event");
        counter!("aquacare_events.received", 1, "event" => name);

        let Some(handler) = handler.as_ref() else {
            continue;
        };

        if let Err(e) = handler.handle_event(event).await {
            counter!("aquacare_events.failed", 1, "event" => name);
            error!(event = name, error = %e, "event handler failed");
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Event>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle_event(&self, event: Event) -> Result<(), String> {
            let fail = matches!(event, Event::ProductCreated(_));
            self.seen.lock().unwrap().push(event);
            if fail {
                Err("boom".into())
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn loop_survives_handler_errors() {
        let (tx, rx) = mpsc::channel(8);
        let recorder = Arc::new(Recorder::default());
        let sender = EventSender::new(tx);

        let order_id = Uuid::new_v4();
        sender.send_or_log(Event::ProductCreated(Uuid::new_v4())).await;
        sender.send_or_log(Event::OrderCreated(order_id)).await;
        drop(sender);

        process_events(rx, Some(recorder.clone() as Arc<dyn EventHandler>)).await;

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], Event::OrderCreated(order_id));
    }

    #[tokio::test]
    async fn publishing_to_closed_channel_does_not_panic() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender.send(Event::CallRequestCreated(Uuid::new_v4())).await.is_err());
        sender.send_or_log(Event::CallRequestCreated(Uuid::new_v4())).await;
    }
}
