use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::metrics::DOMAIN_EVENTS;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
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

    /// Sends an event, logging instead of failing the caller when the bus is gone.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, error = %e, "dropping domain event");
        }
    }
}

/// Domain events emitted by the services after a state change has been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    UserCreated(Uuid),
    MembershipVerified(Uuid),
    MembershipRevoked(Uuid),

    ChapterCreated(Uuid),
    ChapterUpdated(Uuid),
    ChapterDeactivated(Uuid),

    SellerApplied(Uuid),
    SellerApproved(Uuid),
    SellerRejected(Uuid),
    PromoterApplied(Uuid),
    PromoterApproved(Uuid),
    PromoterRejected(Uuid),
    StewardApplied(Uuid),
    StewardApproved(Uuid),
    StewardRejected(Uuid),

    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeactivated(Uuid),

    EventCreated(Uuid),
    EventUpdated(Uuid),
    EventClosed(Uuid),
    EventCancelled(Uuid),

    ListingCreated(Uuid),
    ListingUpdated(Uuid),
    ListingRemoved(Uuid),
    ListingReserved { listing_id: Uuid, order_id: Uuid },
    ListingReleased(Uuid),
    ListingClaimed { listing_id: Uuid, claimed_by: Uuid },

    OrderCreated { order_id: Uuid, kind: String },
    OrderPaid { order_id: Uuid, total_cents: i64 },
    OrderCancelled(Uuid),
    OrderRefunded(Uuid),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::UserCreated(_) => "user_created",
            Event::MembershipVerified(_) => "membership_verified",
            Event::MembershipRevoked(_) => "membership_revoked",
            Event::ChapterCreated(_) => "chapter_created",
            Event::ChapterUpdated(_) => "chapter_updated",
            Event::ChapterDeactivated(_) => "chapter_deactivated",
            Event::SellerApplied(_) => "seller_applied",
            Event::SellerApproved(_) => "seller_approved",
            Event::SellerRejected(_) => "seller_rejected",
            Event::PromoterApplied(_) => "promoter_applied",
            Event::PromoterApproved(_) => "promoter_approved",
            Event::PromoterRejected(_) => "promoter_rejected",
            Event::StewardApplied(_) => "steward_applied",
            Event::StewardApproved(_) => "steward_approved",
            Event::StewardRejected(_) => "steward_rejected",
            Event::ProductCreated(_) => "product_created",
            Event::ProductUpdated(_) => "product_updated",
            Event::ProductDeactivated(_) => "product_deactivated",
            Event::EventCreated(_) => "event_created",
            Event::EventUpdated(_) => "event_updated",
            Event::EventClosed(_) => "event_closed",
            Event::EventCancelled(_) => "event_cancelled",
            Event::ListingCreated(_) => "listing_created",
            Event::ListingUpdated(_) => "listing_updated",
            Event::ListingRemoved(_) => "listing_removed",
            Event::ListingReserved { .. } => "listing_reserved",
            Event::ListingReleased(_) => "listing_released",
            Event::ListingClaimed { .. } => "listing_claimed",
            Event::OrderCreated { .. } => "order_created",
            Event::OrderPaid { .. } => "order_paid",
            Event::OrderCancelled(_) => "order_cancelled",
            Event::OrderRefunded(_) => "order_refunded",
        }
    }
}

/// Creates a bounded event channel
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        DOMAIN_EVENTS.with_label_values(&[event.name()]).inc();

        match &event {
            Event::OrderPaid {
                order_id,
                total_cents,
            } => info!(%order_id, total_cents, "order paid"),
            Event::ListingClaimed {
                listing_id,
                claimed_by,
            } => info!(%listing_id, %claimed_by, "steward listing claimed"),
            Event::SellerApproved(id) | Event::PromoterApproved(id) | Event::StewardApproved(id) => {
                info!(application_id = %id, event = event.name(), "application approved")
            }
            other => info!(event = other.name(), "domain event: {:?}", other),
        }
    }

    info!("Event processing loop stopped");
}
