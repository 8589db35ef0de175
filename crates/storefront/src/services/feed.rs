//! Order change subscriptions.
//!
//! Every order mutation publishes a full snapshot. Subscribers receive the
//! snapshots published after they subscribed; dropping a subscription
//! cancels it, and subscribing again starts a fresh sequence.

use futures::Stream;
use tokio::sync::broadcast;

use crate::models::{Order, OrderEvent, OrderEventKind};

/// Snapshots buffered per subscriber before the slowest one starts lagging.
const FEED_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct OrderFeed {
    sender: broadcast::Sender<OrderEvent>,
}

impl Default for OrderFeed {
    fn default() -> Self {
        Self::new(FEED_CAPACITY)
    }
}

impl OrderFeed {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a snapshot. A feed with no subscribers drops it.
    pub fn publish(&self, kind: OrderEventKind, order: &Order) {
        let event = OrderEvent {
            kind,
            order: order.clone(),
        };
        // Err only means nobody is listening.
        let _ = self.sender.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> OrderSubscription {
        OrderSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A live subscription. Drop it to cancel.
pub struct OrderSubscription {
    receiver: broadcast::Receiver<OrderEvent>,
}

impl OrderSubscription {
    /// The next snapshot, or `None` once the feed is gone.
    ///
    /// A subscriber that falls behind skips the snapshots it missed.
    pub async fn next(&mut self) -> Option<OrderEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "order feed subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Turn the subscription into a lazy stream of snapshots.
    pub fn into_stream(mut self) -> impl Stream<Item = OrderEvent> + Send {
        async_stream::stream! {
            while let Some(event) = self.next().await {
                yield event;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use futures::StreamExt;
    use rust_decimal::Decimal;

    use fashion_hub_core::{OrderCode, OrderStatus, PaymentStatus};

    use super::*;
    use crate::models::CustomerSnapshot;

    fn order() -> Order {
        let now = Utc::now();
        Order {
            code: OrderCode::generate(now, &mut rand::rng()),
            owner: None,
            items: Vec::new(),
            total: Decimal::ZERO,
            status: OrderStatus::OrderPlaced,
            payment_status: PaymentStatus::Pending,
            payment_id: None,
            payment_method: "COD".to_owned(),
            branch: "Pune".to_owned(),
            location: None,
            customer: CustomerSnapshot::default(),
            created_at: now,
            updated_at: now,
            updated_by: None,
        }
    }

    #[tokio::test]
    async fn test_subscriber_sees_events_after_subscribing() {
        let feed = OrderFeed::default();
        let early = order();
        feed.publish(OrderEventKind::Created, &early);

        let mut subscription = feed.subscribe();
        let later = order();
        feed.publish(OrderEventKind::StatusChanged, &later);

        let event = subscription.next().await.unwrap();
        assert_eq!(event.kind, OrderEventKind::StatusChanged);
        assert_eq!(event.order.code, later.code);
    }

    #[tokio::test]
    async fn test_drop_cancels_subscription() {
        let feed = OrderFeed::default();
        let subscription = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);
        drop(subscription);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_ends_when_feed_dropped() {
        let feed = OrderFeed::default();
        let stream = feed.subscribe().into_stream();
        feed.publish(OrderEventKind::Paid, &order());
        drop(feed);

        let events: Vec<OrderEvent> = stream.collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, OrderEventKind::Paid);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_ahead() {
        let feed = OrderFeed::new(2);
        let mut subscription = feed.subscribe();
        let orders: Vec<Order> = (0..4).map(|_| order()).collect();
        for o in &orders {
            feed.publish(OrderEventKind::Created, o);
        }

        let event = subscription.next().await.unwrap();
        assert_eq!(event.order.code, orders[2].code);
    }
}
