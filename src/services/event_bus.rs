//! Processed-event fan-out bus.
//!
//! Subscribers each get their own buffered channel; publishing never
//! blocks. A subscriber that can't keep up loses events (with a warning)
//! without holding up anyone else.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::warn;

use crate::domain::models::Event;

const SUBSCRIBER_BUFFER: usize = 100;

/// Identifies one subscription for unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

#[derive(Debug, Default)]
pub struct ProcessedEventBus {
    subscribers: Mutex<HashMap<u64, mpsc::Sender<Event>>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl ProcessedEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber and return its delivery channel.
    pub fn subscribe(&self) -> (SubscriberId, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(id, tx);
        (SubscriberId(id), rx)
    }

    /// Remove a subscriber; dropping its sender closes the channel.
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&id.0);
    }

    /// Non-blocking send to every subscriber. A full channel drops the
    /// event for that subscriber only.
    pub fn publish(&self, event: &Event) {
        let subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for (id, tx) in subscribers.iter() {
            if let Err(err) = tx.try_send(event.clone()) {
                match err {
                    mpsc::error::TrySendError::Full(_) => {
                        warn!(subscriber = id, kind = %event.kind(), "subscriber full, dropping event");
                    }
                    mpsc::error::TrySendError::Closed(_) => {
                        warn!(subscriber = id, "subscriber channel closed, dropping event");
                    }
                }
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Context, State};
    use serde_json::json;

    fn event() -> Event {
        Event::state_changed(
            "light.desk",
            None,
            Some(State::new("light.desk", json!("on"), Context::new())),
            Context::new(),
        )
    }

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let bus = ProcessedEventBus::new();
        let (_id_a, mut rx_a) = bus.subscribe();
        let (_id_b, mut rx_b) = bus.subscribe();

        bus.publish(&event());

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_full_subscriber_does_not_affect_others() {
        let bus = ProcessedEventBus::new();
        let (_slow, mut slow_rx) = bus.subscribe();
        let (_fast, mut fast_rx) = bus.subscribe();

        // Fill the slow subscriber's buffer without draining it.
        for _ in 0..=SUBSCRIBER_BUFFER {
            bus.publish(&event());
        }

        // The fast subscriber drained nothing either, but the point is the
        // publisher never blocked and both channels hold up to the buffer.
        let mut slow_count = 0;
        while slow_rx.try_recv().is_ok() {
            slow_count += 1;
        }
        let mut fast_count = 0;
        while fast_rx.try_recv().is_ok() {
            fast_count += 1;
        }
        assert_eq!(slow_count, SUBSCRIBER_BUFFER);
        assert_eq!(fast_count, SUBSCRIBER_BUFFER);
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_channel() {
        let bus = ProcessedEventBus::new();
        let (id, mut rx) = bus.subscribe();
        bus.unsubscribe(id);

        assert_eq!(bus.subscriber_count(), 0);
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
