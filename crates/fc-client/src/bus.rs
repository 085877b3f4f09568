//! Session-scoped publish/subscribe
//!
//! Handlers run synchronously, in subscription order, on the task that
//! publishes; for inbound traffic that is the connection's reader task, so
//! handlers observe notifications in wire order and must not block. Handlers
//! receive the publishing [`Session`] as an argument instead of capturing it,
//! which keeps the bus free of reference cycles.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::notification::{Notification, Topic};
use crate::session::Session;

/// Capacity of the broadcast stream offered to async consumers.
///
/// Slow receivers see `RecvError::Lagged` rather than stalling the reader.
const BROADCAST_CAPACITY: usize = 1024;

/// Callback invoked for matching notifications
pub type Handler = Arc<dyn Fn(&Session, &Notification) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    topic: Topic,
    handler: Handler,
}

/// Publish/subscribe registry owned by one session
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
    stream: broadcast::Sender<Notification>,
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        let (stream, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            subscriptions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            stream,
        }
    }

    /// Register `handler` for notifications matching `topic`
    pub fn subscribe(&self, topic: Topic, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.write().push(Subscription { id, topic, handler });
        id
    }

    /// Remove a handler; returns false if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        subscriptions.len() != before
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Receive every notification published from now on
    pub fn stream(&self) -> broadcast::Receiver<Notification> {
        self.stream.subscribe()
    }

    /// Deliver `notification` to stream receivers, then to matching handlers
    ///
    /// Stream receivers see a notification before anything a handler
    /// publishes in response to it.
    pub fn publish(&self, session: &Session, notification: Notification) {
        // No receivers is fine
        let _ = self.stream.send(notification.clone());

        // Snapshot so handlers may subscribe or publish re-entrantly
        let handlers: Vec<Handler> = self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.topic.matches(&notification))
            .map(|s| Arc::clone(&s.handler))
            .collect();

        tracing::trace!(
            notification = notification.name(),
            handlers = handlers.len(),
            "Publishing"
        );

        for handler in handlers {
            handler(session, &notification);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NamedEvent;
    use fc_core::config::ClientConfig;
    use parking_lot::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, Handler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: Handler = Arc::new(move |_: &Session, n: &Notification| {
            sink.lock().push(n.name().to_string());
        });
        (seen, handler)
    }

    #[test]
    fn test_publish_filters_by_topic() {
        let session = Session::new(ClientConfig::default());
        let bus = EventBus::new();
        let (seen, handler) = recorder();
        bus.subscribe(Topic::Named("player.join".into()), handler);

        bus.publish(&session, Notification::Ready);
        bus.publish(
            &session,
            Notification::Named(NamedEvent::new("player.join", vec![])),
        );
        bus.publish(
            &session,
            Notification::Named(NamedEvent::new("player.leave", vec![])),
        );

        assert_eq!(*seen.lock(), vec!["player.join"]);
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let session = Session::new(ClientConfig::default());
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.subscribe(
                Topic::All,
                Arc::new(move |_: &Session, _: &Notification| order.lock().push(tag)),
            );
        }

        bus.publish(&session, Notification::Connected);
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe() {
        let session = Session::new(ClientConfig::default());
        let bus = EventBus::new();
        let (seen, handler) = recorder();
        let id = bus.subscribe(Topic::All, handler);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&session, Notification::Closed);
        assert!(seen.lock().is_empty());
        assert_eq!(bus.handler_count(), 0);
    }

    #[test]
    fn test_reentrant_subscribe_from_handler() {
        let session = Session::new(ClientConfig::default());
        let bus = Arc::new(EventBus::new());
        let inner_bus = Arc::clone(&bus);

        bus.subscribe(
            Topic::Ready,
            Arc::new(move |_: &Session, _: &Notification| {
                inner_bus.subscribe(Topic::Closed, Arc::new(|_: &Session, _: &Notification| {}));
            }),
        );

        bus.publish(&session, Notification::Ready);
        assert_eq!(bus.handler_count(), 2);
    }

    #[tokio::test]
    async fn test_stream_receives_published() {
        let session = Session::new(ClientConfig::default());
        let bus = EventBus::new();
        let mut rx = bus.stream();

        bus.publish(&session, Notification::Login);
        assert!(matches!(rx.recv().await.unwrap(), Notification::Login));
    }
}
