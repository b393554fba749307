//! Change notification bus.
//!
//! Typed publish/subscribe between the services and their observers:
//! - Each [`Topic`] carries one payload type
//! - Delivery is asynchronous and ordered per subscriber
//! - A [`Subscription`] is owned by the subscriber and unsubscribes on drop
//!
//! Services publish only from the main loop, so every subscriber of a topic
//! sees the same global order.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut sub = services.bus().photos.subscribe();
//! services.feed().start().await?;
//!
//! while let Some(event) = sub.recv().await {
//!     println!("change: {event:?}");
//! }
//! ```

use parking_lot::RwLock;
use photofeed_protocol::ChangeEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::trace;

/// Payload published when a new avatar URL is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarChanged {
    /// Small avatar URL.
    pub url: String,
}

struct TopicInner<T> {
    name: &'static str,
    subscribers: RwLock<Vec<(u64, UnboundedSender<T>)>>,
    next_id: AtomicU64,
}

/// A typed channel that fans payloads out to its subscribers.
///
/// Cloning a topic yields another handle to the same subscriber list.
pub struct Topic<T> {
    inner: Arc<TopicInner<T>>,
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> Topic<T> {
    /// Creates a topic with no subscribers.
    pub fn new(name: &'static str) -> Self {
        Self {
            inner: Arc::new(TopicInner {
                name,
                subscribers: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Returns the topic name.
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Subscribes to all payloads published from now on.
    pub fn subscribe(&self) -> Subscription<T> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.subscribers.write().push((id, tx));
        trace!(topic = self.inner.name, id, "subscribed");
        Subscription {
            id,
            topic: Arc::downgrade(&self.inner),
            rx,
        }
    }

    /// Publishes a payload to every live subscriber.
    ///
    /// Returns the number of subscribers it was queued for. Subscribers whose
    /// receiving side is gone are removed.
    pub fn publish(&self, payload: T) -> usize {
        let mut subscribers = self.inner.subscribers.write();
        subscribers.retain(|(_, tx)| tx.send(payload.clone()).is_ok());
        trace!(topic = self.inner.name, delivered = subscribers.len(), "published");
        subscribers.len()
    }

    /// Ends a subscription. Equivalent to dropping it.
    pub fn unsubscribe(&self, subscription: Subscription<T>) {
        drop(subscription);
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }
}

/// The receiving end of a topic.
pub struct Subscription<T> {
    id: u64,
    topic: Weak<TopicInner<T>>,
    rx: UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Returns the subscription id, unique within its topic.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Waits for the next payload. Returns `None` once the topic is gone.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Returns the next payload if one is already queued.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(topic) = self.topic.upgrade() {
            topic.subscribers.write().retain(|(id, _)| *id != self.id);
            trace!(topic = topic.name, id = self.id, "unsubscribed");
        }
    }
}

/// Holds at most one subscription to a topic for its owner.
///
/// Re-subscribing through the slot is a no-op while a subscription is held,
/// so an observer never receives the same payload twice.
pub struct SubscriptionSlot<T> {
    subscription: Option<Subscription<T>>,
}

impl<T: Clone + Send + 'static> SubscriptionSlot<T> {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self { subscription: None }
    }

    /// Subscribes unless already subscribed, and returns the subscription.
    pub fn ensure(&mut self, topic: &Topic<T>) -> &mut Subscription<T> {
        self.subscription.get_or_insert_with(|| topic.subscribe())
    }

    /// Returns the held subscription, if any.
    pub fn get_mut(&mut self) -> Option<&mut Subscription<T>> {
        self.subscription.as_mut()
    }

    /// Returns true if a subscription is held.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Drops the held subscription.
    pub fn release(&mut self) {
        self.subscription = None;
    }
}

impl<T: Clone + Send + 'static> Default for SubscriptionSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Every topic the services publish on.
#[derive(Clone)]
pub struct NotificationBus {
    /// Photo collection length changes.
    pub photos: Topic<ChangeEvent>,
    /// New avatar URLs.
    pub avatar: Topic<AvatarChanged>,
}

impl NotificationBus {
    /// Creates a bus with empty topics.
    pub fn new() -> Self {
        Self {
            photos: Topic::new("photos"),
            avatar: Topic::new("avatar"),
        }
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn publish_and_receive() {
        let topic: Topic<u32> = Topic::new("numbers");
        let mut sub = topic.subscribe();

        assert_eq!(topic.publish(7), 1);
        assert_eq!(sub.recv().await, Some(7));
    }

    #[test]
    fn delivery_is_ordered() {
        let topic: Topic<u32> = Topic::new("numbers");
        let mut sub = topic.subscribe();
        for i in 0..100 {
            topic.publish(i);
        }
        let received: Vec<u32> = std::iter::from_fn(|| sub.try_recv()).collect();
        assert_eq!(received, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn multiple_subscribers() {
        let bus = NotificationBus::new();
        let mut a = bus.photos.subscribe();
        let mut b = bus.photos.subscribe();
        assert_ne!(a.id(), b.id());

        bus.photos.publish(ChangeEvent::inserted(0, 3));

        assert_eq!(a.try_recv(), Some(ChangeEvent::Inserted(0..3)));
        assert_eq!(b.try_recv(), Some(ChangeEvent::Inserted(0..3)));
    }

    #[test]
    fn drop_unsubscribes() {
        let topic: Topic<u32> = Topic::new("numbers");
        let sub = topic.subscribe();
        let other = topic.subscribe();
        assert_eq!(topic.subscriber_count(), 2);

        drop(sub);
        assert_eq!(topic.subscriber_count(), 1);

        topic.unsubscribe(other);
        assert_eq!(topic.subscriber_count(), 0);
        assert_eq!(topic.publish(1), 0);
    }

    #[test]
    fn slot_subscribes_once() {
        let topic: Topic<u32> = Topic::new("numbers");
        let mut slot = SubscriptionSlot::new();

        let first = slot.ensure(&topic).id();
        let second = slot.ensure(&topic).id();
        assert_eq!(first, second);
        assert_eq!(topic.subscriber_count(), 1);

        topic.publish(5);
        assert_eq!(slot.get_mut().and_then(|s| s.try_recv()), Some(5));
        assert_eq!(slot.get_mut().and_then(|s| s.try_recv()), None);

        slot.release();
        assert!(!slot.is_subscribed());
        assert_eq!(topic.subscriber_count(), 0);
    }

    #[test]
    fn subscription_outlives_topic() {
        let topic: Topic<u32> = Topic::new("numbers");
        let mut sub = topic.subscribe();
        topic.publish(1);
        drop(topic);

        assert_eq!(sub.try_recv(), Some(1));
        assert_eq!(sub.try_recv(), None);
    }

    #[tokio::test]
    async fn cross_task_delivery() {
        let topic: Topic<AvatarChanged> = Topic::new("avatar");
        let mut sub = topic.subscribe();

        let publisher = topic.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            publisher.publish(AvatarChanged { url: "u".into() });
        });

        let received = tokio::time::timeout(Duration::from_millis(500), sub.recv())
            .await
            .unwrap();
        assert_eq!(received, Some(AvatarChanged { url: "u".into() }));
        handle.await.unwrap();
    }
}
