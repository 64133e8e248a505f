//! Live tick distribution.
//!
//! [`TickHub`] is an in-process topic broker. Producers publish ticks to a
//! topic string and every live [`TickSubscription`] on that topic receives them
//! in publish order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use charter_core::Tick;
use tokio::sync::mpsc;

/// Anything that can hand out tick subscriptions.
pub trait TickSource {
    fn subscribe(&self, topic: &str) -> TickSubscription;
}

type Subscribers = HashMap<String, Vec<(u64, mpsc::UnboundedSender<Tick>)>>;

#[derive(Debug, Default)]
struct HubInner {
    next_id: u64,
    topics: Subscribers,
}

/// Cloneable handle to a shared topic broker.
#[derive(Debug, Clone, Default)]
pub struct TickHub {
    inner: Arc<Mutex<HubInner>>,
}

impl TickHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `tick` to every subscriber of `topic`.
    ///
    /// Subscribers whose receiver is gone are pruned. Returns the number of
    /// deliveries.
    pub fn publish(&self, topic: &str, tick: Tick) -> usize {
        let Ok(mut inner) = self.inner.lock() else {
            log::error!("tick hub lock poisoned; dropping tick for {topic}");
            return 0;
        };
        let Some(subscribers) = inner.topics.get_mut(topic) else {
            return 0;
        };

        subscribers.retain(|(_, tx)| tx.send(tick.clone()).is_ok());
        let delivered = subscribers.len();
        if delivered == 0 {
            inner.topics.remove(topic);
        }
        delivered
    }

    /// Number of live subscribers on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.topics.get(topic).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn remove(&self, topic: &str, id: u64) {
        if let Ok(mut inner) = self.inner.lock() {
            if let Some(subscribers) = inner.topics.get_mut(topic) {
                subscribers.retain(|(sub_id, _)| *sub_id != id);
                if subscribers.is_empty() {
                    inner.topics.remove(topic);
                }
            }
        }
    }
}

impl TickSource for TickHub {
    fn subscribe(&self, topic: &str) -> TickSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = match self.inner.lock() {
            Ok(mut inner) => {
                let id = inner.next_id;
                inner.next_id += 1;
                inner.topics.entry(topic.to_string()).or_default().push((id, tx));
                id
            }
            Err(_) => {
                log::error!("tick hub lock poisoned; subscription to {topic} is closed");
                u64::MAX
            }
        };

        TickSubscription {
            topic: topic.to_string(),
            id,
            receiver: rx,
            hub: Arc::downgrade(&self.inner),
        }
    }
}

/// Receiving end of a topic subscription.
///
/// Dropping the subscription also unsubscribes, lazily on the next publish.
#[derive(Debug)]
pub struct TickSubscription {
    topic: String,
    id: u64,
    receiver: mpsc::UnboundedReceiver<Tick>,
    hub: Weak<Mutex<HubInner>>,
}

impl TickSubscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next tick. `None` once the hub is gone or unsubscribed.
    pub async fn recv(&mut self) -> Option<Tick> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Tick> {
        self.receiver.try_recv().ok()
    }

    /// Remove this subscription from the hub immediately.
    pub fn unsubscribe(mut self) {
        self.receiver.close();
        if let Some(inner) = self.hub.upgrade() {
            TickHub { inner }.remove(&self.topic, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_topic_subscribers_in_order() {
        let hub = TickHub::new();
        let mut a = hub.subscribe("market");
        let mut other = hub.subscribe("news");

        assert_eq!(hub.publish("market", Tick::new("AAPL", 1.0, 1.0, 0)), 1);
        assert_eq!(hub.publish("market", Tick::new("AAPL", 2.0, 1.0, 1)), 1);

        assert_eq!(a.recv().await.map(|t| t.price), Some(1.0));
        assert_eq!(a.recv().await.map(|t| t.price), Some(2.0));
        assert!(other.try_recv().is_none());
    }

    #[test]
    fn test_unsubscribe_removes_subscriber() {
        let hub = TickHub::new();
        let sub = hub.subscribe("market");
        let _keep = hub.subscribe("market");
        assert_eq!(hub.subscriber_count("market"), 2);

        sub.unsubscribe();
        assert_eq!(hub.subscriber_count("market"), 1);
    }

    #[test]
    fn test_dropped_subscription_pruned_on_publish() {
        let hub = TickHub::new();
        drop(hub.subscribe("market"));
        assert_eq!(hub.publish("market", Tick::new("AAPL", 1.0, 1.0, 0)), 0);
        assert_eq!(hub.subscriber_count("market"), 0);
    }
}
