//! Subscriber registry implementation
//!
//! The set of connected subscribers, shared between the transport layer
//! (which adds and removes) and the broadcaster (which takes snapshots).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::entry::{Subscriber, SubscriberId};

/// Registry of connected subscribers
///
/// Thread-safe via `RwLock`. Snapshots copy the `Arc` handles out under a
/// read lock, so a broadcast never observes a half-applied add or remove.
pub struct SubscriberRegistry {
    subscribers: RwLock<HashMap<SubscriberId, Arc<Subscriber>>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate an ID for a new subscriber
    pub fn next_id(&self) -> SubscriberId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a subscriber
    pub async fn add(&self, subscriber: Arc<Subscriber>) {
        let mut subscribers = self.subscribers.write().await;
        let id = subscriber.id();
        let peer = subscriber.peer_addr();
        subscribers.insert(id, subscriber);

        tracing::info!(
            subscriber = id,
            peer = %peer,
            subscribers = subscribers.len(),
            "Subscriber added"
        );
    }

    /// Unregister a subscriber, marking it closed
    pub async fn remove(&self, id: SubscriberId) -> Option<Arc<Subscriber>> {
        let mut subscribers = self.subscribers.write().await;
        let removed = subscribers.remove(&id);

        if let Some(ref subscriber) = removed {
            subscriber.mark_closed();
            tracing::info!(
                subscriber = id,
                peer = %subscriber.peer_addr(),
                connected_ms = subscriber.connected_for().as_millis() as u64,
                delivered = subscriber.delivered(),
                dropped = subscriber.dropped(),
                subscribers = subscribers.len(),
                "Subscriber removed"
            );
        }

        removed
    }

    /// Open subscribers at this instant
    pub async fn snapshot(&self) -> Vec<Arc<Subscriber>> {
        self.subscribers
            .read()
            .await
            .values()
            .filter(|s| s.is_open())
            .cloned()
            .collect()
    }

    /// Number of registered subscribers
    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Whether no subscribers are registered
    pub async fn is_empty(&self) -> bool {
        self.subscribers.read().await.is_empty()
    }

    /// Mark every subscriber closed and empty the registry
    pub async fn close_all(&self) {
        let mut subscribers = self.subscribers.write().await;
        for subscriber in subscribers.values() {
            subscriber.mark_closed();
        }
        let count = subscribers.len();
        subscribers.clear();

        if count > 0 {
            tracing::info!(closed = count, "All subscribers closed");
        }
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SubscriberState;

    fn subscriber(registry: &SubscriberRegistry) -> Arc<Subscriber> {
        let (subscriber, _rx) = Subscriber::channel(
            registry.next_id(),
            "127.0.0.1:40000".parse().unwrap(),
            4,
        );
        Arc::new(subscriber)
    }

    #[tokio::test]
    async fn test_add_remove() {
        let registry = SubscriberRegistry::new();
        assert!(registry.is_empty().await);

        let a = subscriber(&registry);
        let b = subscriber(&registry);
        assert_ne!(a.id(), b.id());

        registry.add(Arc::clone(&a)).await;
        registry.add(Arc::clone(&b)).await;
        assert_eq!(registry.len().await, 2);

        let removed = registry.remove(a.id()).await.unwrap();
        assert_eq!(removed.id(), a.id());
        assert_eq!(a.state(), SubscriberState::Closed);
        assert_eq!(registry.len().await, 1);
        let remaining: Vec<_> = registry.snapshot().await.iter().map(|s| s.id()).collect();
        assert_eq!(remaining, vec![b.id()]);

        assert!(registry.remove(a.id()).await.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_skips_closed() {
        let registry = SubscriberRegistry::new();
        let a = subscriber(&registry);
        let b = subscriber(&registry);
        registry.add(Arc::clone(&a)).await;
        registry.add(Arc::clone(&b)).await;

        b.mark_closed();

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id(), a.id());
        // Closed but not yet removed
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let registry = SubscriberRegistry::new();
        let a = subscriber(&registry);
        registry.add(Arc::clone(&a)).await;

        let snapshot = registry.snapshot().await;
        registry.add(subscriber(&registry)).await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_mutation() {
        let registry = Arc::new(SubscriberRegistry::new());

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                for _ in 0..50 {
                    let s = subscriber(&registry);
                    let id = s.id();
                    registry.add(s).await;
                    let _ = registry.snapshot().await;
                    registry.remove(id).await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_close_all() {
        let registry = SubscriberRegistry::new();
        let a = subscriber(&registry);
        registry.add(Arc::clone(&a)).await;

        registry.close_all().await;

        assert!(!a.is_open());
        assert!(registry.is_empty().await);
    }
}
