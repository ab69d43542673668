//! Per-channel subscriber set
//!
//! Each channel owns its own lock so that video and audio register,
//! unregister and broadcast never contend with each other.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::subscriber::{Subscriber, SubscriberId};

/// Subscribers of a single channel
pub(super) struct ChannelEntry {
    /// Live subscribers keyed by id (ordered by registration)
    subscribers: Mutex<BTreeMap<SubscriberId, Arc<dyn Subscriber>>>,
}

impl ChannelEntry {
    pub(super) fn new() -> Self {
        Self {
            subscribers: Mutex::new(BTreeMap::new()),
        }
    }

    /// Insert a subscriber, returning the new set size
    pub(super) async fn insert(&self, id: SubscriberId, subscriber: Arc<dyn Subscriber>) -> usize {
        let mut subscribers = self.subscribers.lock().await;
        subscribers.insert(id, subscriber);
        subscribers.len()
    }

    /// Remove a subscriber, returning it if it was present
    pub(super) async fn remove(&self, id: SubscriberId) -> Option<Arc<dyn Subscriber>> {
        self.subscribers.lock().await.remove(&id)
    }

    /// Remove several subscribers under one lock acquisition
    pub(super) async fn remove_all(&self, ids: &[SubscriberId]) -> Vec<Arc<dyn Subscriber>> {
        let mut subscribers = self.subscribers.lock().await;
        ids.iter().filter_map(|id| subscribers.remove(id)).collect()
    }

    /// Copy of the current set
    pub(super) async fn snapshot(&self) -> Vec<(SubscriberId, Arc<dyn Subscriber>)> {
        self.subscribers
            .lock()
            .await
            .iter()
            .map(|(id, sub)| (*id, Arc::clone(sub)))
            .collect()
    }

    /// Take every subscriber out of the set
    pub(super) async fn drain(&self) -> Vec<Arc<dyn Subscriber>> {
        let mut subscribers = self.subscribers.lock().await;
        std::mem::take(&mut *subscribers).into_values().collect()
    }

    pub(super) async fn len(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    pub(super) async fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().await.contains_key(&id)
    }
}
