//! Subscriber registry implementation
//!
//! The central registry that tracks connected viewers per channel and fans
//! capture output out to them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::join_all;

use crate::error::DeliveryError;

use super::config::RegistryConfig;
use super::entry::ChannelEntry;
use super::frame::{BroadcastFrame, StreamChannel};
use super::subscriber::{Subscriber, SubscriberId};

/// Result of one broadcast pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Subscribers that accepted the unit
    pub delivered: usize,
    /// Subscribers that failed and were removed
    pub pruned: usize,
}

/// Registry of connected subscribers for both channels
///
/// Each channel's set sits behind its own lock. Broadcasting holds that lock
/// only to snapshot the set and again to prune failures; the sends themselves
/// run concurrently without it.
pub struct SubscriberRegistry {
    video: ChannelEntry,
    audio: ChannelEntry,
    next_id: AtomicU64,
    config: RegistryConfig,
}

impl SubscriberRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            video: ChannelEntry::new(),
            audio: ChannelEntry::new(),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn entry(&self, channel: StreamChannel) -> &ChannelEntry {
        match channel {
            StreamChannel::Video => &self.video,
            StreamChannel::Audio => &self.audio,
        }
    }

    /// Add a subscriber to a channel
    ///
    /// Subsequent broadcasts on that channel include it.
    pub async fn register(
        &self,
        channel: StreamChannel,
        subscriber: Arc<dyn Subscriber>,
    ) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let peer = subscriber.peer_addr();
        let total = self.entry(channel).insert(id, subscriber).await;

        tracing::info!(
            channel = %channel,
            subscriber = id,
            peer = ?peer,
            subscribers = total,
            "Subscriber registered"
        );

        id
    }

    /// Remove a subscriber from a channel
    ///
    /// Returns whether it was present. Removing an unknown or already pruned
    /// subscriber is a no-op.
    pub async fn unregister(&self, channel: StreamChannel, id: SubscriberId) -> bool {
        let entry = self.entry(channel);
        let removed = entry.remove(id).await.is_some();

        if removed {
            let total = entry.len().await;
            tracing::info!(
                channel = %channel,
                subscriber = id,
                subscribers = total,
                "Subscriber unregistered"
            );
        }

        removed
    }

    /// Deliver a unit to every subscriber of its channel
    ///
    /// Subscribers whose send fails or exceeds the send timeout are closed
    /// and removed before this returns, so they never see a second attempt.
    pub async fn broadcast(&self, frame: &BroadcastFrame) -> BroadcastOutcome {
        let channel = frame.channel;
        let entry = self.entry(channel);

        let snapshot = entry.snapshot().await;
        if snapshot.is_empty() {
            return BroadcastOutcome::default();
        }

        let message = frame.encode();
        let send_timeout = self.config.send_timeout;

        let results = join_all(snapshot.iter().map(|(id, subscriber)| {
            let message = message.clone();
            async move {
                let sent = tokio::time::timeout(send_timeout, subscriber.send(message)).await;
                let result = match sent {
                    Ok(result) => result,
                    Err(_) => Err(DeliveryError::Timeout),
                };
                (*id, result)
            }
        }))
        .await;

        let mut failed = Vec::new();
        for (id, result) in results {
            if let Err(e) = result {
                tracing::warn!(
                    channel = %channel,
                    subscriber = id,
                    sequence = frame.sequence,
                    error = %e,
                    "Send failed, removing subscriber"
                );
                failed.push(id);
            }
        }

        let outcome = BroadcastOutcome {
            delivered: snapshot.len() - failed.len(),
            pruned: failed.len(),
        };

        if !failed.is_empty() {
            entry.remove_all(&failed).await;

            let close_timeout = self.config.close_timeout;
            join_all(
                snapshot
                    .iter()
                    .filter(|(id, _)| failed.contains(id))
                    .map(|(_, subscriber)| tokio::time::timeout(close_timeout, subscriber.close())),
            )
            .await;

            let total = entry.len().await;
            tracing::debug!(
                channel = %channel,
                pruned = outcome.pruned,
                subscribers = total,
                "Pruned failed subscribers"
            );
        }

        outcome
    }

    /// Number of subscribers on a channel
    pub async fn subscriber_count(&self, channel: StreamChannel) -> usize {
        self.entry(channel).len().await
    }

    /// Check whether a subscriber is registered on a channel
    pub async fn is_registered(&self, channel: StreamChannel, id: SubscriberId) -> bool {
        self.entry(channel).contains(id).await
    }

    /// Close and remove every subscriber on both channels
    pub async fn close_all(&self) {
        for channel in StreamChannel::ALL {
            let subscribers = self.entry(channel).drain().await;
            if subscribers.is_empty() {
                continue;
            }

            tracing::info!(
                channel = %channel,
                subscribers = subscribers.len(),
                "Closing subscribers"
            );

            let close_timeout = self.config.close_timeout;
            join_all(
                subscribers
                    .iter()
                    .map(|subscriber| tokio::time::timeout(close_timeout, subscriber.close())),
            )
            .await;
        }
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}
