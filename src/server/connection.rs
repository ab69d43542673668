//! WebSocket viewer connections
//!
//! Each upgraded connection is split: the sink half is registered with the
//! subscriber registry, the stream half is read until the peer goes away.
//! Inbound messages are only a liveness signal and are otherwise ignored.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::Mutex;

use crate::error::DeliveryError;
use crate::registry::{StreamChannel, Subscriber, SubscriberRegistry, WireMessage};

/// Outbound half of a viewer's WebSocket
pub struct WsSubscriber {
    sink: Mutex<SplitSink<WebSocket, Message>>,
    peer: SocketAddr,
    closed: AtomicBool,
}

impl WsSubscriber {
    pub fn new(sink: SplitSink<WebSocket, Message>, peer: SocketAddr) -> Self {
        Self {
            sink: Mutex::new(sink),
            peer,
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Subscriber for WsSubscriber {
    async fn send(&self, message: WireMessage) -> Result<(), DeliveryError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DeliveryError::Closed);
        }

        let message = match message {
            WireMessage::Text(text) => Message::Text(text),
            WireMessage::Binary(data) => Message::Binary(data),
        };

        self.sink
            .lock()
            .await
            .send(message)
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut sink = self.sink.lock().await;
        // Peer may already be gone
        let _ = sink.send(Message::Close(None)).await;
        let _ = sink.close().await;
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.peer)
    }
}

/// Serve one viewer for its whole connection lifetime
pub async fn serve_viewer(
    socket: WebSocket,
    channel: StreamChannel,
    peer: SocketAddr,
    registry: Arc<SubscriberRegistry>,
) {
    let (sink, mut inbound) = socket.split();
    let subscriber = Arc::new(WsSubscriber::new(sink, peer));
    let id = registry.register(channel, subscriber.clone()).await;

    while let Some(message) = inbound.next().await {
        match message {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(channel = %channel, peer = %peer, error = %e, "Viewer read failed");
                break;
            }
        }
    }

    // Already gone if a broadcast pruned it
    registry.unregister(channel, id).await;
    subscriber.close().await;

    let remaining = registry.subscriber_count(channel).await;
    tracing::debug!(
        channel = %channel,
        peer = %peer,
        subscribers = remaining,
        "Viewer disconnected"
    );
}
