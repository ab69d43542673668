//! Subscriber sink abstraction
//!
//! The registry only needs to push messages into a connection and to close
//! it. Connections themselves are owned by the transport layer.

use std::net::SocketAddr;

use async_trait::async_trait;

use crate::error::DeliveryError;

use super::frame::WireMessage;

/// Identifier handed out by the registry on register
pub type SubscriberId = u64;

/// Output sink of one connected viewer
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Send one message, completing once the transport accepted it
    async fn send(&self, message: WireMessage) -> Result<(), DeliveryError>;

    /// Close the connection; must tolerate being called more than once
    async fn close(&self);

    /// Remote address, for logging
    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}
