//! Stream server
//!
//! Wires the capture controller and the subscriber registry to HTTP: two
//! WebSocket delivery endpoints, two control triggers, a status query and
//! the viewer page.

pub mod config;
pub mod connection;
pub mod controller;
pub mod listener;

pub use config::ServerConfig;
pub use connection::WsSubscriber;
pub use controller::{ChannelStatus, StreamController, StreamStatus};
pub use listener::StreamServer;
