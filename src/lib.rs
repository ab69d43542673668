//! camcast: camera and microphone capture-to-WebSocket broadcast
//!
//! This library republishes the output of two external capture tools to any
//! number of browser viewers:
//! - MJPEG from the camera is split into JPEG frames and sent as base64 text
//! - Raw S16LE PCM from the microphone is sent as binary chunks
//! - Capture processes are started and stopped on demand, one per channel
//! - Viewers that stop accepting data are dropped without affecting others
//!
//! # Example: Simple Server
//!
//! ```no_run
//! use camcast::{ServerConfig, StreamServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = StreamServer::new(ServerConfig::default());
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod error;
pub mod media;
pub mod registry;
pub mod server;
pub mod stats;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use capture::{CaptureCommand, CaptureConfig};
pub use error::{Error, Result};
pub use registry::{StreamChannel, SubscriberRegistry};
pub use server::config::ServerConfig;
pub use server::controller::StreamController;
pub use server::listener::StreamServer;
