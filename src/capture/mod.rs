//! Capture process management
//!
//! Each channel is fed by an external tool writing to stdout:
//!
//! ```text
//!   libcamera-vid ──stdout──► MjpegDemuxer ──frames──► registry (video)
//!   arecord       ──stdout──► PcmChunker   ──chunks──► registry (audio)
//!        └──stderr──► tracing
//! ```
//!
//! A session is never restarted after its process exits; a new one is only
//! created by the next start of the stream.

pub mod config;
pub mod session;
pub mod supervisor;

pub use config::{CaptureCommand, CaptureConfig};
pub use session::CaptureSession;
pub use supervisor::CaptureSupervisor;
