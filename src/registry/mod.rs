//! Subscriber registry for capture fan-out
//!
//! The registry tracks connected viewers per channel and delivers every unit
//! produced by a capture pipeline to all of them.
//!
//! # Architecture
//!
//! ```text
//!                      Arc<SubscriberRegistry>
//!                 ┌─────────────────────────────┐
//!                 │ video: Mutex<{id -> sub}>   │
//!                 │ audio: Mutex<{id -> sub}>   │
//!                 └──────────────┬──────────────┘
//!                                │
//!    [Supervisor]                │ snapshot, release lock
//!    registry.broadcast() ───────┼──────────────────────┐
//!                                ▼                      ▼
//!                          sub.send() ─► WS      sub.send() ─► WS
//!                                │                      │
//!                                └── failures ──► prune under lock
//! ```
//!
//! # Zero-Copy Design
//!
//! `bytes::Bytes` uses reference counting, so all subscribers share the same
//! chunk allocation. Video is base64-encoded once per broadcast and shared
//! through a reference-counted `Utf8Bytes`.

pub mod config;
mod entry;
pub mod frame;
pub mod store;
pub mod subscriber;

pub use config::RegistryConfig;
pub use frame::{BroadcastFrame, StreamChannel, WireMessage};
pub use store::{BroadcastOutcome, SubscriberRegistry};
pub use subscriber::{Subscriber, SubscriberId};
