//! Statistics for capture pipelines

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::registry::BroadcastOutcome;

/// Lock-free counters for one channel's pipeline
///
/// Shared between the controller and the channel's supervisor; survives
/// across sessions so totals cover the whole process lifetime.
#[derive(Debug)]
pub struct PipelineStats {
    created_at: Instant,
    sessions_started: AtomicU64,
    spawn_failures: AtomicU64,
    read_failures: AtomicU64,
    bytes_read: AtomicU64,
    units_broadcast: AtomicU64,
    deliveries: AtomicU64,
    pruned_subscribers: AtomicU64,
    buffer_overflows: AtomicU64,
    running: AtomicBool,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            created_at: Instant::now(),
            sessions_started: AtomicU64::new(0),
            spawn_failures: AtomicU64::new(0),
            read_failures: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
            units_broadcast: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            pruned_subscribers: AtomicU64::new(0),
            buffer_overflows: AtomicU64::new(0),
            running: AtomicBool::new(false),
        }
    }

    /// A capture process was spawned
    pub fn on_session_start(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
        self.running.store(true, Ordering::Release);
    }

    /// The capture process was torn down
    pub fn on_session_end(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn on_spawn_failure(&self) {
        self.spawn_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_read_failure(&self) {
        self.read_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_read(&self, bytes: usize) {
        self.bytes_read.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn on_overflow(&self, count: u64) {
        self.buffer_overflows.fetch_add(count, Ordering::Relaxed);
    }

    /// Record one broadcast pass
    pub fn on_broadcast(&self, outcome: BroadcastOutcome) {
        self.units_broadcast.fetch_add(1, Ordering::Relaxed);
        self.deliveries
            .fetch_add(outcome.delivered as u64, Ordering::Relaxed);
        self.pruned_subscribers
            .fetch_add(outcome.pruned as u64, Ordering::Relaxed);
    }

    /// Whether a capture process is currently alive
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn sessions_started(&self) -> u64 {
        self.sessions_started.load(Ordering::Relaxed)
    }

    pub fn spawn_failures(&self) -> u64 {
        self.spawn_failures.load(Ordering::Relaxed)
    }

    pub fn read_failures(&self) -> u64 {
        self.read_failures.load(Ordering::Relaxed)
    }

    pub fn units_broadcast(&self) -> u64 {
        self.units_broadcast.load(Ordering::Relaxed)
    }

    pub fn buffer_overflows(&self) -> u64 {
        self.buffer_overflows.load(Ordering::Relaxed)
    }

    /// Time since these counters were created
    pub fn uptime(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Average input rate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.uptime().as_secs();
        if secs > 0 {
            (self.bytes_read.load(Ordering::Relaxed) * 8) / secs
        } else {
            0
        }
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            running: self.is_running(),
            sessions_started: self.sessions_started(),
            spawn_failures: self.spawn_failures(),
            read_failures: self.read_failures(),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            units_broadcast: self.units_broadcast(),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            pruned_subscribers: self.pruned_subscribers.load(Ordering::Relaxed),
            buffer_overflows: self.buffer_overflows(),
            bitrate: self.bitrate(),
        }
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialisable copy of [`PipelineStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineSnapshot {
    pub running: bool,
    pub sessions_started: u64,
    pub spawn_failures: u64,
    pub read_failures: u64,
    pub bytes_read: u64,
    pub units_broadcast: u64,
    pub deliveries: u64,
    pub pruned_subscribers: u64,
    pub buffer_overflows: u64,
    /// Bits per second averaged since startup
    pub bitrate: u64,
}
