//! Stream controller
//!
//! Single source of truth for whether streaming is active. Starting launches
//! one capture supervisor per channel; stopping signals them to tear down.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::capture::{CaptureConfig, CaptureSupervisor};
use crate::registry::{StreamChannel, SubscriberRegistry};
use crate::stats::{PipelineSnapshot, PipelineStats};

/// Mutable controller state, guarded by one lock
#[derive(Default)]
struct ControllerState {
    /// Whether streaming is active
    active: bool,
    /// Set by `shutdown`; no further sessions are started
    closed: bool,
    /// Stop signal for the current sessions
    signal: Option<watch::Sender<bool>>,
    /// Most recent supervisor task per channel
    video_task: Option<JoinHandle<()>>,
    audio_task: Option<JoinHandle<()>>,
}

impl ControllerState {
    fn task_mut(&mut self, channel: StreamChannel) -> &mut Option<JoinHandle<()>> {
        match channel {
            StreamChannel::Video => &mut self.video_task,
            StreamChannel::Audio => &mut self.audio_task,
        }
    }
}

/// Status snapshot for the control surface
#[derive(Debug, Clone, Serialize)]
pub struct StreamStatus {
    pub active: bool,
    pub video: ChannelStatus,
    pub audio: ChannelStatus,
}

/// Per-channel part of [`StreamStatus`]
#[derive(Debug, Clone, Serialize)]
pub struct ChannelStatus {
    pub subscribers: usize,
    #[serde(flatten)]
    pub pipeline: PipelineSnapshot,
}

/// Gates the capture supervisors
pub struct StreamController {
    config: CaptureConfig,
    registry: Arc<SubscriberRegistry>,
    video_stats: Arc<PipelineStats>,
    audio_stats: Arc<PipelineStats>,
    state: Mutex<ControllerState>,
}

impl StreamController {
    /// Create an inactive controller
    pub fn new(config: CaptureConfig, registry: Arc<SubscriberRegistry>) -> Self {
        Self {
            config,
            registry,
            video_stats: Arc::new(PipelineStats::new()),
            audio_stats: Arc::new(PipelineStats::new()),
            state: Mutex::new(ControllerState::default()),
        }
    }

    /// Registry the supervisors broadcast into
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Counters for a channel
    pub fn stats(&self, channel: StreamChannel) -> &Arc<PipelineStats> {
        match channel {
            StreamChannel::Video => &self.video_stats,
            StreamChannel::Audio => &self.audio_stats,
        }
    }

    /// Start streaming
    ///
    /// Launches one supervisor per channel if not already active; otherwise
    /// does nothing. A channel's new session waits for that channel's
    /// previous session to finish tearing down before spawning its process.
    /// Returns whether this call activated the stream.
    pub async fn start(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.closed {
            tracing::debug!("Controller shut down, not starting");
            return false;
        }
        if state.active {
            tracing::debug!("Stream already active");
            return false;
        }

        let (signal, active) = watch::channel(true);
        state.active = true;
        state.signal = Some(signal);

        for channel in StreamChannel::ALL {
            let previous = state.task_mut(channel).take();
            let supervisor = CaptureSupervisor::new(
                channel,
                &self.config,
                Arc::clone(&self.registry),
                Arc::clone(self.stats(channel)),
            );
            let active = active.clone();

            let task = tokio::spawn(async move {
                if let Some(previous) = previous {
                    let _ = previous.await;
                }
                // Stopped again while the previous session was shutting down
                if !*active.borrow() {
                    return;
                }
                // Failures are logged by the supervisor
                let _ = supervisor.run(active).await;
            });

            *state.task_mut(channel) = Some(task);
        }

        tracing::info!("Stream started");
        true
    }

    /// Stop streaming
    ///
    /// Clears the active flag and signals the running supervisors, without
    /// waiting for them to finish. Returns whether the stream was active.
    pub async fn stop(&self) -> bool {
        let mut state = self.state.lock().await;
        Self::deactivate(&mut state)
    }

    fn deactivate(state: &mut ControllerState) -> bool {
        let was_active = state.active;
        state.active = false;

        if let Some(signal) = state.signal.take() {
            let _ = signal.send(false);
        }

        tracing::info!(was_active = was_active, "Stream stopped");
        was_active
    }

    /// Whether streaming is active
    ///
    /// Stays true after a capture process dies on its own; only `stop`
    /// clears it.
    pub async fn is_active(&self) -> bool {
        self.state.lock().await.active
    }

    /// Stop streaming and wait for every capture process to be torn down
    ///
    /// Later calls to `start` are refused.
    pub async fn shutdown(&self) {
        let tasks = {
            let mut state = self.state.lock().await;
            state.closed = true;
            Self::deactivate(&mut state);
            [state.video_task.take(), state.audio_task.take()]
        };

        for task in tasks.into_iter().flatten() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Capture task failed");
            }
        }
    }

    /// Current status for the control surface
    pub async fn status(&self) -> StreamStatus {
        let active = self.is_active().await;

        StreamStatus {
            active,
            video: self.channel_status(StreamChannel::Video).await,
            audio: self.channel_status(StreamChannel::Audio).await,
        }
    }

    async fn channel_status(&self, channel: StreamChannel) -> ChannelStatus {
        ChannelStatus {
            subscribers: self.registry.subscriber_count(channel).await,
            pipeline: self.stats(channel).snapshot(),
        }
    }
}
