//! Capture supervisor
//!
//! Runs one capture session for one channel: spawns the tool, pumps its
//! output through the channel's splitter into the registry and tears the
//! process down when the stream is stopped or the output fails.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::CaptureError;
use crate::media::{MediaSplitter, MjpegDemuxer, PcmChunker};
use crate::registry::{BroadcastFrame, StreamChannel, SubscriberRegistry};
use crate::stats::PipelineStats;

use super::config::{CaptureCommand, CaptureConfig};
use super::session::CaptureSession;

/// Supervises a single capture session
pub struct CaptureSupervisor {
    channel: StreamChannel,
    command: CaptureCommand,
    splitter: Box<dyn MediaSplitter>,
    registry: Arc<SubscriberRegistry>,
    stats: Arc<PipelineStats>,
}

impl CaptureSupervisor {
    /// Create a supervisor for `channel` using the matching command and splitter
    pub fn new(
        channel: StreamChannel,
        config: &CaptureConfig,
        registry: Arc<SubscriberRegistry>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        let command = config.command(channel).clone();
        let splitter: Box<dyn MediaSplitter> = match channel {
            StreamChannel::Video => {
                Box::new(MjpegDemuxer::with_max_buffer(config.max_frame_buffer))
            }
            StreamChannel::Audio => Box::new(PcmChunker::with_chunk_size(command.read_size)),
        };

        Self {
            channel,
            command,
            splitter,
            registry,
            stats,
        }
    }

    /// Run the session until `active` turns false or the output fails
    ///
    /// The capture process is always killed and reaped before this returns.
    /// Errors are logged here; the return value is informational.
    pub async fn run(mut self, mut active: watch::Receiver<bool>) -> Result<(), CaptureError> {
        let channel = self.channel;
        tracing::info!(channel = %channel, program = %self.command.program, "Starting capture");

        let mut session = match CaptureSession::spawn(channel, &self.command) {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(channel = %channel, error = %e, "Failed to start capture");
                self.stats.on_spawn_failure();
                return Err(e);
            }
        };
        self.stats.on_session_start();

        let result = self.pump(&mut session, &mut active).await;

        session.shutdown().await;
        self.stats.on_session_end();

        match &result {
            Ok(()) => tracing::info!(channel = %channel, "Capture stopped"),
            Err(e) => {
                self.stats.on_read_failure();
                tracing::error!(channel = %channel, error = %e, "Capture read failed");
            }
        }

        result
    }

    async fn pump(
        &mut self,
        session: &mut CaptureSession,
        active: &mut watch::Receiver<bool>,
    ) -> Result<(), CaptureError> {
        let mut buf = vec![0u8; self.command.read_size];
        let mut sequence = 0u64;

        loop {
            let is_active = *active.borrow_and_update();
            if !is_active {
                return Ok(());
            }

            let n = tokio::select! {
                read = session.read(&mut buf) => read?,
                changed = active.changed() => {
                    if changed.is_err() {
                        // Controller gone
                        return Ok(());
                    }
                    continue;
                }
            };
            self.stats.on_read(n);

            let overflows_before = self.splitter.overflows();
            let units = self.splitter.split(&buf[..n]);
            let overflowed = self.splitter.overflows() - overflows_before;
            if overflowed > 0 {
                self.stats.on_overflow(overflowed);
            }

            for data in units {
                let frame = BroadcastFrame {
                    channel: self.channel,
                    sequence,
                    data,
                };
                sequence += 1;

                let outcome = self.registry.broadcast(&frame).await;
                self.stats.on_broadcast(outcome);
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use axum::extract::ws::Utf8Bytes;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use bytes::Bytes;

    use super::*;
    use crate::registry::subscriber::mock::MockSubscriber;
    use crate::registry::WireMessage;
    use crate::testing::eventually;

    fn sh(script: &str) -> CaptureCommand {
        CaptureCommand::new("sh").args(["-c", script])
    }

    fn supervisor(
        channel: StreamChannel,
        command: CaptureCommand,
        registry: &Arc<SubscriberRegistry>,
        stats: &Arc<PipelineStats>,
    ) -> CaptureSupervisor {
        let config = match channel {
            StreamChannel::Video => CaptureConfig::default().video(command),
            StreamChannel::Audio => CaptureConfig::default().audio(command),
        };
        CaptureSupervisor::new(channel, &config, Arc::clone(registry), Arc::clone(stats))
    }

    #[tokio::test]
    async fn test_video_frames_reach_subscribers() {
        let registry = Arc::new(SubscriberRegistry::new());
        let stats = Arc::new(PipelineStats::new());
        let viewer = Arc::new(MockSubscriber::new());
        registry.register(StreamChannel::Video, viewer.clone()).await;

        // Noise, one complete JPEG, then the tool keeps running
        let command = sh(r"printf '\001\377\330ab\377\331'; exec sleep 30");
        let supervisor = supervisor(StreamChannel::Video, command, &registry, &stats);

        let (tx, rx) = watch::channel(true);
        let handle = tokio::spawn(supervisor.run(rx));

        eventually(|| !viewer.received().is_empty()).await;
        let expected = STANDARD.encode([0xFF, 0xD8, b'a', b'b', 0xFF, 0xD9]);
        assert_eq!(viewer.received(), vec![WireMessage::Text(Utf8Bytes::from(expected))]);
        assert!(stats.is_running());

        // Stop while the read is blocked
        tx.send(false).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("supervisor did not stop")
            .unwrap();

        assert!(result.is_ok());
        assert!(!stats.is_running());
        assert_eq!(stats.units_broadcast(), 1);
        assert_eq!(stats.read_failures(), 0);
    }

    #[tokio::test]
    async fn test_audio_eof_ends_session() {
        let registry = Arc::new(SubscriberRegistry::new());
        let stats = Arc::new(PipelineStats::new());
        let listener = Arc::new(MockSubscriber::new());
        registry.register(StreamChannel::Audio, listener.clone()).await;

        let supervisor = supervisor(StreamChannel::Audio, sh("printf 'abcd'"), &registry, &stats);
        let (_tx, rx) = watch::channel(true);

        let result = tokio::time::timeout(Duration::from_secs(5), supervisor.run(rx))
            .await
            .expect("supervisor did not finish");

        assert!(matches!(result, Err(CaptureError::Eof)));
        assert_eq!(
            listener.received(),
            vec![WireMessage::Binary(Bytes::from_static(b"abcd"))]
        );
        assert_eq!(stats.sessions_started(), 1);
        assert_eq!(stats.read_failures(), 1);
        assert!(!stats.is_running());
    }

    #[tokio::test]
    async fn test_heavy_stderr_does_not_stall_capture() {
        let registry = Arc::new(SubscriberRegistry::new());
        let stats = Arc::new(PipelineStats::new());
        let listener = Arc::new(MockSubscriber::new());
        registry.register(StreamChannel::Audio, listener.clone()).await;

        // Far more stderr than a pipe buffers before the tool writes stdout
        let command = sh("yes xxxxxxxxxxxxxxx | head -c 1048576 >&2; printf done");
        let supervisor = supervisor(StreamChannel::Audio, command, &registry, &stats);
        let (_tx, rx) = watch::channel(true);

        let result = tokio::time::timeout(Duration::from_secs(10), supervisor.run(rx))
            .await
            .expect("capture stalled on stderr");

        assert!(matches!(result, Err(CaptureError::Eof)));
        assert_eq!(
            listener.received(),
            vec![WireMessage::Binary(Bytes::from_static(b"done"))]
        );
    }

    #[tokio::test]
    async fn test_spawn_failure_is_terminal() {
        let registry = Arc::new(SubscriberRegistry::new());
        let stats = Arc::new(PipelineStats::new());
        let command = CaptureCommand::new("/nonexistent/camcast-capture-tool");

        let supervisor = supervisor(StreamChannel::Video, command, &registry, &stats);
        let (_tx, rx) = watch::channel(true);

        let result = supervisor.run(rx).await;

        assert!(matches!(result, Err(CaptureError::Spawn { .. })));
        assert_eq!(stats.spawn_failures(), 1);
        assert_eq!(stats.sessions_started(), 0);
    }

    #[tokio::test]
    async fn test_inactive_from_start() {
        let registry = Arc::new(SubscriberRegistry::new());
        let stats = Arc::new(PipelineStats::new());

        let supervisor = supervisor(StreamChannel::Audio, sh("exec sleep 30"), &registry, &stats);
        let (_tx, rx) = watch::channel(false);

        let result = tokio::time::timeout(Duration::from_secs(5), supervisor.run(rx))
            .await
            .expect("supervisor did not finish");

        assert!(result.is_ok());
        assert!(!stats.is_running());
    }

    #[tokio::test]
    async fn test_dropped_controller_stops_session() {
        let registry = Arc::new(SubscriberRegistry::new());
        let stats = Arc::new(PipelineStats::new());

        let supervisor = supervisor(StreamChannel::Audio, sh("exec sleep 30"), &registry, &stats);
        let (tx, rx) = watch::channel(true);
        let handle = tokio::spawn(supervisor.run(rx));

        eventually(|| stats.is_running()).await;
        drop(tx);

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("supervisor did not stop")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_overflow_is_counted() {
        let registry = Arc::new(SubscriberRegistry::new());
        let stats = Arc::new(PipelineStats::new());

        // SOI followed by 64 bytes with no EOI against a 16 byte cap
        let command = sh(r"printf '\377\330'; head -c 64 /dev/zero; exec sleep 30");
        let config = CaptureConfig::default().video(command).max_frame_buffer(16);
        let supervisor =
            CaptureSupervisor::new(StreamChannel::Video, &config, registry, Arc::clone(&stats));

        let (tx, rx) = watch::channel(true);
        let handle = tokio::spawn(supervisor.run(rx));

        eventually(|| stats.buffer_overflows() > 0).await;
        assert_eq!(stats.units_broadcast(), 0);

        tx.send(false).unwrap();
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }
}
