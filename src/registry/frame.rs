//! Broadcast frame types for channel routing
//!
//! This module defines the channel identifiers, the units produced by the
//! capture pipelines and the wire messages they are encoded into.

use axum::extract::ws::Utf8Bytes;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::Serialize;

/// One of the two independent media pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamChannel {
    /// MJPEG camera frames
    Video,
    /// Raw PCM microphone chunks
    Audio,
}

impl StreamChannel {
    /// Both channels, video first
    pub const ALL: [StreamChannel; 2] = [StreamChannel::Video, StreamChannel::Audio];

    /// Lowercase channel name
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamChannel::Video => "video",
            StreamChannel::Audio => "audio",
        }
    }
}

impl std::fmt::Display for StreamChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit to be broadcast to the subscribers of one channel
///
/// Cheap to clone due to `Bytes` reference counting.
#[derive(Debug, Clone)]
pub struct BroadcastFrame {
    /// Channel the unit belongs to
    pub channel: StreamChannel,
    /// Position in the channel's output, starting at 0 for each session
    pub sequence: u64,
    /// JPEG image or PCM chunk
    pub data: Bytes,
}

impl BroadcastFrame {
    /// Create a video frame (one complete JPEG image)
    pub fn video(sequence: u64, data: Bytes) -> Self {
        Self {
            channel: StreamChannel::Video,
            sequence,
            data,
        }
    }

    /// Create an audio chunk
    pub fn audio(sequence: u64, data: Bytes) -> Self {
        Self {
            channel: StreamChannel::Audio,
            sequence,
            data,
        }
    }

    /// Encode for delivery
    ///
    /// Video goes out as base64 text, audio as raw binary.
    pub fn encode(&self) -> WireMessage {
        match self.channel {
            StreamChannel::Video => WireMessage::Text(Utf8Bytes::from(STANDARD.encode(&self.data))),
            StreamChannel::Audio => WireMessage::Binary(self.data.clone()),
        }
    }
}

/// A message as handed to a subscriber
///
/// Both payloads are reference counted, so cloning one per subscriber never
/// copies the encoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    /// Text message (base64 JPEG)
    Text(Utf8Bytes),
    /// Binary message (PCM)
    Binary(Bytes),
}

impl WireMessage {
    /// Payload length in bytes
    pub fn len(&self) -> usize {
        match self {
            WireMessage::Text(s) => s.as_str().len(),
            WireMessage::Binary(b) => b.len(),
        }
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
