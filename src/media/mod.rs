//! Media transforms for capture output
//!
//! This module provides:
//! - MJPEG demuxing (byte stream to JPEG frames)
//! - Raw PCM chunking (byte stream to audio chunks)
//!
//! Both are pure: they do no I/O and hold no locks.

pub mod mjpeg;
pub mod pcm;

pub use mjpeg::MjpegDemuxer;
pub use pcm::PcmChunker;

use bytes::Bytes;

/// Turns raw capture reads into discrete broadcast units
pub trait MediaSplitter: Send {
    /// Feed one read and return the units it completes, in stream order
    fn split(&mut self, data: &[u8]) -> Vec<Bytes>;

    /// Number of times buffered data had to be discarded
    fn overflows(&self) -> u64 {
        0
    }
}
