//! Raw PCM audio chunker
//!
//! Audio is captured as signed 16-bit little-endian mono samples at 44.1 kHz
//! and forwarded as-is. Each read becomes one chunk; no reframing, resampling
//! or sample alignment is attempted.

use bytes::Bytes;

use super::MediaSplitter;

/// Default chunk size in bytes (~46 ms of 44.1 kHz S16LE mono)
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// PCM sample rate produced by the capture tool
pub const SAMPLE_RATE: u32 = 44_100;

/// Number of interleaved channels
pub const CHANNELS: u16 = 1;

/// Bytes per sample (S16LE)
pub const BYTES_PER_SAMPLE: usize = 2;

/// Pass-through chunker for raw PCM reads
#[derive(Debug, Clone)]
pub struct PcmChunker {
    max_chunk: usize,
}

impl PcmChunker {
    /// Create a chunker with the default 4096-byte cap
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Create a chunker with a custom cap (minimum 1 byte)
    pub fn with_chunk_size(max_chunk: usize) -> Self {
        Self {
            max_chunk: max_chunk.max(1),
        }
    }

    /// Maximum chunk size
    pub fn chunk_size(&self) -> usize {
        self.max_chunk
    }

    /// Turn one read into chunks
    ///
    /// A read no larger than the cap yields exactly one chunk; empty reads
    /// yield none.
    pub fn push(&self, data: &[u8]) -> Vec<Bytes> {
        data.chunks(self.max_chunk)
            .map(Bytes::copy_from_slice)
            .collect()
    }
}

impl Default for PcmChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaSplitter for PcmChunker {
    fn split(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.push(data)
    }
}

/// Playback duration of `len` bytes of capture output, in milliseconds
pub fn duration_ms(len: usize) -> f64 {
    let samples = len / (BYTES_PER_SAMPLE * CHANNELS as usize);
    samples as f64 * 1000.0 / SAMPLE_RATE as f64
}
