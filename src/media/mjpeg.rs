//! MJPEG stream demuxer
//!
//! Capture tools writing `--codec mjpeg` to stdout produce a bare concatenation
//! of JPEG images with no container around them. The demuxer recovers the
//! individual images by scanning for the Start-of-Image (`FF D8`) and
//! End-of-Image (`FF D9`) markers:
//!
//! ```text
//!   noise  ┌──────── frame ────────┐ ┌── partial ──
//!   .. .. FF D8 .. .. .. .. .. FF D9 FF D8 .. .. ..
//!         ^ SOI                  ^ EOI
//! ```
//!
//! Every complete frame in the buffer is emitted on each update. Bytes in
//! front of an SOI are dropped together with the frame they precede.

use bytes::{Buf, Bytes, BytesMut};

use super::MediaSplitter;

/// JPEG Start-of-Image marker
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// JPEG End-of-Image marker
pub const EOI: [u8; 2] = [0xFF, 0xD9];

/// Default accumulation buffer cap (2 MiB)
pub const DEFAULT_MAX_BUFFER: usize = 2 * 1024 * 1024;

/// Splits a continuous MJPEG byte stream into JPEG frames
#[derive(Debug)]
pub struct MjpegDemuxer {
    /// Bytes received but not yet part of an emitted frame
    buffer: BytesMut,
    /// High-water mark for `buffer`
    max_buffer: usize,
    /// Times the buffer was discarded for exceeding `max_buffer`
    overflows: u64,
    /// Offset of the SOI that opens the pending frame
    soi: Option<usize>,
    /// Offset where the next marker search resumes
    scan_from: usize,
}

impl MjpegDemuxer {
    /// Create a demuxer with the default 2 MiB buffer cap
    pub fn new() -> Self {
        Self::with_max_buffer(DEFAULT_MAX_BUFFER)
    }

    /// Create a demuxer with a custom buffer cap
    pub fn with_max_buffer(max_buffer: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_buffer,
            overflows: 0,
            soi: None,
            scan_from: 0,
        }
    }

    /// Append `data` and return every complete frame now available
    pub fn push(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some((start, end)) = self.next_frame() {
            // Drop the noise in front of the SOI, then take the frame itself
            self.buffer.advance(start);
            frames.push(self.buffer.split_to(end - start).freeze());
            self.soi = None;
            self.scan_from = 0;
        }

        if self.buffer.len() > self.max_buffer {
            tracing::warn!(
                buffered = self.buffer.len(),
                max = self.max_buffer,
                "MJPEG buffer overflow, discarding partial data"
            );
            self.reset();
            self.overflows += 1;
        }

        frames
    }

    /// Locate the first complete frame as `(soi_offset, end_exclusive)`
    ///
    /// Bytes already searched on earlier updates are not scanned again. The
    /// search resumes one byte early so a marker split across two reads is
    /// still found.
    fn next_frame(&mut self) -> Option<(usize, usize)> {
        let start = match self.soi {
            Some(start) => start,
            None => match find_marker(&self.buffer[self.scan_from..], SOI) {
                Some(offset) => {
                    let start = self.scan_from + offset;
                    self.soi = Some(start);
                    self.scan_from = start + SOI.len();
                    start
                }
                None => {
                    self.scan_from = self.buffer.len().saturating_sub(1);
                    return None;
                }
            },
        };

        match find_marker(&self.buffer[self.scan_from..], EOI) {
            Some(offset) => Some((start, self.scan_from + offset + EOI.len())),
            None => {
                // Never resume inside the SOI itself
                self.scan_from = self
                    .buffer
                    .len()
                    .saturating_sub(1)
                    .max(start + SOI.len());
                None
            }
        }
    }

    /// Bytes waiting for more data
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of buffer discards so far
    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    /// Drop any buffered data
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.soi = None;
        self.scan_from = 0;
    }
}

impl Default for MjpegDemuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaSplitter for MjpegDemuxer {
    fn split(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.push(data)
    }

    fn overflows(&self) -> u64 {
        self.overflows
    }
}

fn find_marker(data: &[u8], marker: [u8; 2]) -> Option<usize> {
    data.windows(2).position(|w| w == marker)
}
