//! Error types for camcast
//!
//! Errors are grouped by the component that produces them. None of them reach
//! the control surface: the capture supervisors and the broadcaster log them
//! and take local corrective action.

use std::fmt;
use std::io;

use crate::registry::StreamChannel;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// I/O error (bind, accept, serve)
    Io(io::Error),
    /// Capture process error
    Capture(CaptureError),
    /// Subscriber delivery error
    Delivery(DeliveryError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Capture(e) => write!(f, "Capture error: {}", e),
            Error::Delivery(e) => write!(f, "Delivery error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Capture(e) => Some(e),
            Error::Delivery(e) => Some(e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<CaptureError> for Error {
    fn from(e: CaptureError) -> Self {
        Error::Capture(e)
    }
}

impl From<DeliveryError> for Error {
    fn from(e: DeliveryError) -> Self {
        Error::Delivery(e)
    }
}

/// Errors raised while running a capture process
#[derive(Debug)]
pub enum CaptureError {
    /// The capture tool could not be started (missing, not executable)
    Spawn {
        program: String,
        source: io::Error,
    },
    /// A stdio pipe of the spawned process was not available
    Pipe {
        channel: StreamChannel,
        stream: &'static str,
    },
    /// Reading the capture output failed
    Read(io::Error),
    /// The capture process closed its output
    Eof,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Spawn { program, source } => {
                write!(f, "failed to spawn {}: {}", program, source)
            }
            CaptureError::Pipe { channel, stream } => {
                write!(f, "no {} pipe for {} capture", stream, channel)
            }
            CaptureError::Read(e) => write!(f, "read failed: {}", e),
            CaptureError::Eof => write!(f, "capture output closed"),
        }
    }
}

impl std::error::Error for CaptureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaptureError::Spawn { source, .. } => Some(source),
            CaptureError::Read(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors raised while sending to a single subscriber
#[derive(Debug, Clone)]
pub enum DeliveryError {
    /// Peer already closed the connection
    Closed,
    /// Send did not complete within the configured timeout
    Timeout,
    /// Transport-level failure
    Transport(String),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Closed => write!(f, "subscriber closed"),
            DeliveryError::Timeout => write!(f, "send timed out"),
            DeliveryError::Transport(msg) => write!(f, "transport error: {}", msg),
        }
    }
}

impl std::error::Error for DeliveryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_error_display() {
        let err = CaptureError::Spawn {
            program: "libcamera-vid".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.to_string(), "failed to spawn libcamera-vid: not found");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_pipe_error_display() {
        let err = CaptureError::Pipe {
            channel: StreamChannel::Audio,
            stream: "stdout",
        };
        assert_eq!(err.to_string(), "no stdout pipe for audio capture");
    }

    #[test]
    fn test_error_conversions() {
        let err: Error = DeliveryError::Timeout.into();
        assert!(matches!(err, Error::Delivery(DeliveryError::Timeout)));

        let err: Error = CaptureError::Eof.into();
        assert_eq!(err.to_string(), "Capture error: capture output closed");

        let err: Error = io::Error::new(io::ErrorKind::AddrInUse, "in use").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
