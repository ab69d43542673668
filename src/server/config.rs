//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::capture::CaptureConfig;
use crate::registry::RegistryConfig;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent viewer connections across both channels (0 = unlimited)
    pub max_connections: usize,

    /// Capture tool configuration
    pub capture: CaptureConfig,

    /// Subscriber registry configuration
    pub registry: RegistryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 0, // Unlimited
            capture: CaptureConfig::default(),
            registry: RegistryConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum viewer connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the capture configuration
    pub fn capture(mut self, capture: CaptureConfig) -> Self {
        self.capture = capture;
        self
    }

    /// Set the per-subscriber send timeout
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.registry = self.registry.send_timeout(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureCommand;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_connections, 0);
        assert_eq!(config.capture.video.program, "libcamera-vid");
        assert_eq!(config.registry.send_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 9000);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:8081".parse().unwrap();
        let capture = CaptureConfig::default().audio(CaptureCommand::arecord_pcm("hw:1,0"));
        let config = ServerConfig::default()
            .bind(addr)
            .max_connections(8)
            .capture(capture)
            .send_timeout(Duration::from_millis(500));

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_connections, 8);
        assert!(config.capture.audio.args.contains(&"hw:1,0".to_string()));
        assert_eq!(config.registry.send_timeout, Duration::from_millis(500));
    }
}
