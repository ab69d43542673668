//! Registry configuration

use std::time::Duration;

/// Configuration for the subscriber registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum time a single subscriber send may take before the
    /// subscriber is treated as failed
    pub send_timeout: Duration,

    /// Maximum time spent closing a pruned subscriber
    pub close_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(5),
            close_timeout: Duration::from_secs(1),
        }
    }
}

impl RegistryConfig {
    /// Set the per-subscriber send timeout
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Set the close timeout
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.send_timeout, Duration::from_secs(5));
        assert_eq!(config.close_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_builder_chaining() {
        let config = RegistryConfig::default()
            .send_timeout(Duration::from_millis(250))
            .close_timeout(Duration::from_millis(50));

        assert_eq!(config.send_timeout, Duration::from_millis(250));
        assert_eq!(config.close_timeout, Duration::from_millis(50));
    }
}
