// Shared transport configuration for building reqwest::Client instances.
//
// The robot link and any future HTTP surface build their clients through
// this module so timeout and user-agent settings stay in one place. The
// cell talks plain HTTP to LAN devices, so there is no TLS or cookie
// machinery here.

use std::time::Duration;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Config with a specific request timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent("cellway/0.1.0")
            .build()?;
        Ok(client)
    }
}
