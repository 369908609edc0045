//! HTTP command link to the transport robot (AGV).
//!
//! The robot exposes a tiny HTTP surface on its LAN address: `GET /{command}`
//! executes a short command token (`taskA`, `stop`, ...) and `GET /` answers
//! a liveness probe. Every call is bounded by a fixed short timeout; timeout,
//! refusal, and non-2xx responses all collapse to `false` — the caller cannot
//! (and does not need to) distinguish them. Retry policy, if any, belongs to
//! the coordinator.

use std::time::Duration;

use tracing::debug;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Default per-call timeout. The robot answers from firmware on a LAN;
/// anything slower than this is as good as unreachable.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(1500);

/// Timeout-bounded command channel to the AGV.
///
/// Construct once and share; the inner `reqwest::Client` pools connections.
/// An unset address disables the link: every operation returns `false`
/// without touching the network.
#[derive(Debug, Clone)]
pub struct RobotLink {
    http: reqwest::Client,
    address: Option<String>,
}

impl RobotLink {
    /// Create a link to the robot at `address` (`host[:port]`).
    ///
    /// `None` or an empty string leaves the link disabled.
    pub fn new(address: Option<String>, timeout: Duration) -> Result<Self, Error> {
        let http = TransportConfig::with_timeout(timeout).build_client()?;
        let address = address.filter(|a| !a.trim().is_empty());
        Ok(Self { http, address })
    }

    /// Create a link with the default ~1.5 s command timeout.
    pub fn with_default_timeout(address: Option<String>) -> Result<Self, Error> {
        Self::new(address, DEFAULT_COMMAND_TIMEOUT)
    }

    /// The configured robot address, if any.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Whether an address is configured.
    pub fn is_configured(&self) -> bool {
        self.address.is_some()
    }

    /// Send a command token to the robot.
    ///
    /// `true` iff a 2xx response arrived within the timeout. Transport
    /// errors are logged at debug and reported as `false`.
    pub async fn send_command(&self, command: &str) -> bool {
        let Some(address) = &self.address else {
            debug!(command, "robot address not configured, command skipped");
            return false;
        };

        let url = format!("http://{address}/{command}");
        match self.http.get(&url).send().await {
            Ok(response) => {
                let ok = response.status().is_success();
                if !ok {
                    debug!(command, status = %response.status(), "robot rejected command");
                }
                ok
            }
            Err(e) => {
                debug!(command, error = %e, "robot command failed");
                false
            }
        }
    }

    /// Probe the robot's liveness endpoint (`GET /`).
    pub async fn check_connection(&self) -> bool {
        let Some(address) = &self.address else {
            return false;
        };

        let url = format!("http://{address}/");
        match self.http.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "robot liveness probe failed");
                false
            }
        }
    }
}
