use thiserror::Error;

/// Top-level error type for the `cellway-api` crate.
///
/// Covers the network edge: event-bus connection lifecycle, payload
/// encoding, and the HTTP transport shared by the robot link.
/// `cellway-core` maps these into operator-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Event bus ───────────────────────────────────────────────────
    /// WebSocket handshake with the backend failed.
    #[error("event bus connection failed: {0}")]
    BusConnect(String),

    /// The bus connection dropped unexpectedly.
    #[error("event bus closed: {reason}")]
    BusClosed { reason: String },

    /// An outgoing payload could not be serialized into the envelope.
    #[error("payload encoding failed for '{event}': {source}")]
    Encode {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::BusConnect(_) | Self::BusClosed { .. } => true,
            _ => false,
        }
    }
}
