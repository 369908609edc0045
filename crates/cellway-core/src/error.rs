// ── Core error types ──
//
// Operator-facing errors from cellway-core. Transport details stay in
// `cellway-api`; the `From` impl below translates edge errors into
// domain-appropriate variants. Most runtime failures in this crate are
// deliberately NOT errors: robot refusals are booleans, undecodable bus
// payloads are dropped, and unknown zones are logged — per the dispatch
// contract none of them may propagate as failures across components.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("event bus unavailable: {reason}")]
    BusUnavailable { reason: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("configuration error: {message}")]
    Config { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("unknown zone: {name}")]
    UnknownZone { name: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("internal error: {0}")]
    Internal(String),
}

// ── Conversion from edge errors ──────────────────────────────────────

impl From<cellway_api::Error> for CoreError {
    fn from(err: cellway_api::Error) -> Self {
        match err {
            cellway_api::Error::BusConnect(reason)
            | cellway_api::Error::BusClosed { reason } => CoreError::BusUnavailable { reason },
            cellway_api::Error::Encode { event, source } => {
                CoreError::Internal(format!("payload encoding failed for '{event}': {source}"))
            }
            cellway_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid URL: {e}"),
            },
            cellway_api::Error::Transport(e) => CoreError::Internal(e.to_string()),
        }
    }
}
