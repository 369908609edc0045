//! Typed payloads for the event-bus surface.
//!
//! Every event the backend understands has a named shape here; the
//! stringly-typed decoding of the source system is replaced by serde
//! structs that fail closed — an envelope that doesn't decode is dropped
//! at the bus layer, never delivered half-typed.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bus event names, outgoing and incoming.
pub mod events {
    pub const SAVE_AGV_ACTION: &str = "save_agv_action";
    pub const GET_AGV_HISTORY: &str = "get_agv_history";
    pub const AGV_HISTORY_RESPONSE: &str = "agv_history_response";
    pub const SEARCH_HISTORY: &str = "search_history";
    pub const SEARCH_HISTORY_RESPONSE: &str = "search_history_response";
    pub const LOGIN_REQUEST: &str = "login_request";
    pub const LOGIN_RESPONSE: &str = "login_response";
    pub const PALETTE_UPDATE: &str = "palette_update";
}

// ── Outgoing ────────────────────────────────────────────────────────

/// `save_agv_action` — persist one dispatch action to the backend store.
#[derive(Debug, Clone, Serialize)]
pub struct SaveAgvAction {
    pub zone: String,
    pub action: String,
}

/// `get_agv_history` — request the stored dispatch history.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HistoryQuery {}

/// `search_history` — inspection-record search filter.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchHistoryQuery {
    /// `YYYY-MM-DD`, or `None` for any date.
    pub date: Option<String>,
    pub qr_code: Option<String>,
    pub status: Option<String>,
}

/// `login_request` — credentials check against the backend.
///
/// The backend expects the source system's PascalCase keys.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// ── Incoming ────────────────────────────────────────────────────────

/// One row of `agv_history_response`.
#[derive(Debug, Clone, Deserialize)]
pub struct AgvHistoryEntry {
    pub timestamp: String,
    pub zone: String,
    pub action: String,
}

impl AgvHistoryEntry {
    /// Parse the backend's timestamp, tolerating both RFC 3339 and the
    /// plain `YYYY-MM-DD HH:MM:SS` the store writes. Unparseable stamps
    /// fall back to "now" rather than dropping the row.
    pub fn parsed_timestamp(&self) -> DateTime<Utc> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(&self.timestamp) {
            return ts.with_timezone(&Utc);
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%d %H:%M:%S") {
            return naive.and_utc();
        }
        Utc::now()
    }
}

/// One row of `search_history_response`.
#[derive(Debug, Clone, Deserialize)]
pub struct InspectionRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub timestamp: String,
    pub qr_code: String,
    pub result: String,
    pub zone: String,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

/// `login_response`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
}

/// `palette_update` — the zone-occupancy feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ZoneUpdate {
    pub zone: String,
    pub count: u32,
}
