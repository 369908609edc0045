// ── Runtime cell configuration ──
//
// These types describe the cell a Coordinator manages: where the bus and
// robot live, which storage zones exist, and the bounds on local caches.
// They carry data only and never touch disk — `cellway-config` loads
// files/env and hands a finished `CellConfig` in (no settings singleton
// anywhere in the core).

use std::time::Duration;

use url::Url;

/// One physical storage zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSpec {
    /// Zone name as it appears in occupancy events and robot commands.
    pub name: String,
    /// Pallet capacity; the zone counts as full at or above this.
    pub capacity: u32,
}

impl ZoneSpec {
    pub fn new(name: impl Into<String>, capacity: u32) -> Self {
        Self {
            name: name.into(),
            capacity,
        }
    }
}

/// Configuration for one cell, passed into [`Coordinator::new`].
///
/// [`Coordinator::new`]: crate::coordinator::Coordinator::new
#[derive(Debug, Clone)]
pub struct CellConfig {
    /// Event-bus endpoint of the cell backend.
    pub bus_url: Url,
    /// Robot `host[:port]`; `None` disables all robot operations.
    pub robot_address: Option<String>,
    /// Per-call robot timeout.
    pub robot_timeout: Duration,
    /// Storage zones of this cell.
    pub zones: Vec<ZoneSpec>,
    /// Bound on the in-memory dispatch-history cache.
    pub history_limit: usize,
    /// Bound on the raw operator journal.
    pub journal_raw_limit: usize,
    /// Bound on filtered journal views.
    pub journal_view_limit: usize,
    /// Capture device indexes of the station cameras.
    pub camera_indexes: Vec<u32>,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            bus_url: "ws://127.0.0.1:5000/ws"
                .parse()
                .expect("static default URL is valid"),
            robot_address: None,
            robot_timeout: Duration::from_millis(1500),
            zones: ["A", "B", "C", "D"]
                .into_iter()
                .map(|name| ZoneSpec::new(name, 4))
                .collect(),
            history_limit: 500,
            journal_raw_limit: 1000,
            journal_view_limit: 500,
            camera_indexes: vec![0, 1, 2],
        }
    }
}
