//! Dispatch history cache.
//!
//! The authoritative dispatch history lives in the backend store, reached
//! only through `save_agv_action` / `agv_history_response` events. This
//! cache keeps a bounded, most-recent-first copy for display before the
//! backend answers; it is replaced wholesale when an authoritative reload
//! arrives, so it is only ever best-effort consistent.

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::AgvHistoryEntry;

/// What became of a recorded dispatch action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Recorded locally, robot call still in flight.
    Pending,
    /// The robot acknowledged the command.
    Sent,
    /// The robot call failed or timed out.
    Failed,
    /// Loaded back from the backend store.
    Archived,
}

/// One dispatch-history row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub zone: String,
    pub action: String,
    pub outcome: Outcome,
}

impl HistoryRecord {
    pub fn new(zone: impl Into<String>, action: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            timestamp: Utc::now(),
            zone: zone.into(),
            action: action.into(),
            outcome,
        }
    }
}

impl From<AgvHistoryEntry> for HistoryRecord {
    fn from(entry: AgvHistoryEntry) -> Self {
        Self {
            timestamp: entry.parsed_timestamp(),
            zone: entry.zone,
            action: entry.action,
            outcome: Outcome::Archived,
        }
    }
}

/// Bounded most-recent-first cache of [`HistoryRecord`]s.
///
/// Sync accessors on purpose: the bus receive task calls
/// [`replace_all`](Self::replace_all) from handler context. A version
/// watch lets observers re-render on change without polling.
pub struct HistoryCache {
    entries: RwLock<VecDeque<HistoryRecord>>,
    limit: usize,
    version: watch::Sender<u64>,
}

impl HistoryCache {
    pub fn new(limit: usize) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            entries: RwLock::new(VecDeque::new()),
            limit: limit.max(1),
            version,
        }
    }

    /// Prepend a record, truncating to the configured bound.
    pub fn record(&self, record: HistoryRecord) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.push_front(record);
        entries.truncate(self.limit);
        drop(entries);
        self.bump();
    }

    /// Set the outcome of the newest record for `zone`, if one exists.
    pub fn resolve_latest(&self, zone: &str, outcome: Outcome) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.iter_mut().find(|e| e.zone == zone) {
            entry.outcome = outcome;
        }
        drop(entries);
        self.bump();
    }

    /// Replace the whole cache with an authoritative backend reload.
    ///
    /// The reload arrives newest-first from the store; it is truncated to
    /// the same bound as locally recorded entries.
    pub fn replace_all(&self, records: Vec<HistoryRecord>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        *entries = records.into_iter().take(self.limit).collect();
        drop(entries);
        self.bump();
    }

    /// Most-recent-first copy of the cache.
    pub fn snapshot(&self) -> Vec<HistoryRecord> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Observe cache changes (the value is a bumping version counter).
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}
