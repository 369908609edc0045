//! Operator journal.
//!
//! Every notable device event (dispatch results, link probes, camera
//! trouble) lands here for operator visibility. The journal is a pure
//! side channel: it never feeds back into zone state. Entries go to a
//! bounded most-recent-first store AND through `tracing` at the matching
//! level, so structured logs and the on-screen journal always agree.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, NaiveDate, Utc};

/// Severity of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Warning => write!(f, "Warning"),
            Self::Error => write!(f, "Error"),
        }
    }
}

/// Which part of the cell produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Camera,
    Agv,
    Server,
    System,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera => write!(f, "Camera"),
            Self::Agv => write!(f, "AGV"),
            Self::Server => write!(f, "Server"),
            Self::System => write!(f, "System"),
        }
    }
}

/// One journal row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub device: Device,
    pub level: Level,
    pub message: String,
}

/// Filter for journal queries. `None` fields match everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct JournalFilter {
    pub date: Option<NaiveDate>,
    pub level: Option<Level>,
    pub device: Option<Device>,
}

impl JournalFilter {
    fn matches(&self, entry: &JournalEntry) -> bool {
        if let Some(date) = self.date {
            if entry.timestamp.date_naive() != date {
                return false;
            }
        }
        if let Some(level) = self.level {
            if entry.level != level {
                return false;
            }
        }
        if let Some(device) = self.device {
            if entry.device != device {
                return false;
            }
        }
        true
    }
}

/// Bounded most-recent-first journal store.
///
/// The raw store keeps up to `raw_limit` entries (default 1000); any
/// filtered view is additionally capped at `view_limit` (default 500).
pub struct Journal {
    entries: RwLock<VecDeque<JournalEntry>>,
    raw_limit: usize,
    view_limit: usize,
}

impl Journal {
    pub fn new(raw_limit: usize, view_limit: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            raw_limit: raw_limit.max(1),
            view_limit: view_limit.max(1),
        }
    }

    /// Append an entry and mirror it to `tracing`.
    pub fn append(&self, device: Device, level: Level, message: impl Into<String>) {
        let message = message.into();

        match level {
            Level::Info => tracing::info!(device = %device, "{message}"),
            Level::Warning => tracing::warn!(device = %device, "{message}"),
            Level::Error => tracing::error!(device = %device, "{message}"),
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.push_front(JournalEntry {
            timestamp: Utc::now(),
            device,
            level,
            message,
        });
        entries.truncate(self.raw_limit);
    }

    /// The newest `n` entries (capped at the view bound).
    pub fn latest(&self, n: usize) -> Vec<JournalEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .take(n.min(self.view_limit))
            .cloned()
            .collect()
    }

    /// Entries matching `filter`, newest first, capped at the view bound.
    pub fn search(&self, filter: &JournalFilter) -> Vec<JournalEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| filter.matches(e))
            .take(self.view_limit)
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
}

impl Default for Journal {
    fn default() -> Self {
        Self::new(1000, 500)
    }
}
