// ── Dispatch domain types ──

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// What caused a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A zone crossed its capacity.
    Auto,
    /// An operator pressed the call button.
    Manual,
}

impl Trigger {
    /// History-record action text, matching what the backend stores.
    pub fn action_label(self) -> &'static str {
        match self {
            Self::Auto => "auto-recall request (full)",
            Self::Manual => "manual dispatch request",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }
}

/// One robot command, alive only for the duration of the call.
///
/// Never persisted as an entity — the history record carries its outcome.
#[derive(Debug, Clone)]
pub struct DispatchCommand {
    pub zone: String,
    pub command_id: Uuid,
    pub trigger: Trigger,
    pub issued_at: DateTime<Utc>,
}

impl DispatchCommand {
    pub fn new(zone: impl Into<String>, trigger: Trigger) -> Self {
        Self {
            zone: zone.into(),
            command_id: Uuid::new_v4(),
            trigger,
            issued_at: Utc::now(),
        }
    }

    /// The wire token the robot understands, e.g. `taskA`.
    pub fn token(&self) -> String {
        format!("task{}", self.zone)
    }
}

/// Severity of the AGV status indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusLevel {
    #[default]
    Normal,
    Warning,
    Error,
}

/// Operator-visible AGV status, published through a `watch` channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgvStatus {
    pub level: StatusLevel,
    /// Link state line, e.g. `"online (idle)"`, `"calling AGV..."`.
    pub connection: String,
    /// Current action line, e.g. `"heading to zone A (auto)"`.
    pub activity: String,
}

impl Default for AgvStatus {
    fn default() -> Self {
        Self {
            level: StatusLevel::Normal,
            connection: "standing by".into(),
            activity: "IDLE".into(),
        }
    }
}
