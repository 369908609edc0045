//! Coordination layer between the network edge (`cellway-api`) and the
//! cell's presentation consumers.
//!
//! This crate owns the domain state and dispatch logic of one shop-floor
//! cell:
//!
//! - **[`Coordinator`]** — Central facade: consumes zone-occupancy events
//!   from the bus, applies the full-zone policy (one dispatch per
//!   Normal→Full rising edge), commands the robot through
//!   [`cellway_api::RobotLink`], and publishes status/zone/history changes
//!   through `watch` channels.
//!
//! - **[`HistoryCache`]** — Bounded most-recent-first view of the dispatch
//!   audit trail; the authoritative copy lives in the backend store and
//!   replaces the cache on reload.
//!
//! - **[`Journal`]** — Bounded operator journal (device/level/message),
//!   mirrored to `tracing`; a pure side channel that never feeds back into
//!   zone state.
//!
//! - **Domain model** ([`model`]) — Typed wire payloads for the bus
//!   surface plus dispatch types ([`Trigger`], [`AgvStatus`], ...).
//!
//! Everything is constructed from an explicit [`CellConfig`]; the core
//! reads neither disk nor environment.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod history;
pub mod journal;
pub mod model;
pub mod zone;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{CellConfig, ZoneSpec};
pub use coordinator::Coordinator;
pub use error::CoreError;
pub use history::{HistoryCache, HistoryRecord, Outcome};
pub use journal::{Device, Journal, JournalEntry, JournalFilter, Level};
pub use model::{
    AgvHistoryEntry, AgvStatus, DispatchCommand, HistoryQuery, InspectionRecord, LoginRequest,
    LoginResponse, SaveAgvAction, SearchHistoryQuery, StatusLevel, Trigger, ZoneUpdate,
};
pub use zone::{ZoneSnapshot, ZoneState};
