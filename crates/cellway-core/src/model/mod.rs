// ── Domain model ──

pub mod dispatch;
pub mod wire;

pub use dispatch::{AgvStatus, DispatchCommand, StatusLevel, Trigger};
pub use wire::{
    AgvHistoryEntry, HistoryQuery, InspectionRecord, LoginRequest, LoginResponse, SaveAgvAction,
    SearchHistoryQuery, ZoneUpdate, events,
};
