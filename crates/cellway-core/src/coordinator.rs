//! Zone-dispatch coordination.
//!
//! The [`Coordinator`] owns the occupancy state of every storage zone,
//! consumes zone-update events from the bus, applies the full-zone policy,
//! commands the robot, and persists an audit record for every dispatch.
//! Consumers (the UI layer) observe it exclusively through `watch`
//! subscriptions and snapshots.
//!
//! Dispatch policy: each zone is a two-state machine, `Normal ⇄ Full`.
//! An update that carries the count from below capacity to at-or-above is
//! a rising edge and fires exactly one dispatch; further updates at or
//! above capacity do nothing until the count drops below capacity again.
//! Manual dispatches bypass the state machine entirely.
//!
//! Per-zone mutation is serialized by holding that zone's async lock
//! through both the decision and the robot call, so two updates for the
//! same zone cannot race into an inconsistent Full/Normal decision;
//! updates for different zones proceed concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use cellway_api::{BusClient, RobotLink};

use crate::config::CellConfig;
use crate::error::CoreError;
use crate::history::{HistoryCache, HistoryRecord, Outcome};
use crate::journal::{Device, Journal, Level};
use crate::model::wire::{AgvHistoryEntry, HistoryQuery, SaveAgvAction, ZoneUpdate, events};
use crate::model::{AgvStatus, DispatchCommand, StatusLevel, Trigger};
use crate::zone::{ZoneSnapshot, ZoneState};

// ── Coordinator ──────────────────────────────────────────────────────

/// The cell's dispatch coordinator.
///
/// Cheaply cloneable via an inner `Arc`. Construct with explicit
/// dependencies ([`RobotLink`], [`BusClient`], [`Journal`]) — there is no
/// global settings or logging state anywhere in the core.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    robot: RobotLink,
    bus: BusClient,
    journal: Arc<Journal>,
    history: HistoryCache,
    zones: HashMap<String, Arc<Mutex<ZoneState>>>,
    zone_watch: watch::Sender<Vec<ZoneSnapshot>>,
    status: watch::Sender<AgvStatus>,
    tasks: TaskTracker,
}

impl Coordinator {
    /// Build a coordinator for the cell described by `config`.
    ///
    /// Registers the bus subscriptions (occupancy feed, history reload)
    /// but does not connect — call [`connect`](Self::connect) or drive
    /// the bus lifecycle yourself and call [`start`](Self::start).
    pub fn new(
        config: &CellConfig,
        robot: RobotLink,
        bus: BusClient,
        journal: Arc<Journal>,
    ) -> Result<Self, CoreError> {
        if config.zones.is_empty() {
            return Err(CoreError::Config {
                message: "at least one zone is required".into(),
            });
        }

        let mut zones = HashMap::new();
        let mut snapshots = Vec::with_capacity(config.zones.len());
        for spec in &config.zones {
            let state = ZoneState::new(spec.name.clone(), spec.capacity);
            snapshots.push(state.snapshot());
            if zones
                .insert(spec.name.clone(), Arc::new(Mutex::new(state)))
                .is_some()
            {
                return Err(CoreError::Config {
                    message: format!("duplicate zone '{}'", spec.name),
                });
            }
        }

        let (zone_watch, _) = watch::channel(snapshots);
        let (status, _) = watch::channel(AgvStatus::default());

        let coordinator = Self {
            inner: Arc::new(CoordinatorInner {
                robot,
                bus,
                journal,
                history: HistoryCache::new(config.history_limit),
                zones,
                zone_watch,
                status,
                tasks: TaskTracker::new(),
            }),
        };
        coordinator.register_bus_handlers();
        Ok(coordinator)
    }

    /// Wire the bus subscriptions. Handlers hold a `Weak` so a dropped
    /// coordinator doesn't keep itself alive through the bus registry.
    fn register_bus_handlers(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.bus.subscribe(
            events::AGV_HISTORY_RESPONSE,
            move |entries: Vec<AgvHistoryEntry>| {
                if let Some(inner) = weak.upgrade() {
                    debug!(rows = entries.len(), "authoritative history reload arrived");
                    inner
                        .history
                        .replace_all(entries.into_iter().map(HistoryRecord::from).collect());
                }
            },
        );

        let weak = Arc::downgrade(&self.inner);
        self.inner
            .bus
            .subscribe(events::PALETTE_UPDATE, move |update: ZoneUpdate| {
                if let Some(inner) = weak.upgrade() {
                    // Handlers run on the bus receive task; move the
                    // update onto a tracked task so a slow robot call
                    // never stalls event delivery.
                    let coordinator = Coordinator {
                        inner: Arc::clone(&inner),
                    };
                    inner.tasks.spawn(async move {
                        coordinator.on_zone_update(&update.zone, update.count).await;
                    });
                }
            });
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Connect the bus, probe the robot, and request the stored history.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.inner.bus.connect().await?;
        self.start().await;
        Ok(())
    }

    /// Startup sequence: probe the robot link, publish the resulting
    /// status, then request the authoritative history reload. Tolerates a
    /// disconnected bus — the reload request is simply skipped.
    pub async fn start(&self) {
        self.inner
            .journal
            .append(Device::System, Level::Info, "checking AGV link");

        if self.inner.robot.check_connection().await {
            self.set_status(
                StatusLevel::Normal,
                Some("online (idle)"),
                Some("IDLE (awaiting commands)"),
            );
            self.inner
                .journal
                .append(Device::Agv, Level::Info, "AGV link established");
        } else {
            self.set_status(StatusLevel::Error, Some("offline"), Some("no device"));
            self.inner.journal.append(
                Device::Agv,
                Level::Error,
                "AGV link check failed (no response)",
            );
        }

        self.load_history().await;
    }

    /// Join in-flight dispatch tasks and close the bus connection.
    pub async fn shutdown(&self) {
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        self.inner.bus.disconnect().await;
        debug!("coordinator shut down");
    }

    // ── Occupancy handling ───────────────────────────────────────────

    /// Apply one occupancy update.
    ///
    /// On a Normal→Full rising edge this records the history entry,
    /// persists it, and dispatches the robot — at most once per edge.
    /// Updates for unknown zones are logged and dropped.
    pub async fn on_zone_update(&self, zone: &str, new_count: u32) {
        let Some(slot) = self.inner.zones.get(zone).cloned() else {
            warn!(zone, new_count, "occupancy update for unknown zone dropped");
            return;
        };

        // The lock is held through the decision AND the dispatch, so a
        // concurrent update for the same zone queues behind it.
        let mut state = slot.lock().await;
        let was_full = state.is_full();
        state.set_count(new_count);
        let rising = !was_full && state.is_full();
        self.publish_zone(state.snapshot());
        debug!(zone, new_count, rising, "zone occupancy updated");

        if rising {
            info!(zone, "zone reached capacity, dispatching robot");
            self.dispatch(zone, Trigger::Auto).await;
        }
    }

    /// Manually reset a zone's count to zero (arms the next rising edge).
    pub async fn reset_zone(&self, zone: &str) {
        self.on_zone_update(zone, 0).await;
    }

    // ── Dispatch operations ──────────────────────────────────────────

    /// Operator-requested dispatch. Same record/command/status flow as
    /// the automatic path, tagged manual; independent of zone state and
    /// of any in-flight automatic dispatch for another zone.
    pub async fn request_manual_dispatch(&self, zone: &str) -> bool {
        info!(zone, "manual dispatch requested");
        self.dispatch(zone, Trigger::Manual).await
    }

    /// Emergency stop. Leaves per-zone counts untouched.
    pub async fn stop(&self) -> bool {
        let ok = self.inner.robot.send_command("stop").await;

        self.inner.status.send_modify(|status| {
            status.activity = "force-stopped".into();
            if !ok {
                status.level = StatusLevel::Error;
            }
        });

        if ok {
            self.inner
                .journal
                .append(Device::Agv, Level::Warning, "AGV emergency stop acknowledged");
        } else {
            self.inner
                .journal
                .append(Device::Agv, Level::Error, "AGV stop command failed");
        }
        ok
    }

    /// Request the authoritative history from the backend and return.
    ///
    /// The response replaces the cache whenever it arrives; the
    /// coordinator keeps operating in the meantime.
    pub async fn load_history(&self) {
        match self
            .inner
            .bus
            .emit(events::GET_AGV_HISTORY, &HistoryQuery::default())
            .await
        {
            Ok(true) => debug!("history reload requested"),
            Ok(false) => debug!("history reload skipped (bus disconnected)"),
            Err(e) => warn!(error = %e, "history reload request failed"),
        }
    }

    /// Record → persist → command → report. The shared tail of the
    /// automatic and manual paths.
    async fn dispatch(&self, zone: &str, trigger: Trigger) -> bool {
        let command = DispatchCommand::new(zone, trigger);
        debug!(
            zone,
            command_id = %command.command_id,
            trigger = trigger.as_str(),
            "dispatch initiated"
        );

        // The operator sees the request even if the robot turns out to
        // be down; the outcome is resolved onto the record afterwards.
        self.inner.history.record(HistoryRecord::new(
            zone,
            trigger.action_label(),
            Outcome::Pending,
        ));
        self.persist_action(zone, trigger.action_label()).await;

        self.set_status(StatusLevel::Warning, Some("calling AGV..."), None);

        let ok = self.inner.robot.send_command(&command.token()).await;

        if ok {
            self.inner.history.resolve_latest(zone, Outcome::Sent);
            let activity = format!("heading to zone {zone} ({})", trigger.as_str());
            self.set_status(StatusLevel::Normal, Some("en route"), Some(activity.as_str()));
            self.inner.journal.append(
                Device::Agv,
                Level::Info,
                format!("AGV {} dispatch to zone {zone} succeeded", trigger.as_str()),
            );
        } else {
            self.inner.history.resolve_latest(zone, Outcome::Failed);
            self.set_status(StatusLevel::Error, Some("link down"), Some("comm failure"));
            self.inner.journal.append(
                Device::Agv,
                Level::Error,
                format!("AGV {} dispatch to zone {zone} failed", trigger.as_str()),
            );
        }
        ok
    }

    /// Emit `save_agv_action`, fire-and-forget. A disconnected bus drops
    /// the record (best-effort consistency until the next reload).
    async fn persist_action(&self, zone: &str, action: &str) {
        let payload = SaveAgvAction {
            zone: zone.to_owned(),
            action: action.to_owned(),
        };
        match self.inner.bus.emit(events::SAVE_AGV_ACTION, &payload).await {
            Ok(true) => {}
            Ok(false) => debug!(zone, "history record not persisted (bus disconnected)"),
            Err(e) => warn!(zone, error = %e, "history record emit failed"),
        }
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Subscribe to zone snapshots (config order, updated per change).
    pub fn zones(&self) -> watch::Receiver<Vec<ZoneSnapshot>> {
        self.inner.zone_watch.subscribe()
    }

    /// Current zone snapshots.
    pub fn zones_snapshot(&self) -> Vec<ZoneSnapshot> {
        self.inner.zone_watch.borrow().clone()
    }

    /// Subscribe to the AGV status indicator.
    pub fn status(&self) -> watch::Receiver<AgvStatus> {
        self.inner.status.subscribe()
    }

    /// The dispatch-history cache.
    pub fn history(&self) -> &HistoryCache {
        &self.inner.history
    }

    /// The operator journal.
    pub fn journal(&self) -> &Journal {
        &self.inner.journal
    }

    /// The underlying bus client (for consumers that register their own
    /// subscriptions, e.g. the inspection-history screen).
    pub fn bus(&self) -> &BusClient {
        &self.inner.bus
    }

    // ── Internals ────────────────────────────────────────────────────

    fn publish_zone(&self, snapshot: ZoneSnapshot) {
        self.inner.zone_watch.send_modify(|zones| {
            if let Some(entry) = zones.iter_mut().find(|z| z.name == snapshot.name) {
                *entry = snapshot;
            }
        });
    }

    fn set_status(&self, level: StatusLevel, connection: Option<&str>, activity: Option<&str>) {
        self.inner.status.send_modify(|status| {
            status.level = level;
            if let Some(connection) = connection {
                status.connection = connection.to_owned();
            }
            if let Some(activity) = activity {
                status.activity = activity.to_owned();
            }
        });
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn offline_coordinator(config: &CellConfig) -> Result<Coordinator, CoreError> {
        let robot = RobotLink::with_default_timeout(None).expect("robot client");
        let bus = BusClient::new(Url::parse("ws://127.0.0.1:1/").expect("url"));
        Coordinator::new(config, robot, bus, Arc::new(Journal::default()))
    }

    #[tokio::test]
    async fn rejects_empty_zone_list() {
        let config = CellConfig {
            zones: Vec::new(),
            ..CellConfig::default()
        };
        assert!(matches!(
            offline_coordinator(&config),
            Err(CoreError::Config { .. })
        ));
    }

    #[tokio::test]
    async fn rejects_duplicate_zones() {
        let config = CellConfig {
            zones: vec![
                crate::config::ZoneSpec::new("A", 4),
                crate::config::ZoneSpec::new("A", 2),
            ],
            ..CellConfig::default()
        };
        assert!(matches!(
            offline_coordinator(&config),
            Err(CoreError::Config { .. })
        ));
    }

    #[tokio::test]
    async fn unknown_zone_updates_are_dropped() {
        let coordinator = offline_coordinator(&CellConfig::default()).expect("coordinator");
        coordinator.on_zone_update("Z", 99).await;

        // Nothing changed and nothing was dispatched.
        assert!(coordinator.history().is_empty());
        assert!(coordinator.zones_snapshot().iter().all(|z| z.current == 0));
    }

    #[tokio::test]
    async fn snapshots_follow_updates_in_config_order() {
        let coordinator = offline_coordinator(&CellConfig::default()).expect("coordinator");
        coordinator.on_zone_update("B", 2).await;

        let zones = coordinator.zones_snapshot();
        assert_eq!(
            zones.iter().map(|z| z.name.as_str()).collect::<Vec<_>>(),
            ["A", "B", "C", "D"]
        );
        assert_eq!(zones[1].current, 2);
        assert!(!zones[1].is_full);
    }

    #[tokio::test]
    async fn reset_rearms_without_dispatching() {
        let coordinator = offline_coordinator(&CellConfig::default()).expect("coordinator");
        coordinator.reset_zone("A").await;
        assert!(coordinator.history().is_empty());
    }
}
