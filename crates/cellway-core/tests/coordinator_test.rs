#![allow(clippy::unwrap_used)]
// Integration tests for the dispatch coordinator. The robot is a wiremock
// server; the bus stays disconnected (emits are dropped by contract), so
// these tests exercise policy, status, history, and journal behavior.

use std::sync::Arc;
use std::time::{Duration, Instant};

use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cellway_api::{BusClient, RobotLink};
use cellway_core::{
    CellConfig, Coordinator, Device, Journal, Level, Outcome, StatusLevel, Trigger,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn robot_address(server: &MockServer) -> String {
    server.uri().trim_start_matches("http://").to_owned()
}

async fn setup() -> (MockServer, Coordinator) {
    let server = MockServer::start().await;
    let robot = RobotLink::new(
        Some(robot_address(&server)),
        Duration::from_millis(1500),
    )
    .unwrap();
    let bus = BusClient::new(Url::parse("ws://127.0.0.1:1/").unwrap());
    let coordinator = Coordinator::new(
        &CellConfig::default(),
        robot,
        bus,
        Arc::new(Journal::default()),
    )
    .unwrap();
    (server, coordinator)
}

fn task_mock(zone: &str, status: u16) -> Mock {
    Mock::given(method("GET"))
        .and(path(format!("/task{zone}")))
        .respond_with(ResponseTemplate::new(status))
}

// ── Rising-edge policy ──────────────────────────────────────────────

#[tokio::test]
async fn full_zone_dispatches_exactly_once_per_rising_edge() {
    let (server, coordinator) = setup().await;
    task_mock("A", 200).expect(1).mount(&server).await;

    for count in 1..=4 {
        coordinator.on_zone_update("A", count).await;
    }
    // Still full — no second dispatch without a drop below capacity.
    coordinator.on_zone_update("A", 4).await;
    coordinator.on_zone_update("A", 5).await;

    let history = coordinator.history().snapshot();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, Trigger::Auto.action_label());
    assert_eq!(history[0].outcome, Outcome::Sent);
    assert_eq!(history[0].zone, "A");
}

#[tokio::test]
async fn second_rising_edge_dispatches_again() {
    let (server, coordinator) = setup().await;
    task_mock("A", 200).expect(2).mount(&server).await;

    for count in 1..=4 {
        coordinator.on_zone_update("A", count).await;
    }
    // Drop below capacity, then fill again: a second edge.
    coordinator.on_zone_update("A", 3).await;
    coordinator.on_zone_update("A", 4).await;

    assert_eq!(coordinator.history().len(), 2);
}

#[tokio::test]
async fn update_landing_above_capacity_is_one_edge() {
    let (server, coordinator) = setup().await;
    task_mock("C", 200).expect(1).mount(&server).await;

    // A single update that jumps straight past capacity.
    coordinator.on_zone_update("C", 7).await;
    coordinator.on_zone_update("C", 8).await;

    assert_eq!(coordinator.history().len(), 1);
}

// ── Dispatch outcomes ───────────────────────────────────────────────

#[tokio::test]
async fn successful_dispatch_reports_en_route() {
    let (server, coordinator) = setup().await;
    task_mock("B", 200).mount(&server).await;

    for count in 1..=4 {
        coordinator.on_zone_update("B", count).await;
    }

    let status = coordinator.status().borrow().clone();
    assert_eq!(status.level, StatusLevel::Normal);
    assert_eq!(status.connection, "en route");
    assert_eq!(status.activity, "heading to zone B (auto)");

    let infos: Vec<_> = coordinator
        .journal()
        .latest(10)
        .into_iter()
        .filter(|e| e.device == Device::Agv && e.level == Level::Info)
        .collect();
    assert!(infos.iter().any(|e| e.message.contains("zone B")));
}

#[tokio::test]
async fn failed_dispatch_reports_error_status() {
    let (server, coordinator) = setup().await;
    task_mock("A", 503).mount(&server).await;

    for count in 1..=4 {
        coordinator.on_zone_update("A", count).await;
    }

    let status = coordinator.status().borrow().clone();
    assert_eq!(status.level, StatusLevel::Error);
    assert_eq!(status.connection, "link down");
    assert_eq!(status.activity, "comm failure");

    let history = coordinator.history().snapshot();
    assert_eq!(history[0].outcome, Outcome::Failed);

    let errors = coordinator.journal().search(&cellway_core::JournalFilter {
        level: Some(Level::Error),
        device: Some(Device::Agv),
        ..Default::default()
    });
    assert_eq!(errors.len(), 1);
}

// ── Manual dispatch and stop ────────────────────────────────────────

#[tokio::test]
async fn manual_dispatch_works_regardless_of_zone_state() {
    let (server, coordinator) = setup().await;
    task_mock("D", 200).expect(1).mount(&server).await;

    // Zone D is empty; the operator calls the robot anyway.
    assert!(coordinator.request_manual_dispatch("D").await);

    let history = coordinator.history().snapshot();
    assert_eq!(history[0].action, Trigger::Manual.action_label());
    assert_eq!(history[0].outcome, Outcome::Sent);

    let status = coordinator.status().borrow().clone();
    assert_eq!(status.activity, "heading to zone D (manual)");
}

#[tokio::test]
async fn concurrent_manual_and_auto_do_not_block_each_other() {
    let (server, coordinator) = setup().await;
    task_mock("A", 200)
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/taskB"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(400)))
        .mount(&server)
        .await;

    // Fill A while a slow manual dispatch for B is in flight.
    let auto = {
        let coordinator = coordinator.clone();
        async move {
            for count in 1..=4 {
                coordinator.on_zone_update("A", count).await;
            }
        }
    };
    let manual = coordinator.request_manual_dispatch("B");

    let started = Instant::now();
    let ((), manual_ok) = tokio::join!(auto, manual);
    assert!(manual_ok);
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "the two dispatches must proceed concurrently"
    );

    assert_eq!(coordinator.history().len(), 2);
}

#[tokio::test]
async fn stop_sets_forced_stop_and_keeps_counts() {
    let (server, coordinator) = setup().await;
    Mock::given(method("GET"))
        .and(path("/stop"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    coordinator.on_zone_update("A", 2).await;
    assert!(coordinator.stop().await);

    let status = coordinator.status().borrow().clone();
    assert_eq!(status.activity, "force-stopped");

    // Counts survive a stop.
    let zones = coordinator.zones_snapshot();
    assert_eq!(zones[0].current, 2);

    let warnings = coordinator.journal().search(&cellway_core::JournalFilter {
        level: Some(Level::Warning),
        ..Default::default()
    });
    assert!(warnings.iter().any(|e| e.message.contains("emergency stop")));
}

// ── Startup probe ───────────────────────────────────────────────────

#[tokio::test]
async fn startup_probe_reports_online() {
    let (server, coordinator) = setup().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    coordinator.start().await;

    let status = coordinator.status().borrow().clone();
    assert_eq!(status.level, StatusLevel::Normal);
    assert_eq!(status.connection, "online (idle)");
}

#[tokio::test]
async fn startup_probe_reports_offline_when_unreachable() {
    let robot = RobotLink::new(Some("127.0.0.1:9".into()), Duration::from_millis(300)).unwrap();
    let bus = BusClient::new(Url::parse("ws://127.0.0.1:1/").unwrap());
    let coordinator = Coordinator::new(
        &CellConfig::default(),
        robot,
        bus,
        Arc::new(Journal::default()),
    )
    .unwrap();

    coordinator.start().await;

    let status = coordinator.status().borrow().clone();
    assert_eq!(status.level, StatusLevel::Error);
    assert_eq!(status.connection, "offline");
    assert_eq!(status.activity, "no device");
}

// ── Disabled robot ──────────────────────────────────────────────────

#[tokio::test]
async fn unset_robot_address_fails_dispatch_without_network() {
    let robot = RobotLink::with_default_timeout(None).unwrap();
    let bus = BusClient::new(Url::parse("ws://127.0.0.1:1/").unwrap());
    let coordinator = Coordinator::new(
        &CellConfig::default(),
        robot,
        bus,
        Arc::new(Journal::default()),
    )
    .unwrap();

    let started = Instant::now();
    assert!(!coordinator.request_manual_dispatch("A").await);
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(coordinator.history().snapshot()[0].outcome, Outcome::Failed);
}
