use std::net::Ipv4Addr;
use std::rc::Rc;
use std::time::Duration;

use super::fakes::{test_config, ScriptedNetwork, TestRig, STATION_IP};
use crate::clock::{Clock, ManualClock};
use crate::network::{
    ConnectOutcome, ConnectionState, InterfaceMode, LinkHealth, LinkStatus, NetworkError,
    NetworkManager,
};

fn manager(driver: &ScriptedNetwork) -> (NetworkManager, Rc<ManualClock>) {
    let clock = Rc::new(ManualClock::new());
    let dyn_clock: Rc<dyn Clock> = clock.clone();
    (NetworkManager::new(Box::new(driver.clone()), dyn_clock), clock)
}

const TIMEOUT: Duration = Duration::from_secs(30);

#[test]
fn connect_gives_up_after_retries() {
    let driver = ScriptedNetwork::failing(LinkStatus::ConnectFail);
    let (mut net, clock) = manager(&driver);

    let outcome = net.connect("lab", "password1", TIMEOUT, 3).unwrap();

    assert_eq!(
        outcome,
        ConnectOutcome::Failed {
            attempts: 3,
            last_status: LinkStatus::ConnectFail
        }
    );
    assert_eq!(driver.connect_calls(), 3);
    assert_eq!(net.state(), ConnectionState::Failed);
    // Terminal failures return at once; only the two back-offs pass
    assert_eq!(clock.now(), Duration::from_secs(4));
}

#[test]
fn connect_surveys_once_per_call_not_per_attempt() {
    let driver = ScriptedNetwork::failing(LinkStatus::NoApFound);
    driver.set_visible(&["neighbour", "cafe"]);
    let (mut net, clock) = manager(&driver);

    let outcome = net.connect("lab", "password1", TIMEOUT, 3).unwrap();

    assert!(!outcome.is_connected());
    assert_eq!(driver.scan_calls(), 1);
    assert_eq!(driver.connect_calls(), 3);
    // The survey adds no waiting of its own
    assert_eq!(clock.now(), Duration::from_secs(4));
}

#[test]
fn ssid_missing_from_scan_is_still_tried() {
    let driver = ScriptedNetwork::reliable();
    driver.set_visible(&["neighbour"]);
    let (mut net, _) = manager(&driver);

    let outcome = net.connect("hidden-lab", "password1", TIMEOUT, 1).unwrap();

    assert_eq!(outcome, ConnectOutcome::Connected { ip: STATION_IP });
    assert_eq!(driver.scan_calls(), 1);
}

#[test]
fn connect_succeeds_on_a_later_attempt() {
    let driver = ScriptedNetwork::failing(LinkStatus::NoApFound);
    driver.succeed_on(2);
    let (mut net, _) = manager(&driver);

    let outcome = net.connect("lab", "password1", TIMEOUT, 3).unwrap();

    assert_eq!(outcome, ConnectOutcome::Connected { ip: STATION_IP });
    assert_eq!(driver.connect_calls(), 2);
    assert_eq!(net.state(), ConnectionState::Connected);
    assert_eq!(net.get_ip(), Some(STATION_IP));
    assert_eq!(net.status().ssid.as_deref(), Some("lab"));
}

#[test]
fn each_attempt_waits_for_the_timeout_while_connecting() {
    let driver = ScriptedNetwork::failing(LinkStatus::Connecting);
    let (mut net, clock) = manager(&driver);

    let outcome = net
        .connect("lab", "password1", Duration::from_secs(5), 2)
        .unwrap();

    assert_eq!(
        outcome,
        ConnectOutcome::Failed {
            attempts: 2,
            last_status: LinkStatus::Connecting
        }
    );
    // 5 s polling, 2 s back-off, 5 s polling
    assert_eq!(clock.now(), Duration::from_secs(12));
}

#[test]
fn invalid_ssid_is_rejected_before_touching_the_radio() {
    let driver = ScriptedNetwork::reliable();
    let (mut net, _) = manager(&driver);

    assert!(matches!(
        net.connect("", "password1", TIMEOUT, 3),
        Err(NetworkError::InvalidSsid(_))
    ));
    assert!(matches!(
        net.connect(&"x".repeat(33), "password1", TIMEOUT, 3),
        Err(NetworkError::InvalidSsid(_))
    ));
    assert_eq!(driver.connect_calls(), 0);
    assert!(!driver.station_active());
}

#[test]
fn connect_tears_down_hotspot_and_old_association() {
    let driver = ScriptedNetwork::reliable();
    driver.force_ap_active();
    let (mut net, _) = manager(&driver);

    net.connect("lab", "password1", TIMEOUT, 1).unwrap();
    assert!(!driver.ap_active());
    assert_eq!(driver.disconnect_calls(), 0);

    net.connect("lab", "password1", TIMEOUT, 1).unwrap();
    assert_eq!(driver.disconnect_calls(), 1);
    assert!(net.is_connected());
}

#[test]
fn disconnect_is_idempotent() {
    let driver = ScriptedNetwork::reliable();
    let (mut net, _) = manager(&driver);
    net.connect("lab", "password1", TIMEOUT, 1).unwrap();

    net.disconnect();
    net.disconnect();

    assert_eq!(driver.disconnect_calls(), 1);
    assert_eq!(net.state(), ConnectionState::Idle);
    assert_eq!(net.get_ip(), None);
}

#[test]
fn monitor_reports_loss_once() {
    let driver = ScriptedNetwork::reliable();
    let (mut net, _) = manager(&driver);
    assert_eq!(net.monitor(), LinkHealth::Down);

    net.connect("lab", "password1", TIMEOUT, 1).unwrap();
    assert_eq!(net.monitor(), LinkHealth::Up);

    driver.drop_link();
    assert_eq!(net.monitor(), LinkHealth::Lost);
    assert_eq!(net.state(), ConnectionState::Failed);
    assert_eq!(net.monitor(), LinkHealth::Down);
    assert_eq!(driver.connect_calls(), 1);
}

#[test]
fn access_point_defaults_its_address_and_stops_station() {
    let driver = ScriptedNetwork::reliable();
    let (mut net, clock) = manager(&driver);
    net.connect("lab", "password1", TIMEOUT, 1).unwrap();

    let ip = net.start_access_point("ESP32-Cam", "12345678", 11).unwrap();

    assert_eq!(ip, Ipv4Addr::new(192, 168, 4, 1));
    assert_eq!(net.mode(), InterfaceMode::AccessPoint);
    assert!(driver.ap_active());
    assert!(!driver.station_active());
    assert!(net.is_connected());
    assert_eq!(clock.now(), Duration::from_secs(2));

    net.stop_access_point();
    net.stop_access_point();
    assert!(!driver.ap_active());
    assert_eq!(net.state(), ConnectionState::Idle);
}

#[test]
fn access_point_validates_arguments() {
    let driver = ScriptedNetwork::reliable();
    let (mut net, _) = manager(&driver);

    assert!(matches!(
        net.start_access_point("cam", "short", 6),
        Err(NetworkError::InvalidAccessPoint(_))
    ));
    assert!(matches!(
        net.start_access_point("cam", "12345678", 15),
        Err(NetworkError::InvalidAccessPoint(_))
    ));
    assert!(net.start_access_point("cam", "", 6).is_ok());
}

#[test]
fn housekeeping_reconnects_at_a_bounded_rate() {
    let mut rig = TestRig::new();
    assert_eq!(rig.network.connect_calls(), 1);

    rig.network.drop_link();
    rig.network.never_succeed();

    rig.ctx.housekeeping();
    assert_eq!(rig.network.connect_calls(), 2);
    assert_eq!(rig.ctx.network.state(), ConnectionState::Failed);

    rig.clock.advance(Duration::from_secs(10));
    rig.ctx.housekeeping();
    assert_eq!(rig.network.connect_calls(), 2);

    rig.clock.advance(Duration::from_secs(21));
    rig.network.succeed_on(1);
    rig.ctx.housekeeping();
    assert_eq!(rig.network.connect_calls(), 3);
    assert_eq!(rig.ctx.network.state(), ConnectionState::Connected);

    rig.clock.advance(Duration::from_secs(60));
    rig.ctx.housekeeping();
    assert_eq!(rig.network.connect_calls(), 3);
}

#[test]
fn housekeeping_leaves_hotspot_alone() {
    let mut config = test_config();
    config.network_mode = InterfaceMode::AccessPoint;
    let mut rig = TestRig::unstarted(config);
    rig.ctx
        .network
        .start_access_point("ESP32-Cam", "12345678", 11)
        .unwrap();

    rig.clock.advance(Duration::from_secs(120));
    rig.ctx.housekeeping();
    assert_eq!(rig.network.connect_calls(), 0);
}

#[test]
fn housekeeping_status_tick_reclaims_when_low() {
    let mut rig = TestRig::new();
    rig.heap.set_free(50_000);

    rig.clock.advance(Duration::from_secs(59));
    rig.ctx.housekeeping();
    assert_eq!(rig.heap.reclaim_count(), 0);

    rig.clock.advance(Duration::from_secs(1));
    rig.ctx.housekeeping();
    assert_eq!(rig.heap.reclaim_count(), 1);
}
