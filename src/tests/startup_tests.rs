use heapless::spsc::Queue;
use std::cell::RefCell;
use std::rc::Rc;

use super::fakes::{test_config, TestRig};
use crate::app::bring_up;
use crate::camera::CameraConfig;
use crate::display::StatusDisplay;
use crate::events::{DeviceEvent, EventQueue, EventStorage};
use crate::network::{ConnectionState, InterfaceMode};

#[derive(Clone, Default)]
struct RecordingDisplay {
    screens: Rc<RefCell<Vec<Vec<String>>>>,
}

impl StatusDisplay for RecordingDisplay {
    fn show_lines(&mut self, lines: &[String]) -> anyhow::Result<()> {
        self.screens.borrow_mut().push(lines.to_vec());
        Ok(())
    }
}

#[test]
fn bring_up_connects_then_starts_camera() {
    let mut rig = TestRig::unstarted(test_config());

    bring_up(&mut rig.ctx, CameraConfig::default()).unwrap();

    assert_eq!(rig.ctx.network.state(), ConnectionState::Connected);
    assert!(rig.ctx.camera.is_initialized());
    assert_eq!(rig.camera.configured().len(), 6);
}

#[test]
fn failed_uplink_never_touches_the_camera() {
    let mut rig = TestRig::unstarted(test_config());
    rig.network.never_succeed();

    let err = bring_up(&mut rig.ctx, CameraConfig::default()).unwrap_err();

    assert!(err.to_string().contains("after 3 attempts"));
    assert_eq!(rig.network.connect_calls(), 3);
    assert!(rig.camera.configured().is_empty());
    assert!(!rig.network.station_active());
    assert!(!rig.ctx.is_running());
}

#[test]
fn camera_failure_releases_the_uplink() {
    let mut rig = TestRig::unstarted(test_config());
    rig.camera.fail_power_on(true);

    let err = bring_up(&mut rig.ctx, CameraConfig::default()).unwrap_err();

    assert!(err.to_string().contains("Camera init failed"));
    assert!(!rig.ctx.camera.is_initialized());
    assert!(!rig.network.station_active());
    assert!(!rig.ctx.network.is_connected());
}

#[test]
fn hotspot_mode_brings_up_access_point() {
    let mut config = test_config();
    config.network_mode = InterfaceMode::AccessPoint;
    let mut rig = TestRig::unstarted(config);

    bring_up(&mut rig.ctx, CameraConfig::default()).unwrap();

    assert!(rig.network.ap_active());
    assert_eq!(rig.network.connect_calls(), 0);
    assert_eq!(rig.ctx.network.get_ip(), Some("192.168.4.1".parse().unwrap()));
    assert!(rig.ctx.camera.is_initialized());
}

#[test]
fn cleanup_runs_once_worth_of_teardown() {
    let mut rig = TestRig::new();

    rig.ctx.cleanup();
    rig.ctx.cleanup();

    assert_eq!(rig.camera.deinit_calls(), 1);
    assert_eq!(rig.network.disconnect_calls(), 1);
    assert!(!rig.ctx.is_running());
}

#[test]
fn status_event_mirrors_to_display_and_rearms() {
    let display = RecordingDisplay::default();
    let rearms = Rc::new(RefCell::new(0u32));
    let storage: &'static mut EventStorage = Box::leak(Box::new(Queue::new()));
    let (mut producer, events) = EventQueue::split(storage);
    let counter = rearms.clone();
    let events = events.with_rearm(move || *counter.borrow_mut() += 1);

    let mut rig = TestRig::new();
    rig.ctx = rig.ctx.with_display(Box::new(display.clone())).with_events(events);

    rig.ctx.poll_events();
    assert!(display.screens.borrow().is_empty());
    assert_eq!(*rearms.borrow(), 1);

    producer.enqueue(DeviceEvent::StatusRequested).unwrap();
    rig.ctx.poll_events();

    let screens = display.screens.borrow();
    assert_eq!(screens.len(), 1);
    assert_eq!(screens[0][0], "http://192.168.1.50:80/");
    assert_eq!(*rearms.borrow(), 2);
    assert!(rig.ctx.is_running());
}
