use heapless::spsc::Queue;
use std::time::Duration;

use super::fakes::{MockSocket, Shot, TestRig};
use crate::events::{DeviceEvent, EventQueue, EventStorage};
use crate::http::{run_stream, StreamEnd};

fn parts(sock: &MockSocket) -> usize {
    let needle = b"--frame\r\n";
    sock.output.windows(needle.len()).filter(|w| w == needle).count()
}

#[test]
fn stream_times_out_after_configured_window() {
    let mut rig = TestRig::new();
    let mut sock = MockSocket::get("/stream");

    let summary = run_stream(&mut rig.ctx, &mut sock, 1);

    // One frame every 80 ms; the check before frame 1502 sees 120.08 s
    assert_eq!(summary.end, StreamEnd::Timeout);
    assert_eq!(summary.frames, 1501);
    assert_eq!(summary.elapsed, Duration::from_millis(120_080));
    assert_eq!(parts(&sock), 1501);
    assert_eq!(rig.ctx.stats.total_frames, 1501);
    assert_eq!(rig.ctx.stats.active_streams, 0);

    let (head, _) = sock.response();
    assert!(head.contains("multipart/x-mixed-replace; boundary=frame"));
    assert!(head.contains("Connection: keep-alive"));
}

#[test]
fn stream_forces_gc_every_interval_and_at_end() {
    let mut rig = TestRig::new();
    let mut sock = MockSocket::get("/stream");

    run_stream(&mut rig.ctx, &mut sock, 1);

    // Frames 30, 60, ..., 1500 plus the reclaim after the session
    assert_eq!(rig.heap.reclaim_count(), 51);
}

#[test]
fn stream_ends_after_consecutive_errors() {
    let mut rig = TestRig::new();
    rig.camera.set_fallback(Shot::Error);
    let mut sock = MockSocket::get("/stream");

    let summary = run_stream(&mut rig.ctx, &mut sock, 7);

    assert_eq!(summary.end, StreamEnd::TooManyErrors);
    assert_eq!(summary.frames, 0);
    assert_eq!(rig.camera.capture_calls(), 5);
    // Back-off between failures but not after the last one
    assert_eq!(summary.elapsed, Duration::from_millis(400));
    assert_eq!(rig.ctx.stats.active_streams, 0);
}

#[test]
fn a_good_frame_resets_the_error_count() {
    let mut rig = TestRig::new();
    for _ in 0..4 {
        rig.camera.push_error();
    }
    rig.camera.push_frame(vec![0xFF, 0xD8, 0x00, 0xFF, 0xD9]);
    rig.camera.set_fallback(Shot::Missing);
    let mut sock = MockSocket::get("/stream");

    let summary = run_stream(&mut rig.ctx, &mut sock, 1);

    assert_eq!(summary.end, StreamEnd::TooManyErrors);
    assert_eq!(summary.frames, 1);
    assert_eq!(rig.camera.capture_calls(), 10);
}

#[test]
fn write_failure_ends_with_client_gone() {
    let mut rig = TestRig::new();
    rig.camera.set_fallback(Shot::Frame(vec![0x55; 500]));
    let mut sock = MockSocket::get("/stream").failing_after(2_000);

    let summary = run_stream(&mut rig.ctx, &mut sock, 3);

    assert_eq!(summary.end, StreamEnd::ClientGone);
    assert!(summary.frames >= 1);
    assert!(summary.frames < 4);
    assert_eq!(rig.ctx.stats.active_streams, 0);
    assert!(rig.heap.reclaim_count() >= 1);
}

#[test]
fn header_write_failure_ends_immediately() {
    let mut rig = TestRig::new();
    let mut sock = MockSocket::get("/stream").failing_after(0);

    let summary = run_stream(&mut rig.ctx, &mut sock, 1);

    assert_eq!(summary.end, StreamEnd::ClientGone);
    assert_eq!(rig.camera.capture_calls(), 0);
    assert_eq!(rig.ctx.stats.active_streams, 0);
}

#[test]
fn cancelled_token_stops_stream() {
    let mut rig = TestRig::new();
    rig.ctx.shutdown_token().cancel();
    let mut sock = MockSocket::get("/stream");

    let summary = run_stream(&mut rig.ctx, &mut sock, 1);

    assert_eq!(summary.end, StreamEnd::Cancelled);
    assert_eq!(summary.frames, 0);
    assert!(sock.response().0.starts_with("HTTP/1.1 200 OK"));
    assert_eq!(rig.ctx.stats.active_streams, 0);
}

#[test]
fn queued_shutdown_event_stops_stream() {
    let mut rig = TestRig::new();
    let storage: &'static mut EventStorage = Box::leak(Box::new(Queue::new()));
    let (mut producer, events) = EventQueue::split(storage);
    rig.ctx = rig.ctx.with_events(events);
    producer.enqueue(DeviceEvent::ShutdownRequested).unwrap();
    let mut sock = MockSocket::get("/stream");

    let summary = run_stream(&mut rig.ctx, &mut sock, 1);

    assert_eq!(summary.end, StreamEnd::Cancelled);
    assert!(!rig.ctx.is_running());
}

#[test]
fn low_memory_is_counted_per_frame_check() {
    let mut rig = TestRig::new();
    rig.heap.set_free(30_000);
    rig.camera.set_fallback(Shot::Error);
    let mut sock = MockSocket::get("/stream");

    run_stream(&mut rig.ctx, &mut sock, 1);

    assert_eq!(rig.ctx.stats.low_memory_count, 5);
    // One forced reclaim per warning, one after the session
    assert_eq!(rig.heap.reclaim_count(), 6);
}

#[test]
fn stream_request_is_routed_through_serve_connection() {
    let mut rig = TestRig::new();
    rig.camera.set_fallback(Shot::Error);
    let mut sock = MockSocket::get("/stream");

    crate::http::serve_connection(&mut rig.ctx, &mut sock, "10.0.0.9:4000");

    assert!(sock.response().0.contains("boundary=frame"));
    assert_eq!(rig.camera.capture_calls(), 5);
    assert_eq!(rig.ctx.stats.active_streams, 0);
}
