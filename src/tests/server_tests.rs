use std::io::{Read, Write};
use std::net::TcpStream;
use std::thread;

use super::fakes::{MockSocket, Shot, TestRig};
use crate::events::ShutdownToken;
use crate::http::{serve_connection, HttpServer};

fn serve(rig: &mut TestRig, mut sock: MockSocket) -> MockSocket {
    serve_connection(&mut rig.ctx, &mut sock, "10.0.0.2:50000");
    sock
}

#[test]
fn control_change_is_visible_in_status() {
    let mut rig = TestRig::new();

    let sock = serve(&mut rig, MockSocket::get("/control?quality=5"));
    assert_eq!(sock.json()["camera"]["quality"], 5);

    let sock = serve(&mut rig, MockSocket::get("/status"));
    let (head, _) = sock.response();
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Type: application/json"));
    assert_eq!(sock.json()["camera"]["quality"], 5);
    assert_eq!(rig.camera.applied("quality"), Some(5));
}

#[test]
fn control_skips_bad_fields_and_applies_the_rest() {
    let mut rig = TestRig::new();

    let sock = serve(
        &mut rig,
        MockSocket::get("/control?quality=abc&brightness=1&foo=bar&size=641x480"),
    );
    let doc = sock.json();
    assert_eq!(doc["camera"]["quality"], 12);
    assert_eq!(doc["camera"]["brightness"], 1);
    assert_eq!(doc["camera"]["framesize"], "640x480 (VGA)");
}

#[test]
fn control_clamps_out_of_range_values() {
    let mut rig = TestRig::new();

    let doc = serve(&mut rig, MockSocket::get("/control?quality=99&contrast=-7&size=800x600")).json();
    assert_eq!(doc["camera"]["quality"], 31);
    assert_eq!(doc["camera"]["contrast"], -2);
    assert_eq!(doc["camera"]["framesize_code"], 10);
}

#[test]
fn control_saturates_numbers_beyond_integer_range() {
    let mut rig = TestRig::new();

    let doc = serve(
        &mut rig,
        MockSocket::get("/control?quality=99999999999&brightness=-99999999999"),
    )
    .json();
    assert_eq!(doc["camera"]["quality"], 31);
    assert_eq!(doc["camera"]["brightness"], -2);
    assert_eq!(rig.camera.applied("quality"), Some(31));
}

#[test]
fn control_without_query_reports_status() {
    let mut rig = TestRig::new();
    let doc = serve(&mut rig, MockSocket::get("/control")).json();
    assert_eq!(doc["camera"]["quality"], 12);
    assert!(doc["server"]["running"].as_bool().unwrap());
}

#[test]
fn capture_returns_exact_frame() {
    let mut rig = TestRig::new();
    rig.camera.push_frame(vec![0xAB; 12_000]);

    let sock = serve(&mut rig, MockSocket::get("/capture"));
    let (head, body) = sock.response();
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Type: image/jpeg\r\n"));
    assert!(head.contains("Content-Length: 12000\r\n"));
    assert!(head.contains("Connection: close\r\n"));
    assert_eq!(body.len(), 12_000);
}

#[test]
fn capture_failure_is_500() {
    let mut rig = TestRig::new();
    rig.camera.push_error();

    let sock = serve(&mut rig, MockSocket::get("/capture"));
    let (head, body) = sock.response();
    assert!(head.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert!(String::from_utf8_lossy(&body).contains("Capture failed"));
}

#[test]
fn capture_of_missing_frame_is_500() {
    let mut rig = TestRig::new();
    rig.camera.set_fallback(Shot::Missing);

    let (head, _) = serve(&mut rig, MockSocket::get("/capture")).response();
    assert!(head.starts_with("HTTP/1.1 500"));
}

#[test]
fn unknown_path_is_404() {
    let mut rig = TestRig::new();
    let (head, body) = serve(&mut rig, MockSocket::get("/nope")).response();
    assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(String::from_utf8_lossy(&body).contains("404"));
}

#[test]
fn non_get_is_404() {
    let mut rig = TestRig::new();
    let sock = serve(&mut rig, MockSocket::new("POST /status HTTP/1.1\r\n\r\n"));
    assert!(sock.response().0.starts_with("HTTP/1.1 404"));
}

#[test]
fn malformed_request_line_is_404() {
    let mut rig = TestRig::new();
    let sock = serve(&mut rig, MockSocket::new("garbage\r\n\r\n"));
    assert!(sock.response().0.starts_with("HTTP/1.1 404"));
}

#[test]
fn empty_request_gets_no_response() {
    let mut rig = TestRig::new();
    let sock = serve(&mut rig, MockSocket::new(""));
    assert!(sock.output.is_empty());
    assert_eq!(rig.ctx.stats.request_count, 1);
}

#[test]
fn index_is_gzipped_when_accepted() {
    let mut rig = TestRig::new();

    let plain = serve(&mut rig, MockSocket::get("/"));
    let (head, html) = plain.response();
    assert!(head.contains("Content-Type: text/html"));
    assert!(!head.contains("Content-Encoding"));
    assert!(String::from_utf8_lossy(&html).contains("/stream"));

    let gz = serve(
        &mut rig,
        MockSocket::new("GET / HTTP/1.1\r\nAccept-Encoding: gzip, deflate\r\n\r\n"),
    );
    let (head, body) = gz.response();
    assert!(head.contains("Content-Encoding: gzip"));
    assert!(body.len() < html.len());
}

#[test]
fn status_document_has_every_section() {
    let mut rig = TestRig::new();
    rig.clock.advance(std::time::Duration::from_millis(12_340));

    let doc = serve(&mut rig, MockSocket::get("/status")).json();
    assert_eq!(doc["camera"]["initialized"], true);
    assert_eq!(doc["camera"]["format"], "JPEG");
    assert_eq!(doc["server"]["port"], 80);
    assert_eq!(doc["server"]["request_count"], 1);
    assert_eq!(doc["server"]["uptime"], 12.3);
    assert_eq!(doc["network"]["connected"], true);
    assert_eq!(doc["network"]["ip"], "192.168.1.50");
    assert_eq!(doc["memory"]["free"], 200_000);
    assert_eq!(doc["memory"]["total"], 300_000);
}

#[test]
fn periodic_gc_runs_every_interval_when_low() {
    let mut rig = TestRig::new();
    // Below the reclaim threshold but above the warning level
    rig.heap.set_free(60_000);

    for _ in 0..49 {
        serve(&mut rig, MockSocket::get("/status"));
    }
    assert_eq!(rig.heap.reclaim_count(), 0);

    serve(&mut rig, MockSocket::get("/status"));
    assert_eq!(rig.heap.reclaim_count(), 1);
    assert_eq!(rig.ctx.stats.request_count, 50);
}

#[test]
fn periodic_gc_skipped_with_plenty_free() {
    let mut rig = TestRig::new();
    for _ in 0..50 {
        serve(&mut rig, MockSocket::get("/status"));
    }
    assert_eq!(rig.heap.reclaim_count(), 0);
}

/// Stops the accept loop even when the client side panics
struct StopOnDrop(ShutdownToken);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

fn exchange(port: u16, request: &str) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).expect("connect");
    stream.write_all(request.as_bytes()).expect("send");
    let mut response = Vec::new();
    stream.read_to_end(&mut response).expect("receive");
    String::from_utf8_lossy(&response).into_owned()
}

#[test]
fn listener_survives_bad_request_and_stops_on_shutdown() {
    let mut rig = TestRig::new();
    let server = HttpServer::bind(0).unwrap();
    let port = server.port();
    let stop = StopOnDrop(rig.ctx.shutdown_token());

    let client = thread::spawn(move || {
        let _stop = stop;
        let bad = exchange(port, "garbage\r\n\r\n");
        let status = exchange(port, "GET /status HTTP/1.1\r\nHost: cam\r\n\r\n");
        (bad, status)
    });

    server.run(&mut rig.ctx).unwrap();
    let (bad, status) = client.join().expect("client thread");

    assert!(bad.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(status.starts_with("HTTP/1.1 200 OK\r\n"));
    let body = &status[status.find("\r\n\r\n").unwrap() + 4..];
    let doc: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(doc["server"]["port"], port);
    assert_eq!(doc["server"]["request_count"], 2);

    assert!(!rig.ctx.is_running());
    assert_eq!(rig.ctx.stats.client_count, 2);
    assert_eq!(rig.ctx.stats.request_count, 2);
}
