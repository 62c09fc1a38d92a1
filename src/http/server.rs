use anyhow::{Context, Result};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

use super::request::{Request, RequestError};
use super::response;
use super::router::Route;
use super::status::{apply_control, StatusDocument};
use super::stream::run_stream;
use crate::context::ServerContext;

/// Single-threaded HTTP server over a non-blocking listener.
///
/// The accept loop polls every `accept_poll_ms` so device events and
/// housekeeping run between connections. Each connection is served to
/// completion, streams included, before the next accept.
pub struct HttpServer {
    listener: TcpListener,
    port: u16,
}

impl HttpServer {
    pub fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port))
            .with_context(|| format!("Failed to bind HTTP port {}", port))?;
        listener.set_nonblocking(true)?;
        let port = listener.local_addr()?.port();
        log::info!("[HTTP] Listening on port {}", port);
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Accept until the context stops running. Only listener failures at bind
    /// time escape; everything per-connection is handled here.
    pub fn run(&self, ctx: &mut ServerContext) -> Result<()> {
        ctx.port = self.port;
        ctx.reclaim("server start");

        while ctx.is_running() {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    ctx.stats.client_count = ctx.stats.client_count.wrapping_add(1);
                    handle_accepted(ctx, stream, addr);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    ctx.poll_events();
                    ctx.housekeeping();
                    ctx.clock.sleep(ctx.config.accept_poll());
                }
                Err(e) => {
                    log::error!("[HTTP] Accept error: {:?}", e);
                    ctx.clock.sleep(ctx.config.accept_poll());
                }
            }
        }

        log::info!("[HTTP] Server stopped");
        Ok(())
    }
}

fn handle_accepted(ctx: &mut ServerContext, mut stream: TcpStream, addr: SocketAddr) {
    let timeout = Some(ctx.config.socket_timeout());
    let setup = stream
        .set_nonblocking(false)
        .and_then(|_| stream.set_read_timeout(timeout))
        .and_then(|_| stream.set_write_timeout(timeout))
        .and_then(|_| stream.set_nodelay(true));
    if let Err(e) = setup {
        log::warn!("[HTTP] Socket setup for {} failed: {}", addr, e);
        return;
    }

    serve_connection(ctx, &mut stream, &addr.to_string());
    // Dropping the stream closes the socket
}

/// Serve one request on `sock`. Errors stop at this boundary: they are
/// logged and the connection is abandoned.
pub fn serve_connection<S: Read + Write>(ctx: &mut ServerContext, sock: &mut S, peer: &str) {
    ctx.stats.request_count = ctx.stats.request_count.wrapping_add(1);
    let id = ctx.stats.request_count;

    if let Err(e) = handle_request(ctx, sock, id) {
        match e.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                log::warn!("[HTTP] Request #{} from {} timed out", id, peer)
            }
            _ => log::warn!("[HTTP] Request #{} from {} failed: {}", id, peer, e),
        }
    }

    let every = ctx.config.gc_interval;
    if every > 0 && id % every == 0 {
        ctx.guard.smart_gc(false, "request interval");
    }
}

fn handle_request<S: Read + Write>(ctx: &mut ServerContext, sock: &mut S, id: u32) -> io::Result<()> {
    let raw = Request::read_from(sock)?;
    let req = match Request::parse(&raw) {
        Ok(req) => req,
        Err(RequestError::Empty) => return Ok(()),
        Err(RequestError::MalformedLine) => {
            log::debug!("[HTTP] Request #{}: malformed request line", id);
            return response::send_not_found(sock);
        }
    };
    log::info!("[HTTP] #{} {} {}", id, req.method, req.path);

    match Route::for_request(&req) {
        Route::Index => ctx.page.send(sock, req.accepts_gzip),
        Route::Stream => {
            run_stream(ctx, sock, id);
            Ok(())
        }
        Route::Capture => send_capture(ctx, sock),
        Route::Status => response::send_json(sock, &StatusDocument::collect(ctx)),
        Route::Control => {
            apply_control(ctx, &req.query);
            response::send_json(sock, &StatusDocument::collect(ctx))
        }
        Route::NotFound => response::send_not_found(sock),
    }
}

fn send_capture<S: Write>(ctx: &mut ServerContext, sock: &mut S) -> io::Result<()> {
    match ctx.camera.capture_frame() {
        Ok(frame) => response::send_bytes(
            sock,
            "image/jpeg",
            &frame,
            &[
                ("Cache-Control", "no-cache"),
                ("Access-Control-Allow-Origin", "*"),
            ],
        ),
        Err(e) => {
            log::warn!("[HTTP] Capture failed: {}", e);
            response::send_server_error(sock, "Capture failed")
        }
    }
}
