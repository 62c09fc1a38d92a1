//! MJPEG multipart session: one long-lived response per `/stream` request.

use std::io::Write;
use std::time::Duration;

use super::response;
use crate::context::ServerContext;

/// fps is logged every this many frames
const FPS_LOG_EVERY: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Streaming,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    Timeout,
    TooManyErrors,
    ClientGone,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamSummary {
    pub end: StreamEnd,
    pub frames: u32,
    pub elapsed: Duration,
}

impl StreamSummary {
    pub fn average_fps(&self) -> f32 {
        let secs = self.elapsed.as_secs_f32();
        if secs > 0.0 {
            self.frames as f32 / secs
        } else {
            0.0
        }
    }
}

pub struct StreamSession {
    id: u32,
    started: Duration,
    frame_count: u32,
    consecutive_errors: u32,
    state: SessionState,
}

impl StreamSession {
    fn new(id: u32, started: Duration) -> Self {
        Self {
            id,
            started,
            frame_count: 0,
            consecutive_errors: 0,
            state: SessionState::Starting,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    /// Send the multipart header, then frames until a terminal condition
    fn pump<S: Write>(&mut self, ctx: &mut ServerContext, sock: &mut S) -> StreamEnd {
        if let Err(e) = response::write_stream_head(sock) {
            log::warn!("[HTTP] Stream #{}: header write failed: {}", self.id, e);
            return StreamEnd::ClientGone;
        }
        self.state = SessionState::Streaming;

        let timeout = ctx.config.stream_timeout();
        let gc_every = ctx.config.stream_gc_interval;
        let max_errors = ctx.config.max_errors;

        loop {
            ctx.poll_events();
            if !ctx.is_running() {
                return StreamEnd::Cancelled;
            }

            let elapsed = ctx.clock.now().saturating_sub(self.started);
            if elapsed > timeout {
                log::info!("[HTTP] Stream #{}: timed out after {:?}", self.id, timeout);
                return StreamEnd::Timeout;
            }

            if ctx.guard.check_memory().warning {
                ctx.stats.low_memory_count += 1;
                ctx.guard.smart_gc(true, "stream low memory");
            }

            match ctx.camera.capture_frame() {
                Ok(frame) => {
                    self.consecutive_errors = 0;
                    if let Err(e) = response::write_part(sock, &frame) {
                        log::info!("[HTTP] Stream #{}: client gone ({})", self.id, e);
                        return StreamEnd::ClientGone;
                    }
                    drop(frame);

                    self.frame_count += 1;
                    ctx.stats.total_frames = ctx.stats.total_frames.wrapping_add(1);

                    if gc_every > 0 && self.frame_count % gc_every == 0 {
                        ctx.guard.smart_gc(true, "stream frames");
                    }
                    if self.frame_count % FPS_LOG_EVERY == 0 {
                        let secs = ctx.clock.now().saturating_sub(self.started).as_secs_f32();
                        let fps = if secs > 0.0 { self.frame_count as f32 / secs } else { 0.0 };
                        log::info!(
                            "[HTTP] Stream #{}: {} frames, {:.1} fps",
                            self.id,
                            self.frame_count,
                            fps
                        );
                    }

                    ctx.clock.sleep(ctx.config.frame_delay());
                }
                Err(e) => {
                    self.consecutive_errors += 1;
                    log::warn!(
                        "[HTTP] Stream #{}: capture failed ({}/{}): {}",
                        self.id,
                        self.consecutive_errors,
                        max_errors,
                        e
                    );
                    if self.consecutive_errors >= max_errors {
                        return StreamEnd::TooManyErrors;
                    }
                    ctx.clock.sleep(ctx.config.error_backoff());
                }
            }
        }
    }
}

/// Run a stream session to completion on `sock`.
///
/// `active_streams` is raised on entry and lowered exactly once on every exit
/// path, followed by a forced reclamation.
pub fn run_stream<S: Write>(ctx: &mut ServerContext, sock: &mut S, id: u32) -> StreamSummary {
    log::info!("[HTTP] Stream #{} starting", id);
    ctx.stats.active_streams += 1;

    let mut session = StreamSession::new(id, ctx.clock.now());
    let end = session.pump(ctx, sock);
    session.close();

    ctx.stats.active_streams = ctx.stats.active_streams.saturating_sub(1);
    let summary = StreamSummary {
        end,
        frames: session.frame_count,
        elapsed: ctx.clock.now().saturating_sub(session.started),
    };
    log::info!(
        "[HTTP] Stream #{} ended ({:?}): {} frames, {:.0}s, {:.1} fps",
        id,
        summary.end,
        summary.frames,
        summary.elapsed.as_secs_f32(),
        summary.average_fps()
    );
    ctx.reclaim("stream end");
    summary
}
