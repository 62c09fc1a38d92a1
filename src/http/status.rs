use serde::Serialize;
use std::collections::BTreeMap;

use crate::camera::{CameraStatus, FrameSize};
use crate::context::ServerContext;
use crate::memory::MemoryStatus;
use crate::network::NetworkStatus;

#[derive(Debug, Serialize)]
pub struct ServerSection {
    pub running: bool,
    pub port: u16,
    /// Seconds, one decimal
    pub uptime: f64,
    pub request_count: u32,
    pub client_count: u32,
    pub active_streams: u32,
    pub total_frames: u32,
    pub gc_count: u32,
    pub low_memory_count: u32,
}

#[derive(Debug, Serialize)]
pub struct StatusDocument {
    pub camera: CameraStatus,
    pub server: ServerSection,
    pub network: NetworkStatus,
    pub memory: MemoryStatus,
}

impl StatusDocument {
    pub fn collect(ctx: &ServerContext) -> Self {
        let uptime = (ctx.uptime().as_secs_f64() * 10.0).round() / 10.0;
        Self {
            camera: ctx.camera.status(),
            server: ServerSection {
                running: ctx.is_running(),
                port: ctx.port,
                uptime,
                request_count: ctx.stats.request_count,
                client_count: ctx.stats.client_count,
                active_streams: ctx.stats.active_streams,
                total_frames: ctx.stats.total_frames,
                gc_count: ctx.guard.gc_count(),
                low_memory_count: ctx.stats.low_memory_count,
            },
            network: ctx.network.status(),
            memory: ctx.guard.check_memory(),
        }
    }
}

/// Apply `/control` query pairs one by one. Unknown keys are ignored and a
/// field that fails to parse or apply is logged and skipped.
pub fn apply_control(ctx: &mut ServerContext, query: &BTreeMap<String, String>) {
    if !query.is_empty() {
        log::info!("[HTTP] Control: {:?}", query);
    }

    for (key, value) in query {
        let result = match key.as_str() {
            "size" | "framesize" => match FrameSize::parse_dims(value) {
                Some(size) => ctx.camera.set_framesize(size).map(|_| ()),
                None => {
                    log::warn!("[HTTP] Unknown frame size '{}'", value);
                    continue;
                }
            },
            "quality" | "contrast" | "brightness" | "saturation" => {
                // Saturate so oversized numbers still clamp in the setters
                let parsed = match value.trim().parse::<i64>() {
                    Ok(v) => v.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
                    Err(_) => {
                        log::warn!("[HTTP] Bad value for {}: '{}'", key, value);
                        continue;
                    }
                };
                match key.as_str() {
                    "quality" => ctx.camera.set_quality(parsed).map(|_| ()),
                    "contrast" => ctx.camera.set_contrast(parsed).map(|_| ()),
                    "brightness" => ctx.camera.set_brightness(parsed).map(|_| ()),
                    _ => ctx.camera.set_saturation(parsed).map(|_| ()),
                }
            }
            _ => continue,
        };

        if let Err(e) = result {
            log::warn!("[HTTP] Control {}={} not applied: {}", key, value, e);
        }
    }
}
