//! Startup sequence shared by the device and host binaries.

use anyhow::{bail, Result};
use std::rc::Rc;

use crate::camera::{CameraConfig, CameraDriver, CameraSource};
use crate::clock::Clock;
use crate::config::ServerConfig;
use crate::context::ServerContext;
use crate::display::StatusDisplay;
use crate::events::EventQueue;
use crate::http::HttpServer;
use crate::memory::{MemoryProbe, MemoryThresholds, ResourceGuard};
use crate::network::{ConnectOutcome, InterfaceMode, NetworkDriver, NetworkManager};
use crate::version;

/// Hardware (or simulated hardware) the node runs on
pub struct Platform {
    pub camera: Box<dyn CameraDriver>,
    pub network: Box<dyn NetworkDriver>,
    pub memory: Box<dyn MemoryProbe>,
    pub clock: Rc<dyn Clock>,
    pub display: Option<Box<dyn StatusDisplay>>,
    pub events: Option<EventQueue>,
}

pub fn build_context(config: ServerConfig, platform: Platform) -> ServerContext {
    let thresholds = MemoryThresholds {
        gc_threshold: config.gc_threshold,
        low_memory_warning: config.low_memory_warning,
    };
    let guard = ResourceGuard::new(platform.memory, thresholds);
    let camera = CameraSource::new(platform.camera);
    let network = NetworkManager::new(platform.network, platform.clock.clone());

    let mut ctx = ServerContext::new(config, camera, network, guard, platform.clock);
    if let Some(display) = platform.display {
        ctx = ctx.with_display(display);
    }
    if let Some(events) = platform.events {
        ctx = ctx.with_events(events);
    }
    ctx
}

/// Network first, then the camera. Any failure releases what was acquired.
pub fn bring_up(ctx: &mut ServerContext, camera_config: CameraConfig) -> Result<()> {
    match ctx.config.network_mode {
        InterfaceMode::Station => {
            let ssid = ctx.config.wifi_ssid.clone();
            let password = ctx.config.wifi_password.clone();
            let outcome = ctx.network.connect(
                &ssid,
                &password,
                ctx.config.connect_timeout(),
                ctx.config.connect_retries,
            );
            match outcome {
                Ok(ConnectOutcome::Connected { .. }) => {}
                Ok(ConnectOutcome::Failed {
                    attempts,
                    last_status,
                }) => {
                    ctx.cleanup();
                    bail!(
                        "WiFi connection to '{}' failed after {} attempts ({:?})",
                        ssid,
                        attempts,
                        last_status
                    );
                }
                Err(e) => {
                    ctx.cleanup();
                    bail!("WiFi bring-up failed: {}", e);
                }
            }
        }
        InterfaceMode::AccessPoint => {
            let ap = ctx.config.access_point.clone();
            if let Err(e) = ctx
                .network
                .start_access_point(&ap.ssid, &ap.password, ap.channel)
            {
                ctx.cleanup();
                bail!("Hotspot bring-up failed: {}", e);
            }
        }
    }

    if let Err(e) = ctx.camera.init(camera_config) {
        ctx.cleanup();
        bail!("Camera init failed: {}", e);
    }
    Ok(())
}

/// Bring everything up and serve until shutdown. Cleanup always runs.
pub fn start(config: ServerConfig, platform: Platform) -> Result<()> {
    log::info!("ESP32-Cam streamer {}", version::full_version());

    let mut ctx = build_context(config, platform);
    ctx.reclaim("startup");

    let camera_config = CameraConfig {
        quality: ctx.config.jpeg_quality,
        ..CameraConfig::xiao_esp32s3()
    };
    bring_up(&mut ctx, camera_config)?;

    let server = match HttpServer::bind(ctx.config.http_port) {
        Ok(server) => server,
        Err(e) => {
            ctx.cleanup();
            return Err(e);
        }
    };
    ctx.port = server.port();

    let ip = ctx
        .network
        .get_ip()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "0.0.0.0".to_string());
    log::info!("[HTTP] Control page: http://{}:{}/", ip, ctx.port);
    log::info!("[HTTP] Stream:       http://{}:{}/stream", ip, ctx.port);
    log::info!("[HTTP] Snapshot:     http://{}:{}/capture", ip, ctx.port);
    ctx.mirror_status_to_display();

    let result = server.run(&mut ctx);
    ctx.cleanup();
    result
}
