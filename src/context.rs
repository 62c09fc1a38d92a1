use std::rc::Rc;
use std::time::Duration;

use crate::camera::CameraSource;
use crate::clock::Clock;
use crate::config::ServerConfig;
use crate::display::{LogDisplay, StatusDisplay};
use crate::events::{DeviceEvent, EventQueue, ShutdownToken};
use crate::http::page::IndexPage;
use crate::memory::ResourceGuard;
use crate::network::{ConnectionState, InterfaceMode, LinkHealth, NetworkManager};

/// Counters reported under `server` in the status document
#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    pub request_count: u32,
    pub client_count: u32,
    pub active_streams: u32,
    pub total_frames: u32,
    pub low_memory_count: u32,
}

/// Everything the request handlers touch, built once at startup
pub struct ServerContext {
    pub config: ServerConfig,
    pub camera: CameraSource,
    pub network: NetworkManager,
    pub guard: ResourceGuard,
    pub stats: ServerStats,
    pub clock: Rc<dyn Clock>,
    pub page: IndexPage,
    pub port: u16,
    shutdown: ShutdownToken,
    running: bool,
    events: Option<EventQueue>,
    display: Box<dyn StatusDisplay>,
    started_at: Duration,
    last_status_log: Duration,
    last_reconnect: Option<Duration>,
}

impl ServerContext {
    pub fn new(
        config: ServerConfig,
        camera: CameraSource,
        network: NetworkManager,
        guard: ResourceGuard,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let now = clock.now();
        let port = config.http_port;
        Self {
            config,
            camera,
            network,
            guard,
            stats: ServerStats::default(),
            clock,
            page: IndexPage::new(),
            port,
            shutdown: ShutdownToken::new(),
            running: true,
            events: None,
            display: Box::new(LogDisplay),
            started_at: now,
            last_status_log: now,
            last_reconnect: None,
        }
    }

    pub fn with_events(mut self, events: EventQueue) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_display(mut self, display: Box<dyn StatusDisplay>) -> Self {
        self.display = display;
        self
    }

    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running && !self.shutdown.is_cancelled()
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn uptime(&self) -> Duration {
        self.clock.now().saturating_sub(self.started_at)
    }

    /// Forced reclamation, used at startup and after each stream
    pub fn reclaim(&mut self, tag: &str) -> usize {
        self.guard.smart_gc(true, tag).1
    }

    /// Handle whatever the interrupt handlers queued since the last call
    pub fn poll_events(&mut self) {
        let Some(queue) = self.events.as_mut() else {
            return;
        };
        for event in queue.drain() {
            match event {
                DeviceEvent::StatusRequested => self.mirror_status_to_display(),
                DeviceEvent::ShutdownRequested => {
                    log::warn!("[HTTP] Shutdown requested");
                    self.shutdown.cancel();
                    self.running = false;
                }
            }
        }
    }

    /// Idle-tick work of the accept loop: periodic status log with a memory
    /// check, and reconnecting a lost uplink at a bounded rate.
    pub fn housekeeping(&mut self) {
        let now = self.clock.now();

        if now.saturating_sub(self.last_status_log) >= self.config.status_interval() {
            self.last_status_log = now;
            let mem = self.guard.check_memory();
            log::info!(
                "[HTTP] up {}s, {} requests, {} frames, {} streams, {} bytes free ({:.1}%)",
                self.uptime().as_secs(),
                self.stats.request_count,
                self.stats.total_frames,
                self.stats.active_streams,
                mem.free,
                mem.free_percent
            );
            self.guard.smart_gc(false, "status tick");
        }

        self.maintain_uplink(now);
    }

    fn maintain_uplink(&mut self, now: Duration) {
        if self.network.mode() != InterfaceMode::Station {
            return;
        }
        if self.network.monitor() == LinkHealth::Up {
            return;
        }
        if self.network.state() != ConnectionState::Failed {
            return;
        }
        let due = match self.last_reconnect {
            Some(at) => now.saturating_sub(at) >= self.config.reconnect_interval(),
            None => true,
        };
        if !due {
            return;
        }
        self.last_reconnect = Some(now);

        log::info!("[WIFI] Reconnecting to '{}'", self.config.wifi_ssid);
        let ssid = self.config.wifi_ssid.clone();
        let password = self.config.wifi_password.clone();
        match self
            .network
            .connect(&ssid, &password, self.config.connect_timeout(), 1)
        {
            Ok(outcome) if outcome.is_connected() => self.mirror_status_to_display(),
            Ok(outcome) => log::warn!("[WIFI] Reconnect failed: {:?}", outcome),
            Err(e) => log::error!("[WIFI] Reconnect error: {}", e),
        }
    }

    pub fn status_lines(&self) -> Vec<String> {
        let ip = self
            .network
            .get_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "offline".to_string());
        let mem = self.guard.check_memory();
        vec![
            format!("http://{}:{}/", ip, self.port),
            format!("Streams: {}", self.stats.active_streams),
            format!("Frames: {}", self.stats.total_frames),
            format!("Free: {}KB", mem.free / 1024),
        ]
    }

    pub fn mirror_status_to_display(&mut self) {
        let lines = self.status_lines();
        if let Err(e) = self.display.show_lines(&lines) {
            log::debug!("[DISP] Display update failed: {}", e);
        }
    }

    /// Release the camera and the uplink, then reclaim. Safe to call more than once.
    pub fn cleanup(&mut self) {
        log::info!("[HTTP] Cleaning up");
        self.running = false;
        self.camera.deinit();
        self.network.shutdown();
        self.guard.smart_gc(true, "cleanup");
    }
}
