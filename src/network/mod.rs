pub mod driver;
pub mod loopback;
pub mod validators;
#[cfg(target_os = "espidf")]
pub mod wifi;

pub use driver::{InterfaceMode, IpConfig, LinkStatus, NetworkDriver, NetworkError, ScanEntry};
pub use loopback::LoopbackNetwork;

use serde::Serialize;
use std::net::Ipv4Addr;
use std::rc::Rc;
use std::time::Duration;

use crate::clock::Clock;

/// Status poll cadence while an attempt is in flight
pub const CONNECT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Pause between failed attempts
pub const CONNECT_BACKOFF: Duration = Duration::from_secs(2);
/// Time the hotspot needs before its interface reports an address
pub const AP_SETTLE: Duration = Duration::from_secs(2);
pub const DEFAULT_AP_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected { ip: Ipv4Addr },
    Failed { attempts: u32, last_status: LinkStatus },
}

impl ConnectOutcome {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectOutcome::Connected { .. })
    }
}

/// Result of a non-blocking uplink check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkHealth {
    Up,
    /// Was connected until this check
    Lost,
    Down,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkStatus {
    pub state: ConnectionState,
    pub mode: InterfaceMode,
    pub connected: bool,
    pub ssid: Option<String>,
    pub ip: Option<String>,
    pub ifconfig: Option<IpConfig>,
}

/// Sole owner of the uplink interface. Reconnection policy lives with the caller.
pub struct NetworkManager {
    driver: Box<dyn NetworkDriver>,
    clock: Rc<dyn Clock>,
    state: ConnectionState,
    mode: InterfaceMode,
    ssid: Option<String>,
}

impl NetworkManager {
    pub fn new(driver: Box<dyn NetworkDriver>, clock: Rc<dyn Clock>) -> Self {
        Self {
            driver,
            clock,
            state: ConnectionState::Idle,
            mode: InterfaceMode::Station,
            ssid: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn mode(&self) -> InterfaceMode {
        self.mode
    }

    /// Join `ssid` as a client, trying up to `retries` times.
    ///
    /// Each attempt polls the link every second until an address is assigned,
    /// a terminal failure is reported, or `timeout` passes. Invalid arguments
    /// and radio activation errors are returned as `Err`; exhausted retries
    /// are an `Ok(ConnectOutcome::Failed)`.
    pub fn connect(
        &mut self,
        ssid: &str,
        password: &str,
        timeout: Duration,
        retries: u32,
    ) -> Result<ConnectOutcome, NetworkError> {
        validators::validate_ssid(ssid).map_err(|e| NetworkError::InvalidSsid(e.to_string()))?;

        if self.driver.is_active(InterfaceMode::AccessPoint) {
            log::info!("[WIFI] Shutting down hotspot before joining {}", ssid);
            self.driver.set_active(InterfaceMode::AccessPoint, false)?;
        }
        if let Err(e) = self.driver.set_active(InterfaceMode::Station, true) {
            self.state = ConnectionState::Failed;
            return Err(e);
        }
        self.mode = InterfaceMode::Station;

        if self.driver.is_connected() {
            log::info!("[WIFI] Dropping previous association");
            if let Err(e) = self.driver.disconnect() {
                log::warn!("[WIFI] Disconnect before connect failed: {}", e);
            }
        }

        self.survey(ssid);

        self.state = ConnectionState::Connecting;
        let mut last_status = LinkStatus::Idle;

        for attempt in 1..=retries {
            log::info!("[WIFI] Connecting to '{}' (attempt {}/{})", ssid, attempt, retries);

            last_status = match self.driver.connect(ssid, password) {
                Ok(()) => self.wait_for_link(timeout),
                Err(e) => {
                    log::warn!("[WIFI] Connect call failed: {}", e);
                    LinkStatus::ConnectFail
                }
            };

            if last_status == LinkStatus::GotIp {
                let ip = self
                    .driver
                    .ifconfig(InterfaceMode::Station)
                    .map(|c| c.ip)
                    .unwrap_or(Ipv4Addr::UNSPECIFIED);
                self.state = ConnectionState::Connected;
                self.ssid = Some(ssid.to_string());
                log::info!("[WIFI] Connected to '{}', IP {}", ssid, ip);
                return Ok(ConnectOutcome::Connected { ip });
            }

            log::warn!(
                "[WIFI] Attempt {} failed: {:?} ({})",
                attempt,
                last_status,
                last_status.describe()
            );
            if attempt < retries {
                self.clock.sleep(CONNECT_BACKOFF);
            }
        }

        self.state = ConnectionState::Failed;
        log::error!("[WIFI] Giving up on '{}' after {} attempts", ssid, retries);
        Ok(ConnectOutcome::Failed {
            attempts: retries,
            last_status,
        })
    }

    /// Log what is in range before joining; a missing target is the most
    /// common field failure.
    fn survey(&mut self, ssid: &str) {
        let entries = match self.driver.scan() {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("[WIFI] Scan failed: {}", e);
                return;
            }
        };
        for entry in &entries {
            log::debug!(
                "[WIFI]   {:<32} ch{:>2} {:>4} dBm",
                entry.ssid,
                entry.channel,
                entry.rssi
            );
        }
        if !entries.is_empty() && !entries.iter().any(|e| e.ssid == ssid) {
            log::warn!(
                "[WIFI] '{}' not among {} visible networks",
                ssid,
                entries.len()
            );
        }
    }

    fn wait_for_link(&self, timeout: Duration) -> LinkStatus {
        let started = self.clock.now();
        loop {
            let status = self.driver.status();
            if status == LinkStatus::GotIp || status.is_terminal_failure() {
                return status;
            }
            if self.clock.now().saturating_sub(started) >= timeout {
                log::warn!("[WIFI] No address after {:?}", timeout);
                return status;
            }
            self.clock.sleep(CONNECT_POLL_INTERVAL);
        }
    }

    /// Drop the client association. Does nothing when not connected.
    pub fn disconnect(&mut self) {
        if self.mode == InterfaceMode::Station && self.driver.is_connected() {
            if let Err(e) = self.driver.disconnect() {
                log::warn!("[WIFI] Disconnect failed: {}", e);
            }
            log::info!("[WIFI] Disconnected");
        }
        if self.mode == InterfaceMode::Station {
            self.state = ConnectionState::Idle;
        }
    }

    pub fn is_connected(&self) -> bool {
        match self.mode {
            InterfaceMode::Station => self.driver.is_connected(),
            InterfaceMode::AccessPoint => self.driver.is_active(InterfaceMode::AccessPoint),
        }
    }

    pub fn get_ip(&self) -> Option<Ipv4Addr> {
        if !self.is_connected() {
            return None;
        }
        let ip = self.driver.ifconfig(self.mode).map(|c| c.ip);
        match self.mode {
            InterfaceMode::AccessPoint => {
                ip.filter(|ip| !ip.is_unspecified()).or(Some(DEFAULT_AP_IP))
            }
            InterfaceMode::Station => ip,
        }
    }

    /// Report whether a previously established uplink is still there.
    /// Never blocks and never reconnects.
    pub fn monitor(&mut self) -> LinkHealth {
        if self.is_connected() {
            return LinkHealth::Up;
        }
        if self.state == ConnectionState::Connected {
            log::warn!("[WIFI] Connection lost");
            self.state = ConnectionState::Failed;
            return LinkHealth::Lost;
        }
        LinkHealth::Down
    }

    /// Bring up the hotspot, tearing down client mode first. Returns the AP address.
    pub fn start_access_point(
        &mut self,
        ssid: &str,
        password: &str,
        channel: u8,
    ) -> Result<Ipv4Addr, NetworkError> {
        validators::validate_ssid(ssid).map_err(|e| NetworkError::InvalidSsid(e.to_string()))?;
        validators::validate_ap_password(password)
            .and_then(|_| validators::validate_channel(channel))
            .map_err(|e| NetworkError::InvalidAccessPoint(e.to_string()))?;

        if self.driver.is_active(InterfaceMode::Station) {
            self.disconnect();
            self.driver.set_active(InterfaceMode::Station, false)?;
        }

        self.driver.configure_access_point(ssid, password, channel)?;
        self.driver.set_active(InterfaceMode::AccessPoint, true)?;
        self.mode = InterfaceMode::AccessPoint;
        self.clock.sleep(AP_SETTLE);

        let ip = self
            .driver
            .ifconfig(InterfaceMode::AccessPoint)
            .map(|c| c.ip)
            .filter(|ip| !ip.is_unspecified())
            .unwrap_or(DEFAULT_AP_IP);
        self.state = ConnectionState::Connected;
        self.ssid = Some(ssid.to_string());
        log::info!("[WIFI] Hotspot '{}' up on channel {}, IP {}", ssid, channel, ip);
        Ok(ip)
    }

    /// Does nothing when the hotspot is not running.
    pub fn stop_access_point(&mut self) {
        if !self.driver.is_active(InterfaceMode::AccessPoint) {
            return;
        }
        if let Err(e) = self.driver.set_active(InterfaceMode::AccessPoint, false) {
            log::warn!("[WIFI] Failed to stop hotspot: {}", e);
        }
        if self.mode == InterfaceMode::AccessPoint {
            self.state = ConnectionState::Idle;
            self.mode = InterfaceMode::Station;
        }
        log::info!("[WIFI] Hotspot stopped");
    }

    /// Tear down whichever mode is active
    pub fn shutdown(&mut self) {
        self.stop_access_point();
        self.disconnect();
        if self.driver.is_active(InterfaceMode::Station) {
            if let Err(e) = self.driver.set_active(InterfaceMode::Station, false) {
                log::warn!("[WIFI] Failed to deactivate station: {}", e);
            }
        }
    }

    pub fn status(&self) -> NetworkStatus {
        let connected = self.is_connected();
        let ifconfig = if connected {
            self.driver.ifconfig(self.mode)
        } else {
            None
        };
        NetworkStatus {
            state: self.state,
            mode: self.mode,
            connected,
            ssid: self.ssid.clone(),
            ip: ifconfig.map(|c| c.ip.to_string()),
            ifconfig,
        }
    }
}

