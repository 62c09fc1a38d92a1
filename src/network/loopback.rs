use std::net::Ipv4Addr;

use super::driver::{InterfaceMode, IpConfig, LinkStatus, NetworkDriver, NetworkError};

/// Network driver for the host build: every association succeeds at once on
/// the loopback address.
#[derive(Debug, Default)]
pub struct LoopbackNetwork {
    station_active: bool,
    ap_active: bool,
    connected: bool,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn loopback_config(ip: Ipv4Addr) -> IpConfig {
        IpConfig {
            ip,
            netmask: Ipv4Addr::new(255, 0, 0, 0),
            gateway: Ipv4Addr::LOCALHOST,
            dns: Ipv4Addr::LOCALHOST,
        }
    }
}

impl NetworkDriver for LoopbackNetwork {
    fn set_active(&mut self, mode: InterfaceMode, active: bool) -> Result<(), NetworkError> {
        match mode {
            InterfaceMode::Station => {
                self.station_active = active;
                if !active {
                    self.connected = false;
                }
            }
            InterfaceMode::AccessPoint => self.ap_active = active,
        }
        Ok(())
    }

    fn is_active(&self, mode: InterfaceMode) -> bool {
        match mode {
            InterfaceMode::Station => self.station_active,
            InterfaceMode::AccessPoint => self.ap_active,
        }
    }

    fn connect(&mut self, _ssid: &str, _password: &str) -> Result<(), NetworkError> {
        if !self.station_active {
            return Err(NetworkError::Driver("station interface inactive".into()));
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), NetworkError> {
        self.connected = false;
        Ok(())
    }

    fn status(&self) -> LinkStatus {
        if self.connected {
            LinkStatus::GotIp
        } else {
            LinkStatus::Idle
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn ifconfig(&self, mode: InterfaceMode) -> Option<IpConfig> {
        match mode {
            InterfaceMode::Station if self.connected => {
                Some(Self::loopback_config(Ipv4Addr::LOCALHOST))
            }
            InterfaceMode::AccessPoint if self.ap_active => {
                Some(Self::loopback_config(Ipv4Addr::new(127, 0, 0, 2)))
            }
            _ => None,
        }
    }

    fn configure_access_point(
        &mut self,
        ssid: &str,
        _password: &str,
        channel: u8,
    ) -> Result<(), NetworkError> {
        log::debug!("[LOOP] Hotspot '{}' on channel {}", ssid, channel);
        Ok(())
    }
}
