use anyhow::Result;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    nvs::EspDefaultNvsPartition,
    wifi::{AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi},
};
use esp_idf_sys::EspError;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use super::driver::{InterfaceMode, IpConfig, LinkStatus, NetworkDriver, NetworkError, ScanEntry};

/// Last `WIFI_EVENT_STA_DISCONNECTED` reason, 0 while none is pending
static LAST_DISCONNECT_REASON: AtomicU32 = AtomicU32::new(0);
static HANDLER_REGISTERED: AtomicBool = AtomicBool::new(false);

fn esp_err(e: EspError) -> NetworkError {
    NetworkError::Driver(format!("{:?}", e))
}

/// Translate an ESP-IDF `wifi_err_reason_t` into a link status
fn reason_to_status(reason: u32) -> LinkStatus {
    match reason {
        201 => LinkStatus::NoApFound,
        // AUTH_EXPIRE, 4WAY_HANDSHAKE_TIMEOUT, AUTH_FAIL, HANDSHAKE_TIMEOUT
        2 | 15 | 202 | 204 => LinkStatus::WrongPassword,
        _ => LinkStatus::ConnectFail,
    }
}

/// ESP32 radio driver over `EspWifi`, used without the blocking wrapper so
/// that the manager controls every wait.
pub struct EspWifiDriver {
    wifi: EspWifi<'static>,
    client: ClientConfiguration,
    access_point: Option<AccessPointConfiguration>,
    station_active: bool,
    ap_active: bool,
    connecting: bool,
}

impl EspWifiDriver {
    pub fn new(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> Result<Self> {
        log::info!("[WIFI] Initializing radio");
        let wifi = EspWifi::new(modem, sys_loop, Some(nvs))?;
        register_event_handler();

        Ok(Self {
            wifi,
            client: ClientConfiguration::default(),
            access_point: None,
            station_active: false,
            ap_active: false,
            connecting: false,
        })
    }

    /// Push the combination of active modes to the radio
    fn apply(&mut self) -> Result<(), NetworkError> {
        let configuration = match (self.station_active, self.ap_active) {
            (false, false) => {
                if self.wifi.is_started().map_err(esp_err)? {
                    self.wifi.stop().map_err(esp_err)?;
                }
                return Ok(());
            }
            (true, false) => Configuration::Client(self.client.clone()),
            (false, true) => {
                Configuration::AccessPoint(self.access_point.clone().unwrap_or_default())
            }
            (true, true) => Configuration::Mixed(
                self.client.clone(),
                self.access_point.clone().unwrap_or_default(),
            ),
        };

        self.wifi.set_configuration(&configuration).map_err(esp_err)?;
        if !self.wifi.is_started().map_err(esp_err)? {
            self.wifi.start().map_err(esp_err)?;
            disable_power_save();
        }
        Ok(())
    }
}

impl NetworkDriver for EspWifiDriver {
    fn set_active(&mut self, mode: InterfaceMode, active: bool) -> Result<(), NetworkError> {
        match mode {
            InterfaceMode::Station => {
                self.station_active = active;
                if !active {
                    self.connecting = false;
                }
            }
            InterfaceMode::AccessPoint => self.ap_active = active,
        }
        self.apply()
    }

    fn is_active(&self, mode: InterfaceMode) -> bool {
        match mode {
            InterfaceMode::Station => self.station_active,
            InterfaceMode::AccessPoint => self.ap_active,
        }
    }

    fn connect(&mut self, ssid: &str, password: &str) -> Result<(), NetworkError> {
        self.client = ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| NetworkError::InvalidSsid(ssid.to_string()))?,
            password: password
                .try_into()
                .map_err(|_| NetworkError::Driver("password too long".into()))?,
            auth_method: if password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        };
        self.apply()?;

        LAST_DISCONNECT_REASON.store(0, Ordering::SeqCst);
        self.connecting = true;
        self.wifi.connect().map_err(esp_err)
    }

    fn disconnect(&mut self) -> Result<(), NetworkError> {
        self.connecting = false;
        self.wifi.disconnect().map_err(esp_err)
    }

    fn status(&self) -> LinkStatus {
        if self.is_connected() {
            return LinkStatus::GotIp;
        }
        match LAST_DISCONNECT_REASON.load(Ordering::SeqCst) {
            0 if self.connecting => LinkStatus::Connecting,
            0 => LinkStatus::Idle,
            reason => reason_to_status(reason),
        }
    }

    fn is_connected(&self) -> bool {
        let associated = self.wifi.is_connected().unwrap_or(false);
        let has_ip = self
            .wifi
            .sta_netif()
            .get_ip_info()
            .map(|info| !info.ip.is_unspecified())
            .unwrap_or(false);
        associated && has_ip
    }

    fn ifconfig(&self, mode: InterfaceMode) -> Option<IpConfig> {
        let netif = match mode {
            InterfaceMode::Station => self.wifi.sta_netif(),
            InterfaceMode::AccessPoint => self.wifi.ap_netif(),
        };
        let info = netif.get_ip_info().ok()?;
        Some(IpConfig {
            ip: info.ip,
            netmask: prefix_to_netmask(info.subnet.mask.0),
            gateway: info.subnet.gateway,
            dns: info.dns.unwrap_or(Ipv4Addr::UNSPECIFIED),
        })
    }

    fn configure_access_point(
        &mut self,
        ssid: &str,
        password: &str,
        channel: u8,
    ) -> Result<(), NetworkError> {
        self.access_point = Some(AccessPointConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| NetworkError::InvalidSsid(ssid.to_string()))?,
            password: password
                .try_into()
                .map_err(|_| NetworkError::InvalidAccessPoint("password too long".into()))?,
            channel,
            auth_method: if password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            max_connections: 4,
            ..Default::default()
        });
        Ok(())
    }

    fn scan(&mut self) -> Result<Vec<ScanEntry>, NetworkError> {
        let found = self.wifi.scan().map_err(esp_err)?;
        Ok(found
            .into_iter()
            .map(|ap| ScanEntry {
                ssid: ap.ssid.to_string(),
                rssi: ap.signal_strength,
                channel: ap.channel,
            })
            .collect())
    }
}

fn prefix_to_netmask(prefix: u8) -> Ipv4Addr {
    let bits = u32::MAX
        .checked_shl(32u32.saturating_sub(prefix as u32))
        .unwrap_or(0);
    Ipv4Addr::from(bits)
}

fn disable_power_save() {
    // Power save drops the link under sustained streaming traffic
    unsafe {
        use esp_idf_sys::*;
        let result = esp_wifi_set_ps(wifi_ps_type_t_WIFI_PS_NONE);
        if result == ESP_OK {
            log::info!("[WIFI] Power save disabled");
        } else {
            log::warn!("[WIFI] Failed to set power save mode: {:?}", result);
        }
    }
}

/// Record disconnect reasons from the system event loop
fn register_event_handler() {
    if HANDLER_REGISTERED.swap(true, Ordering::SeqCst) {
        return;
    }

    unsafe extern "C" fn wifi_event_handler(
        _handler_arg: *mut core::ffi::c_void,
        event_base: esp_idf_sys::esp_event_base_t,
        event_id: i32,
        event_data: *mut core::ffi::c_void,
    ) {
        use esp_idf_sys::*;
        if event_base != WIFI_EVENT {
            return;
        }
        match event_id as u32 {
            wifi_event_t_WIFI_EVENT_STA_DISCONNECTED => {
                if !event_data.is_null() {
                    let disc = &*(event_data as *const wifi_event_sta_disconnected_t);
                    LAST_DISCONNECT_REASON.store(disc.reason as u32, Ordering::SeqCst);
                }
            }
            wifi_event_t_WIFI_EVENT_STA_CONNECTED => {
                LAST_DISCONNECT_REASON.store(0, Ordering::SeqCst);
            }
            _ => {}
        }
    }

    unsafe {
        use esp_idf_sys::*;
        let err = esp_event_handler_register(
            WIFI_EVENT,
            ESP_EVENT_ANY_ID,
            Some(wifi_event_handler),
            core::ptr::null_mut(),
        );
        if err != ESP_OK {
            log::warn!("[WIFI] Failed to register event handler: {}", err);
        }
    }
}
