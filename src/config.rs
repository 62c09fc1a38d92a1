use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::network::validators;
use crate::network::InterfaceMode;

#[cfg(target_os = "espidf")]
const CONFIG_NAMESPACE: &str = "camcfg";
#[cfg(target_os = "espidf")]
const CONFIG_KEY: &str = "config";

/// Env var naming a JSON override file for the host build
#[cfg(not(target_os = "espidf"))]
pub const CONFIG_ENV_VAR: &str = "CAM_STREAMER_CONFIG";

/// Every tunable of the streaming node. Read once at startup, never hot-reloaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    // WiFi settings
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub network_mode: InterfaceMode,
    pub access_point: AccessPointConfig,
    pub connect_timeout_secs: u64,
    pub connect_retries: u32,
    pub reconnect_interval_secs: u64,

    // HTTP server
    pub http_port: u16,
    pub socket_timeout_secs: u64,
    pub accept_poll_ms: u64,
    pub status_interval_secs: u64,

    // Memory guard
    pub gc_threshold: usize,
    pub low_memory_warning: usize,
    pub gc_interval: u32,

    // Stream session
    pub stream_timeout_secs: u64,
    pub stream_gc_interval: u32,
    pub frame_delay_ms: u64,
    pub max_errors: u32,
    pub error_backoff_ms: u64,

    // Initial JPEG quality handed to the camera profile
    pub jpeg_quality: u8,

    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AccessPointConfig {
    pub ssid: String,
    pub password: String,
    pub channel: u8,
}

impl Default for AccessPointConfig {
    fn default() -> Self {
        Self {
            ssid: "ESP32-Cam".to_string(),
            password: "12345678".to_string(),
            channel: 11,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        // Baked in by build.rs from wifi_config.h, which is not committed
        let wifi_ssid = env!("WIFI_SSID");
        let wifi_password = env!("WIFI_PASSWORD");

        Self {
            wifi_ssid: wifi_ssid.to_string(),
            wifi_password: wifi_password.to_string(),
            network_mode: InterfaceMode::Station,
            access_point: AccessPointConfig::default(),
            connect_timeout_secs: 30,
            connect_retries: 3,
            reconnect_interval_secs: 30,
            http_port: 80,
            socket_timeout_secs: 5,
            accept_poll_ms: 100,
            status_interval_secs: 60,
            gc_threshold: 80_000,
            low_memory_warning: 40_000,
            gc_interval: 50,
            stream_timeout_secs: 120,
            stream_gc_interval: 30,
            frame_delay_ms: 80,
            max_errors: 5,
            error_backoff_ms: 100,
            jpeg_quality: 12,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Parse a (possibly partial) JSON override; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ServerConfig =
            serde_json::from_str(json).context("Invalid configuration JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.network_mode == InterfaceMode::Station {
            validators::validate_ssid(&self.wifi_ssid)?;
        } else {
            validators::validate_ssid(&self.access_point.ssid)?;
            validators::validate_ap_password(&self.access_point.password)?;
            validators::validate_channel(self.access_point.channel)?;
        }
        validators::validate_port(self.http_port)?;
        validators::validate_quality(self.jpeg_quality)?;
        if self.connect_retries == 0 {
            anyhow::bail!("connect_retries must be at least 1");
        }
        if self.max_errors == 0 {
            anyhow::bail!("max_errors must be at least 1");
        }
        if self.low_memory_warning > self.gc_threshold {
            log::warn!(
                "[CFG] low_memory_warning ({}) above gc_threshold ({})",
                self.low_memory_warning,
                self.gc_threshold
            );
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval_secs)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_timeout_secs)
    }

    pub fn accept_poll(&self) -> Duration {
        Duration::from_millis(self.accept_poll_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs)
    }

    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

/// Load the NVS override if one was stored, otherwise the compiled defaults.
#[cfg(target_os = "espidf")]
pub fn load_or_default(
    nvs_partition: esp_idf_svc::nvs::EspDefaultNvsPartition,
) -> Result<ServerConfig> {
    match load_from_nvs(nvs_partition) {
        Ok(Some(mut config)) => {
            log::info!("[CFG] Loaded configuration override from NVS");
            // An override without credentials keeps the compiled-in ones
            if config.wifi_ssid.is_empty() {
                let defaults = ServerConfig::default();
                config.wifi_ssid = defaults.wifi_ssid;
                config.wifi_password = defaults.wifi_password;
            }
            config.validate()?;
            Ok(config)
        }
        Ok(None) => {
            log::info!("[CFG] No NVS override, using compiled defaults");
            let config = ServerConfig::default();
            config.validate()?;
            Ok(config)
        }
        Err(e) => {
            log::warn!("[CFG] Failed to read NVS override: {:?}, using defaults", e);
            let config = ServerConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

#[cfg(target_os = "espidf")]
fn load_from_nvs(
    nvs_partition: esp_idf_svc::nvs::EspDefaultNvsPartition,
) -> Result<Option<ServerConfig>> {
    use esp_idf_svc::nvs::EspNvs;

    let nvs = EspNvs::new(nvs_partition, CONFIG_NAMESPACE, true)?;
    let mut buf = vec![0u8; 2048];
    let Some(data) = nvs.get_blob(CONFIG_KEY, &mut buf)? else {
        return Ok(None);
    };
    let config: ServerConfig = serde_json::from_slice(data)?;
    Ok(Some(config))
}

/// Host build: optional JSON file named by `CAM_STREAMER_CONFIG`.
#[cfg(not(target_os = "espidf"))]
pub fn load_or_default() -> Result<ServerConfig> {
    let mut config = match std::env::var(CONFIG_ENV_VAR) {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path))?;
            log::info!("[CFG] Loaded configuration from {}", path);
            serde_json::from_str::<ServerConfig>(&json).context("Invalid configuration JSON")?
        }
        Err(_) => ServerConfig::default(),
    };

    // The simulator never associates with a real AP
    if config.wifi_ssid.is_empty() {
        config.wifi_ssid = "loopback".to_string();
    }
    if config.http_port == 80 {
        config.http_port = 8080;
    }
    config.validate()?;
    Ok(config)
}
