use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("invalid SSID: {0}")]
    InvalidSsid(String),

    #[error("invalid access point settings: {0}")]
    InvalidAccessPoint(String),

    #[error("network driver error: {0}")]
    Driver(String),
}

/// Client (station) and hotspot modes are mutually exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceMode {
    Station,
    AccessPoint,
}

/// Link status as reported by the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Idle,
    Connecting,
    WrongPassword,
    NoApFound,
    ConnectFail,
    GotIp,
}

impl LinkStatus {
    /// Map the numeric status codes used by the board's network stack.
    /// 1000 (association) and 1001 (handshake timeout) are treated as in progress.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => LinkStatus::Idle,
            1000 | 1001 => LinkStatus::Connecting,
            2 => LinkStatus::WrongPassword,
            1 | 3 => LinkStatus::NoApFound,
            4 => LinkStatus::ConnectFail,
            5 => LinkStatus::GotIp,
            _ => LinkStatus::ConnectFail,
        }
    }

    /// What the status means, for failure logs
    pub fn describe(self) -> &'static str {
        match self {
            LinkStatus::Idle => "no connection and no activity",
            LinkStatus::Connecting => "still associating",
            LinkStatus::WrongPassword => "authentication failed, check the password",
            LinkStatus::NoApFound => "no access point answered to that SSID",
            LinkStatus::ConnectFail => "association failed",
            LinkStatus::GotIp => "connected with an address",
        }
    }

    /// A status that ends the current attempt without waiting for the timeout
    pub fn is_terminal_failure(self) -> bool {
        matches!(
            self,
            LinkStatus::WrongPassword | LinkStatus::NoApFound | LinkStatus::ConnectFail
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IpConfig {
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub dns: Ipv4Addr,
}

/// A network seen by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub ssid: String,
    pub rssi: i8,
    pub channel: u8,
}

/// Contract of the WiFi radio. Every call returns promptly; waiting is done
/// by the manager.
pub trait NetworkDriver {
    fn set_active(&mut self, mode: InterfaceMode, active: bool) -> Result<(), NetworkError>;
    fn is_active(&self, mode: InterfaceMode) -> bool;

    /// Start associating with `ssid`; progress is observed through `status`
    fn connect(&mut self, ssid: &str, password: &str) -> Result<(), NetworkError>;
    fn disconnect(&mut self) -> Result<(), NetworkError>;

    fn status(&self) -> LinkStatus;
    fn is_connected(&self) -> bool;
    fn ifconfig(&self, mode: InterfaceMode) -> Option<IpConfig>;

    fn configure_access_point(
        &mut self,
        ssid: &str,
        password: &str,
        channel: u8,
    ) -> Result<(), NetworkError>;

    /// Networks in range. Radios without scan support report none.
    fn scan(&mut self) -> Result<Vec<ScanEntry>, NetworkError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_link_status() {
        assert_eq!(LinkStatus::from_code(5), LinkStatus::GotIp);
        assert_eq!(LinkStatus::from_code(2), LinkStatus::WrongPassword);
        assert_eq!(LinkStatus::from_code(1001), LinkStatus::Connecting);
        assert_eq!(LinkStatus::from_code(1), LinkStatus::NoApFound);
        assert_eq!(LinkStatus::from_code(-7), LinkStatus::ConnectFail);
        assert!(LinkStatus::NoApFound.is_terminal_failure());
        assert!(!LinkStatus::Connecting.is_terminal_failure());
        assert!(!LinkStatus::GotIp.is_terminal_failure());
    }

    #[test]
    fn failures_have_distinct_descriptions() {
        let failures = [
            LinkStatus::WrongPassword,
            LinkStatus::NoApFound,
            LinkStatus::ConnectFail,
        ];
        for (i, a) in failures.iter().enumerate() {
            assert!(!a.describe().is_empty());
            for b in &failures[i + 1..] {
                assert_ne!(a.describe(), b.describe());
            }
        }
        assert!(LinkStatus::WrongPassword.describe().contains("password"));
    }

    struct SilentRadio;

    impl NetworkDriver for SilentRadio {
        fn set_active(&mut self, _: InterfaceMode, _: bool) -> Result<(), NetworkError> {
            Ok(())
        }
        fn is_active(&self, _: InterfaceMode) -> bool {
            false
        }
        fn connect(&mut self, _: &str, _: &str) -> Result<(), NetworkError> {
            Ok(())
        }
        fn disconnect(&mut self) -> Result<(), NetworkError> {
            Ok(())
        }
        fn status(&self) -> LinkStatus {
            LinkStatus::Idle
        }
        fn is_connected(&self) -> bool {
            false
        }
        fn ifconfig(&self, _: InterfaceMode) -> Option<IpConfig> {
            None
        }
        fn configure_access_point(&mut self, _: &str, _: &str, _: u8) -> Result<(), NetworkError> {
            Ok(())
        }
    }

    #[test]
    fn scan_defaults_to_nothing_visible() {
        assert!(SilentRadio.scan().unwrap().is_empty());
    }
}
