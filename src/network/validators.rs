use anyhow::{anyhow, Result};

pub const MAX_SSID_LEN: usize = 32;
pub const MIN_WPA2_PASSWORD_LEN: usize = 8;
pub const MAX_WPA2_PASSWORD_LEN: usize = 64;

pub fn validate_ssid(ssid: &str) -> Result<()> {
    if ssid.is_empty() {
        return Err(anyhow!("WiFi SSID cannot be empty"));
    }
    if ssid.len() > MAX_SSID_LEN {
        return Err(anyhow!("WiFi SSID must be 32 characters or less"));
    }
    if ssid.chars().any(|c| c.is_control()) {
        return Err(anyhow!("WiFi SSID cannot contain control characters"));
    }
    Ok(())
}

/// Hotspot passwords: empty means an open network, otherwise WPA2 length rules apply
pub fn validate_ap_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < MIN_WPA2_PASSWORD_LEN {
        return Err(anyhow!("AP password must be at least 8 characters"));
    }
    if password.len() > MAX_WPA2_PASSWORD_LEN {
        return Err(anyhow!("AP password must be 64 characters or less"));
    }
    Ok(())
}

pub fn validate_channel(channel: u8) -> Result<()> {
    if !(1..=14).contains(&channel) {
        return Err(anyhow!("WiFi channel {} out of range 1-14", channel));
    }
    Ok(())
}

pub fn validate_quality(quality: u8) -> Result<()> {
    if !(1..=31).contains(&quality) {
        return Err(anyhow!("JPEG quality {} out of range 1-31", quality));
    }
    Ok(())
}

pub fn validate_port(port: u16) -> Result<()> {
    if port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ssid() {
        assert!(validate_ssid("MyNetwork").is_ok());
        assert!(validate_ssid("").is_err());
        assert!(validate_ssid("a".repeat(33).as_str()).is_err());
        assert!(validate_ssid("Network\0").is_err());
    }

    #[test]
    fn test_validate_ap_password() {
        assert!(validate_ap_password("").is_ok());
        assert!(validate_ap_password("short").is_err());
        assert!(validate_ap_password("esp32camera").is_ok());
        assert!(validate_ap_password(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_ranges() {
        assert!(validate_channel(0).is_err());
        assert!(validate_channel(6).is_ok());
        assert!(validate_channel(15).is_err());
        assert!(validate_quality(0).is_err());
        assert!(validate_quality(31).is_ok());
        assert!(validate_port(0).is_err());
        assert!(validate_port(80).is_ok());
    }
}
