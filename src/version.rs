// Centralized version information

// Firmware version shown on the control page and in the boot banner
pub const DISPLAY_VERSION: &str = "v2.4-cam";

// Cargo package version from Cargo.toml
pub const CARGO_VERSION: &str = env!("CARGO_PKG_VERSION");

// Full version string including Cargo version
pub fn full_version() -> String {
    format!("{} ({})", DISPLAY_VERSION, CARGO_VERSION)
}

// Value for the `Server:` response header
pub fn server_header() -> String {
    format!("esp32-cam/{}", CARGO_VERSION)
}
