use std::fs;
use std::path::Path;

fn main() -> anyhow::Result<()> {
    // ESP-IDF link and cfg args only matter when building for the device
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();

        // Add crash log helper for better panic diagnostics
        println!("cargo:rustc-link-arg=-Wl,--undefined=esp_backtrace_print_app_description");
    }

    println!("cargo:rerun-if-changed=wifi_config.h");

    // Read WiFi configuration if it exists
    let wifi_config_path = "wifi_config.h";
    let contents = if Path::new(wifi_config_path).exists() {
        fs::read_to_string(wifi_config_path)?
    } else {
        println!("cargo:warning=wifi_config.h not found! Copy wifi_config.h.example to wifi_config.h and add your credentials.");
        String::new()
    };

    // Missing defines fall back to empty strings so env!() always resolves
    let ssid = define_value(&contents, "WIFI_SSID").unwrap_or_default();
    let password = define_value(&contents, "WIFI_PASSWORD").unwrap_or_default();
    println!("cargo:rustc-env=WIFI_SSID={}", ssid);
    println!("cargo:rustc-env=WIFI_PASSWORD={}", password);

    Ok(())
}

fn define_value(contents: &str, name: &str) -> Option<String> {
    let needle = format!("#define {} ", name);
    contents
        .lines()
        .find(|l| l.trim_start().starts_with(&needle))
        .and_then(|l| l.split('"').nth(1))
        .map(str::to_string)
}
