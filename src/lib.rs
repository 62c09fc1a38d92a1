//! ESP32 camera node: WiFi uplink, OV2640 frame source and a single-threaded
//! HTTP server for MJPEG streams, snapshots and JSON status/control.

pub mod app;
#[cfg(target_os = "espidf")]
pub mod button;
pub mod camera;
pub mod clock;
pub mod config;
pub mod context;
pub mod display;
pub mod events;
pub mod http;
pub mod logging;
pub mod memory;
pub mod network;
pub mod version;

#[cfg(test)]
mod tests;
