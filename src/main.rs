use anyhow::Result;
use log::LevelFilter;
use static_cell::StaticCell;
use std::rc::Rc;

use esp32_cam_streamer::app::{self, Platform};
use esp32_cam_streamer::clock::SystemClock;
use esp32_cam_streamer::events::EventStorage;
use esp32_cam_streamer::{config, logging};

#[cfg(target_os = "espidf")]
use esp_idf_sys as _; // Binstart

// Generate ESP-IDF app descriptor
#[cfg(target_os = "espidf")]
#[allow(unexpected_cfgs)]
mod app_desc {
    esp_idf_sys::esp_app_desc!();
}

static EVENTS: StaticCell<EventStorage> = StaticCell::new();

fn main() -> Result<()> {
    #[cfg(target_os = "espidf")]
    esp_idf_svc::sys::link_patches();

    logging::init_logger(LevelFilter::Info).map_err(|e| anyhow::anyhow!("{}", e))?;

    let result = run();
    if let Err(e) = &result {
        log::error!("Fatal: {:#}", e);
    }
    result
}

#[cfg(target_os = "espidf")]
fn run() -> Result<()> {
    use esp32_cam_streamer::button;
    use esp32_cam_streamer::camera::esp::EspCamera;
    use esp32_cam_streamer::memory::esp::EspHeapProbe;
    use esp32_cam_streamer::network::wifi::EspWifiDriver;
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs::EspDefaultNvsPartition};
    use heapless::spsc::Queue;

    log::info!("Free heap: {} bytes", unsafe {
        esp_idf_sys::esp_get_free_heap_size()
    });

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let config = config::load_or_default(nvs.clone())?;
    if !logging::set_max_level_from_str(&config.log_level) {
        log::warn!("Unknown log level '{}', keeping info", config.log_level);
    }

    let events = button::install_boot_button(peripherals.pins.gpio0, EVENTS.init(Queue::new()))?;
    let wifi = EspWifiDriver::new(peripherals.modem, sys_loop, nvs)?;

    let platform = Platform {
        camera: Box::new(EspCamera::new()),
        network: Box::new(wifi),
        memory: Box::new(EspHeapProbe::new()),
        clock: Rc::new(SystemClock::new()),
        display: None,
        events: Some(events),
    };
    app::start(config, platform)
}

/// Host simulator: same server on port 8080 with a simulated camera.
/// Type `status` or `quit` on stdin to raise the device events.
#[cfg(not(target_os = "espidf"))]
fn run() -> Result<()> {
    use esp32_cam_streamer::camera::sim::SimulatedOv2640;
    use esp32_cam_streamer::events::{DeviceEvent, EventQueue};
    use esp32_cam_streamer::memory::FixedHeap;
    use esp32_cam_streamer::network::LoopbackNetwork;
    use heapless::spsc::Queue;
    use std::io::BufRead;

    let config = config::load_or_default()?;
    if !logging::set_max_level_from_str(&config.log_level) {
        log::warn!("Unknown log level '{}', keeping info", config.log_level);
    }

    let (mut producer, events) = EventQueue::split(EVENTS.init(Queue::new()));
    std::thread::Builder::new()
        .name("stdin-events".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines().map_while(Result::ok) {
                let event = match line.trim() {
                    "status" => DeviceEvent::StatusRequested,
                    "quit" | "exit" => DeviceEvent::ShutdownRequested,
                    _ => continue,
                };
                if producer.enqueue(event).is_err() {
                    log::warn!("Event queue full, dropping {:?}", event);
                }
            }
        })?;

    // 512 KB PSRAM-class budget with a little headroom returned per reclaim
    let heap = FixedHeap::new(512 * 1024);
    heap.set_free(320 * 1024);
    heap.set_reclaim_gain(4 * 1024);

    let platform = Platform {
        camera: Box::new(SimulatedOv2640::new()),
        network: Box::new(LoopbackNetwork::new()),
        memory: Box::new(heap),
        clock: Rc::new(SystemClock::new()),
        display: None,
        events: Some(events),
    };
    app::start(config, platform)
}
