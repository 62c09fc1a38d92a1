//! BOOT button (GPIO0) wired to the device event queue.
//!
//! A single press asks for the status to be mirrored to the display; two
//! presses within `DOUBLE_PRESS_MS` request a shutdown.

use anyhow::Result;
use esp_idf_hal::gpio::{Gpio0, InterruptType, PinDriver, Pull};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::events::{DeviceEvent, EventQueue, EventStorage};

const DOUBLE_PRESS_MS: u32 = 500;

/// Millisecond timestamp of the previous press, 0 when none
static LAST_PRESS_MS: AtomicU32 = AtomicU32::new(0);

fn isr_millis() -> u32 {
    // esp_timer_get_time is safe to call from ISR context
    (unsafe { esp_idf_sys::esp_timer_get_time() } / 1000) as u32
}

pub fn install_boot_button(pin: Gpio0, storage: &'static mut EventStorage) -> Result<EventQueue> {
    let mut button = PinDriver::input(pin)?;
    button.set_pull(Pull::Up)?;
    button.set_interrupt_type(InterruptType::NegEdge)?;

    let (mut producer, queue) = EventQueue::split(storage);

    // The handler only timestamps and enqueues; a full queue drops the press
    unsafe {
        button.subscribe(move || {
            let now = isr_millis().max(1);
            let last = LAST_PRESS_MS.swap(now, Ordering::Relaxed);
            let event = if last != 0 && now.wrapping_sub(last) < DOUBLE_PRESS_MS {
                LAST_PRESS_MS.store(0, Ordering::Relaxed);
                DeviceEvent::ShutdownRequested
            } else {
                DeviceEvent::StatusRequested
            };
            let _ = producer.enqueue(event);
        })?;
    }
    button.enable_interrupt()?;
    log::info!("[BTN] BOOT button armed on GPIO0");

    // The driver disables the interrupt after each edge; re-enable from task context
    Ok(queue.with_rearm(move || {
        if let Err(e) = button.enable_interrupt() {
            log::warn!("[BTN] Failed to re-arm interrupt: {:?}", e);
        }
    }))
}
