use esp_idf_hal::delay::FreeRtos;
use esp_idf_sys::*;

use super::{HeapReading, MemoryProbe};

/// Heap probe over the ESP-IDF `heap_caps` API (internal DRAM plus PSRAM)
pub struct EspHeapProbe;

impl EspHeapProbe {
    pub fn new() -> Self {
        log_heap_regions("boot");
        Self
    }
}

impl Default for EspHeapProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for EspHeapProbe {
    fn read(&self) -> HeapReading {
        let mut info = multi_heap_info_t::default();
        unsafe {
            heap_caps_get_info(&mut info, MALLOC_CAP_DEFAULT);
        }
        HeapReading {
            free: unsafe { esp_get_free_heap_size() } as usize,
            allocated: info.total_allocated_bytes as usize,
        }
    }

    fn reclaim(&mut self) {
        // Closed sockets and returned frame buffers are freed by the idle and
        // tcpip tasks, so yield long enough for them to run.
        FreeRtos::delay_ms(10);
    }
}

/// Log internal DRAM and PSRAM usage with a label
pub fn log_heap_regions(label: &str) {
    unsafe {
        let internal_free = heap_caps_get_free_size(MALLOC_CAP_INTERNAL);
        let internal_largest = heap_caps_get_largest_free_block(MALLOC_CAP_INTERNAL);
        let internal_min = heap_caps_get_minimum_free_size(MALLOC_CAP_INTERNAL);
        let psram_free = heap_caps_get_free_size(MALLOC_CAP_SPIRAM);
        let psram_largest = heap_caps_get_largest_free_block(MALLOC_CAP_SPIRAM);
        let stack_watermark = uxTaskGetStackHighWaterMark(std::ptr::null_mut());

        log::info!("[MEM] Heap [{}]:", label);
        log::info!(
            "[MEM]   Internal DRAM: free={} KB, largest={} KB, min={} KB",
            internal_free / 1024,
            internal_largest / 1024,
            internal_min / 1024
        );
        log::info!(
            "[MEM]   PSRAM: free={} KB, largest={} KB",
            psram_free / 1024,
            psram_largest / 1024
        );
        log::info!("[MEM]   Stack remaining: {} bytes", stack_watermark);

        if internal_largest < 4096 {
            log::error!("[MEM] Internal DRAM largest block < 4KB");
        }
    }
}
