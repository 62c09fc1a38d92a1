//! Cooperative memory guard.
//!
//! Nothing here ever fails: low memory is reported through flags and handled
//! by reclaiming at fixed cut points (request count, stream frame count,
//! status tick).

#[cfg(target_os = "espidf")]
pub mod esp;
pub mod fixed;

pub use fixed::FixedHeap;

use serde::Serialize;

/// Raw heap numbers as reported by a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapReading {
    pub free: usize,
    pub allocated: usize,
}

pub trait MemoryProbe {
    fn read(&self) -> HeapReading;

    /// Give the allocator a chance to release memory
    fn reclaim(&mut self);
}

#[derive(Debug, Clone, Copy)]
pub struct MemoryThresholds {
    /// Below this many free bytes a non-forced `smart_gc` reclaims
    pub gc_threshold: usize,
    /// Below this many free bytes `check_memory` raises the warning flag
    pub low_memory_warning: usize,
}

impl Default for MemoryThresholds {
    fn default() -> Self {
        Self {
            gc_threshold: 80_000,
            low_memory_warning: 40_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MemoryStatus {
    pub free: usize,
    pub allocated: usize,
    pub total: usize,
    pub free_percent: f32,
    pub warning: bool,
    /// Free memory already sits under the reclaim threshold
    pub gc_due: bool,
}

pub struct ResourceGuard {
    probe: Box<dyn MemoryProbe>,
    thresholds: MemoryThresholds,
    gc_count: u32,
}

impl ResourceGuard {
    pub fn new(probe: Box<dyn MemoryProbe>, thresholds: MemoryThresholds) -> Self {
        Self {
            probe,
            thresholds,
            gc_count: 0,
        }
    }

    pub fn gc_count(&self) -> u32 {
        self.gc_count
    }

    /// Snapshot of the heap. The reclaim threshold is evaluated before the warning.
    pub fn check_memory(&self) -> MemoryStatus {
        let reading = self.probe.read();
        let total = reading.free + reading.allocated;

        let gc_due = reading.free < self.thresholds.gc_threshold;
        let warning = reading.free < self.thresholds.low_memory_warning;

        let free_percent = if total == 0 {
            0.0
        } else {
            (reading.free as f32 / total as f32) * 100.0
        };

        if warning {
            log::warn!(
                "[MEM] Low memory: {} bytes free ({:.1}%)",
                reading.free,
                free_percent
            );
        }

        MemoryStatus {
            free: reading.free,
            allocated: reading.allocated,
            total,
            free_percent,
            warning,
            gc_due,
        }
    }

    /// Reclaim when forced or when free memory is under the threshold.
    /// Returns whether a reclaim ran and the free bytes afterwards.
    pub fn smart_gc(&mut self, force: bool, tag: &str) -> (bool, usize) {
        let before = self.probe.read().free;

        if !force && before >= self.thresholds.gc_threshold {
            return (false, before);
        }

        self.probe.reclaim();
        self.gc_count = self.gc_count.wrapping_add(1);

        let after = self.probe.read().free;
        log::debug!(
            "[MEM] gc ({}): {} -> {} bytes free ({:+})",
            tag,
            before,
            after,
            after as i64 - before as i64
        );
        (true, after)
    }
}
