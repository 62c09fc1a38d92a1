use std::cell::Cell;
use std::rc::Rc;

use super::{HeapReading, MemoryProbe};

/// Fixed-size heap model for the host build and tests.
///
/// Clones share the same counters, so a test can keep a handle while the
/// guard owns the probe.
#[derive(Clone)]
pub struct FixedHeap {
    inner: Rc<Inner>,
}

struct Inner {
    total: usize,
    free: Cell<usize>,
    reclaim_gain: Cell<usize>,
    reclaims: Cell<u32>,
}

impl FixedHeap {
    pub fn new(total: usize) -> Self {
        Self {
            inner: Rc::new(Inner {
                total,
                free: Cell::new(total),
                reclaim_gain: Cell::new(0),
                reclaims: Cell::new(0),
            }),
        }
    }

    pub fn set_free(&self, free: usize) {
        self.inner.free.set(free.min(self.inner.total));
    }

    /// Bytes handed back by each reclaim
    pub fn set_reclaim_gain(&self, gain: usize) {
        self.inner.reclaim_gain.set(gain);
    }

    pub fn reclaim_count(&self) -> u32 {
        self.inner.reclaims.get()
    }
}

impl MemoryProbe for FixedHeap {
    fn read(&self) -> HeapReading {
        let free = self.inner.free.get();
        HeapReading {
            free,
            allocated: self.inner.total - free,
        }
    }

    fn reclaim(&mut self) {
        self.inner.reclaims.set(self.inner.reclaims.get() + 1);
        let free = self.inner.free.get() + self.inner.reclaim_gain.get();
        self.set_free(free);
    }
}
