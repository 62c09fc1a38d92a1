//! Interrupt-to-main-loop event passing.
//!
//! Interrupt handlers only push a [`DeviceEvent`] into a lock-free SPSC queue;
//! the accept loop and the stream loop drain it from task context.

use heapless::spsc::{Consumer, Producer, Queue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Queue capacity parameter; the SPSC ring holds one less than this
pub const EVENT_QUEUE_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Mirror the status lines to the display
    StatusRequested,
    /// Stop streaming and leave the accept loop
    ShutdownRequested,
}

pub type EventStorage = Queue<DeviceEvent, EVENT_QUEUE_DEPTH>;
pub type EventProducer = Producer<'static, DeviceEvent, EVENT_QUEUE_DEPTH>;

/// Consumer half plus the hook that re-enables the interrupt after a drain
pub struct EventQueue {
    consumer: Consumer<'static, DeviceEvent, EVENT_QUEUE_DEPTH>,
    rearm: Option<Box<dyn FnMut()>>,
}

impl EventQueue {
    /// Split `'static` storage into the ISR-side producer and the task-side queue
    pub fn split(storage: &'static mut EventStorage) -> (EventProducer, EventQueue) {
        let (producer, consumer) = storage.split();
        (
            producer,
            EventQueue {
                consumer,
                rearm: None,
            },
        )
    }

    pub fn with_rearm(mut self, rearm: impl FnMut() + 'static) -> Self {
        self.rearm = Some(Box::new(rearm));
        self
    }

    /// Take every pending event. The interrupt is re-armed afterwards, even
    /// when nothing was pending.
    pub fn drain(&mut self) -> heapless::Vec<DeviceEvent, EVENT_QUEUE_DEPTH> {
        let mut events = heapless::Vec::new();
        while let Some(event) = self.consumer.dequeue() {
            // capacity exceeds the ring, push cannot fail
            let _ = events.push(event);
        }
        if let Some(rearm) = self.rearm.as_mut() {
            rearm();
        }
        events
    }
}

/// Cooperative stop flag shared between the event handlers and the loops
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
