//! Receive side of a bus: the single-producer single-consumer frame queue
//! shared by the receive interrupt and the task context, and the interrupt
//! handler that feeds it.
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use heapless::spsc::{Producer, Queue};

use crate::config::{RxMode, RX_QUEUE_SLOTS};
use crate::protocol::control::CommandDispatcher;
use crate::protocol::transport::frame::Frame;
use crate::protocol::transport::traits::bus_controller::{BusHealth, RxHandler};

//==================================================================================COUNTERS
/// Per-bus counters written from both contexts.
#[derive(Debug)]
pub struct BusCounters {
    received: AtomicU32,
    dropped: AtomicU32,
    health: AtomicU8,
}

impl BusCounters {
    pub const fn new() -> Self {
        Self {
            received: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            health: AtomicU8::new(BusHealth::Active as u8),
        }
    }

    /// Frames seen by the receive interrupt, dropped ones included.
    pub fn received(&self) -> u32 {
        self.received.load(Ordering::Relaxed)
    }

    /// Frames discarded because the queue was full or the DLC was invalid.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Last fault state latched by the health monitor.
    pub fn health(&self) -> BusHealth {
        BusHealth::from_raw(self.health.load(Ordering::Acquire))
    }

    pub(crate) fn latch_health(&self, health: BusHealth) -> BusHealth {
        BusHealth::from_raw(self.health.swap(health as u8, Ordering::AcqRel))
    }

    fn count_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    fn count_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for BusCounters {
    fn default() -> Self {
        Self::new()
    }
}

//==================================================================================CHANNEL
/// Static storage of one bus' receive path.
///
/// `N` is the number of queue slots; one is kept free by the ring, so at most
/// `N - 1` frames are pending at once.
pub struct RxChannel<const N: usize = RX_QUEUE_SLOTS> {
    pub(crate) queue: Queue<Frame, N>,
    pub(crate) counters: BusCounters,
}

impl<const N: usize> RxChannel<N> {
    pub const fn new() -> Self {
        Self {
            queue: Queue::new(),
            counters: BusCounters::new(),
        }
    }

    pub fn counters(&self) -> &BusCounters {
        &self.counters
    }
}

impl<const N: usize> Default for RxChannel<N> {
    fn default() -> Self {
        Self::new()
    }
}

//==================================================================================HANDLER
/// Receive interrupt handler installed into the bus controller.
///
/// Every frame goes through the command dispatcher first, then into the
/// queue. A full queue drops the newest frame; pending frames are never
/// overwritten.
pub struct RxPath<'a, const N: usize = RX_QUEUE_SLOTS> {
    producer: Option<Producer<'a, Frame, N>>,
    dispatcher: CommandDispatcher<'a>,
    counters: &'a BusCounters,
}

impl<'a, const N: usize> RxPath<'a, N> {
    pub(crate) fn new(
        mode: RxMode,
        producer: Producer<'a, Frame, N>,
        dispatcher: CommandDispatcher<'a>,
        counters: &'a BusCounters,
    ) -> Self {
        let producer = match mode {
            RxMode::Queued => Some(producer),
            RxMode::CommandOnly => None,
        };
        Self {
            producer,
            dispatcher,
            counters,
        }
    }
}

impl<const N: usize> RxHandler for RxPath<'_, N> {
    fn on_frame(&mut self, frame: Frame) -> bool {
        self.counters.count_received();
        self.dispatcher.dispatch(&frame);

        let Some(producer) = self.producer.as_mut() else {
            return true;
        };
        if !frame.has_valid_dlc() {
            self.counters.count_dropped();
            #[cfg(feature = "defmt")]
            defmt::trace!("RX frame {=u32:#x} dropped, DLC {=u8}", frame.id, frame.dlc);
            return false;
        }
        match producer.enqueue(frame) {
            Ok(()) => true,
            Err(_) => {
                self.counters.count_dropped();
                #[cfg(feature = "defmt")]
                defmt::trace!("RX queue full, frame {=u32:#x} dropped", frame.id);
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
