//! Counters of the firmware update session that cross the interrupt/task
//! boundary.
use core::sync::atomic::{AtomicU32, Ordering};

/// Declared image size, progress and error count of the current update
/// session, plus a generation number bumped on every entry into `Update`.
///
/// The dispatcher (interrupt) opens sessions and records the declared size;
/// the update engine (task) notices the new generation, re-initialises its
/// own buffers and advances the progress counters.
#[derive(Debug)]
pub struct SessionCounters {
    declared_size: AtomicU32,
    bytes_written: AtomicU32,
    error_count: AtomicU32,
    generation: AtomicU32,
}

impl SessionCounters {
    pub const fn new() -> Self {
        Self {
            declared_size: AtomicU32::new(0),
            bytes_written: AtomicU32::new(0),
            error_count: AtomicU32::new(0),
            generation: AtomicU32::new(0),
        }
    }

    /// Open a new session: forget any declared size and publish a new
    /// generation.
    pub(crate) fn begin(&self) {
        self.declared_size.store(0, Ordering::Relaxed);
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Record the declared image size. The first non-zero value of a session
    /// wins; later offers are refused.
    pub(crate) fn offer_size(&self, size: u32) -> bool {
        size != 0
            && self
                .declared_size
                .compare_exchange(0, size, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    /// Clear progress and error counters at session entry.
    pub(crate) fn reset_progress(&self) {
        self.bytes_written.store(0, Ordering::Release);
        self.error_count.store(0, Ordering::Release);
    }

    /// Add `bytes` to the written total and return the new total.
    pub(crate) fn advance(&self, bytes: u32) -> u32 {
        self.bytes_written.fetch_add(bytes, Ordering::AcqRel) + bytes
    }

    /// Count one rejected chunk and return the new count.
    pub(crate) fn record_error(&self) -> u32 {
        self.error_count.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }

    /// Declared image size in bytes, 0 while unknown.
    pub fn declared_size(&self) -> u32 {
        self.declared_size.load(Ordering::Acquire)
    }

    pub fn bytes_written(&self) -> u32 {
        self.bytes_written.load(Ordering::Acquire)
    }

    pub fn error_count(&self) -> u32 {
        self.error_count.load(Ordering::Acquire)
    }

    pub fn generation(&self) -> u32 {
        self.generation.load(Ordering::Acquire)
    }
}

impl Default for SessionCounters {
    fn default() -> Self {
        Self::new()
    }
}
