//! Execution-time table of the periodic tasks, plus the status heartbeat
//! frame that reports it on the bus.
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_time::{Duration, Instant};

use crate::protocol::transport::frame::Frame;

/// Periodic tasks driven by the external scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(usize)]
pub enum TaskId {
    /// High-frequency tick (1 ms).
    Fast = 0,
    /// Slow tick (100 ms).
    Slow = 1,
    /// Free-running background loop.
    Background = 2,
}

impl TaskId {
    pub const COUNT: usize = 3;
    pub const ALL: [TaskId; Self::COUNT] = [TaskId::Fast, TaskId::Slow, TaskId::Background];
}

/// Last and maximum execution time per task, in microseconds.
///
/// The scheduler records durations; the `ClearMinMax` control command zeroes
/// the maxima from interrupt context.
#[derive(Debug)]
pub struct TaskStats {
    last_us: [AtomicU32; TaskId::COUNT],
    max_us: [AtomicU32; TaskId::COUNT],
}

impl TaskStats {
    pub const fn new() -> Self {
        Self {
            last_us: [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)],
            max_us: [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)],
        }
    }

    /// Store one execution time for `task` and raise its maximum if needed.
    pub fn record(&self, task: TaskId, elapsed: Duration) {
        let micros = u32::try_from(elapsed.as_micros()).unwrap_or(u32::MAX);
        self.last_us[task as usize].store(micros, Ordering::Relaxed);
        self.max_us[task as usize].fetch_max(micros, Ordering::Relaxed);
    }

    /// Run `body`, record how long it took and return its result.
    pub fn measure<T>(&self, task: TaskId, body: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let result = body();
        self.record(task, started.elapsed());
        result
    }

    pub fn last(&self, task: TaskId) -> Duration {
        Duration::from_micros(self.last_us[task as usize].load(Ordering::Relaxed) as u64)
    }

    pub fn max(&self, task: TaskId) -> Duration {
        Duration::from_micros(self.max_us[task as usize].load(Ordering::Relaxed) as u64)
    }

    /// Zero every maximum.
    pub fn clear_max(&self) {
        for max in &self.max_us {
            max.store(0, Ordering::Relaxed);
        }
    }

    /// Status heartbeat sent once per second on the device identifier.
    ///
    /// Layout: fast-task times in 50 µs units, slow and background times in
    /// 500 µs units (last then max, truncated to a byte each), then a 12-bit
    /// uptime in 4 s units followed by the 4-bit reset reason.
    pub fn status_frame(&self, device_id: u8, uptime: Duration, reset_reason: u8) -> Frame {
        let us = |cell: &AtomicU32| cell.load(Ordering::Relaxed);
        let fast = TaskId::Fast as usize;
        let slow = TaskId::Slow as usize;
        let bg = TaskId::Background as usize;
        let uptime_units = (uptime.as_millis() / 4000) as u32;

        Frame {
            id: device_id as u32,
            dlc: 8,
            data: [
                (us(&self.last_us[fast]) / 50) as u8,
                (us(&self.max_us[fast]) / 50) as u8,
                (us(&self.last_us[slow]) / 500) as u8,
                (us(&self.max_us[slow]) / 500) as u8,
                (us(&self.last_us[bg]) / 500) as u8,
                (us(&self.max_us[bg]) / 500) as u8,
                (uptime_units >> 4) as u8,
                (((uptime_units & 0x0F) << 4) as u8) | (reset_reason & 0x0F),
            ],
        }
    }
}

impl Default for TaskStats {
    fn default() -> Self {
        Self::new()
    }
}
