//! Device mode flag: selects which periodic logic the scheduler runs.
use core::sync::atomic::{AtomicU8, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DeviceMode {
    /// Application traffic.
    Normal = 0,
    /// Firmware reflash in progress.
    Update = 1,
}

/// Atomic cell holding the [`DeviceMode`].
///
/// Written by the command dispatcher only, read by the scheduler every tick.
/// Only a restart brings an `Update` device back to `Normal` once flashing
/// has started.
#[derive(Debug)]
pub struct ModeCell(AtomicU8);

impl ModeCell {
    pub const fn new() -> Self {
        Self(AtomicU8::new(DeviceMode::Normal as u8))
    }

    pub fn get(&self) -> DeviceMode {
        match self.0.load(Ordering::Acquire) {
            0 => DeviceMode::Normal,
            _ => DeviceMode::Update,
        }
    }

    #[inline]
    pub fn is_update(&self) -> bool {
        self.get() == DeviceMode::Update
    }

    /// `Normal → Update`. Returns `false` if the device already was in
    /// `Update`.
    pub(crate) fn enter_update(&self) -> bool {
        self.0
            .compare_exchange(
                DeviceMode::Normal as u8,
                DeviceMode::Update as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub(crate) fn set_normal(&self) {
        self.0.store(DeviceMode::Normal as u8, Ordering::Release);
    }
}

impl Default for ModeCell {
    fn default() -> Self {
        Self::new()
    }
}
