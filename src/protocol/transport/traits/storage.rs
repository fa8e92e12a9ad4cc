//! Firmware storage contract consumed by the update engine.
use core::ops::Range;

/// Location and size of the region that receives the next image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Region {
    pub address: u32,
    pub size: u32,
}

/// Storage holding the inactive executable image slot.
///
/// Offsets and ranges are relative to the start of the update region.
pub trait Storage {
    type Error: core::fmt::Debug;

    /// Region the next image is written to, or `None` if the device has no
    /// spare image slot.
    fn update_region(&mut self) -> Option<Region>;

    fn erase(&mut self, range: Range<u32>) -> Result<(), Self::Error>;

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Select the freshly written image for the next boot.
    fn set_boot_target(&mut self) -> Result<(), Self::Error>;
}
