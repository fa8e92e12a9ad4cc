//! TX staging pool: keeps outbound payloads alive while the controller copies
//! them asynchronously.
use crate::protocol::transport::frame::Frame;

/// Fixed ring of `K` staging frames with a wrapping allocation index.
///
/// Each transmit takes the next slot, so a staged frame stays untouched for
/// the following `K - 1` transmits. See
/// [`TX_POOL_SLOTS`](crate::config::TX_POOL_SLOTS) for the sizing rule.
#[derive(Debug)]
pub struct TxPool<const K: usize> {
    slots: [Frame; K],
    next: usize,
}

impl<const K: usize> TxPool<K> {
    const NOT_EMPTY: () = assert!(K > 0, "TX pool needs at least one slot");

    /// Empty pool. `K` must be non-zero, checked at compile time:
    ///
    /// ```compile_fail
    /// let _pool = can_ecu_core::protocol::transport::tx_pool::TxPool::<0>::new();
    /// ```
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NOT_EMPTY;
        Self {
            slots: [Frame {
                id: 0,
                dlc: 0,
                data: [0; 8],
            }; K],
            next: 0,
        }
    }

    /// Number of staging slots.
    #[inline]
    pub const fn slots(&self) -> usize {
        K
    }

    /// Index of the slot the next transmit will use.
    #[inline]
    pub fn next_slot(&self) -> usize {
        self.next
    }

    /// Copy `frame` into the next slot and return the staged copy.
    ///
    /// Bytes past the DLC are zeroed, never copied.
    pub fn stage(&mut self, frame: &Frame) -> &Frame {
        let index = self.next;
        self.next = (self.next + 1) % K;

        let slot = &mut self.slots[index];
        let len = frame.payload().len();
        slot.id = frame.id;
        slot.dlc = len as u8;
        slot.data = [0; 8];
        slot.data[..len].copy_from_slice(frame.payload());
        slot
    }
}

impl<const K: usize> Default for TxPool<K> {
    fn default() -> Self {
        Self::new()
    }
}
