//! In-memory representation of a classic CAN data frame as it travels between
//! the receive interrupt, the queues and the transmit path.
use embedded_can::{ExtendedId, Id, StandardId};

/// Largest identifier that still fits the 11-bit standard format.
pub const MAX_STANDARD_ID: u32 = 0x7FF;
/// Largest 29-bit extended identifier.
pub const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;
/// Classic CAN payload limit.
pub const MAX_DLC: u8 = 8;

//==================================================================================FRAME
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Fixed-size frame record: identifier, data length code and an eight byte
/// payload buffer. Only the first `dlc` bytes are meaningful.
///
/// Whether the identifier is extended is derived from its value, never stored.
pub struct Frame {
    /// 11- or 29-bit identifier.
    pub id: u32,
    /// Number of valid payload bytes (0 to 8).
    pub dlc: u8,
    pub data: [u8; 8],
}

impl Frame {
    /// Builds a frame from an identifier and up to eight payload bytes.
    ///
    /// Returns `None` when the payload is longer than eight bytes.
    pub fn with_payload(id: u32, payload: &[u8]) -> Option<Self> {
        if payload.len() > MAX_DLC as usize {
            return None;
        }
        let mut data = [0u8; 8];
        data[..payload.len()].copy_from_slice(payload);
        Some(Self {
            id,
            dlc: payload.len() as u8,
            data,
        })
    }

    /// `true` when the identifier needs the 29-bit format.
    #[inline]
    pub fn is_extended(&self) -> bool {
        self.id > MAX_STANDARD_ID
    }

    /// `true` when the DLC is within the classic CAN range.
    #[inline]
    pub fn has_valid_dlc(&self) -> bool {
        self.dlc <= MAX_DLC
    }

    /// Valid payload bytes. An out-of-range DLC is clamped to eight.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[..(self.dlc.min(MAX_DLC) as usize)]
    }

    /// Identifier in `embedded-can` form, or `None` above 29 bits.
    pub fn can_id(&self) -> Option<Id> {
        if self.is_extended() {
            ExtendedId::new(self.id).map(Id::Extended)
        } else {
            StandardId::new(self.id as u16).map(Id::Standard)
        }
    }
}

/// Raw numeric value of an `embedded-can` identifier.
pub fn raw_id(id: Id) -> u32 {
    match id {
        Id::Standard(id) => id.as_raw() as u32,
        Id::Extended(id) => id.as_raw(),
    }
}

impl embedded_can::Frame for Frame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        Self::with_payload(raw_id(id.into()), data)
    }

    /// Remote frames are not carried by this stack.
    fn new_remote(_id: impl Into<Id>, _dlc: usize) -> Option<Self> {
        None
    }

    fn is_extended(&self) -> bool {
        Frame::is_extended(self)
    }

    fn is_remote_frame(&self) -> bool {
        false
    }

    fn id(&self) -> Id {
        // Identifiers wider than 29 bits saturate to the largest extended one.
        match self.can_id() {
            Some(id) => id,
            None => Id::Extended(ExtendedId::MAX),
        }
    }

    fn dlc(&self) -> usize {
        self.payload().len()
    }

    fn data(&self) -> &[u8] {
        self.payload()
    }
}
