//! Control protocol carried on the reserved control identifier: opcode
//! definitions, frame builder and the inline dispatcher run by the receive
//! interrupt.
//!
//! Control frame layout:
//!
//! ```text
//! byte 0     opcode
//! byte 1     target device identity (mode changes only)
//! bytes 2..6 big-endian u32 image size (update negotiation only)
//! ```
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::config::NodeConfig;
use crate::protocol::transport::frame::Frame;

pub mod dispatcher;

pub use dispatcher::{CommandDispatcher, DispatchOutcome};

//==================================================================================OPCODES
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    /// Restart the device immediately.
    Reset = 0x01,
    /// Zero the maximum task execution times.
    ClearMinMax = 0x02,
    /// Reserved.
    ClearErrors = 0x03,
    /// Switch the addressed device to update mode.
    EnterUpdateMode = 0x04,
    /// Leave update mode, or declare the image size of the running session.
    EnterNormalMode = 0x05,
}

/// Smallest DLC of a frame that carries the image size in bytes 2..6.
pub const SIZE_FRAME_DLC: u8 = 6;

//==================================================================================BUILDER
/// Build a control frame for `opcode`, addressed to `target`, optionally
/// carrying an image size.
pub fn build_control_frame(node: &NodeConfig, opcode: Opcode, target: u8, size: Option<u32>) -> Frame {
    let mut data = [0u8; 8];
    data[0] = opcode.into();
    data[1] = target;
    let dlc = match size {
        Some(size) => {
            data[2..6].copy_from_slice(&size.to_be_bytes());
            SIZE_FRAME_DLC
        }
        None => 2,
    };
    Frame {
        id: node.control_id,
        dlc,
        data,
    }
}

/// Image size carried in bytes 2..6, if the frame is long enough.
pub fn declared_size(frame: &Frame) -> Option<u32> {
    let payload = frame.payload();
    if payload.len() < SIZE_FRAME_DLC as usize {
        return None;
    }
    Some(u32::from_be_bytes([payload[2], payload[3], payload[4], payload[5]]))
}
