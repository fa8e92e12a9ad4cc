//! Low-level algorithms shared by the protocol layers.
pub mod crc;
