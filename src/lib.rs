//! `can-ecu-core` library: the onboard CAN network core of a vehicle ECU in a
//! `no_std` environment. It moves frames between a bus controller driver and
//! the application tasks, monitors and recovers bus health, runs a small
//! control protocol inline in the receive interrupt and drives a chunked,
//! CRC-checked firmware update over the bus.
#![no_std]
#[cfg(test)]
extern crate std;
//==================================================================================
/// Build-time node identity, bus settings and buffer dimensions.
pub mod config;
/// Error enums of the transport, bus bring-up and update session.
pub mod error;
/// Low-level algorithms (CRC-8 of update chunks).
pub mod infra;
/// Scheduler entry points tying the components of one node together.
pub mod node;
/// Frame transport, control dispatcher, health monitor and update engine.
pub mod protocol;
/// Device mode, update session counters and task statistics shared between
/// the receive interrupt and the tasks.
pub mod state;
//==================================================================================
pub use config::{BusConfig, NodeConfig, RxMode};
pub use node::Node;
pub use protocol::transport::frame::Frame;
pub use state::{ControlBlock, DeviceMode};
