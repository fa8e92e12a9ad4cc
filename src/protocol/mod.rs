//! Network-facing components of the node: frame transport, control protocol,
//! bus health monitoring and the firmware update engine.
pub mod control;
pub mod health;
pub mod transport;
pub mod update;
