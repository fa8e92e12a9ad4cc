//! Contracts of the collaborators this core drives: the bus controller
//! driver, the firmware storage and the device restart primitive.
pub mod bus_controller;
pub mod restart;
pub mod storage;
