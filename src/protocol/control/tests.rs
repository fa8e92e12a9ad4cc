//! Opcode handling of the inline dispatcher.
use super::*;
use crate::config::NodeConfig;
use crate::protocol::control::{build_control_frame, declared_size, Opcode};
use crate::protocol::transport::frame::Frame;
use crate::state::{DeviceMode, TaskId};
use embassy_time::Duration;
use std::panic::{catch_unwind, AssertUnwindSafe};

struct PanicRestart;

impl Restart for PanicRestart {
    fn restart(&self) -> ! {
        panic!("restart requested")
    }
}

const NODE: NodeConfig = NodeConfig::DEFAULT;

fn control(opcode: Opcode, target: u8, size: Option<u32>) -> Frame {
    build_control_frame(&NODE, opcode, target, size)
}

//==================================================================================FILTERING
#[test]
/// Frames on other identifiers are left alone.
fn test_non_control_frame() {
    let block = ControlBlock::new(NODE);
    let dispatcher = CommandDispatcher::new(&block, &PanicRestart);
    let frame = Frame::with_payload(0x123, &[0x04, 0x19]).unwrap();
    assert_eq!(dispatcher.dispatch(&frame), DispatchOutcome::NotControl);
    assert_eq!(block.mode().get(), DeviceMode::Normal);
}

#[test]
/// A control frame without payload carries no opcode.
fn test_empty_control_frame() {
    let block = ControlBlock::new(NODE);
    let dispatcher = CommandDispatcher::new(&block, &PanicRestart);
    let frame = Frame::with_payload(NODE.control_id, &[]).unwrap();
    assert_eq!(dispatcher.dispatch(&frame), DispatchOutcome::NotControl);
}

#[test]
/// Unknown opcodes are reported and have no effect.
fn test_unknown_opcode() {
    let block = ControlBlock::new(NODE);
    let dispatcher = CommandDispatcher::new(&block, &PanicRestart);
    let frame = Frame::with_payload(NODE.control_id, &[0x7E, 0x19]).unwrap();
    assert_eq!(dispatcher.dispatch(&frame), DispatchOutcome::Unknown(0x7E));
    assert_eq!(block.mode().get(), DeviceMode::Normal);
}

//==================================================================================OPCODES
#[test]
/// Reset goes straight to the restart primitive.
fn test_reset_restarts() {
    let block = ControlBlock::new(NODE);
    let dispatcher = CommandDispatcher::new(&block, &PanicRestart);
    let frame = control(Opcode::Reset, 0, None);
    let result = catch_unwind(AssertUnwindSafe(|| dispatcher.dispatch(&frame)));
    assert!(result.is_err());
}

#[test]
/// ClearMinMax zeroes every task maximum.
fn test_clear_min_max() {
    let block = ControlBlock::new(NODE);
    block.tasks().record(TaskId::Fast, Duration::from_micros(900));
    block.tasks().record(TaskId::Slow, Duration::from_micros(4000));
    let dispatcher = CommandDispatcher::new(&block, &PanicRestart);

    let outcome = dispatcher.dispatch(&control(Opcode::ClearMinMax, 0, None));

    assert_eq!(outcome, DispatchOutcome::Executed(Opcode::ClearMinMax));
    assert_eq!(block.tasks().max(TaskId::Fast), Duration::from_micros(0));
    assert_eq!(block.tasks().max(TaskId::Slow), Duration::from_micros(0));
}

#[test]
/// ClearErrors is accepted without side effects.
fn test_clear_errors_is_noop() {
    let block = ControlBlock::new(NODE);
    let dispatcher = CommandDispatcher::new(&block, &PanicRestart);
    let outcome = dispatcher.dispatch(&control(Opcode::ClearErrors, 0, None));
    assert_eq!(outcome, DispatchOutcome::Executed(Opcode::ClearErrors));
    assert_eq!(block.mode().get(), DeviceMode::Normal);
}

//==================================================================================MODE_CHANGES
#[test]
/// Mode changes addressed to another device are ignored.
fn test_mode_change_other_device() {
    let block = ControlBlock::new(NODE);
    let dispatcher = CommandDispatcher::new(&block, &PanicRestart);
    let outcome = dispatcher.dispatch(&control(Opcode::EnterUpdateMode, 0x42, None));
    assert_eq!(outcome, DispatchOutcome::Ignored(Opcode::EnterUpdateMode));
    assert_eq!(block.mode().get(), DeviceMode::Normal);
}

#[test]
/// Entering update opens a session, and normal mode is allowed back before
/// any size is declared.
fn test_update_then_back_to_normal() {
    let block = ControlBlock::new(NODE);
    let dispatcher = CommandDispatcher::new(&block, &PanicRestart);

    dispatcher.dispatch(&control(Opcode::EnterUpdateMode, NODE.device_id, None));
    assert_eq!(block.mode().get(), DeviceMode::Update);
    assert_eq!(block.session().generation(), 1);

    let outcome = dispatcher.dispatch(&control(Opcode::EnterNormalMode, NODE.device_id, None));
    assert_eq!(outcome, DispatchOutcome::Executed(Opcode::EnterNormalMode));
    assert_eq!(block.mode().get(), DeviceMode::Normal);
}

#[test]
/// A size frame only records the size; later sizes do not override it.
fn test_size_declaration() {
    let block = ControlBlock::new(NODE);
    let dispatcher = CommandDispatcher::new(&block, &PanicRestart);
    dispatcher.dispatch(&control(Opcode::EnterUpdateMode, NODE.device_id, None));

    let outcome = dispatcher.dispatch(&control(Opcode::EnterNormalMode, NODE.device_id, Some(40)));
    assert_eq!(outcome, DispatchOutcome::Executed(Opcode::EnterNormalMode));
    assert_eq!(block.mode().get(), DeviceMode::Update);
    assert_eq!(block.session().declared_size(), 40);

    dispatcher.dispatch(&control(Opcode::EnterNormalMode, NODE.device_id, Some(4096)));
    assert_eq!(block.session().declared_size(), 40);
}

#[test]
/// A size frame outside an update session is ignored.
fn test_size_outside_update() {
    let block = ControlBlock::new(NODE);
    let dispatcher = CommandDispatcher::new(&block, &PanicRestart);
    let outcome = dispatcher.dispatch(&control(Opcode::EnterNormalMode, NODE.device_id, Some(40)));
    assert_eq!(outcome, DispatchOutcome::Ignored(Opcode::EnterNormalMode));
    assert_eq!(block.session().declared_size(), 0);
}

#[test]
/// The size may ride on the update request itself.
fn test_size_on_update_request() {
    let block = ControlBlock::new(NODE);
    let dispatcher = CommandDispatcher::new(&block, &PanicRestart);
    dispatcher.dispatch(&control(Opcode::EnterUpdateMode, NODE.device_id, Some(1024)));
    assert_eq!(block.mode().get(), DeviceMode::Update);
    assert_eq!(block.session().declared_size(), 1024);
}

#[test]
/// Once a size is declared the device stays in update mode.
fn test_no_return_to_normal_mid_flash() {
    let block = ControlBlock::new(NODE);
    let dispatcher = CommandDispatcher::new(&block, &PanicRestart);
    dispatcher.dispatch(&control(Opcode::EnterUpdateMode, NODE.device_id, None));
    dispatcher.dispatch(&control(Opcode::EnterNormalMode, NODE.device_id, Some(40)));

    let outcome = dispatcher.dispatch(&control(Opcode::EnterNormalMode, NODE.device_id, None));
    assert_eq!(outcome, DispatchOutcome::Ignored(Opcode::EnterNormalMode));
    assert_eq!(block.mode().get(), DeviceMode::Update);
}

#[test]
/// A repeated update request keeps the running session.
fn test_repeated_update_request() {
    let block = ControlBlock::new(NODE);
    let dispatcher = CommandDispatcher::new(&block, &PanicRestart);
    dispatcher.dispatch(&control(Opcode::EnterUpdateMode, NODE.device_id, Some(40)));

    let outcome = dispatcher.dispatch(&control(Opcode::EnterUpdateMode, NODE.device_id, None));
    assert_eq!(outcome, DispatchOutcome::Ignored(Opcode::EnterUpdateMode));
    assert_eq!(block.session().generation(), 1);
    assert_eq!(block.session().declared_size(), 40);
}

//==================================================================================BUILDER
#[test]
/// The builder lays out opcode, target and big-endian size.
fn test_build_control_frame_layout() {
    let frame = control(Opcode::EnterNormalMode, 0x19, Some(0x0102_0304));
    assert_eq!(frame.id, NODE.control_id);
    assert_eq!(frame.payload(), &[0x05, 0x19, 0x01, 0x02, 0x03, 0x04]);
    assert_eq!(declared_size(&frame), Some(0x0102_0304));

    let short = control(Opcode::Reset, 0, None);
    assert_eq!(short.payload(), &[0x01, 0x00]);
    assert_eq!(declared_size(&short), None);
}
