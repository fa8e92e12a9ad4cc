//! Receive interrupt handler: dispatch, enqueue and drop accounting.
use super::*;
use crate::config::NodeConfig;
use crate::protocol::control::{build_control_frame, Opcode};
use crate::protocol::transport::traits::restart::Restart;
use crate::state::{ControlBlock, DeviceMode};

struct PanicRestart;

impl Restart for PanicRestart {
    fn restart(&self) -> ! {
        panic!("restart requested")
    }
}

fn data_frame(id: u32, byte: u8) -> Frame {
    Frame::with_payload(id, &[byte; 8]).unwrap()
}

#[test]
/// Frames are queued in arrival order.
fn test_enqueue_in_order() {
    let control = ControlBlock::new(NodeConfig::DEFAULT);
    let RxChannel { mut queue, counters } = RxChannel::<4>::new();
    let (producer, mut consumer) = queue.split();
    let mut path = RxPath::new(
        RxMode::Queued,
        producer,
        CommandDispatcher::new(&control, &PanicRestart),
        &counters,
    );

    assert!(path.on_frame(data_frame(0x100, 1)));
    assert!(path.on_frame(data_frame(0x101, 2)));

    assert_eq!(consumer.dequeue().map(|f| f.id), Some(0x100));
    assert_eq!(consumer.dequeue().map(|f| f.id), Some(0x101));
    assert_eq!(consumer.dequeue(), None);
}

#[test]
/// A full queue keeps its content and counts the newest frame as dropped.
fn test_full_queue_drops_newest() {
    let control = ControlBlock::new(NodeConfig::DEFAULT);
    let RxChannel { mut queue, counters } = RxChannel::<4>::new();
    let (producer, mut consumer) = queue.split();
    let mut path = RxPath::new(
        RxMode::Queued,
        producer,
        CommandDispatcher::new(&control, &PanicRestart),
        &counters,
    );

    for i in 0..3 {
        assert!(path.on_frame(data_frame(0x200 + i, i as u8)));
    }
    assert!(!path.on_frame(data_frame(0x2FF, 0xFF)));

    assert_eq!(counters.dropped(), 1);
    assert_eq!(counters.received(), 4);
    for i in 0..3 {
        assert_eq!(consumer.dequeue().map(|f| f.id), Some(0x200 + i));
    }
    assert_eq!(consumer.dequeue(), None);
}

#[test]
/// Frames with a DLC above eight never reach the queue.
fn test_invalid_dlc_dropped() {
    let control = ControlBlock::new(NodeConfig::DEFAULT);
    let RxChannel { mut queue, counters } = RxChannel::<4>::new();
    let (producer, mut consumer) = queue.split();
    let mut path = RxPath::new(
        RxMode::Queued,
        producer,
        CommandDispatcher::new(&control, &PanicRestart),
        &counters,
    );

    let mut frame = data_frame(0x300, 0);
    frame.dlc = 9;
    assert!(!path.on_frame(frame));
    assert_eq!(counters.dropped(), 1);
    assert_eq!(consumer.dequeue(), None);
}

#[test]
/// Control frames are dispatched before queuing, even when they are dropped.
fn test_dispatch_before_enqueue() {
    let control = ControlBlock::new(NodeConfig::DEFAULT);
    let RxChannel { mut queue, counters } = RxChannel::<2>::new();
    let (producer, mut consumer) = queue.split();
    let mut path = RxPath::new(
        RxMode::Queued,
        producer,
        CommandDispatcher::new(&control, &PanicRestart),
        &counters,
    );

    assert!(path.on_frame(data_frame(0x400, 0)));
    let update = build_control_frame(control.node(), Opcode::EnterUpdateMode, 0x19, None);
    assert!(!path.on_frame(update));

    assert_eq!(control.mode().get(), DeviceMode::Update);
    assert_eq!(counters.dropped(), 1);
    assert_eq!(consumer.dequeue().map(|f| f.id), Some(0x400));
}

#[test]
/// Command-only buses dispatch but never queue.
fn test_command_only_mode() {
    let control = ControlBlock::new(NodeConfig::DEFAULT);
    let RxChannel { mut queue, counters } = RxChannel::<4>::new();
    let (producer, mut consumer) = queue.split();
    let mut path = RxPath::new(
        RxMode::CommandOnly,
        producer,
        CommandDispatcher::new(&control, &PanicRestart),
        &counters,
    );

    let update = build_control_frame(control.node(), Opcode::EnterUpdateMode, 0x19, None);
    assert!(path.on_frame(update));
    assert!(path.on_frame(data_frame(0x500, 0)));

    assert_eq!(control.mode().get(), DeviceMode::Update);
    assert_eq!(consumer.dequeue(), None);
    assert_eq!(counters.dropped(), 0);
}

#[test]
/// The health latch returns the previous state.
fn test_health_latch() {
    let counters = BusCounters::new();
    assert_eq!(counters.health(), BusHealth::Active);
    assert_eq!(counters.latch_health(BusHealth::Off), BusHealth::Active);
    assert_eq!(counters.health(), BusHealth::Off);
}
