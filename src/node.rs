//! Scheduler-facing glue of one ECU: owns the bus transports, the health
//! monitor and the update engine, and exposes one entry point per scheduler
//! cadence.
//!
//! * [`Node::fast_tick`]: high-rate tick, hands received frames to the
//!   application while the device is in normal mode.
//! * [`Node::slow_tick`]: bus health polling and recovery.
//! * [`Node::background`]: free-running loop, pumps the update engine while
//!   the device is in update mode.
//!
//! Each entry point records its execution time in the task statistics of the
//! [`ControlBlock`].
use embassy_time::Duration;
use heapless::Vec;

use crate::config::{MAX_BUSES, REASSEMBLY_CAPACITY, RX_QUEUE_SLOTS, TX_POOL_SLOTS};
use crate::error::{TransportError, UpdateError};
use crate::protocol::health::{BusMonitor, PollReport};
use crate::protocol::transport::frame::Frame;
use crate::protocol::transport::traits::bus_controller::BusController;
use crate::protocol::transport::traits::restart::Restart;
use crate::protocol::transport::traits::storage::Storage;
use crate::protocol::transport::Transport;
use crate::protocol::update::{UpdateEngine, UpdateState};
use crate::state::{ControlBlock, DeviceMode, TaskId};

/// Bus carrying the update session; the other buses are muted during it.
pub const UPDATE_BUS: usize = 0;

pub struct Node<
    'a,
    B,
    S,
    const N: usize = RX_QUEUE_SLOTS,
    const K: usize = TX_POOL_SLOTS,
    const R: usize = REASSEMBLY_CAPACITY,
> where
    B: BusController,
    S: Storage,
{
    control: &'a ControlBlock,
    transports: Vec<Transport<'a, B, N, K>, MAX_BUSES>,
    monitor: BusMonitor,
    engine: UpdateEngine<'a, S, R>,
}

impl<'a, B, S, const N: usize, const K: usize, const R: usize> Node<'a, B, S, N, K, R>
where
    B: BusController,
    S: Storage,
{
    pub fn new(control: &'a ControlBlock, restart: &'a dyn Restart, storage: S) -> Self {
        Self {
            control,
            transports: Vec::new(),
            monitor: BusMonitor::new(),
            engine: UpdateEngine::new(control, restart, storage),
        }
    }

    /// Attach a bus that is already up and return its index. Fails with
    /// `ResourceExhausted` once [`MAX_BUSES`] are attached.
    pub fn attach(&mut self, transport: Transport<'a, B, N, K>) -> Result<usize, TransportError<B::Error>> {
        self.transports
            .push(transport)
            .map_err(|_| TransportError::ResourceExhausted)?;
        Ok(self.transports.len() - 1)
    }

    #[inline]
    pub fn mode(&self) -> DeviceMode {
        self.control.mode().get()
    }

    pub fn control(&self) -> &'a ControlBlock {
        self.control
    }

    pub fn transport(&self, bus: usize) -> Option<&Transport<'a, B, N, K>> {
        self.transports.get(bus)
    }

    pub fn transport_mut(&mut self, bus: usize) -> Option<&mut Transport<'a, B, N, K>> {
        self.transports.get_mut(bus)
    }

    pub fn engine(&self) -> &UpdateEngine<'a, S, R> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut UpdateEngine<'a, S, R> {
        &mut self.engine
    }

    /// Send `frame` on bus `bus`. An index with no attached bus is an
    /// `InvalidState`.
    pub fn transmit(&mut self, bus: usize, frame: &Frame) -> Result<(), TransportError<B::Error>> {
        self.transports
            .get_mut(bus)
            .ok_or(TransportError::InvalidState)?
            .transmit(frame)
    }

    /// Hand every queued frame to `app` with the index of its bus, in normal
    /// mode only. Returns the number of frames delivered.
    pub fn fast_tick(&mut self, mut app: impl FnMut(usize, Frame)) -> usize {
        let control = self.control;
        control.tasks().measure(TaskId::Fast, || {
            if control.mode().is_update() {
                return 0;
            }
            self.transports
                .iter_mut()
                .enumerate()
                .map(|(bus, transport)| transport.drain_rx(|frame| app(bus, frame)))
                .sum::<usize>()
        })
    }

    /// Poll the health of every bus and hand each report to `report`.
    pub fn slow_tick(&mut self, report: impl FnMut(usize, PollReport<B::Error>)) {
        let control = self.control;
        let monitor = self.monitor;
        control
            .tasks()
            .measure(TaskId::Slow, || monitor.poll_all(self.transports.iter_mut(), report));
    }

    /// Pump the update engine over [`UPDATE_BUS`] and discard the traffic of
    /// the other buses. Returns `None` in normal mode or without a bus.
    pub fn background(&mut self) -> Option<Result<UpdateState, UpdateError<S::Error>>> {
        let control = self.control;
        control.tasks().measure(TaskId::Background, || {
            if !control.mode().is_update() {
                return None;
            }
            let (update, others) = self.transports.split_first_mut()?;
            for transport in others {
                transport.clear_rx();
            }
            Some(self.engine.pump(update))
        })
    }

    /// Send the periodic status frame on `bus`.
    pub fn send_status(
        &mut self,
        bus: usize,
        uptime: Duration,
        reset_reason: u8,
    ) -> Result<(), TransportError<B::Error>> {
        let frame = self
            .control
            .tasks()
            .status_frame(self.control.node().device_id, uptime, reset_reason);
        self.transmit(bus, &frame)
    }
}
