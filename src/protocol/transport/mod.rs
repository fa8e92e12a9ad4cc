//! Frame transport of one bus: bring-up, the interrupt-fed RX queue drained
//! from task context and the TX path through the staging pool.
//!
//! One [`Transport`] exists per bus. It owns the consumer half of the RX
//! queue; the producer half lives in the [`RxPath`](rx::RxPath) registered
//! with the controller.
use heapless::spsc::Consumer;

use crate::config::{BusConfig, RX_QUEUE_SLOTS, TX_POOL_SLOTS};
use crate::error::{InitError, InitStage, TransportError};
use crate::protocol::control::CommandDispatcher;
use crate::state::ControlBlock;

pub mod frame;
pub mod rx;
pub mod traits;
pub mod tx_pool;

use frame::{Frame, MAX_DLC};
use rx::{BusCounters, RxChannel, RxPath};
use traits::bus_controller::{BusController, BusHealth, BusStatus, RegisterRx, TxDescriptor};
use traits::restart::Restart;
use tx_pool::TxPool;

//==================================================================================TRANSPORT
/// Transport of one bus, generic over the controller driver `B`, the RX
/// queue slots `N` and the TX staging slots `K`.
pub struct Transport<'a, B, const N: usize = RX_QUEUE_SLOTS, const K: usize = TX_POOL_SLOTS>
where
    B: BusController,
{
    bus: B,
    rx: Consumer<'a, Frame, N>,
    tx: TxPool<K>,
    counters: &'a BusCounters,
}

impl<'a, B, const N: usize, const K: usize> Transport<'a, B, N, K>
where
    B: BusController,
{
    /// Bring a bus up: split the RX queue, configure the controller, install
    /// the receive handler and enable the bus, in that order.
    ///
    /// Every received frame is handed to a [`CommandDispatcher`] built from
    /// `control` and `restart` before it is queued.
    pub fn init(
        config: &BusConfig,
        mut bus: B,
        channel: &'a mut RxChannel<N>,
        control: &'a ControlBlock,
        restart: &'a dyn Restart,
    ) -> Result<Self, InitError<B::Error>>
    where
        B: RegisterRx<RxPath<'a, N>>,
    {
        if N < 2 {
            return Err(InitError::ResourceExhausted);
        }
        let RxChannel { queue, counters } = channel;
        let counters: &'a BusCounters = counters;
        let (producer, consumer) = queue.split();

        bus.init(config).map_err(|error| InitError::Controller {
            stage: InitStage::Configure,
            error,
        })?;

        let handler = RxPath::new(
            config.rx_mode,
            producer,
            CommandDispatcher::new(control, restart),
            counters,
        );
        bus.register_rx_handler(handler)
            .map_err(|error| InitError::Controller {
                stage: InitStage::RegisterRx,
                error,
            })?;

        bus.enable().map_err(|error| InitError::Controller {
            stage: InitStage::Enable,
            error,
        })?;

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Bus up at {=u32} bit/s, RX capacity {=usize}, TX slots {=usize}",
            config.bitrate,
            N - 1,
            K
        );

        Ok(Self {
            bus,
            rx: consumer,
            tx: TxPool::new(),
            counters,
        })
    }

    /// Copy `frame` into the next staging slot and queue it on the
    /// controller, preserving identifier, DLC and payload.
    pub fn transmit(&mut self, frame: &Frame) -> Result<(), TransportError<B::Error>> {
        if frame.dlc > MAX_DLC {
            return Err(TransportError::InvalidArgument { dlc: frame.dlc });
        }
        let staged = self.tx.stage(frame);
        let descriptor = TxDescriptor {
            id: staged.id,
            dlc: staged.dlc,
            extended: staged.is_extended(),
            remote: false,
            fd: false,
            bit_rate_switch: false,
            data: staged.payload(),
        };
        self.bus.transmit(&descriptor).map_err(TransportError::Io)
    }

    /// Oldest pending frame, removed from the queue.
    #[inline]
    pub fn dequeue_rx(&mut self) -> Option<Frame> {
        self.rx.dequeue()
    }

    /// Oldest pending frame, left in the queue.
    #[inline]
    pub fn peek_rx(&self) -> Option<&Frame> {
        self.rx.peek()
    }

    /// Number of frames waiting in the RX queue.
    #[inline]
    pub fn pending_rx(&self) -> usize {
        self.rx.len()
    }

    /// Usable RX queue capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Discard the frames pending right now and return how many went.
    ///
    /// Frames the interrupt adds meanwhile stay queued, so the call always
    /// terminates.
    pub fn clear_rx(&mut self) -> usize {
        let pending = self.rx.len();
        let mut cleared = 0;
        while cleared < pending && self.rx.dequeue().is_some() {
            cleared += 1;
        }
        cleared
    }

    /// Hand the frames pending right now to `sink`, oldest first.
    pub fn drain_rx(&mut self, mut sink: impl FnMut(Frame)) -> usize {
        let pending = self.rx.len();
        let mut drained = 0;
        while drained < pending {
            let Some(frame) = self.rx.dequeue() else {
                break;
            };
            sink(frame);
            drained += 1;
        }
        drained
    }

    /// Forward up to `K` frames from another bus' queue to this bus.
    ///
    /// Stops at the first transmit failure; the failing frame is consumed.
    /// Returns the number of frames sent.
    pub fn relay_from<const M: usize>(
        &mut self,
        source: &mut Consumer<'_, Frame, M>,
    ) -> Result<usize, TransportError<B::Error>> {
        let mut sent = 0;
        while sent < K {
            let Some(frame) = source.dequeue() else {
                break;
            };
            self.transmit(&frame)?;
            sent += 1;
        }
        Ok(sent)
    }

    /// Receive queue of this bus, for relaying into another bus.
    pub fn rx_queue(&mut self) -> &mut Consumer<'a, Frame, N> {
        &mut self.rx
    }

    pub fn dropped_frames(&self) -> u32 {
        self.counters.dropped()
    }

    pub fn received_frames(&self) -> u32 {
        self.counters.received()
    }

    /// Fault state latched by the last health poll.
    pub fn health(&self) -> BusHealth {
        self.counters.health()
    }

    pub(crate) fn latch_health(&self, health: BusHealth) -> BusHealth {
        self.counters.latch_health(health)
    }

    /// Live controller status.
    pub fn status(&mut self) -> BusStatus {
        self.bus.status()
    }

    pub fn recover(&mut self) -> Result<(), TransportError<B::Error>> {
        self.bus.recover().map_err(TransportError::Io)
    }

    /// Driver of this bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}

//==================================================================================INIT_ALL
/// Bring up every bus in order and report each result in its own slot.
///
/// A failing bus does not stop the others, and buses already up stay up.
pub fn init_all<'a, B, const N: usize, const K: usize, const BUSES: usize>(
    config: &BusConfig,
    buses: [(B, &'a mut RxChannel<N>); BUSES],
    control: &'a ControlBlock,
    restart: &'a dyn Restart,
) -> [Result<Transport<'a, B, N, K>, InitError<B::Error>>; BUSES]
where
    B: BusController + RegisterRx<RxPath<'a, N>>,
{
    buses.map(|(bus, channel)| {
        let result = Transport::init(config, bus, channel, control, restart);
        #[cfg(feature = "defmt")]
        if let Err(InitError::Controller { stage, .. }) = &result {
            defmt::error!("Bus bring-up failed during {}", stage);
        }
        result
    })
}
