//! Build-time configuration: node identity, per-bus controller settings and
//! the fixed buffer dimensions used by the transport and the update engine.
//!
//! Nothing here is runtime-tunable. Firmware picks its values when it builds
//! the [`ControlBlock`](crate::state::ControlBlock) and the transports, and the
//! buffer sizes are const generics whose defaults are the constants below.

//==================================================================================NODE
/// Identity of this ECU on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeConfig {
    /// Device identity. Mode-change commands must carry it in byte 1, update
    /// chunks arrive on this identifier and ACK/NACK replies leave on it.
    pub device_id: u8,
    /// Reserved identifier carrying control opcodes.
    pub control_id: u32,
}

impl NodeConfig {
    pub const DEFAULT: Self = Self {
        device_id: 0x19,
        control_id: 0x010,
    };

    /// Identifier of update chunks and of the ACK/NACK replies.
    pub const fn data_id(&self) -> u32 {
        self.device_id as u32
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

//==================================================================================BUS
/// What the receive interrupt does with frames that are not control frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxMode {
    /// Dispatch control frames, then queue every frame for the task context.
    Queued,
    /// Dispatch control frames only; nothing is queued.
    CommandOnly,
}

/// Settings handed to the bus controller when a bus is brought up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusConfig {
    /// Nominal bit rate in bit/s.
    pub bitrate: u32,
    /// Depth of the controller's own hardware/driver TX queue.
    pub tx_queue_depth: u8,
    /// Priority of the receive interrupt.
    pub interrupt_priority: u8,
    pub rx_mode: RxMode,
}

impl BusConfig {
    pub const DEFAULT: Self = Self {
        bitrate: 1_000_000,
        tx_queue_depth: 10,
        interrupt_priority: 3,
        rx_mode: RxMode::Queued,
    };
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

//==================================================================================SIZES
/// Storage slots of the RX queue. `heapless::spsc::Queue<_, N>` keeps one slot
/// free, so the usable capacity is 115 frames.
pub const RX_QUEUE_SLOTS: usize = 116;

/// Number of TX staging buffers per bus.
///
/// The controller copies a payload out of its staging buffer after
/// `transmit` has returned, so a slot is only safe to reuse once the frame
/// written `TX_POOL_SLOTS` transmits earlier has left the driver. The pool
/// must hold more slots than frames can be in flight at once, which is
/// bounded by the controller queue depth ([`BusConfig::tx_queue_depth`]).
///
/// Safety margin: `TX_POOL_SLOTS - tx_queue_depth`. The defaults keep the
/// historical 10/10 pairing, a margin of zero, which is only sound while
/// callers never have more than `TX_POOL_SLOTS - 1` frames outstanding.
/// Update traffic stays within it (one reply per received chunk); a deeper
/// controller queue needs a larger pool, passed as the `K` const generic of
/// [`Transport`](crate::protocol::transport::Transport).
pub const TX_POOL_SLOTS: usize = 10;

/// Byte capacity of the update reassembly buffer: one flash chunk plus room
/// for two maximum-size update payloads.
pub const REASSEMBLY_CAPACITY: usize = 32;

/// Flash write granularity of the update engine.
pub const FLASH_WRITE_CHUNK: usize = 16;

/// Upper bound on the number of buses one node drives.
pub const MAX_BUSES: usize = 2;
