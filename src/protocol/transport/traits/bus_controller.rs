//! Minimal abstraction for a CAN bus controller driver. Lets the transport
//! plug into an on-chip peripheral, an external controller or a host mock.
use core::fmt;

use crate::config::BusConfig;

//==================================================================================STATUS
/// Fault confinement state reported by the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BusHealth {
    /// Error counters below the warning limit.
    Active = 0,
    /// An error counter passed the warning limit.
    Warning = 1,
    /// The controller only sends passive error flags.
    Passive = 2,
    /// The controller disconnected itself; recovery is required.
    Off = 3,
}

impl BusHealth {
    /// Inverse of `as u8`; unknown values read as `Off`.
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Active,
            1 => Self::Warning,
            2 => Self::Passive,
            _ => Self::Off,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ERROR_ACTIVE",
            Self::Warning => "ERROR_WARNING",
            Self::Passive => "ERROR_PASSIVE",
            Self::Off => "BUS_OFF",
        }
    }
}

impl fmt::Display for BusHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error statistics reported next to the fault state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusStats {
    pub tx_error_count: u16,
    pub rx_error_count: u16,
    pub bus_error_count: u32,
}

/// Snapshot returned by [`BusController::status`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusStatus {
    pub health: BusHealth,
    pub stats: BusStats,
}

//==================================================================================DESCRIPTOR
/// Low-level transmit request handed to the controller.
///
/// `data` points into a TX staging slot that stays untouched until the pool
/// wraps around, so drivers that copy the payload after `transmit` returns
/// may keep reading it until then.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxDescriptor<'a> {
    pub id: u32,
    pub dlc: u8,
    pub extended: bool,
    pub remote: bool,
    pub fd: bool,
    pub bit_rate_switch: bool,
    pub data: &'a [u8],
}

//==================================================================================TRAITS
/// Contract of a bus controller driver.
///
/// Recovery and transmit are bounded-time operations invoked from task
/// context only; none of these methods is called from the receive interrupt.
pub trait BusController {
    type Error: core::fmt::Debug;

    /// Configure the controller (bit timing, TX queue, interrupt priority).
    fn init(&mut self, config: &BusConfig) -> Result<(), Self::Error>;

    /// Start participating on the bus.
    fn enable(&mut self) -> Result<(), Self::Error>;

    /// Queue one frame for transmission.
    fn transmit(&mut self, descriptor: &TxDescriptor<'_>) -> Result<(), Self::Error>;

    /// Current fault state and error statistics.
    fn status(&mut self) -> BusStatus;

    /// Request bus-off recovery. Repeated requests while still off must be
    /// harmless retries.
    fn recover(&mut self) -> Result<(), Self::Error>;
}

/// Installation of the receive handler `H` into the controller's receive
/// interrupt.
///
/// The controller owns the handler from then on and calls
/// [`RxHandler::on_frame`] once per received frame, from interrupt context.
pub trait RegisterRx<H: RxHandler>: BusController {
    fn register_rx_handler(&mut self, handler: H) -> Result<(), Self::Error>;
}

/// Receive callback run by the controller in interrupt context.
///
/// Implementations must not block and must not allocate. The return value
/// tells the driver whether the frame was accepted into the RX queue.
pub trait RxHandler {
    fn on_frame(&mut self, frame: crate::protocol::transport::frame::Frame) -> bool;
}
