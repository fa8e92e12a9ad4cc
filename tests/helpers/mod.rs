/// Test doubles for the collaborators of the core: bus controller, firmware
/// storage and restart primitive.
use can_ecu_core::protocol::transport::frame::Frame;
use can_ecu_core::protocol::transport::traits::{
    bus_controller::{
        BusController, BusHealth, BusStats, BusStatus, RegisterRx, RxHandler, TxDescriptor,
    },
    restart::Restart,
    storage::{Region, Storage},
};
use can_ecu_core::BusConfig;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Error returned by the mocks when a failure is scripted.
pub struct MockError;

//==================================================================================BUS
#[allow(dead_code)]
/// In-memory bus controller. Records transmitted frames and feeds injected
/// frames to the registered receive handler, as the receive interrupt would.
pub struct MockBus<H> {
    handler: Option<H>,
    pub config: Option<BusConfig>,
    pub enabled: bool,
    pub sent: Vec<Frame>,
    pub health: BusHealth,
    pub recover_calls: usize,
    pub fail_transmit: bool,
    pub fail_recover: bool,
    pub fail_enable: bool,
}

#[allow(dead_code)]
impl<H> MockBus<H> {
    pub fn new() -> Self {
        Self {
            handler: None,
            config: None,
            enabled: false,
            sent: Vec::new(),
            health: BusHealth::Active,
            recover_calls: 0,
            fail_transmit: false,
            fail_recover: false,
            fail_enable: false,
        }
    }

    /// Transmitted frames, oldest first, forgetting them.
    pub fn take_sent(&mut self) -> Vec<Frame> {
        std::mem::take(&mut self.sent)
    }
}

#[allow(dead_code)]
impl<H: RxHandler> MockBus<H> {
    /// Deliver `frame` to the receive handler. Returns the handler's flag.
    pub fn inject(&mut self, frame: Frame) -> bool {
        let handler = self
            .handler
            .as_mut()
            .expect("receive handler must be registered");
        handler.on_frame(frame)
    }
}

impl<H> BusController for MockBus<H> {
    type Error = MockError;

    fn init(&mut self, config: &BusConfig) -> Result<(), MockError> {
        self.config = Some(*config);
        Ok(())
    }

    fn enable(&mut self) -> Result<(), MockError> {
        if self.fail_enable {
            return Err(MockError);
        }
        self.enabled = true;
        Ok(())
    }

    fn transmit(&mut self, descriptor: &TxDescriptor<'_>) -> Result<(), MockError> {
        if self.fail_transmit {
            return Err(MockError);
        }
        assert_eq!(descriptor.extended, descriptor.id > 0x7FF);
        assert!(!descriptor.remote && !descriptor.fd && !descriptor.bit_rate_switch);
        let mut data = [0u8; 8];
        data[..descriptor.data.len()].copy_from_slice(descriptor.data);
        self.sent.push(Frame {
            id: descriptor.id,
            dlc: descriptor.dlc,
            data,
        });
        Ok(())
    }

    fn status(&mut self) -> BusStatus {
        BusStatus {
            health: self.health,
            stats: BusStats {
                tx_error_count: if self.health == BusHealth::Off { 256 } else { 0 },
                rx_error_count: 0,
                bus_error_count: 0,
            },
        }
    }

    fn recover(&mut self) -> Result<(), MockError> {
        self.recover_calls += 1;
        if self.fail_recover {
            return Err(MockError);
        }
        Ok(())
    }
}

impl<H: RxHandler> RegisterRx<H> for MockBus<H> {
    fn register_rx_handler(&mut self, handler: H) -> Result<(), MockError> {
        self.handler = Some(handler);
        Ok(())
    }
}

//==================================================================================STORAGE
#[allow(dead_code)]
/// Flash double recording erases and writes.
pub struct MockStorage {
    pub region: Option<Region>,
    pub erased: Vec<Range<u32>>,
    pub writes: Vec<(u32, Vec<u8>)>,
    pub boot_target_set: bool,
    pub fail_erase: bool,
    pub fail_write: bool,
    pub fail_boot_target: bool,
}

#[allow(dead_code)]
impl MockStorage {
    pub fn with_region(size: u32) -> Self {
        Self {
            region: Some(Region {
                address: 0x0800_0000,
                size,
            }),
            erased: Vec::new(),
            writes: Vec::new(),
            boot_target_set: false,
            fail_erase: false,
            fail_write: false,
            fail_boot_target: false,
        }
    }

    pub fn without_region() -> Self {
        Self {
            region: None,
            ..Self::with_region(0)
        }
    }

    /// Concatenation of every write, checked to be contiguous from offset 0.
    pub fn image(&self) -> Vec<u8> {
        let mut image = Vec::new();
        for (offset, bytes) in &self.writes {
            assert_eq!(*offset as usize, image.len(), "writes must be contiguous");
            image.extend_from_slice(bytes);
        }
        image
    }
}

impl Storage for MockStorage {
    type Error = MockError;

    fn update_region(&mut self) -> Option<Region> {
        self.region
    }

    fn erase(&mut self, range: Range<u32>) -> Result<(), MockError> {
        if self.fail_erase {
            return Err(MockError);
        }
        self.erased.push(range);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), MockError> {
        if self.fail_write {
            return Err(MockError);
        }
        self.writes.push((offset, bytes.to_vec()));
        Ok(())
    }

    fn set_boot_target(&mut self) -> Result<(), MockError> {
        if self.fail_boot_target {
            return Err(MockError);
        }
        self.boot_target_set = true;
        Ok(())
    }
}

//==================================================================================RESTART
/// Restart primitive that unwinds instead of resetting; tests catch it with
/// `catch_unwind`.
pub struct MockRestart;

pub const RESTART_MESSAGE: &str = "restart requested";

impl Restart for MockRestart {
    fn restart(&self) -> ! {
        panic!("{}", RESTART_MESSAGE)
    }
}

#[allow(dead_code)]
/// Runs `f` and reports whether it requested a restart.
pub fn restarted<T>(f: impl FnOnce() -> T) -> bool {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));
    match result {
        Ok(_) => false,
        Err(payload) => {
            let message = payload
                .downcast_ref::<String>()
                .map(String::as_str)
                .or_else(|| payload.downcast_ref::<&str>().copied());
            assert_eq!(message, Some(RESTART_MESSAGE), "unexpected panic");
            true
        }
    }
}
