//! Inline command dispatcher. Runs inside the receive interrupt for every
//! frame, before the frame is queued, so even frames that end up dropped are
//! inspected.
use crate::protocol::control::{declared_size, Opcode};
use crate::protocol::transport::frame::Frame;
use crate::protocol::transport::traits::restart::Restart;
use crate::state::{ControlBlock, DeviceMode};

/// Result of inspecting one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchOutcome {
    /// Not on the control identifier, or no opcode byte.
    NotControl,
    /// Control identifier with an opcode this node does not know.
    Unknown(u8),
    /// Opcode addressed to another device, or a refused transition.
    Ignored(Opcode),
    Executed(Opcode),
}

/// Executes control opcodes against the shared [`ControlBlock`].
///
/// Constant time and allocation-free. `Reset` never returns.
#[derive(Clone, Copy)]
pub struct CommandDispatcher<'a> {
    control: &'a ControlBlock,
    restart: &'a dyn Restart,
}

impl<'a> CommandDispatcher<'a> {
    pub fn new(control: &'a ControlBlock, restart: &'a dyn Restart) -> Self {
        Self { control, restart }
    }

    pub fn dispatch(&self, frame: &Frame) -> DispatchOutcome {
        let node = self.control.node();
        if frame.id != node.control_id {
            return DispatchOutcome::NotControl;
        }
        let payload = frame.payload();
        let Some(&raw) = payload.first() else {
            return DispatchOutcome::NotControl;
        };
        let Ok(opcode) = Opcode::try_from(raw) else {
            #[cfg(feature = "defmt")]
            defmt::debug!("Unknown control opcode {=u8:#x}", raw);
            return DispatchOutcome::Unknown(raw);
        };

        match opcode {
            Opcode::Reset => {
                #[cfg(feature = "defmt")]
                defmt::info!("Reset requested over the bus");
                self.restart.restart()
            }
            Opcode::ClearMinMax => {
                self.control.tasks().clear_max();
                DispatchOutcome::Executed(opcode)
            }
            // Reserved: accepted, nothing to clear yet.
            Opcode::ClearErrors => DispatchOutcome::Executed(opcode),
            Opcode::EnterUpdateMode | Opcode::EnterNormalMode => {
                if payload.get(1) != Some(&node.device_id) {
                    return DispatchOutcome::Ignored(opcode);
                }
                if opcode == Opcode::EnterUpdateMode {
                    self.enter_update(frame)
                } else {
                    self.enter_normal(frame)
                }
            }
        }
    }

    fn enter_update(&self, frame: &Frame) -> DispatchOutcome {
        let session = self.control.session();
        let mode = self.control.mode();
        if mode.is_update() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Already in update mode, session kept");
            return DispatchOutcome::Ignored(Opcode::EnterUpdateMode);
        }

        // The session is opened before the mode flips so the engine never
        // sees `Update` with the previous session's size.
        session.begin();
        if let Some(size) = declared_size(frame) {
            session.offer_size(size);
        }
        mode.enter_update();

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Device mode -> Update (session {=u32}, size {=u32})",
            session.generation(),
            session.declared_size()
        );
        DispatchOutcome::Executed(Opcode::EnterUpdateMode)
    }

    /// A size-bearing frame only records the image size and never switches
    /// mode. Without a size, `Update` is left only before flashing started
    /// (no size declared, nothing written); otherwise the switch is refused.
    fn enter_normal(&self, frame: &Frame) -> DispatchOutcome {
        let session = self.control.session();
        let mode = self.control.mode();

        if let Some(size) = declared_size(frame) {
            // Size negotiation: only meaningful inside an update session and
            // never a mode change.
            if mode.get() == DeviceMode::Update && session.offer_size(size) {
                #[cfg(feature = "defmt")]
                defmt::info!("Update image size declared: {=u32} bytes", size);
                return DispatchOutcome::Executed(Opcode::EnterNormalMode);
            }
            return DispatchOutcome::Ignored(Opcode::EnterNormalMode);
        }

        if mode.get() == DeviceMode::Update
            && (session.declared_size() != 0 || session.bytes_written() != 0)
        {
            #[cfg(feature = "defmt")]
            defmt::warn!("Refusing to leave update mode mid-flash");
            return DispatchOutcome::Ignored(Opcode::EnterNormalMode);
        }

        mode.set_normal();
        #[cfg(feature = "defmt")]
        defmt::info!("Device mode -> Normal");
        DispatchOutcome::Executed(Opcode::EnterNormalMode)
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
