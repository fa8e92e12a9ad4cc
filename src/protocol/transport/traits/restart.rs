//! Device restart primitive.

/// Restarts the device. Shared between the receive interrupt (Reset opcode)
/// and the update engine (completed image), hence `&self` and `Sync`.
pub trait Restart: Sync {
    fn restart(&self) -> !;
}
