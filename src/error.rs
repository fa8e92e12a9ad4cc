//! Error definitions shared across library modules.
//! Each type models one failure domain (transport, bus bring-up, update chunk
//! validation, update session) and is generic over the collaborator error
//! when a bus controller or storage failure can bubble through it.
use thiserror_no_std::Error;

//==================================================================================TRANSPORT_ERROR
#[derive(Error, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Failures raised by the frame transport.
pub enum TransportError<E: core::fmt::Debug> {
    /// Data length code above the classic CAN maximum of eight bytes.
    #[error("Invalid DLC: {dlc}")]
    InvalidArgument { dlc: u8 },
    /// The bus was never enabled or has been handed over.
    #[error("Bus not initialised")]
    InvalidState,
    /// A bounded buffer had no room left.
    #[error("Resource exhausted")]
    ResourceExhausted,
    /// The bus controller refused or failed the operation.
    #[error("Bus controller error: {0:?}")]
    Io(E),
}

//==================================================================================INIT_ERROR
/// Bring-up step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitStage {
    Configure,
    RegisterRx,
    Enable,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors encountered while bringing a bus up.
pub enum InitError<E: core::fmt::Debug> {
    /// The RX queue storage cannot hold a single frame.
    #[error("RX queue storage exhausted")]
    ResourceExhausted,
    /// The bus controller rejected one of the bring-up steps.
    #[error("Bus controller failed during {stage:?}: {error:?}")]
    Controller { stage: InitStage, error: E },
}

//==================================================================================CHUNK_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Reasons an update chunk is rejected.
pub enum ChunkError {
    /// The frame carries no byte at all, not even a check byte.
    #[error("Empty update chunk")]
    Empty,
    /// The CRC over the zero-padded word left a non-zero remainder.
    #[error("CRC mismatch, remainder {remainder:#04x}")]
    Crc { remainder: u8 },
}

//==================================================================================UPDATE_ERROR
#[derive(Error, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Failures of the firmware update session.
pub enum UpdateError<E: core::fmt::Debug> {
    /// Storage exposes no region to receive the new image.
    #[error("No update region available")]
    NoStorage,
    /// Erasing the update region failed; retried on the next pump.
    #[error("Erase failed: {0:?}")]
    Erase(E),
    /// Declared image size does not fit into the update region.
    #[error("Image of {declared} bytes exceeds region of {capacity} bytes")]
    ImageTooLarge { declared: u32, capacity: u32 },
    /// Writing image bytes failed. The session is stalled until reset.
    #[error("Write failed at offset {offset}: {error:?}")]
    Write { offset: u32, error: E },
    /// The written image could not be selected as the next boot target.
    #[error("Setting boot target failed: {0:?}")]
    BootTarget(E),
}
