//! Over-bus firmware update engine.
//!
//! The engine is a pump: the background loop calls [`UpdateEngine::pump`]
//! while the device is in update mode, and each call does a bounded amount
//! of work before returning. One call drains only the frames queued when it
//! started and performs at most one storage write.
//!
//! Session flow:
//!
//! ```text
//! Idle ──region + erase──▶ Negotiating ──size known──▶ Receiving ──all bytes──▶ Complete
//!                               │                          │
//!                               └──image too large──▶ Stalled ◀──write failed
//! ```
use embassy_time::{Duration, Instant};
use heapless::Deque;

use crate::config::{FLASH_WRITE_CHUNK, REASSEMBLY_CAPACITY};
use crate::error::{ChunkError, UpdateError};
use crate::protocol::transport::frame::Frame;
use crate::protocol::transport::traits::bus_controller::BusController;
use crate::protocol::transport::traits::restart::Restart;
use crate::protocol::transport::traits::storage::{Region, Storage};
use crate::protocol::transport::Transport;
use crate::state::ControlBlock;

pub mod chunk;

use chunk::{ack_frame, nack_frame, validate_chunk, MAX_CHUNK_DATA};

//==================================================================================STATE
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateState {
    /// Waiting for the update region to be acquired and erased.
    Idle,
    /// Region ready, waiting for the image size.
    Negotiating,
    /// Accepting chunks and writing them out.
    Receiving,
    /// Image written; the boot target was requested.
    Complete,
    /// A fatal error ended the session. Only a reset leaves this state.
    Stalled,
}

//==================================================================================ENGINE
/// Update session driver, generic over the firmware storage `S` and the
/// reassembly buffer capacity `R`.
pub struct UpdateEngine<'a, S: Storage, const R: usize = REASSEMBLY_CAPACITY> {
    control: &'a ControlBlock,
    restart: &'a dyn Restart,
    storage: S,
    state: UpdateState,
    region: Option<Region>,
    reassembly: Deque<u8, R>,
    /// Session generation the buffers belong to; 0 before the first session.
    generation: u32,
    started: Instant,
}

impl<'a, S: Storage, const R: usize> UpdateEngine<'a, S, R> {
    /// A full flash chunk plus one maximum chunk must fit, or a half-full
    /// buffer could neither flush nor accept the next chunk.
    const FITS_ONE_CHUNK: () = assert!(R >= FLASH_WRITE_CHUNK + MAX_CHUNK_DATA);

    pub fn new(control: &'a ControlBlock, restart: &'a dyn Restart, storage: S) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::FITS_ONE_CHUNK;
        Self {
            control,
            restart,
            storage,
            state: UpdateState::Idle,
            region: None,
            reassembly: Deque::new(),
            generation: 0,
            started: Instant::now(),
        }
    }

    #[inline]
    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// Image bytes validated but not written yet.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.reassembly.len()
    }

    /// Time since the current session was opened.
    pub fn session_elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn region(&self) -> Option<Region> {
        self.region
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Run one bounded step of the update session over `transport`.
    ///
    /// A new session (opened by the dispatcher) is noticed here and resets
    /// the engine. Errors are reported once, on the pump that hit them:
    /// `NoStorage` and `Erase` are retried by later pumps, `ImageTooLarge`
    /// and `Write` leave the engine [`Stalled`](UpdateState::Stalled).
    /// Completion with a valid boot target does not return.
    pub fn pump<B, const N: usize, const K: usize>(
        &mut self,
        transport: &mut Transport<'_, B, N, K>,
    ) -> Result<UpdateState, UpdateError<S::Error>>
    where
        B: BusController,
    {
        let generation = self.control.session().generation();
        if generation == 0 {
            return Ok(self.state);
        }
        if generation != self.generation {
            self.begin(generation, transport);
        }

        if self.state == UpdateState::Idle {
            self.prepare_region()?;
        }
        if self.state == UpdateState::Negotiating {
            self.negotiate()?;
        }
        if self.state == UpdateState::Receiving {
            self.receive(transport);
            self.flush()?;
            self.finish()?;
        }
        Ok(self.state)
    }

    fn begin<B, const N: usize, const K: usize>(
        &mut self,
        generation: u32,
        transport: &mut Transport<'_, B, N, K>,
    ) where
        B: BusController,
    {
        self.generation = generation;
        self.control.session().reset_progress();
        self.reassembly.clear();
        #[allow(unused_variables)]
        let stale = transport.clear_rx();
        self.region = None;
        self.state = UpdateState::Idle;
        self.started = Instant::now();

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Update session {=u32} started, {=usize} stale frames discarded",
            generation,
            stale
        );
    }

    fn prepare_region(&mut self) -> Result<(), UpdateError<S::Error>> {
        let region = match self.region {
            Some(region) => region,
            None => {
                let Some(region) = self.storage.update_region() else {
                    #[cfg(feature = "defmt")]
                    defmt::error!("No update region available");
                    return Err(UpdateError::NoStorage);
                };
                self.region = Some(region);
                region
            }
        };

        self.storage
            .erase(0..region.size)
            .map_err(UpdateError::Erase)?;

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Update region {=u32:#x} ({=u32} bytes) erased",
            region.address,
            region.size
        );
        self.state = UpdateState::Negotiating;
        Ok(())
    }

    fn negotiate(&mut self) -> Result<(), UpdateError<S::Error>> {
        let declared = self.control.session().declared_size();
        if declared == 0 {
            return Ok(());
        }
        let capacity = self.region.map(|region| region.size).unwrap_or(0);
        if declared > capacity {
            #[cfg(feature = "defmt")]
            defmt::error!(
                "Image of {=u32} bytes does not fit region of {=u32}",
                declared,
                capacity
            );
            self.state = UpdateState::Stalled;
            return Err(UpdateError::ImageTooLarge { declared, capacity });
        }

        #[cfg(feature = "defmt")]
        defmt::info!("Receiving image of {=u32} bytes", declared);
        self.state = UpdateState::Receiving;
        Ok(())
    }

    /// Drain the frames queued right now into the reassembly buffer.
    ///
    /// A chunk that would not fit is left at the head of the queue for a
    /// later pump.
    fn receive<B, const N: usize, const K: usize>(&mut self, transport: &mut Transport<'_, B, N, K>)
    where
        B: BusController,
    {
        let data_id = self.control.node().data_id();
        let pending = transport.pending_rx();

        for _ in 0..pending {
            let Some(frame) = transport.peek_rx().copied() else {
                break;
            };
            if frame.id == data_id {
                let incoming = frame.payload().len().saturating_sub(1);
                if R - self.reassembly.len() < incoming {
                    break;
                }
            }
            transport.dequeue_rx();
            if frame.id == data_id {
                self.accept(&frame, transport);
            }
        }
    }

    fn accept<B, const N: usize, const K: usize>(
        &mut self,
        frame: &Frame,
        transport: &mut Transport<'_, B, N, K>,
    ) where
        B: BusController,
    {
        let data_id = self.control.node().data_id();
        let reply = match validate_chunk(frame) {
            Ok(data) => {
                for &byte in data {
                    if self.reassembly.push_back(byte).is_err() {
                        break;
                    }
                }
                ack_frame(data_id)
            }
            Err(ChunkError::Empty) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("Empty update chunk ignored");
                return;
            }
            #[allow(unused_variables)]
            Err(ChunkError::Crc { remainder }) => {
                let errors = self.control.session().record_error();
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "Chunk rejected (remainder {=u8:#x}), {=u32} errors",
                    remainder,
                    errors
                );
                nack_frame(data_id, errors)
            }
        };

        if transport.transmit(&reply).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Update reply not sent");
        }
    }

    /// Write at most one flash chunk, or the whole tail of the image once it
    /// is buffered.
    fn flush(&mut self) -> Result<(), UpdateError<S::Error>> {
        let session = self.control.session();
        let offset = session.bytes_written();
        let remaining = session.declared_size().saturating_sub(offset) as usize;
        let buffered = self.reassembly.len();

        // The tail goes out in one write once all of it is buffered.
        let len = if remaining < FLASH_WRITE_CHUNK {
            if buffered >= remaining {
                remaining
            } else {
                0
            }
        } else if buffered >= FLASH_WRITE_CHUNK {
            FLASH_WRITE_CHUNK
        } else {
            0
        };
        if len == 0 {
            return Ok(());
        }

        let mut chunk = [0u8; FLASH_WRITE_CHUNK];
        for slot in chunk[..len].iter_mut() {
            *slot = self.reassembly.pop_front().unwrap_or(0);
        }

        if let Err(error) = self.storage.write(offset, &chunk[..len]) {
            #[cfg(feature = "defmt")]
            defmt::error!("Flash write failed at offset {=u32}, update stalled", offset);
            self.state = UpdateState::Stalled;
            return Err(UpdateError::Write { offset, error });
        }

        let written = session.advance(len as u32);
        #[cfg(feature = "defmt")]
        defmt::debug!("Wrote {=usize} bytes, {=u32} total", len, written);

        if written >= session.declared_size() && !self.reassembly.is_empty() {
            #[cfg(feature = "defmt")]
            defmt::debug!("Discarding {=usize} bytes past the image end", self.reassembly.len());
            self.reassembly.clear();
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), UpdateError<S::Error>> {
        let session = self.control.session();
        let declared = session.declared_size();
        if declared == 0 || session.bytes_written() < declared {
            return Ok(());
        }

        self.state = UpdateState::Complete;
        #[cfg(feature = "defmt")]
        defmt::info!(
            "Image of {=u32} bytes written in {=u64} ms, {=u32} chunks rejected",
            declared,
            self.session_elapsed().as_millis(),
            session.error_count()
        );

        match self.storage.set_boot_target() {
            Ok(()) => self.restart.restart(),
            Err(error) => {
                #[cfg(feature = "defmt")]
                defmt::error!("Boot target not set, staying on the current image");
                Err(UpdateError::BootTarget(error))
            }
        }
    }
}
