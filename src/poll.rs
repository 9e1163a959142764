//! Readiness multiplexer.
//!
//! Waiting is split in two: a `Waiter` blocks on raw descriptors and fills
//! in `revents`, then the device interprets those into stream readiness.
//! Raw descriptor readiness does not map 1:1 to stream readiness, a device
//! may be waiting on a timer or a status pipe rather than the hardware.

use std::io;

use crate::{
    device::{describe_descriptors, PcmDevice, PollDescriptor, Readiness},
    engine::EngineError,
};

/// Blocking wait on a descriptor set.
pub trait Waiter {
    /// Block until at least one descriptor is ready, setting `revents` on
    /// each. A signal interrupting the wait surfaces as
    /// `io::ErrorKind::Interrupted`.
    fn wait(&mut self, fds: &mut [PollDescriptor]) -> io::Result<usize>;
}

/// `poll(2)` with no timeout.
#[derive(Clone, Copy, Debug, Default)]
pub struct PollWaiter;

impl Waiter for PollWaiter {
    fn wait(&mut self, fds: &mut [PollDescriptor]) -> io::Result<usize> {
        // SAFETY: the pointer and length come from a live mutable slice of
        // pollfd structs, which poll only reads and writes within bounds.
        let ret = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };

        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(ret as usize)
    }
}

pub struct Multiplexer<W: Waiter> {
    waiter: W,
    fds: Vec<PollDescriptor>,
    interrupted: u64,
}

impl<W: Waiter> Multiplexer<W> {
    /// Fetch the device's descriptor set once. The set stays fixed for the
    /// lifetime of the multiplexer.
    pub fn new<D: PcmDevice + ?Sized>(device: &D, waiter: W) -> Result<Self, EngineError> {
        let fds = device
            .descriptors()
            .map_err(|source| EngineError::Device {
                op: "poll descriptors",
                source,
            })?;

        // poll on an empty set with no timeout would never return
        if fds.is_empty() {
            return Err(EngineError::NoDescriptors);
        }

        debug!("Waiting on {} descriptor(s):\n{}", fds.len(), describe_descriptors(&fds));

        Ok(Self {
            waiter,
            fds,
            interrupted: 0,
        })
    }

    pub fn descriptors(&self) -> &[PollDescriptor] {
        &self.fds
    }

    /// Number of waits cut short by a signal so far.
    pub fn interrupted(&self) -> u64 {
        self.interrupted
    }

    /// Block until the device reports some readiness.
    ///
    /// Interrupted waits are retried. Any other wait failure is fatal, the
    /// engine cannot know when to write without it.
    pub fn wait<D: PcmDevice + ?Sized>(&mut self, device: &mut D) -> Result<Readiness, EngineError> {
        for fd in &mut self.fds {
            fd.revents = 0;
        }

        loop {
            match self.waiter.wait(&mut self.fds) {
                Ok(_) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    self.interrupted += 1;
                    trace!("Wait interrupted by signal, retrying");
                }
                Err(e) => return Err(EngineError::Wait(e)),
            }
        }

        device
            .translate_readiness(&self.fds)
            .map_err(|source| EngineError::Device {
                op: "poll revents",
                source,
            })
    }
}
