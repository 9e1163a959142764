//! Playback device boundary.
//!
//! Opening and configuring the hardware happens before the engine starts.
//! What the engine needs afterwards is captured by the `PcmDevice` trait:
//! readiness descriptors, readiness translation, stream state, capacity,
//! writes and the two recovery calls.

#[cfg(feature = "alsa")]
pub mod alsa;
pub mod wav;

use std::fmt;

use thiserror::Error;

use crate::sources::Sample;

/// OS-level readiness descriptor, as handed to `poll(2)`.
pub type PollDescriptor = libc::pollfd;

/// Readable / writable / error flags, used both for the interest of a
/// descriptor and for the readiness the device reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Readiness {
    pub readable: bool,
    pub writable: bool,
    pub error: bool,
}

impl Readiness {
    pub const WRITABLE: Readiness = Readiness {
        readable: false,
        writable: true,
        error: false,
    };

    pub fn from_poll_bits(bits: libc::c_short) -> Self {
        Self {
            readable: bits & libc::POLLIN != 0,
            writable: bits & libc::POLLOUT != 0,
            error: bits & libc::POLLERR != 0,
        }
    }

    pub fn to_poll_bits(self) -> libc::c_short {
        let mut bits = 0;
        if self.readable {
            bits |= libc::POLLIN;
        }
        if self.writable {
            bits |= libc::POLLOUT;
        }
        if self.error {
            bits |= libc::POLLERR;
        }
        bits
    }

    pub fn is_empty(&self) -> bool {
        !(self.readable || self.writable || self.error)
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }

        let mut first = true;
        for (set, name) in [
            (self.readable, "POLLIN"),
            (self.writable, "POLLOUT"),
            (self.error, "POLLERR"),
        ] {
            if set {
                if !first {
                    f.write_str(" ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Stream state as reported by the device, re-read every iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Normal,
    /// Underrun (playback) or overrun
    Xrun,
    Suspended,
    Other,
}

/// Outcome of a resume attempt that did not fail outright.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resume {
    Resumed,
    /// The device cannot resume this stream, it has to be prepared instead
    NotPossible,
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("stream underrun/overrun")]
    Xrun,

    #[error("stream suspended")]
    Suspended,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{op} failed: {reason}")]
    Failed { op: &'static str, reason: String },
}

impl DeviceError {
    pub fn failed(op: &'static str, reason: impl ToString) -> Self {
        DeviceError::Failed {
            op,
            reason: reason.to_string(),
        }
    }

    /// Faults expected under load, recovered in place by the engine.
    pub fn is_transient(&self) -> bool {
        matches!(self, DeviceError::Xrun | DeviceError::Suspended)
    }
}

/// An open, configured playback stream.
///
/// Owned by the engine for the whole run. Calls are expected to be
/// non-blocking, except `write`, which may block until at least one frame is
/// accepted after the device signalled write readiness.
pub trait PcmDevice {
    /// Negotiated sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Descriptors to wait on and the events the device is interested in.
    /// Queried once at setup.
    fn descriptors(&self) -> Result<Vec<PollDescriptor>, DeviceError>;

    /// Interpret the raw `revents` of the descriptor set as stream readiness.
    fn translate_readiness(&mut self, fds: &[PollDescriptor]) -> Result<Readiness, DeviceError>;

    fn state(&mut self) -> StreamState;

    /// Frames that can be written without blocking.
    fn avail(&mut self) -> Result<usize, DeviceError>;

    /// Write frames, returning how many were accepted. Fewer than requested
    /// is a normal outcome.
    fn write(&mut self, frames: &[Sample]) -> Result<usize, DeviceError>;

    /// Reset the stream after a fault.
    fn prepare(&mut self) -> Result<(), DeviceError>;

    /// Continue a suspended stream without a full reset.
    fn resume(&mut self) -> Result<Resume, DeviceError>;

    /// Frames queued ahead of the DAC, for diagnostics.
    fn delay(&mut self) -> Result<i64, DeviceError> {
        Ok(0)
    }

    /// Called once when the engine shuts down gracefully.
    fn stop(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }
}

/// Human readable descriptor listing, one line per descriptor.
pub fn describe_descriptors(fds: &[PollDescriptor]) -> String {
    fds.iter()
        .enumerate()
        .map(|(i, fd)| format!("{i}: fd{} {}", fd.fd, Readiness::from_poll_bits(fd.events)))
        .collect::<Vec<_>>()
        .join("\n")
}
