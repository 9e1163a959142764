//! Streaming engine: the wait -> inspect -> write loop.
//!
//! Each iteration refills the local buffer if it is exhausted, waits for the
//! device to become writable, checks the stream for faults, then writes as
//! many frames as the device has room for. Underruns and suspensions are
//! recovered in place; everything else ends the run with an error naming the
//! failing operation.

use std::io;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use thiserror::Error;

use crate::{
    buffer::LocalBuffer,
    device::{DeviceError, PcmDevice, Readiness, Resume, StreamState},
    poll::{Multiplexer, Waiter},
    sources::AudioSource,
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("waiting for device readiness failed: {0}")]
    Wait(#[source] io::Error),

    #[error("{op}: {source}")]
    Device {
        op: &'static str,
        #[source]
        source: DeviceError,
    },

    #[error("recovery failed, {op}: {source}")]
    Recovery {
        op: &'static str,
        #[source]
        source: DeviceError,
    },

    #[error("device has no readiness descriptors")]
    NoDescriptors,

    #[error("local buffer capacity must be at least one frame")]
    InvalidCapacity,

    #[error("device reported a sample rate of 0 Hz")]
    InvalidSampleRate,
}

/// Shared stop flag, checked by the engine every time a wait returns.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// Local buffer exhausted, regenerating
    Filling,
    /// Blocked on device readiness
    Waiting,
    /// Device signalled it can take data
    Writable,
    /// Resetting the stream after a fault
    Recovering,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    Xrun,
    Suspended,
}

/// Outcome of a single loop iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Frames accepted by the device
    Wrote(usize),
    /// Readiness did not include write readiness
    NotWritable(Readiness),
    /// Device, local buffer or frame limit left no room for a single frame
    NoRoom,
    /// A fault was recovered, no data moved this iteration
    Recovered { fault: Fault, detected_by: &'static str },
    /// Cancel token was set while waiting
    Cancelled,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub blocks_generated: u64,
    pub frames_written: u64,
    pub writes: u64,
    /// Writes that accepted fewer frames than requested
    pub partial_writes: u64,
    pub xruns: u64,
    pub suspends: u64,
    /// Iterations woken up without write readiness
    pub idle_wakeups: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct EngineOptions {
    pub buffer_frames: usize,
    /// Stop after this many frames were written, run forever when `None`
    pub frame_limit: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            buffer_frames: crate::constants::LOCAL_BUFFER_FRAMES,
            frame_limit: None,
        }
    }
}

pub struct Engine<D: PcmDevice, S: AudioSource, W: Waiter> {
    device: D,
    source: S,
    mux: Multiplexer<W>,
    buffer: LocalBuffer,
    state: EngineState,
    stats: EngineStats,
    frame_limit: Option<u64>,
    cancel: CancelToken,
}

impl<D: PcmDevice, S: AudioSource, W: Waiter> Engine<D, S, W> {
    pub fn new(device: D, source: S, waiter: W, options: EngineOptions) -> Result<Self, EngineError> {
        if options.buffer_frames == 0 {
            return Err(EngineError::InvalidCapacity);
        }
        if device.sample_rate() == 0 {
            return Err(EngineError::InvalidSampleRate);
        }

        let mux = Multiplexer::new(&device, waiter)?;

        Ok(Self {
            device,
            source,
            mux,
            buffer: LocalBuffer::new(options.buffer_frames),
            state: EngineState::Filling,
            stats: EngineStats::default(),
            frame_limit: options.frame_limit,
            cancel: CancelToken::new(),
        })
    }

    /// Token that stops `run` the next time a wait returns.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn buffer(&self) -> &LocalBuffer {
        &self.buffer
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn multiplexer(&self) -> &Multiplexer<W> {
        &self.mux
    }

    /// Run until cancelled or until the frame limit is reached, then stop
    /// the device.
    pub fn run(&mut self) -> Result<EngineStats, EngineError> {
        loop {
            if self.limit_reached() {
                info!("Frame limit reached after {} frames", self.stats.frames_written);
                break;
            }

            if self.step()? == Step::Cancelled {
                info!("Playback cancelled");
                break;
            }
        }

        self.device
            .stop()
            .map_err(|source| EngineError::Device { op: "stop", source })?;

        Ok(self.stats.clone())
    }

    fn limit_reached(&self) -> bool {
        matches!(self.frame_limit, Some(limit) if self.stats.frames_written >= limit)
    }

    /// One iteration of the playback loop.
    pub fn step(&mut self) -> Result<Step, EngineError> {
        if self.buffer.is_exhausted() {
            self.state = EngineState::Filling;
            self.buffer.refill(&mut self.source);
            self.stats.blocks_generated += 1;
            debug!("Generated new data block ({} frames)", self.buffer.capacity());
        }

        self.state = EngineState::Waiting;
        let readiness = self.mux.wait(&mut self.device)?;
        trace!("Poll events: {readiness}");

        if self.cancel.is_cancelled() {
            return Ok(Step::Cancelled);
        }

        if !readiness.writable {
            self.stats.idle_wakeups += 1;
            return Ok(Step::NotWritable(readiness));
        }

        self.state = EngineState::Writable;

        match self.device.state() {
            StreamState::Xrun => return self.recover_xrun("state"),
            StreamState::Suspended => return self.recover_suspend("state"),
            StreamState::Normal | StreamState::Other => {}
        }

        let available = match self.device.avail() {
            Ok(frames) => frames,
            Err(DeviceError::Xrun) => return self.recover_xrun("avail_update"),
            Err(source) => {
                return Err(EngineError::Device {
                    op: "avail_update",
                    source,
                })
            }
        };

        if log_enabled!(log::Level::Trace) {
            if let Ok(delay) = self.device.delay() {
                let delay_ms = 1000.0 * delay as f64 / self.device.sample_rate() as f64;
                trace!("avail={available} delay={delay_ms:.1}ms");
            }
        }

        let mut requested = available.min(self.buffer.remaining());
        if let Some(limit) = self.frame_limit {
            let allowed = limit.saturating_sub(self.stats.frames_written);
            requested = requested.min(usize::try_from(allowed).unwrap_or(usize::MAX));
        }
        if requested == 0 {
            return Ok(Step::NoRoom);
        }

        let pending = &self.buffer.pending()[..requested];
        let written = match self.device.write(pending) {
            Ok(written) => written,
            Err(DeviceError::Xrun) => return self.recover_xrun("writei"),
            Err(DeviceError::Suspended) => return self.recover_suspend("writei"),
            Err(source) => return Err(EngineError::Device { op: "writei", source }),
        };
        trace!("writei {written}");

        let written = self.buffer.advance(written);
        self.stats.writes += 1;
        self.stats.frames_written += written as u64;
        if written < requested {
            self.stats.partial_writes += 1;
        }

        Ok(Step::Wrote(written))
    }

    fn recover_xrun(&mut self, detected_by: &'static str) -> Result<Step, EngineError> {
        self.state = EngineState::Recovering;
        self.stats.xruns += 1;

        self.device
            .prepare()
            .map_err(|source| EngineError::Recovery {
                op: "prepare after underrun",
                source,
            })?;

        warn!("Underrun detected by {detected_by}, stream prepared");

        Ok(Step::Recovered {
            fault: Fault::Xrun,
            detected_by,
        })
    }

    fn recover_suspend(&mut self, detected_by: &'static str) -> Result<Step, EngineError> {
        self.state = EngineState::Recovering;
        self.stats.suspends += 1;

        let resumed = match self.device.resume() {
            Ok(Resume::Resumed) => true,
            Ok(Resume::NotPossible) => false,
            Err(e) => {
                debug!("Resume failed: {e}");
                false
            }
        };

        if resumed {
            warn!("Suspend detected by {detected_by}, stream resumed");
        } else {
            self.device
                .prepare()
                .map_err(|source| EngineError::Recovery {
                    op: "prepare after suspend",
                    source,
                })?;
            warn!("Suspend detected by {detected_by}, stream could not resume and was prepared");
        }

        Ok(Step::Recovered {
            fault: Fault::Suspended,
            detected_by,
        })
    }
}
