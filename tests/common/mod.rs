//! Test infrastructure for pcm-tone integration tests.
//!
//! Provides a scripted playback device that records every call, scripted
//! waiters, and helpers to build engines around them.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;

pub use pcm_tone::device::{
    DeviceError, PcmDevice, PollDescriptor, Readiness, Resume, StreamState,
};
pub use pcm_tone::engine::{
    Engine, EngineError, EngineOptions, EngineState, Fault, Step,
};
pub use pcm_tone::poll::{Multiplexer, PollWaiter, Waiter};
pub use pcm_tone::sources::{sine::SineSource, AudioSource, Sample};

/// Device calls as seen by the mock, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Translate,
    State,
    Avail,
    /// Frames requested
    Write(usize),
    Prepare,
    Resume,
    Delay,
    Stop,
}

/// Scripted playback device.
///
/// Each queue is consumed one entry per call; an empty queue falls back to
/// a healthy device that accepts everything.
pub struct MockDevice {
    pub rate: u32,
    pub fds: Vec<PollDescriptor>,
    pub readiness: VecDeque<Readiness>,
    pub states: VecDeque<StreamState>,
    pub avail: VecDeque<Result<usize, DeviceError>>,
    /// `Ok(n)` accepts at most `n` frames
    pub writes: VecDeque<Result<usize, DeviceError>>,
    pub resumes: VecDeque<Result<Resume, DeviceError>>,
    pub prepare_fails: bool,
    pub default_avail: usize,
    pub calls: Vec<Call>,
    pub written: Vec<Sample>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            rate: 44100,
            fds: vec![PollDescriptor {
                fd: 10,
                events: libc::POLLOUT,
                revents: 0,
            }],
            readiness: VecDeque::new(),
            states: VecDeque::new(),
            avail: VecDeque::new(),
            writes: VecDeque::new(),
            resumes: VecDeque::new(),
            prepare_fails: false,
            default_avail: 1024,
            calls: Vec::new(),
            written: Vec::new(),
        }
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn write_requests(&self) -> Vec<usize> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Write(n) => Some(*n),
                _ => None,
            })
            .collect()
    }

    /// Calls made during the last `step`, i.e. since the last `Translate`.
    pub fn last_iteration(&self) -> &[Call] {
        let start = self
            .calls
            .iter()
            .rposition(|c| *c == Call::Translate)
            .unwrap_or(0);
        &self.calls[start..]
    }
}

impl PcmDevice for MockDevice {
    fn sample_rate(&self) -> u32 {
        self.rate
    }

    fn descriptors(&self) -> Result<Vec<PollDescriptor>, DeviceError> {
        Ok(self.fds.clone())
    }

    fn translate_readiness(&mut self, fds: &[PollDescriptor]) -> Result<Readiness, DeviceError> {
        self.calls.push(Call::Translate);
        if let Some(readiness) = self.readiness.pop_front() {
            return Ok(readiness);
        }

        let bits = fds.iter().fold(0, |acc, fd| acc | fd.revents);
        Ok(Readiness::from_poll_bits(bits))
    }

    fn state(&mut self) -> StreamState {
        self.calls.push(Call::State);
        self.states.pop_front().unwrap_or(StreamState::Normal)
    }

    fn avail(&mut self) -> Result<usize, DeviceError> {
        self.calls.push(Call::Avail);
        self.avail.pop_front().unwrap_or(Ok(self.default_avail))
    }

    fn write(&mut self, frames: &[Sample]) -> Result<usize, DeviceError> {
        self.calls.push(Call::Write(frames.len()));
        let accepted = match self.writes.pop_front() {
            Some(Ok(max)) => frames.len().min(max),
            Some(Err(e)) => return Err(e),
            None => frames.len(),
        };
        self.written.extend_from_slice(&frames[..accepted]);
        Ok(accepted)
    }

    fn prepare(&mut self) -> Result<(), DeviceError> {
        self.calls.push(Call::Prepare);
        if self.prepare_fails {
            return Err(DeviceError::failed("snd_pcm_prepare", "Input/output error"));
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<Resume, DeviceError> {
        self.calls.push(Call::Resume);
        self.resumes.pop_front().unwrap_or(Ok(Resume::Resumed))
    }

    fn delay(&mut self) -> Result<i64, DeviceError> {
        self.calls.push(Call::Delay);
        Ok(0)
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.calls.push(Call::Stop);
        Ok(())
    }
}

/// Waiter reporting every descriptor ready for what it asked for.
#[derive(Default)]
pub struct ReadyWaiter {
    pub waits: usize,
}

impl Waiter for ReadyWaiter {
    fn wait(&mut self, fds: &mut [PollDescriptor]) -> io::Result<usize> {
        self.waits += 1;
        for fd in fds.iter_mut() {
            fd.revents = fd.events;
        }
        Ok(fds.len())
    }
}

/// Waiter interrupted by a signal a number of times before succeeding.
pub struct InterruptedWaiter {
    pub interrupts: usize,
    pub attempts: usize,
}

impl InterruptedWaiter {
    pub fn new(interrupts: usize) -> Self {
        Self {
            interrupts,
            attempts: 0,
        }
    }
}

impl Waiter for InterruptedWaiter {
    fn wait(&mut self, fds: &mut [PollDescriptor]) -> io::Result<usize> {
        self.attempts += 1;
        if self.attempts <= self.interrupts {
            return Err(io::Error::from_raw_os_error(libc::EINTR));
        }
        ReadyWaiter::default().wait(fds)
    }
}

/// Waiter whose wait primitive fails outright.
pub struct BrokenWaiter;

impl Waiter for BrokenWaiter {
    fn wait(&mut self, _fds: &mut [PollDescriptor]) -> io::Result<usize> {
        Err(io::Error::from_raw_os_error(libc::EBADF))
    }
}

/// Source producing 0.0, 1.0, 2.0, ... so buffer positions show in output.
#[derive(Default)]
pub struct RampSource {
    next: f32,
}

impl AudioSource for RampSource {
    fn fill(&mut self, buffer: &mut [Sample]) {
        for slot in buffer {
            *slot = self.next;
            self.next += 1.0;
        }
    }
}

pub fn options(buffer_frames: usize) -> EngineOptions {
    EngineOptions {
        buffer_frames,
        frame_limit: None,
    }
}

/// Engine over a scripted device, with a ramp source and an always-ready waiter.
pub fn ramp_engine(
    device: MockDevice,
    buffer_frames: usize,
) -> Engine<MockDevice, RampSource, ReadyWaiter> {
    Engine::new(
        device,
        RampSource::default(),
        ReadyWaiter::default(),
        options(buffer_frames),
    )
    .unwrap()
}
