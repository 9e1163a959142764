//! File sink device: records the stream into a 32-bit float mono WAV file.
//!
//! A regular file is always writable, so readiness comes straight from
//! polling the file descriptor. Each iteration accepts at most one period of
//! frames, which keeps the engine's partial write path busy.

use std::fs::File;
use std::io::BufWriter;
use std::os::fd::AsRawFd;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::{
    constants::CHANNELS,
    device::{DeviceError, PcmDevice, PollDescriptor, Readiness, Resume, StreamState},
    sources::Sample,
};

pub struct WavDevice {
    writer: WavWriter<BufWriter<File>>,
    /// Second handle on the output file, only used for readiness polling
    poll_file: File,
    sample_rate: u32,
    period: usize,
    frames_written: u64,
}

impl WavDevice {
    pub fn create<P: AsRef<Path>>(
        path: P,
        sample_rate: u32,
        period: usize,
    ) -> Result<Self, DeviceError> {
        let spec = WavSpec {
            channels: CHANNELS,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };

        let file = File::create(path.as_ref())?;
        let poll_file = file.try_clone()?;
        let writer = WavWriter::new(BufWriter::new(file), spec)
            .map_err(|e| DeviceError::failed("wav header", e))?;

        info!(
            "Recording to {} at {} Hz, {} frames per period",
            path.as_ref().display(),
            sample_rate,
            period
        );

        Ok(Self {
            writer,
            poll_file,
            sample_rate,
            period,
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl PcmDevice for WavDevice {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn descriptors(&self) -> Result<Vec<PollDescriptor>, DeviceError> {
        Ok(vec![PollDescriptor {
            fd: self.poll_file.as_raw_fd(),
            events: libc::POLLOUT,
            revents: 0,
        }])
    }

    fn translate_readiness(&mut self, fds: &[PollDescriptor]) -> Result<Readiness, DeviceError> {
        Ok(fds
            .iter()
            .map(|fd| Readiness::from_poll_bits(fd.revents))
            .fold(Readiness::default(), |acc, r| Readiness {
                readable: acc.readable || r.readable,
                writable: acc.writable || r.writable,
                error: acc.error || r.error,
            }))
    }

    fn state(&mut self) -> StreamState {
        StreamState::Normal
    }

    fn avail(&mut self) -> Result<usize, DeviceError> {
        Ok(self.period)
    }

    fn write(&mut self, frames: &[Sample]) -> Result<usize, DeviceError> {
        let count = frames.len().min(self.period);

        for &sample in &frames[..count] {
            self.writer
                .write_sample(sample)
                .map_err(|e| DeviceError::failed("wav write", e))?;
        }
        self.frames_written += count as u64;

        Ok(count)
    }

    fn prepare(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn resume(&mut self) -> Result<Resume, DeviceError> {
        Ok(Resume::Resumed)
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        // Rewrites the header lengths, the file is playable after this
        self.writer
            .flush()
            .map_err(|e| DeviceError::failed("wav flush", e))?;

        debug!("Flushed {} frames to WAV file", self.frames_written);
        Ok(())
    }
}
