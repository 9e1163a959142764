//! ALSA playback backend.
//!
//! `AlsaDevice::open` does the one-time setup handshake: non-blocking
//! playback stream, interleaved float samples, mono, rate as close to the
//! hint as the hardware allows.

use ::alsa::pcm::{Access, Format, HwParams, State, PCM};
use ::alsa::poll::{Descriptors, Flags};
use ::alsa::{Direction, Output, ValueOr};

use crate::{
    constants::CHANNELS,
    device::{
        describe_descriptors, DeviceError, PcmDevice, PollDescriptor, Readiness, Resume,
        StreamState,
    },
    sources::Sample,
};

impl From<::alsa::Error> for DeviceError {
    fn from(e: ::alsa::Error) -> Self {
        match e.errno() {
            libc::EPIPE => DeviceError::Xrun,
            libc::ESTRPIPE => DeviceError::Suspended,
            _ => DeviceError::failed(e.func(), e),
        }
    }
}

/// EAGAIN and ENOSYS mean the hardware cannot resume and needs a prepare.
pub(crate) fn resume_outcome(result: Result<(), ::alsa::Error>) -> Result<Resume, DeviceError> {
    match result {
        Ok(()) => Ok(Resume::Resumed),
        Err(e) if e.errno() == libc::EAGAIN || e.errno() == libc::ENOSYS => {
            Ok(Resume::NotPossible)
        }
        Err(e) => Err(e.into()),
    }
}

pub struct AlsaDevice {
    pcm: PCM,
    sample_rate: u32,
}

impl AlsaDevice {
    pub fn open(device_name: &str, rate_hint: u32) -> Result<Self, DeviceError> {
        let pcm = PCM::new(device_name, Direction::Playback, true)?;

        {
            let hwparams = HwParams::any(&pcm)?;
            hwparams.set_access(Access::RWInterleaved)?;
            hwparams.set_format(Format::FloatLE)?;
            hwparams.set_rate_near(rate_hint, ValueOr::Nearest)?;
            hwparams.set_channels(CHANNELS as u32)?;
            pcm.hw_params(&hwparams)?;
        }

        let (sample_rate, buffer_size, period_size) = {
            let current = pcm.hw_params_current()?;
            (
                current.get_rate()?,
                current.get_buffer_size()?,
                current.get_period_size()?,
            )
        };

        info!("Opened ALSA device {device_name}, actual rate: {sample_rate} Hz");
        info!("Buffer size (frames): {buffer_size}, period size (frames): {period_size}");

        let device = Self { pcm, sample_rate };

        if log_enabled!(log::Level::Debug) {
            debug!("Poll descriptors:\n{}", describe_descriptors(&device.descriptors()?));
            match device.dump() {
                Ok(dump) => debug!("PCM setup:\n{dump}"),
                Err(e) => warn!("Could not dump PCM setup: {e}"),
            }
        }

        Ok(device)
    }

    fn dump(&self) -> Result<String, DeviceError> {
        let mut output = Output::buffer_open()?;
        self.pcm.dump(&mut output)?;
        Ok(format!("{output}"))
    }
}

impl PcmDevice for AlsaDevice {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn descriptors(&self) -> Result<Vec<PollDescriptor>, DeviceError> {
        Ok(Descriptors::get(&self.pcm)?)
    }

    fn translate_readiness(&mut self, fds: &[PollDescriptor]) -> Result<Readiness, DeviceError> {
        // ALSA may wait on a status pipe with POLLIN even for playback; the
        // plugin maps that back to POLLOUT and updates its bookkeeping here.
        let flags = Descriptors::revents(&self.pcm, fds)?;

        Ok(Readiness {
            readable: flags.contains(Flags::IN),
            writable: flags.contains(Flags::OUT),
            error: flags.contains(Flags::ERR),
        })
    }

    fn state(&mut self) -> StreamState {
        match self.pcm.state() {
            State::Prepared | State::Running => StreamState::Normal,
            State::XRun => StreamState::Xrun,
            State::Suspended => StreamState::Suspended,
            _ => StreamState::Other,
        }
    }

    fn avail(&mut self) -> Result<usize, DeviceError> {
        let frames = self.pcm.avail_update()?;
        Ok(frames.max(0) as usize)
    }

    fn write(&mut self, frames: &[Sample]) -> Result<usize, DeviceError> {
        let io = self.pcm.io_f32()?;
        Ok(io.writei(frames)?)
    }

    fn prepare(&mut self) -> Result<(), DeviceError> {
        Ok(self.pcm.prepare()?)
    }

    fn resume(&mut self) -> Result<Resume, DeviceError> {
        resume_outcome(self.pcm.resume())
    }

    fn delay(&mut self) -> Result<i64, DeviceError> {
        Ok(self.pcm.delay()? as i64)
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        Ok(self.pcm.drop()?)
    }
}
