use std::f64::consts::TAU;

use crate::{
    constants::{TONE_AMPLITUDE, TONE_FREQUENCY},
    sources::{AudioSource, Sample},
};

/// Sine tone generator.
///
/// The phase is counted in samples and wrapped into `[0, sample_rate)` so it
/// never grows large enough to lose precision on long runs.
#[derive(Clone, Debug)]
pub struct SineSource {
    frequency: f64,
    amplitude: f32,
    sample_rate: f64,
    phase: f64,
}

impl SineSource {
    pub fn new(frequency: f64, sample_rate: u32) -> Self {
        assert!(sample_rate > 0, "sample rate must be positive");

        Self {
            frequency,
            amplitude: TONE_AMPLITUDE,
            sample_rate: sample_rate as f64,
            phase: 0.0,
        }
    }

    /// 440 Hz at full scale
    pub fn a4(sample_rate: u32) -> Self {
        Self::new(TONE_FREQUENCY, sample_rate)
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Start from an arbitrary phase, wrapped into the valid range.
    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = phase.rem_euclid(self.sample_rate);
        self
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate as u32
    }

    /// Sample value for a given phase, without touching the generator state.
    pub fn sample_at(&self, phase: f64) -> Sample {
        let radians = phase * TAU * self.frequency / self.sample_rate;
        radians.sin() as Sample * self.amplitude
    }

    fn next_sample(&mut self) -> Sample {
        let sample = self.sample_at(self.phase);

        self.phase += 1.0;
        if self.phase >= self.sample_rate {
            self.phase -= self.sample_rate;
        }

        sample
    }
}

impl AudioSource for SineSource {
    fn fill(&mut self, buffer: &mut [Sample]) {
        for slot in buffer {
            *slot = self.next_sample();
        }
    }
}
