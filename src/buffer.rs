//! Local sample buffer sitting between the generator and the device.
//!
//! Holds one generated block and tracks how much of it the device has not
//! accepted yet. The block is only regenerated once it is fully written.

use crate::sources::{AudioSource, Sample};

pub struct LocalBuffer {
    samples: Vec<Sample>,
    /// Index of the first frame not yet written to the device
    cursor: usize,
    /// Frames between the cursor and the end of the block
    remaining: usize,
    /// Total frames handed out since creation - for diagnostics
    total_advanced: u64,
}

impl LocalBuffer {
    /// Allocates the whole block up front. It is never resized afterwards.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity],
            cursor: 0,
            remaining: 0,
            total_advanced: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn total_advanced(&self) -> u64 {
        self.total_advanced
    }

    /// True when every frame of the current block has been written, including
    /// the initial state before the first block was generated.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Regenerate a full block in place and rewind the cursor.
    pub fn refill<S: AudioSource + ?Sized>(&mut self, source: &mut S) {
        source.fill(&mut self.samples);
        self.cursor = 0;
        self.remaining = self.samples.len();
    }

    /// Frames not yet written, starting at the cursor.
    pub fn pending(&self) -> &[Sample] {
        &self.samples[self.cursor..self.cursor + self.remaining]
    }

    /// Move the cursor past `frames` written frames.
    ///
    /// Never advances beyond the end of the block; returns the number of
    /// frames actually consumed.
    pub fn advance(&mut self, frames: usize) -> usize {
        let frames = frames.min(self.remaining);

        self.cursor += frames;
        self.remaining -= frames;
        self.total_advanced += frames as u64;

        frames
    }
}
