//! Audio source abstraction for the playback pipeline.
//!
//! All audio sources implement the `AudioSource` trait, which provides
//! a pull-based interface for filling the engine's local buffer.

pub mod sine;

/// A mono sample as 32-bit float, one sample per frame.
pub type Sample = f32;

/// Trait for audio sources that can produce samples on demand.
///
/// Sources keep whatever state they need between calls, so consecutive
/// fills continue the signal where the previous one stopped.
pub trait AudioSource {
    /// Overwrite every slot of `buffer` with the next samples of the signal.
    fn fill(&mut self, buffer: &mut [Sample]);
}
