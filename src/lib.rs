//! pcm-tone library crate
//!
//! Real-time tone playback: a sine generator feeding a local buffer that a
//! readiness-driven engine streams to a PCM device, recovering from
//! underruns and suspends along the way.
//! The binary in main.rs wires these together.

#[macro_use]
extern crate log;

pub mod buffer;
pub mod config;
pub mod constants;
pub mod device;
pub mod engine;
pub mod poll;
pub mod sources;

#[cfg(test)]
mod buffer_tests;
