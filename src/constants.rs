// Device and tone defaults, overridable from Config.toml
pub const DEFAULT_DEVICE_NAME: &str = "default";
pub const DEFAULT_SAMPLE_RATE: u32 = 44100; // Rate hint, the device may negotiate another one
pub const CHANNELS: u16 = 1; // Mono, one sample per frame

pub const TONE_FREQUENCY: f64 = 440.0; // A4
pub const TONE_AMPLITUDE: f32 = 1.0;

/// Local buffer size in frames. Any size works, this one amortises the
/// generator cost over many device writes.
pub const LOCAL_BUFFER_FRAMES: usize = 65536;

pub const DEFAULT_WAV_PATH: &str = "pcm-tone.wav";
pub const DEFAULT_WAV_PERIOD: usize = 1024;
