use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs::read_to_string;

use crate::constants::{
    DEFAULT_DEVICE_NAME, DEFAULT_SAMPLE_RATE, DEFAULT_WAV_PATH, DEFAULT_WAV_PERIOD,
    LOCAL_BUFFER_FRAMES, TONE_AMPLITUDE, TONE_FREQUENCY,
};

pub const CONFIG_FILE: &str = "Config.toml";

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Alsa,
    Wav,
}

impl Default for Backend {
    fn default() -> Self {
        if cfg!(feature = "alsa") {
            Backend::Alsa
        } else {
            Backend::Wav
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub backend: Backend,

    /// ALSA device name
    pub name: String,

    /// Rate requested from the device, the negotiated one may differ
    pub sample_rate: u32,

    /// Output file of the wav backend
    pub wav_path: PathBuf,

    /// Frames the wav backend accepts per iteration
    pub wav_period: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            backend: Backend::default(),
            name: DEFAULT_DEVICE_NAME.to_string(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            wav_path: PathBuf::from(DEFAULT_WAV_PATH),
            wav_period: DEFAULT_WAV_PERIOD,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ToneConfig {
    pub frequency: f64,
    pub amplitude: f32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        ToneConfig {
            frequency: TONE_FREQUENCY,
            amplitude: TONE_AMPLITUDE,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub buffer_frames: usize,

    /// Seconds of audio to play, 0 plays until interrupted
    pub duration_secs: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            buffer_frames: LOCAL_BUFFER_FRAMES,
            duration_secs: 0.0,
        }
    }
}

impl EngineConfig {
    /// Frame limit at the negotiated rate
    pub fn frame_limit(&self, sample_rate: u32) -> Option<u64> {
        if self.duration_secs > 0.0 {
            Some((self.duration_secs * sample_rate as f64).round() as u64)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub tone: ToneConfig,
    pub engine: EngineConfig,
}

impl Config {
    pub fn parse(s: &str) -> Result<Config> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.device.sample_rate == 0 {
            bail!("device.sample_rate must be positive");
        }
        if self.device.wav_period == 0 {
            bail!("device.wav_period must be at least one frame");
        }
        if !(self.tone.frequency.is_finite() && self.tone.frequency > 0.0) {
            bail!("tone.frequency must be a positive number of Hz");
        }
        if !(0.0..=1.0).contains(&self.tone.amplitude) {
            bail!("tone.amplitude must be within 0.0 and 1.0");
        }
        if self.engine.buffer_frames == 0 {
            bail!("engine.buffer_frames must be at least one frame");
        }
        if !(self.engine.duration_secs.is_finite() && self.engine.duration_secs >= 0.0) {
            bail!("engine.duration_secs must not be negative");
        }

        Ok(())
    }
}

pub async fn load(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let config = read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    Config::parse(&config).with_context(|| format!("Invalid config in {}", path.display()))
}

/// Load the config, falling back to defaults if the file does not exist.
pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();

    let exists = tokio::fs::try_exists(path)
        .await
        .with_context(|| format!("Failed to check for {}", path.display()))?;

    if exists {
        load(path).await
    } else {
        info!("No config at {}, using defaults", path.display());
        Ok(Config::default())
    }
}
