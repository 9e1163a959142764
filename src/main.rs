#[macro_use]
extern crate log;

use anyhow::{anyhow, Context, Result};

use pcm_tone::{
    config::{self, Backend, Config},
    device::{wav::WavDevice, PcmDevice},
    engine::{Engine, EngineError, EngineOptions, EngineStats},
    poll::PollWaiter,
    sources::sine::SineSource,
};

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::CONFIG_FILE.to_string());
    let config = config::load_or_default(&config_path).await?;

    let stats = match config.device.backend {
        Backend::Wav => {
            let device = WavDevice::create(
                &config.device.wav_path,
                config.device.sample_rate,
                config.device.wav_period,
            )
            .context("Failed to create WAV output")?;
            play(device, &config).await?
        }
        Backend::Alsa => play(open_alsa(&config)?, &config).await?,
    };

    info!(
        "Wrote {} frames in {} writes ({} partial), {} blocks generated, {} underruns, {} suspends",
        stats.frames_written,
        stats.writes,
        stats.partial_writes,
        stats.blocks_generated,
        stats.xruns,
        stats.suspends
    );

    Ok(())
}

#[cfg(feature = "alsa")]
fn open_alsa(config: &Config) -> Result<pcm_tone::device::alsa::AlsaDevice> {
    pcm_tone::device::alsa::AlsaDevice::open(&config.device.name, config.device.sample_rate)
        .with_context(|| format!("Failed to open ALSA device {}", config.device.name))
}

#[cfg(not(feature = "alsa"))]
fn open_alsa(_config: &Config) -> Result<WavDevice> {
    Err(anyhow!(
        "ALSA backend requested but pcm-tone was built without the `alsa` feature"
    ))
}

/// Run the engine on a blocking thread until Ctrl-C or the configured
/// duration elapses.
async fn play<D>(device: D, config: &Config) -> Result<EngineStats>
where
    D: PcmDevice + Send + 'static,
{
    let sample_rate = device.sample_rate();
    if sample_rate == 0 {
        return Err(EngineError::InvalidSampleRate.into());
    }
    let source = SineSource::new(config.tone.frequency, sample_rate)
        .with_amplitude(config.tone.amplitude);
    let options = EngineOptions {
        buffer_frames: config.engine.buffer_frames,
        frame_limit: config.engine.frame_limit(sample_rate),
    };

    let mut engine = Engine::new(device, source, PollWaiter, options)?;
    let cancel = engine.cancel_token();

    info!(
        "Playing {} Hz at {} Hz sample rate, press Ctrl-C to stop",
        config.tone.frequency, sample_rate
    );

    let playback = tokio::task::spawn_blocking(move || engine.run());

    let ctrl_c = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            // Takes effect once the current wait returns
            Ok(()) => cancel.cancel(),
            Err(e) => warn!("Unable to listen for Ctrl-C: {e}"),
        }
    });

    let result = playback.await;
    ctrl_c.abort();

    result
        .context("Playback task panicked")?
        .map_err(|e| {
            error!("Playback failed: {e}");
            anyhow!(e)
        })
}
