use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use crate::clock::Clock;
use crate::error::SynthError;

/// Per-frame audio callback. `input` holds one sample per input channel
/// (empty when input is disabled), `output` one slot per output channel.
pub trait Patch: Send {
    fn render_frame(&mut self, clock: &Clock, input: &[f32], output: &mut [f32]);
}

impl<F> Patch for F
where
    F: FnMut(&Clock, &[f32], &mut [f32]) + Send,
{
    fn render_frame(&mut self, clock: &Clock, input: &[f32], output: &mut [f32]) {
        self(clock, input, output)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub enable_input: bool,
    pub level_meter: bool, // log the peak of every rendered block at debug level
    pub output: Option<PathBuf>, // record rendered audio to this WAV file
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_rate: 48000,
            channels: 2,
            enable_input: false,
            level_meter: false,
            output: None,
        }
    }
}

const METER_WIDTH: usize = 40;

/// Owns the clock and the patch and renders interleaved blocks.
pub struct SynthEngine<P: Patch> {
    config: EngineConfig,
    clock: Clock,
    patch: P,
    recorder: Option<hound::WavWriter<BufWriter<File>>>,
    record_failed: bool,
}

impl<P: Patch> SynthEngine<P> {
    /// `build` receives the engine clock, so every component of the patch
    /// sees the same sample rate as the renderer.
    pub fn new<F>(config: EngineConfig, build: F) -> Result<Self, SynthError>
    where
        F: FnOnce(&Clock) -> Result<P, SynthError>,
    {
        let clock = Clock::new(config.sample_rate as f64);
        let patch = build(&clock)?;

        let recorder = match &config.output {
            Some(path) => {
                let spec = hound::WavSpec {
                    channels: config.channels,
                    sample_rate: config.sample_rate,
                    bits_per_sample: 32,
                    sample_format: hound::SampleFormat::Float,
                };
                log::info!("Recording to {}", path.display());
                Some(hound::WavWriter::create(path, spec)?)
            }
            None => None,
        };

        log::info!(
            "Engine created: {} Hz, {} channels, input {}",
            config.sample_rate,
            config.channels,
            if config.enable_input { "on" } else { "off" }
        );

        Ok(SynthEngine {
            config,
            clock,
            patch,
            recorder,
            record_failed: false,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn patch(&self) -> &P {
        &self.patch
    }

    pub fn patch_mut(&mut self) -> &mut P {
        &mut self.patch
    }

    /// Renders `frames` frames of `channels` interleaved samples. `input` is
    /// either empty or `frames * input_channels` interleaved samples; it is
    /// ignored unless input is enabled.
    pub fn render(&mut self, frames: usize, channels: usize, input: &[f32]) -> Result<Vec<f32>, SynthError> {
        let mut output = vec![0.0f32; frames * channels];
        self.render_into(frames, channels, input, &mut output)?;
        Ok(output)
    }

    /// Same as `render`, writing into `output`, which must hold exactly
    /// `frames * channels` samples. Does not allocate.
    pub fn render_into(
        &mut self,
        frames: usize,
        channels: usize,
        input: &[f32],
        output: &mut [f32],
    ) -> Result<(), SynthError> {
        if self.recorder.is_some() && channels != self.config.channels as usize {
            log::warn!(
                "Render with {} channels while recording {} channels",
                channels,
                self.config.channels
            );
            return Err(SynthError::BufferError(format!(
                "recording expects {} channels, got {}",
                self.config.channels, channels
            )));
        }
        if output.len() != frames * channels {
            return Err(SynthError::BufferError(format!(
                "output length {} is not {} frames of {} channels",
                output.len(),
                frames,
                channels
            )));
        }

        let input: &[f32] = if self.config.enable_input { input } else { &[] };
        let input_channels = if input.is_empty() || frames == 0 {
            0
        } else if input.len() % frames == 0 {
            input.len() / frames
        } else {
            log::warn!("Input buffer of {} samples does not hold {} frames", input.len(), frames);
            return Err(SynthError::BufferError(format!(
                "input length {} is not a multiple of {} frames",
                input.len(),
                frames
            )));
        };

        for frame in 0..frames {
            let inp = &input[frame * input_channels..(frame + 1) * input_channels];
            let out = &mut output[frame * channels..(frame + 1) * channels];
            self.patch.render_frame(&self.clock, inp, out);
            self.clock.advance();
        }

        if self.config.level_meter {
            log_level(output);
        }
        self.record(output);
        Ok(())
    }

    fn record(&mut self, samples: &[f32]) {
        let Some(writer) = self.recorder.as_mut() else { return };
        match samples.iter().try_for_each(|&s| writer.write_sample(s)) {
            Ok(()) => self.record_failed = false,
            Err(e) => {
                // warn once per run of failures
                if !self.record_failed {
                    log::warn!("Recording failed: {}", e);
                }
                self.record_failed = true;
            }
        }
    }

    /// Finalizes the recording, if any, and hands the patch back.
    pub fn finish(self) -> Result<P, SynthError> {
        if let Some(writer) = self.recorder {
            writer.finalize()?;
            log::info!("Recording finalized after {:.2} s", self.clock.seconds());
        }
        Ok(self.patch)
    }
}

fn log_level(samples: &[f32]) {
    let peak = samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
    let width = ((peak.min(1.0) * METER_WIDTH as f32) as usize).min(METER_WIDTH);
    log::debug!(
        "[{}{}] {:.3}{}",
        "#".repeat(width),
        " ".repeat(METER_WIDTH - width),
        peak,
        if peak > 1.0 { " clip" } else { "" }
    );
}

#[cfg(feature = "device")]
pub use device::Player;

#[cfg(feature = "device")]
mod device {
    use std::sync::{Arc, Mutex, PoisonError};

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::Stream;

    use super::{EngineConfig, Patch, SynthEngine};
    use crate::clock::Clock;
    use crate::error::SynthError;

    /// Drives a `SynthEngine` from the default output device. The device's
    /// sample rate and channel count replace the ones in the config.
    pub struct Player<P: Patch + 'static> {
        engine: Arc<Mutex<SynthEngine<P>>>,
        stream: Option<Stream>,
    }

    impl<P: Patch + 'static> Player<P> {
        pub fn start<F>(mut config: EngineConfig, build: F) -> Result<Self, SynthError>
        where
            F: FnOnce(&Clock) -> Result<P, SynthError>,
        {
            let host = cpal::default_host();
            let device = host.default_output_device()
                .ok_or_else(|| SynthError::AudioError("No output device found".to_string()))?;
            let supported = device.default_output_config()
                .map_err(|e| SynthError::AudioError(e.to_string()))?;
            let stream_config = supported.config();

            config.sample_rate = stream_config.sample_rate.0;
            config.channels = stream_config.channels;
            let channels = config.channels as usize;

            let engine = Arc::new(Mutex::new(SynthEngine::new(config, build)?));
            let ctx = Arc::clone(&engine);

            let stream = device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut engine = ctx.lock().unwrap_or_else(PoisonError::into_inner);
                    let frames = data.len() / channels.max(1);
                    let (block, rest) = data.split_at_mut(frames * channels);
                    rest.fill(0.0);
                    if engine.render_into(frames, channels, &[], block).is_err() {
                        block.fill(0.0);
                    }
                },
                |err| log::error!("Stream error: {}", err),
                None,
            ).map_err(|e| SynthError::AudioError(e.to_string()))?;

            stream.play().map_err(|e| SynthError::AudioError(e.to_string()))?;
            log::info!("Player started on {} Hz, {} channels", stream_config.sample_rate.0, channels);

            Ok(Player { engine, stream: Some(stream) })
        }

        /// Runs `f` with the engine locked, e.g. to swap the score of a
        /// playing patch.
        pub fn with_engine<R>(&self, f: impl FnOnce(&mut SynthEngine<P>) -> R) -> R {
            let mut engine = self.engine.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut engine)
        }

        /// Stops the stream, finalizes any recording and returns the patch.
        pub fn stop(mut self) -> Result<P, SynthError> {
            drop(self.stream.take());
            log::info!("Player stopped");
            let engine = Arc::try_unwrap(self.engine)
                .map_err(|_| SynthError::AudioError("Engine still shared after stream stop".to_string()))?;
            engine.into_inner().unwrap_or_else(PoisonError::into_inner).finish()
        }
    }
}
