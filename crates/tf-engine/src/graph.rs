//! Output device lifecycle
//!
//! `Uninitialized → Active(Running | Suspended)`. The stream is built
//! lazily on the first [`AudioGraph::unlock`] call; the host invokes that
//! after a genuine user interaction, never at process start, to satisfy
//! platform autoplay restrictions. Until then every scheduling call in the
//! rest of the engine is a silent no-op.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate as CpalSampleRate, StreamConfig};

use crate::{AudioError, AudioResult, DeviceState, DeviceStateCell, EngineConfig, Renderer};

/// Owns the cpal stream and publishes device availability.
pub struct AudioGraph {
    state: DeviceStateCell,
    /// Renderer parked here until the stream is built, then moved into the
    /// callback.
    renderer: Option<Renderer>,
    stream: Option<cpal::Stream>,
    config: EngineConfig,
    /// Set after a failed unlock so we only log the failure once
    failed: bool,
}

impl AudioGraph {
    pub fn new(config: EngineConfig, renderer: Renderer, state: DeviceStateCell) -> Self {
        Self {
            state,
            renderer: Some(renderer),
            stream: None,
            config,
            failed: false,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state.get()
    }

    /// Build and start the output stream if it does not exist yet; resume
    /// it if it is suspended. Safe to call on every user interaction.
    pub fn unlock(&mut self) {
        match self.state.get() {
            DeviceState::Running => {}
            DeviceState::Suspended => self.resume(),
            DeviceState::Failed => {}
            DeviceState::Uninitialized => {
                if self.failed {
                    return;
                }
                match self.start_stream() {
                    Ok(()) => {
                        self.state.set(DeviceState::Running);
                        log::info!("[AudioGraph] output stream started");
                    }
                    Err(err) => {
                        self.failed = true;
                        self.state.set(DeviceState::Failed);
                        log::error!("[AudioGraph] device unavailable, audio disabled: {err}");
                    }
                }
            }
        }
    }

    /// Pause the stream (e.g. window lost focus)
    pub fn suspend(&mut self) {
        if let Some(stream) = &self.stream {
            if self.state.get() == DeviceState::Running {
                match stream.pause() {
                    Ok(()) => self.state.set(DeviceState::Suspended),
                    Err(err) => log::warn!("[AudioGraph] suspend failed: {err}"),
                }
            }
        }
    }

    /// Restart a suspended stream
    pub fn resume(&mut self) {
        if let Some(stream) = &self.stream {
            if self.state.get() == DeviceState::Suspended {
                match stream.play() {
                    Ok(()) => self.state.set(DeviceState::Running),
                    Err(err) => log::warn!("[AudioGraph] resume failed: {err}"),
                }
            }
        }
    }

    /// Drop the stream; the graph cannot be restarted afterwards.
    pub fn shutdown(&mut self) {
        self.stream = None;
        self.state.set(DeviceState::Uninitialized);
    }

    fn start_stream(&mut self) -> AudioResult<()> {
        let Some(renderer) = self.renderer.take() else {
            return Err(AudioError::Backend("stream already consumed".into()));
        };

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let desired_rate = self.config.sample_rate.as_u32();
        let stream_config = match pick_stream_config(&device, desired_rate) {
            Ok(config) => config,
            Err(err) => {
                self.renderer = Some(renderer);
                return Err(err);
            }
        };
        if stream_config.sample_rate.0 != desired_rate {
            log::warn!(
                "[AudioGraph] device runs at {} Hz, engine scheduled for {} Hz",
                stream_config.sample_rate.0,
                desired_rate
            );
        }

        let channels = stream_config.channels as usize;
        let mut renderer = renderer;
        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _| renderer.render(data, channels),
                |err| log::error!("[AudioGraph] stream error: {err}"),
                None,
            )
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        self.stream = Some(stream);
        Ok(())
    }
}

/// Choose an f32 stereo output config, preferring the engine's rate.
fn pick_stream_config(device: &cpal::Device, desired_rate: u32) -> AudioResult<StreamConfig> {
    let configs = device
        .supported_output_configs()
        .map_err(|e| AudioError::Backend(e.to_string()))?;

    let mut fallback = None;
    for supported in configs {
        if supported.sample_format() != SampleFormat::F32 || supported.channels() < 2 {
            continue;
        }
        let min = supported.min_sample_rate().0;
        let max = supported.max_sample_rate().0;
        if (min..=max).contains(&desired_rate) {
            let mut config = supported
                .with_sample_rate(CpalSampleRate(desired_rate))
                .config();
            config.channels = 2;
            return Ok(config);
        }
        fallback.get_or_insert_with(|| supported.with_max_sample_rate());
    }

    if let Some(supported) = fallback {
        let mut config = supported.config();
        config.channels = 2;
        return Ok(config);
    }

    // Last resort: whatever the device calls its default
    let default = device
        .default_output_config()
        .map_err(|_| AudioError::ConfigError)?;
    Ok(default.config())
}
