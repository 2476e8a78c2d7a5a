//! CPAL-based audio output backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use sq_engine::Frame;
use tracing::{debug, warn};

use crate::traits::{AudioError, AudioOutput, RenderCallback};

/// Largest block handed to the render callback in one call. Bigger device
/// buffers are served in several calls.
const MAX_BLOCK: usize = 4096;

/// Default output device, driven by the device's own callback thread.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
}

impl CpalOutput {
    /// Open the default output device in stereo at its preferred rate.
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut config: StreamConfig = config.into();
        // The callback interleaves two channels
        config.channels = 2;
        debug!(sample_rate = config.sample_rate.0, "opened output device");

        Ok(Self {
            device,
            config,
            stream: None,
        })
    }

    /// Ask for a specific rate instead of the device default.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.config.sample_rate = cpal::SampleRate(sample_rate);
        self
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn start(&mut self, mut render: RenderCallback) -> Result<(), AudioError> {
        if self.stream.is_some() {
            return Err(AudioError::AlreadyStarted);
        }
        let channels = self.config.channels as usize;
        let mut scratch = vec![Frame::silence(); MAX_BLOCK];

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for chunk in data.chunks_mut(MAX_BLOCK * channels) {
                        let frames = chunk.len() / channels;
                        let block = &mut scratch[..frames];
                        render(block);
                        for (out, frame) in chunk.chunks_mut(channels).zip(block.iter()) {
                            for (i, sample) in out.iter_mut().enumerate() {
                                *sample = match i {
                                    0 => frame.left.clamp(-1.0, 1.0),
                                    1 => frame.right.clamp(-1.0, 1.0),
                                    _ => 0.0,
                                };
                            }
                        }
                    }
                },
                |err| warn!(%err, "audio stream error"),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);
        debug!("audio stream started");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        if let Some(stream) = self.stream.take() {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
            debug!("audio stream stopped");
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.stream.is_some()
    }
}
