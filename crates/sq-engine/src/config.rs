//! Engine configuration.

use crate::post_mix::StereoMode;

/// Settings fixed when an engine is created. Stereo settings can change later.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub sample_rate: u32,
    /// Wrap to the restart position at song end instead of finishing
    pub looping: bool,
    pub stereo_mode: StereoMode,
    pub stereo_percent: u16,
    /// Tempo in BPM used instead of the song's initial tempo
    pub tempo: Option<u16>,
    /// Frames per render callback
    pub block_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            looping: true,
            stereo_mode: StereoMode::Imaging,
            stereo_percent: 100,
            tempo: None,
            block_size: 512,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    /// Offline render settings: plays the song once.
    pub fn one_shot(sample_rate: u32) -> Self {
        Self {
            looping: false,
            ..Self::with_sample_rate(sample_rate)
        }
    }
}
