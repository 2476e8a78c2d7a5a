//! Bridge configuration.

use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Output rate passed to the module at init
    pub sample_rate: u32,
    /// Capacity of the audio ring in frames
    pub ring_frames: usize,
    /// How long `load` waits for the module to report ready
    pub ready_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            ring_frames: 8192,
            ready_timeout: Duration::from_secs(5),
        }
    }
}

impl BridgeConfig {
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }
}
