//! Audio output trait and error types.

use sq_engine::Frame;
use thiserror::Error;

/// Error type for audio operations.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("device init error: {0}")]
    DeviceInit(String),
    #[error("stream create error: {0}")]
    StreamCreate(String),
    #[error("playback error: {0}")]
    Playback(String),
    #[error("no audio device available")]
    NoDevice,
    #[error("output already started")]
    AlreadyStarted,
}

/// Fills a block of frames. Runs in the render domain: it must not block,
/// allocate, or take locks.
pub type RenderCallback = Box<dyn FnMut(&mut [Frame]) + Send + 'static>;

/// A sink that pulls audio from a render callback at its own pace.
pub trait AudioOutput {
    fn sample_rate(&self) -> u32;

    /// Hand over the render callback and begin pulling from it.
    fn start(&mut self, render: RenderCallback) -> Result<(), AudioError>;

    /// Stop pulling. The callback is dropped.
    fn stop(&mut self) -> Result<(), AudioError>;

    fn is_running(&self) -> bool;
}
