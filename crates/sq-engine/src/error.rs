//! Engine error types.

use thiserror::Error;

/// Failure of a single voice backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VoiceError {
    #[error("instrument kind is not playable by this voice")]
    UnsupportedInstrument,
    #[error("sample has no data")]
    EmptySample,
    #[error("voice backend failed: {0}")]
    Backend(&'static str),
}

/// Errors from control operations on the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("song has no subsong {0}")]
    NoSuchSubsong(usize),
    #[error("channel {0} does not exist")]
    NoSuchChannel(usize),
}
