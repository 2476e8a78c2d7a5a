//! Controller errors.

use sq_audio::AudioError;
use sq_bridge::{BridgeError, ModuleError};
use sq_ir::SongError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("invalid song: {0}")]
    Song(#[from] SongError),
    #[error("no replay module registered for {0:?}")]
    UnknownModule(String),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error("no song loaded")]
    NoSong,
    #[error("song has no subsong {0}")]
    NoSuchSubsong(usize),
    #[error("render command queue is full")]
    CommandQueueFull,
    #[error("wav export failed: {0}")]
    Wav(#[from] hound::Error),
}

pub type Result<T> = std::result::Result<T, ControllerError>;
