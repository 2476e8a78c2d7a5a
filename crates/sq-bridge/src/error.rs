//! Bridge and module errors.

use std::time::Duration;

use thiserror::Error;

use crate::bridge::BridgeState;

/// Failure reported by a replay module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    #[error("module init failed: {0}")]
    Init(String),
    #[error("module rejected the binary: {0}")]
    Load(String),
    #[error("module has no subsong {0}")]
    NoSuchSubsong(u32),
    #[error("no module loaded")]
    NotLoaded,
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Errors from [`ModuleBridge`](crate::ModuleBridge) operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: BridgeState,
    },
    #[error("load failed: {0}")]
    LoadFailed(String),
    #[error("module not ready after {0:?}")]
    Timeout(Duration),
    #[error("module thread is gone")]
    Disconnected,
    #[error("bridge was disposed")]
    Disposed,
    #[error("failed to spawn module thread: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
