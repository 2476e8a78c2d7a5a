//! Headless controller for sequent.
//!
//! Provides the transport control surface shared by the CLI and tests:
//! loading songs and replay modules, real-time playback through an
//! [`AudioOutput`], telemetry, and offline rendering.

mod command;
mod config;
mod controller;
mod error;
mod registry;
mod session;
mod wav;

pub use command::{Command, Telemetry};
pub use config::SessionConfig;
pub use controller::Controller;
pub use error::{ControllerError, Result};
pub use registry::ModuleRegistry;
pub use session::{RenderSession, SessionHandle};
pub use wav::{frames_to_wav, write_wav};

// Re-export common types so callers don't need the lower crates directly.
pub use sq_audio::{AudioOutput, CpalOutput, ManualOutput};
pub use sq_bridge::{BridgeEvent, ReplayModule, SongDecoder};
pub use sq_engine::{Diagnostic, EngineConfig, Frame, PlaybackPosition, StereoGainMatrix, StereoMode};
pub use sq_ir::{Song, SongError};
