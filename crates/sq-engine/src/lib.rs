//! Playback engine for sequent.
//!
//! Turns a [`sq_ir::Song`] into audio: the sequencer walks the order
//! list, the effect processor updates channel state each tick, and the
//! voice dispatcher renders every channel into one stereo mix.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod channel;
mod config;
mod dispatch;
pub mod effects;
mod engine;
mod error;
mod frame;
pub mod frequency;
mod post_mix;
pub mod sequencer;
pub mod timing;
pub mod voice;
mod waveform;

pub use channel::ChannelState;
pub use config::EngineConfig;
pub use dispatch::{Diagnostic, VoiceDispatch, DIAGNOSTIC_CAPACITY};
pub use engine::{Engine, FrameSource};
pub use error::{EngineError, VoiceError};
pub use frame::{clear, Frame};
pub use post_mix::{StereoGainMatrix, StereoMode};
pub use sequencer::{PlaybackPosition, Sequencer};
pub use timing::TickClock;
pub use voice::{SampleVoice, SynthVoice, Voice, VoiceParam, VoiceSlot};
