//! Song model for the sequent sequencer.
//!
//! A song is a set of patterns arranged by an order list, plus the
//! instruments the cells refer to. Everything here is immutable once a
//! song is handed to the engine; the engine shares it as `Arc<Song>`.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod analysis;
mod effects;
mod instrument;
mod pattern;
mod sample;
pub mod song;

pub use analysis::{analyze, SongFeatures};
pub use effects::{param_to_slide, Effect};
pub use instrument::{
    DelegatedModule, Envelope, EnvelopePoint, Instrument, InstrumentKind, SynthConfig,
    SynthWaveform, MAX_ENVELOPE_POINTS,
};
pub use pattern::{Cell, Note, Pattern, MAX_VOLUME};
pub use sample::{LoopType, Sample, SampleData};
pub use song::{ChannelSettings, OrderEntry, Song, SongError, TickTiming, MAX_CHANNELS};
