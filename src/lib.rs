//! sequent: a tracker sequencer with an isolated replay-module bridge.
//!
//! The work happens in the `sq-*` crates; this package carries the CLI
//! and the built-in demo song.

pub mod demo;

pub use demo::demo_song;
