//! Messages crossing between the control and render domains.

use sq_bridge::BridgeEvent;
use sq_engine::{Diagnostic, PlaybackPosition, StereoMode};

/// Control to render. Applied at the start of the next render callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Play,
    /// Stop and rewind transport and channel state
    Stop,
    SetTempo(u16),
    SetStereoMode(StereoMode),
    SetStereoAmount(u16),
    SelectSubsong(usize),
    SetLooping(bool),
}

/// Render (or module) to control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Telemetry {
    /// Playback moved to a new row
    Position(PlaybackPosition),
    Diagnostic(Diagnostic),
    /// A one-shot song played its last row
    Finished,
    /// A render callback panicked; the block was replaced by silence
    BlockDropped,
    /// Event from the replay module of a delegated song
    Module(BridgeEvent),
}
