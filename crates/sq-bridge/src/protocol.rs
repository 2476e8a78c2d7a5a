//! Messages between the bridge and its module thread.

use std::sync::Arc;

use sq_engine::Frame;

/// Bridge to module.
///
/// `epoch` is the play epoch the bridge moved to when it sent the message;
/// audio produced afterwards is tagged with it. `generation` numbers loads
/// so replies to an older load can be told apart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlMessage {
    Init { sample_rate: u32 },
    Load { binary: Arc<[u8]>, generation: u32 },
    Play { epoch: u32 },
    Stop,
    SeekSubsong { index: u32, epoch: u32 },
    /// Unload and end the module thread
    Shutdown,
}

impl ControlMessage {
    pub fn name(&self) -> &'static str {
        match self {
            ControlMessage::Init { .. } => "init",
            ControlMessage::Load { .. } => "load",
            ControlMessage::Play { .. } => "play",
            ControlMessage::Stop => "stop",
            ControlMessage::SeekSubsong { .. } => "seekSubsong",
            ControlMessage::Shutdown => "shutdown",
        }
    }
}

/// Playback position as the module reports it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModulePosition {
    pub order: u16,
    pub row: u16,
    pub speed: u16,
}

/// Module to bridge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModuleMessage {
    /// The last `Load` succeeded
    Ready,
    Error { message: String },
    /// The song reached its end; the module stopped producing audio
    Ended,
    Position(ModulePosition),
}

/// A module message stamped with the load generation that was current
/// when the module thread sent it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct HostEvent {
    pub generation: u32,
    pub message: ModuleMessage,
}

/// A frame in the audio ring, tagged with the play epoch it belongs to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct TaggedFrame {
    pub epoch: u32,
    pub frame: Frame,
}
