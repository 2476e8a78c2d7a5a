//! The replay module contract.

use crate::error::ModuleError;
use crate::protocol::ModulePosition;

/// A self-contained replayer that renders a whole song.
///
/// Modules run on the bridge's module thread and only ever see one call
/// at a time. They render in whole native frames of [`frame_len`]
/// samples, e.g. one 50 Hz replay tick.
///
/// [`frame_len`]: ReplayModule::frame_len
pub trait ReplayModule: Send {
    fn init(&mut self, sample_rate: u32) -> Result<(), ModuleError>;

    /// Parse a module file. Playback starts at subsong 0.
    fn load(&mut self, binary: &[u8]) -> Result<(), ModuleError>;

    /// Jump to the start of a subsong. Also used to rewind on stop.
    fn seek_subsong(&mut self, index: u32) -> Result<(), ModuleError>;

    /// Samples produced per `decode_frame` call.
    fn frame_len(&self) -> usize;

    /// Render one native frame into `left`/`right`. Returns samples written.
    fn decode_frame(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<usize, ModuleError>;

    fn is_song_end(&self) -> bool;

    fn position(&self) -> Option<ModulePosition>;

    fn unload(&mut self);
}
