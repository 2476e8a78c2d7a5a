//! Runs a tracker song on the module thread.

use std::sync::Arc;

use sq_engine::{Engine, EngineConfig, Frame};
use sq_ir::Song;

use crate::error::ModuleError;
use crate::module::ReplayModule;
use crate::protocol::ModulePosition;

/// Native replay rate of engine modules.
const FRAME_RATE: u32 = 50;

/// Turns a module file into a song.
pub trait SongDecoder: Send {
    fn decode(&self, binary: &[u8]) -> Result<Song, ModuleError>;
}

impl<F> SongDecoder for F
where
    F: Fn(&[u8]) -> Result<Song, ModuleError> + Send,
{
    fn decode(&self, binary: &[u8]) -> Result<Song, ModuleError> {
        self(binary)
    }
}

/// A [`ReplayModule`] backed by the sequent engine.
pub struct EngineModule<D> {
    decoder: D,
    sample_rate: u32,
    engine: Option<Engine>,
    scratch: Vec<Frame>,
}

impl<D: SongDecoder> EngineModule<D> {
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            sample_rate: 0,
            engine: None,
            scratch: Vec::new(),
        }
    }
}

impl<D: SongDecoder> ReplayModule for EngineModule<D> {
    fn init(&mut self, sample_rate: u32) -> Result<(), ModuleError> {
        if sample_rate < FRAME_RATE {
            return Err(ModuleError::Init(format!("unusable sample rate {sample_rate}")));
        }
        self.sample_rate = sample_rate;
        self.scratch = vec![Frame::silence(); self.frame_len()];
        Ok(())
    }

    fn load(&mut self, binary: &[u8]) -> Result<(), ModuleError> {
        if self.sample_rate == 0 {
            return Err(ModuleError::Init("load before init".into()));
        }
        let song = self.decoder.decode(binary)?;
        song.validate().map_err(|e| ModuleError::Load(e.to_string()))?;
        let mut engine = Engine::with_config(Arc::new(song), &EngineConfig::one_shot(self.sample_rate));
        engine.play();
        self.engine = Some(engine);
        Ok(())
    }

    fn seek_subsong(&mut self, index: u32) -> Result<(), ModuleError> {
        let engine = self.engine.as_mut().ok_or(ModuleError::NotLoaded)?;
        engine
            .select_subsong(index as usize)
            .map_err(|_| ModuleError::NoSuchSubsong(index))
    }

    fn frame_len(&self) -> usize {
        (self.sample_rate / FRAME_RATE).max(1) as usize
    }

    fn decode_frame(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<usize, ModuleError> {
        let engine = self.engine.as_mut().ok_or(ModuleError::NotLoaded)?;
        let n = self.scratch.len().min(left.len()).min(right.len());
        let block = &mut self.scratch[..n];
        engine.render(block);
        for (i, frame) in block.iter().enumerate() {
            left[i] = frame.left;
            right[i] = frame.right;
        }
        Ok(n)
    }

    fn is_song_end(&self) -> bool {
        self.engine.as_ref().is_some_and(Engine::is_finished)
    }

    fn position(&self) -> Option<ModulePosition> {
        let engine = self.engine.as_ref()?;
        let pos = engine.position();
        Some(ModulePosition {
            order: pos.order,
            row: pos.row,
            speed: engine.speed() as u16,
        })
    }

    fn unload(&mut self) {
        self.engine = None;
    }
}
