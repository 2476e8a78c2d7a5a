//! Main playback engine.
//!
//! Owns the sequencer, per-channel state and voices for one song. All of
//! it is mutated from [`Engine::render`] only; control calls take effect
//! at the next render.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use sq_ir::Song;

use crate::channel::ChannelState;
use crate::config::EngineConfig;
use crate::dispatch::{Diagnostic, VoiceDispatch};
use crate::effects::{self, TickContext};
use crate::error::EngineError;
use crate::frame::{self, Frame};
use crate::post_mix::{StereoGainMatrix, StereoMode};
use crate::sequencer::{PlaybackPosition, Sequencer, SequencerEvent};
use crate::voice::{Voice, VoiceParam};

/// Audio produced outside the channel voices, mixed in before the
/// post-mix stage. Must not block or allocate.
pub trait FrameSource: Send {
    /// Add frames to `out`.
    fn mix_into(&mut self, out: &mut [Frame]);
}

/// The main playback engine.
pub struct Engine {
    song: Arc<Song>,
    sequencer: Sequencer,
    channels: Vec<ChannelState>,
    dispatch: VoiceDispatch,
    stereo_mode: StereoMode,
    stereo_percent: u16,
    matrix: StereoGainMatrix,
    source: Option<Box<dyn FrameSource>>,
    sample_rate: u32,
    /// Survives rewinds, unlike tempo changes from the song itself
    tempo_override: Option<u16>,
    playing: bool,
}

impl Engine {
    /// Create a new engine for the given song.
    pub fn new(song: Arc<Song>, sample_rate: u32) -> Self {
        Self::with_config(song, &EngineConfig::with_sample_rate(sample_rate))
    }

    pub fn with_config(song: Arc<Song>, config: &EngineConfig) -> Self {
        let mut sequencer = Sequencer::new(Arc::clone(&song), config.sample_rate);
        sequencer.set_looping(config.looping);
        if let Some(bpm) = config.tempo {
            sequencer.set_tempo(bpm);
        }
        let channels = song.channels.iter().map(ChannelState::new).collect();
        let dispatch = VoiceDispatch::new(song.channel_count(), config.sample_rate);
        Self {
            song,
            sequencer,
            channels,
            dispatch,
            stereo_mode: config.stereo_mode,
            stereo_percent: config.stereo_percent,
            matrix: StereoGainMatrix::from_mode(config.stereo_mode, config.stereo_percent),
            source: None,
            sample_rate: config.sample_rate,
            tempo_override: config.tempo,
            playing: false,
        }
    }

    pub fn song(&self) -> &Arc<Song> {
        &self.song
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Start playback from the current position.
    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Stop playback and rewind, so the next `play` starts clean.
    pub fn stop(&mut self) {
        self.playing = false;
        self.rewind();
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// True once a non-looping song has played its last row.
    pub fn is_finished(&self) -> bool {
        self.sequencer.is_finished() && self.source.is_none()
    }

    pub fn position(&self) -> PlaybackPosition {
        self.sequencer.position()
    }

    /// Current ticks per row.
    pub fn speed(&self) -> u8 {
        self.sequencer.transport().speed
    }

    pub fn tempo(&self) -> u16 {
        self.sequencer.transport().tempo
    }

    /// Override the song tempo from the next tick on, and after every rewind.
    pub fn set_tempo(&mut self, bpm: u16) {
        self.tempo_override = Some(bpm);
        self.sequencer.set_tempo(bpm);
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.sequencer.set_looping(looping);
    }

    pub fn set_stereo_mode(&mut self, mode: StereoMode) {
        self.stereo_mode = mode;
        self.matrix = StereoGainMatrix::from_mode(mode, self.stereo_percent);
    }

    /// Separation percentage, clamped to the current mode's range.
    pub fn set_stereo_percent(&mut self, percent: u16) {
        self.stereo_percent = percent;
        self.matrix = StereoGainMatrix::from_mode(self.stereo_mode, percent);
    }

    pub fn stereo_gains(&self) -> StereoGainMatrix {
        self.matrix
    }

    /// Switch subsong. Playback continues from its first row if playing.
    pub fn select_subsong(&mut self, index: usize) -> Result<(), EngineError> {
        self.sequencer.select_subsong(index)?;
        self.rewind();
        Ok(())
    }

    pub fn channel(&self, index: usize) -> Option<&ChannelState> {
        self.channels.get(index)
    }

    pub fn voice_active(&self, channel: usize) -> bool {
        self.dispatch.is_active(channel)
    }

    /// Replace a channel's built-in voices with a custom one.
    pub fn install_voice(&mut self, channel: usize, voice: Box<dyn Voice + Send>) -> Result<(), EngineError> {
        self.dispatch.install(channel, voice)
    }

    /// Mix an external source into the output, replacing any previous one.
    pub fn attach_source(&mut self, source: Box<dyn FrameSource>) {
        self.source = Some(source);
    }

    pub fn detach_source(&mut self) -> Option<Box<dyn FrameSource>> {
        self.source.take()
    }

    pub fn pop_diagnostic(&mut self) -> Option<Diagnostic> {
        self.dispatch.pop_diagnostic()
    }

    /// Fill `out` with the next frames. Silence while stopped.
    pub fn render(&mut self, out: &mut [Frame]) {
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.render_block(out));
        #[cfg(not(feature = "alloc_check"))]
        self.render_block(out);
    }

    /// Render a single frame.
    pub fn render_frame(&mut self) -> Frame {
        let mut out = [Frame::silence()];
        self.render(&mut out);
        out[0]
    }

    /// Render `count` frames into a new buffer. Not for the audio callback.
    pub fn render_frames(&mut self, count: usize) -> Vec<Frame> {
        let mut out = vec![Frame::silence(); count];
        self.render(&mut out);
        out
    }

    fn render_block(&mut self, out: &mut [Frame]) {
        frame::clear(out);
        if !self.playing {
            return;
        }

        let mut offset = 0;
        while offset < out.len() {
            let remaining = u32::try_from(out.len() - offset).unwrap_or(u32::MAX);
            let step = self.sequencer.advance(remaining);
            for event in &step.events {
                self.process_event(event);
            }
            let end = offset + step.consumed as usize;
            self.render_voices(&mut out[offset..end]);
            offset = end;
        }

        if let Some(source) = self.source.as_mut() {
            source.mix_into(out);
        }
        self.matrix.apply(out);
    }

    fn process_event(&mut self, event: &SequencerEvent) {
        let ch = event.channel as usize;
        let Some(prev) = self.channels.get(ch) else {
            return;
        };
        let instruments = &self.song.instruments;
        let ctx = TickContext {
            row: event.row,
            instruments,
        };
        let applied = effects::apply(prev, event.cell.as_ref(), event.tick, &ctx);
        let signals = applied.signals;
        let state = applied.state;

        if signals.cut {
            self.dispatch.cut(ch);
        }
        if signals.note_off {
            self.dispatch.note_off(ch);
        }
        if let Some(trigger) = signals.trigger {
            self.dispatch
                .note_on(ch, trigger.instrument, trigger.pitch, trigger.velocity, instruments);
            if let Some(offset) = signals.sample_offset {
                self.dispatch.set_param(ch, VoiceParam::SampleOffset, offset as f32);
            }
        }
        if signals.retrigger {
            self.dispatch.retrigger(ch);
        }
        if let Some(row) = signals.loop_to_row {
            self.sequencer.request_loop(row);
        }

        self.dispatch
            .set_param(ch, VoiceParam::Period, state.effective_period() as f32);
        self.dispatch
            .set_param(ch, VoiceParam::Volume, state.effective_volume() as f32);
        self.dispatch.set_param(ch, VoiceParam::Pan, state.pan as f32);
        self.channels[ch] = state;
    }

    fn render_voices(&mut self, out: &mut [Frame]) {
        for (ch, settings) in self.song.channels.iter().enumerate() {
            if !settings.muted {
                self.dispatch.render(ch, out);
            }
        }
    }

    fn rewind(&mut self) {
        self.sequencer.reset();
        if let Some(bpm) = self.tempo_override {
            self.sequencer.set_tempo(bpm);
        }
        for (state, settings) in self.channels.iter_mut().zip(&self.song.channels) {
            *state = ChannelState::new(settings);
        }
        self.dispatch.reset();
    }
}
