//! Channel to voice routing.
//!
//! Every channel owns one preallocated voice slot. Notes for missing
//! instruments, or voices that fail, leave the channel silent for that
//! note and leave a [`Diagnostic`] behind; playback carries on.

use alloc::boxed::Box;
use alloc::vec::Vec;
use heapless::Deque;
use sq_ir::Instrument;

use crate::error::{EngineError, VoiceError};
use crate::frame::Frame;
use crate::voice::{Voice, VoiceParam, VoiceSlot};

/// Diagnostics kept before the oldest are dropped.
pub const DIAGNOSTIC_CAPACITY: usize = 64;

/// Something that went wrong on a channel without stopping playback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// A cell referenced an instrument the song does not have
    MissingInstrument { channel: u8, instrument: u8 },
    /// The channel's voice failed to start or render
    VoiceFailed { channel: u8, error: VoiceError },
}

struct ChannelVoice {
    slot: VoiceSlot,
    /// Replaces the built-in voice when installed
    custom: Option<Box<dyn Voice + Send>>,
    note: u8,
}

impl ChannelVoice {
    fn voice(&mut self) -> &mut dyn Voice {
        match self.custom.as_deref_mut() {
            Some(custom) => custom,
            None => &mut self.slot,
        }
    }
}

pub struct VoiceDispatch {
    voices: Vec<ChannelVoice>,
    sample_rate: u32,
    diagnostics: Deque<Diagnostic, DIAGNOSTIC_CAPACITY>,
}

impl VoiceDispatch {
    pub fn new(channels: usize, sample_rate: u32) -> Self {
        let voices = (0..channels)
            .map(|_| ChannelVoice {
                slot: VoiceSlot::Silent,
                custom: None,
                note: 0,
            })
            .collect();
        Self {
            voices,
            sample_rate,
            diagnostics: Deque::new(),
        }
    }

    pub fn channels(&self) -> usize {
        self.voices.len()
    }

    /// Route a channel to a caller-supplied voice instead of the built-ins.
    pub fn install(&mut self, channel: usize, voice: Box<dyn Voice + Send>) -> Result<(), EngineError> {
        let slot = self
            .voices
            .get_mut(channel)
            .ok_or(EngineError::NoSuchChannel(channel))?;
        slot.slot = VoiceSlot::Silent;
        slot.custom = Some(voice);
        Ok(())
    }

    /// Start a note. `instrument` is the cell's instrument index.
    pub fn note_on(
        &mut self,
        channel: usize,
        instrument: Option<u8>,
        pitch: u8,
        velocity: u8,
        instruments: &[Instrument],
    ) {
        let sample_rate = self.sample_rate;
        let Some(voice) = self.voices.get_mut(channel) else {
            return;
        };
        voice.voice().dispose();
        voice.note = pitch;

        let Some(index) = instrument else {
            return;
        };
        let Some(inst) = instruments.get(index as usize) else {
            self.report(Diagnostic::MissingInstrument {
                channel: channel as u8,
                instrument: index,
            });
            return;
        };

        if voice.custom.is_none() && !voice.slot.prepare(inst, sample_rate) {
            // Delegated instrument: the bridge renders this song
            return;
        }
        if let Err(error) = voice.voice().trigger_attack(pitch, velocity, inst) {
            voice.voice().dispose();
            self.report(Diagnostic::VoiceFailed {
                channel: channel as u8,
                error,
            });
        }
    }

    pub fn note_off(&mut self, channel: usize) {
        if let Some(voice) = self.voices.get_mut(channel) {
            let note = voice.note;
            voice.voice().trigger_release(note);
        }
    }

    pub fn cut(&mut self, channel: usize) {
        if let Some(voice) = self.voices.get_mut(channel) {
            voice.voice().dispose();
        }
    }

    /// Restart the current note from its beginning.
    pub fn retrigger(&mut self, channel: usize) {
        self.set_param(channel, VoiceParam::SampleOffset, 0.0);
    }

    pub fn set_param(&mut self, channel: usize, param: VoiceParam, value: f32) {
        if let Some(voice) = self.voices.get_mut(channel) {
            voice.voice().set_param(param, value);
        }
    }

    /// Add a channel's audio to `out`. A failing voice is silenced for
    /// the rest of its note.
    pub fn render(&mut self, channel: usize, out: &mut [Frame]) {
        let Some(voice) = self.voices.get_mut(channel) else {
            return;
        };
        if !voice.voice().is_active() {
            return;
        }
        if let Err(error) = voice.voice().render(out) {
            voice.voice().dispose();
            self.report(Diagnostic::VoiceFailed {
                channel: channel as u8,
                error,
            });
        }
    }

    pub fn is_active(&self, channel: usize) -> bool {
        self.voices.get(channel).is_some_and(|v| match &v.custom {
            Some(custom) => custom.is_active(),
            None => v.slot.is_active(),
        })
    }

    /// Silence every channel. Installed voices stay installed.
    pub fn reset(&mut self) {
        for voice in &mut self.voices {
            voice.voice().dispose();
            voice.note = 0;
        }
    }

    pub fn pop_diagnostic(&mut self) -> Option<Diagnostic> {
        self.diagnostics.pop_front()
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        if self.diagnostics.is_full() {
            self.diagnostics.pop_front();
        }
        let _ = self.diagnostics.push_back(diagnostic);
    }
}
