//! Per-channel playback state.
//!
//! `ChannelState` is plain data: the effect processor takes one by
//! reference and returns the next one. Voice rendering state (sample
//! position, oscillator phase) lives in the voice, not here.

use sq_ir::ChannelSettings;

use crate::frequency::clamp_period;

/// A running pitch effect. One at a time per channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PitchSlide {
    /// Period units per tick toward higher pitch
    Up(u8),
    /// Period units per tick toward lower pitch
    Down(u8),
    /// Slide toward `target_period` at the remembered speed
    Tone,
    Arpeggio { x: u8, y: u8 },
}

/// Speed and depth of a vibrato or tremolo.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Oscillation {
    pub speed: u8,
    pub depth: u8,
}

/// Last non-zero parameters, reused when a command arrives with zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EffectMemory {
    pub porta_up: u8,
    pub porta_down: u8,
    pub tone_porta_speed: u8,
    pub volume_slide: i8,
    pub vibrato: Oscillation,
    pub tremolo: Oscillation,
    pub sample_offset: u8,
}

/// A note held back by a note delay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelayedNote {
    pub tick: u16,
    pub pitch: u8,
}

/// Sequencing state for a single tracker channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelState {
    /// Last triggered note
    pub note: Option<u8>,
    /// Current instrument
    pub instrument: Option<u8>,
    /// Base volume (0-64)
    pub volume: u8,
    /// Panning (-64 to +64)
    pub pan: i8,
    /// Base Amiga period (0 = nothing playing)
    pub period: u16,
    /// Tone portamento destination
    pub target_period: u16,

    // Per-tick modulation, recomputed every tick
    /// Period offset from vibrato/arpeggio
    pub period_offset: i16,
    /// Volume offset from tremolo
    pub volume_offset: i8,

    // Continuous effect slots. Each persists until replaced by a command
    // for the same slot, cleared, or the note is cut.
    pub pitch: Option<PitchSlide>,
    pub vibrato: Option<Oscillation>,
    pub volume_slide: Option<i8>,
    pub tremolo: Option<Oscillation>,
    /// Retrigger interval in ticks
    pub retrigger: Option<u8>,

    pub memory: EffectMemory,
    /// Vibrato waveform (0=sine, 1=ramp, 2=square, 3=random; +4 = keep phase on new notes)
    pub vibrato_waveform: u8,
    pub vibrato_pos: u8,
    pub tremolo_waveform: u8,
    pub tremolo_pos: u8,

    /// Tick of the current row a note cut fires on
    pub cut_at: Option<u16>,
    pub delayed: Option<DelayedNote>,

    // Pattern loop bookkeeping
    pub loop_row: u16,
    pub loop_count: u8,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new(&ChannelSettings::default())
    }
}

impl ChannelState {
    /// Fresh state for a channel at song start.
    pub fn new(settings: &ChannelSettings) -> Self {
        Self {
            note: None,
            instrument: None,
            volume: settings.initial_vol.min(64),
            pan: settings.initial_pan.clamp(-64, 64),
            period: 0,
            target_period: 0,
            period_offset: 0,
            volume_offset: 0,
            pitch: None,
            vibrato: None,
            volume_slide: None,
            tremolo: None,
            retrigger: None,
            memory: EffectMemory::default(),
            vibrato_waveform: 0,
            vibrato_pos: 0,
            tremolo_waveform: 0,
            tremolo_pos: 0,
            cut_at: None,
            delayed: None,
            loop_row: 0,
            loop_count: 0,
        }
    }

    /// Period after vibrato/arpeggio, clamped. Zero when nothing plays.
    pub fn effective_period(&self) -> u16 {
        if self.period == 0 {
            return 0;
        }
        clamp_period(self.period as i32 + self.period_offset as i32)
    }

    /// Volume after tremolo (0-64).
    pub fn effective_volume(&self) -> u8 {
        (self.volume as i16 + self.volume_offset as i16).clamp(0, 64) as u8
    }

    /// True if any continuous effect slot is occupied.
    pub fn has_continuous(&self) -> bool {
        self.pitch.is_some()
            || self.vibrato.is_some()
            || self.volume_slide.is_some()
            || self.tremolo.is_some()
            || self.retrigger.is_some()
    }

    /// Empty every continuous effect slot. Effect memory is kept.
    pub fn clear_continuous(&mut self) {
        self.pitch = None;
        self.vibrato = None;
        self.volume_slide = None;
        self.tremolo = None;
        self.retrigger = None;
        self.period_offset = 0;
        self.volume_offset = 0;
    }
}
