//! Per-tick effect processing.
//!
//! [`apply`] is a pure function from the previous channel state and the
//! cell for this tick to the next channel state plus the voice signals
//! the tick produced. It never touches voices itself, so it can be tested
//! without any audio.
//!
//! Tick 0 reads the cell: instrument, volume column, note and the row
//! part of the effect. Ticks after that advance the continuous slots.
//! Pattern delay repeats a row with tick numbers past `speed`, so they
//! count as continuous ticks.

use sq_ir::{Cell, Effect, Instrument, Note, MAX_VOLUME};

use crate::channel::{ChannelState, DelayedNote, Oscillation, PitchSlide};
use crate::frequency::{clamp_period, note_to_period};
use crate::waveform::{advance, waveform_value, NO_RETRIGGER};

/// Song data the processor needs besides the channel itself.
#[derive(Clone, Copy, Debug)]
pub struct TickContext<'a> {
    /// Row being played
    pub row: u16,
    pub instruments: &'a [Instrument],
}

/// A note to start on the channel's voice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteTrigger {
    pub pitch: u8,
    pub instrument: Option<u8>,
    /// Channel volume at the attack (0-64)
    pub velocity: u8,
}

/// What the voice has to do after this tick.
///
/// Consumers apply them in field order: `cut` and `note_off` act on the
/// note that was sounding before `trigger` starts a new one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Signals {
    pub cut: bool,
    pub note_off: bool,
    pub trigger: Option<NoteTrigger>,
    pub retrigger: bool,
    /// Start offset in frames for the triggered note
    pub sample_offset: Option<u32>,
    /// Row the sequencer should loop back to at the end of this row
    pub loop_to_row: Option<u16>,
}

impl Signals {
    pub fn is_empty(&self) -> bool {
        *self == Signals::default()
    }
}

/// Result of one tick of effect processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Applied {
    pub state: ChannelState,
    pub signals: Signals,
}

/// Process one tick for one channel.
pub fn apply(
    prev: &ChannelState,
    cell: Option<&Cell>,
    tick: u16,
    ctx: &TickContext<'_>,
) -> Applied {
    let mut state = *prev;
    let mut signals = Signals::default();
    state.period_offset = 0;
    state.volume_offset = 0;

    if tick == 0 {
        state.cut_at = None;
        state.delayed = None;
        if ctx.row == 0 {
            state.loop_row = 0;
        }
        if let Some(cell) = cell {
            row_start(&mut state, &mut signals, cell, ctx);
        }
    } else {
        continuous(&mut state, &mut signals, tick);
    }

    if state.cut_at == Some(tick) {
        state.cut_at = None;
        let volume = state.volume;
        cut(&mut state, &mut signals);
        // A delayed note due on this tick starts after the cut at its own volume
        if state.delayed.is_some_and(|d| d.tick == tick) {
            state.volume = volume;
        }
    }
    if let Some(delayed) = state.delayed {
        if delayed.tick == tick {
            state.delayed = None;
            start_note(&mut state, &mut signals, delayed.pitch);
        }
    }

    Applied { state, signals }
}

fn row_start(state: &mut ChannelState, signals: &mut Signals, cell: &Cell, ctx: &TickContext<'_>) {
    let effect = cell.effect;

    if let Some(index) = cell.instrument {
        state.instrument = Some(index);
        if let Some(inst) = ctx.instruments.get(index as usize) {
            state.volume = inst.default_volume.min(MAX_VOLUME);
        }
    }
    if let Some(volume) = cell.volume {
        state.volume = volume.min(MAX_VOLUME);
    }

    // An immediate cut ends the note already sounding, before this cell's
    // note starts
    if effect == Effect::NoteCut(0) {
        let volume = state.volume;
        cut(state, signals);
        if matches!(cell.note, Note::On(_)) {
            state.volume = volume;
        }
    }

    match cell.note {
        Note::On(pitch) => match effect {
            e if e.is_tone_porta() && state.period != 0 => {
                state.target_period = clamp_period(note_to_period(pitch) as i32);
            }
            Effect::NoteDelay(ticks) if ticks > 0 => {
                state.delayed = Some(DelayedNote {
                    tick: ticks as u16,
                    pitch,
                });
            }
            _ => start_note(state, signals, pitch),
        },
        Note::Off => signals.note_off = true,
        Note::Cut => cut(state, signals),
        Note::None => {}
    }

    row_effect(state, signals, effect, ctx.row);
}

fn row_effect(state: &mut ChannelState, signals: &mut Signals, effect: Effect, row: u16) {
    let memory = &mut state.memory;
    match effect {
        Effect::Arpeggio { x, y } => state.pitch = Some(PitchSlide::Arpeggio { x, y }),
        Effect::PortaUp(v) => state.pitch = Some(PitchSlide::Up(remember(&mut memory.porta_up, v))),
        Effect::PortaDown(v) => {
            state.pitch = Some(PitchSlide::Down(remember(&mut memory.porta_down, v)))
        }
        Effect::TonePorta(v) => {
            remember(&mut memory.tone_porta_speed, v);
            state.pitch = Some(PitchSlide::Tone);
        }
        Effect::Vibrato { speed, depth } => {
            state.vibrato = Some(remember_oscillation(&mut memory.vibrato, speed, depth));
        }
        Effect::TonePortaVolSlide(slide) => {
            state.pitch = Some(PitchSlide::Tone);
            state.volume_slide = Some(remember_slide(&mut memory.volume_slide, slide));
        }
        Effect::VibratoVolSlide(slide) => {
            state.vibrato = Some(memory.vibrato);
            state.volume_slide = Some(remember_slide(&mut memory.volume_slide, slide));
        }
        Effect::Tremolo { speed, depth } => {
            state.tremolo = Some(remember_oscillation(&mut memory.tremolo, speed, depth));
        }
        Effect::VolumeSlide(slide) => {
            state.volume_slide = Some(remember_slide(&mut memory.volume_slide, slide));
        }
        Effect::SetPan(p) => state.pan = (p as i32 * 128 / 255 - 64) as i8,
        Effect::SetPanPosition(p) => state.pan = (p.min(15) as i32 * 128 / 15 - 64) as i8,
        Effect::SampleOffset(o) => {
            let offset = remember(&mut memory.sample_offset, o);
            if signals.trigger.is_some() {
                signals.sample_offset = Some(offset as u32 * 256);
            }
        }
        Effect::SetVolume(v) => state.volume = v.min(MAX_VOLUME),
        Effect::FinePortaUp(v) => {
            if state.period != 0 {
                state.period = clamp_period(state.period as i32 - v as i32);
            }
        }
        Effect::FinePortaDown(v) => {
            if state.period != 0 {
                state.period = clamp_period(state.period as i32 + v as i32);
            }
        }
        Effect::FineVolumeSlideUp(v) => state.volume = slide_volume(state.volume, v as i16),
        Effect::FineVolumeSlideDown(v) => state.volume = slide_volume(state.volume, -(v as i16)),
        Effect::SetVibratoWaveform(w) => state.vibrato_waveform = w & 7,
        Effect::SetTremoloWaveform(w) => state.tremolo_waveform = w & 7,
        Effect::PatternLoop(0) => state.loop_row = row,
        Effect::PatternLoop(count) => {
            if state.loop_count == 0 {
                state.loop_count = count;
                signals.loop_to_row = Some(state.loop_row);
            } else {
                state.loop_count -= 1;
                if state.loop_count > 0 {
                    signals.loop_to_row = Some(state.loop_row);
                }
            }
        }
        Effect::RetriggerNote(n) => state.retrigger = (n > 0).then_some(n),
        Effect::NoteCut(0) => {}
        Effect::NoteCut(n) => state.cut_at = Some(n as u16),
        Effect::ClearContinuous => state.clear_continuous(),
        // Handled by the sequencer, by the note column, or not modelled
        Effect::None
        | Effect::NoteDelay(_)
        | Effect::SetFinetune(_)
        | Effect::SetSpeed(_)
        | Effect::SetTempo(_)
        | Effect::PositionJump(_)
        | Effect::PatternBreak(_)
        | Effect::PatternDelay(_) => {}
    }
}

fn continuous(state: &mut ChannelState, signals: &mut Signals, tick: u16) {
    match state.pitch {
        Some(PitchSlide::Up(speed)) => {
            if state.period != 0 {
                state.period = clamp_period(state.period as i32 - speed as i32);
            }
        }
        Some(PitchSlide::Down(speed)) => {
            if state.period != 0 {
                state.period = clamp_period(state.period as i32 + speed as i32);
            }
        }
        Some(PitchSlide::Tone) => tone_porta(state),
        Some(PitchSlide::Arpeggio { x, y }) => {
            let semitones = match tick % 3 {
                0 => 0,
                1 => x,
                _ => y,
            };
            if let (Some(note), true) = (state.note, semitones > 0) {
                let base = note_to_period(note) as i32;
                let shifted = note_to_period(note.saturating_add(semitones)) as i32;
                state.period_offset = (shifted - base) as i16;
            }
        }
        None => {}
    }

    if let Some(osc) = state.vibrato {
        let wave = waveform_value(state.vibrato_waveform, state.vibrato_pos) as i32;
        state.period_offset += (wave * osc.depth as i32 / 128) as i16;
        state.vibrato_pos = advance(state.vibrato_pos, osc.speed);
    }

    if let Some(slide) = state.volume_slide {
        state.volume = slide_volume(state.volume, slide as i16);
    }

    if let Some(osc) = state.tremolo {
        let wave = waveform_value(state.tremolo_waveform, state.tremolo_pos) as i32;
        state.volume_offset = (wave * osc.depth as i32 / 64).clamp(-64, 64) as i8;
        state.tremolo_pos = advance(state.tremolo_pos, osc.speed);
    }

    if let Some(interval) = state.retrigger {
        if state.note.is_some() && tick % interval as u16 == 0 {
            signals.retrigger = true;
        }
    }
}

/// Move toward the target period without passing it.
fn tone_porta(state: &mut ChannelState) {
    let speed = state.memory.tone_porta_speed as i32;
    let target = state.target_period as i32;
    if target == 0 || speed == 0 || state.period == 0 {
        return;
    }
    let period = state.period as i32;
    let next = if period < target {
        (period + speed).min(target)
    } else {
        (period - speed).max(target)
    };
    state.period = clamp_period(next);
}

fn start_note(state: &mut ChannelState, signals: &mut Signals, pitch: u8) {
    state.note = Some(pitch);
    state.period = clamp_period(note_to_period(pitch) as i32);
    state.target_period = state.period;
    if state.vibrato_waveform & NO_RETRIGGER == 0 {
        state.vibrato_pos = 0;
    }
    if state.tremolo_waveform & NO_RETRIGGER == 0 {
        state.tremolo_pos = 0;
    }
    signals.trigger = Some(NoteTrigger {
        pitch,
        instrument: state.instrument,
        velocity: state.volume,
    });
}

fn cut(state: &mut ChannelState, signals: &mut Signals) {
    state.volume = 0;
    state.clear_continuous();
    signals.cut = true;
}

fn slide_volume(volume: u8, delta: i16) -> u8 {
    (volume as i16 + delta).clamp(0, MAX_VOLUME as i16) as u8
}

fn remember(slot: &mut u8, value: u8) -> u8 {
    if value != 0 {
        *slot = value;
    }
    *slot
}

fn remember_slide(slot: &mut i8, value: i8) -> i8 {
    if value != 0 {
        *slot = value;
    }
    *slot
}

fn remember_oscillation(slot: &mut Oscillation, speed: u8, depth: u8) -> Oscillation {
    if speed != 0 {
        slot.speed = speed;
    }
    if depth != 0 {
        slot.depth = depth;
    }
    *slot
}

#[cfg(test)]
mod tests {
    use super::*;
    use sq_ir::{SynthConfig, SynthWaveform};

    fn instruments() -> alloc::vec::Vec<Instrument> {
        alloc::vec![
            Instrument::synth("lead", SynthConfig::with_waveform(SynthWaveform::Square)),
            Instrument::synth("quiet", SynthConfig::default()).with_default_volume(20),
        ]
    }

    /// Run one full row of `speed` ticks and return the final state plus
    /// every tick's signals.
    fn run_row(
        state: &ChannelState,
        cell: Option<&Cell>,
        row: u16,
        speed: u16,
        insts: &[Instrument],
    ) -> (ChannelState, alloc::vec::Vec<Signals>) {
        let ctx = TickContext { row, instruments: insts };
        let mut current = *state;
        let mut all = alloc::vec::Vec::new();
        for tick in 0..speed {
            let applied = apply(&current, cell, tick, &ctx);
            current = applied.state;
            all.push(applied.signals);
        }
        (current, all)
    }

    #[test]
    fn note_triggers_with_instrument_volume() {
        let insts = instruments();
        let cell = Cell::note(48, 1);
        let ctx = TickContext { row: 0, instruments: &insts };
        let applied = apply(&ChannelState::default(), Some(&cell), 0, &ctx);
        assert_eq!(applied.state.period, 428);
        assert_eq!(applied.state.volume, 20);
        assert_eq!(
            applied.signals.trigger,
            Some(NoteTrigger { pitch: 48, instrument: Some(1), velocity: 20 })
        );
    }

    #[test]
    fn volume_column_overrides_instrument_volume() {
        let insts = instruments();
        let cell = Cell::note(48, 1).with_volume(50);
        let ctx = TickContext { row: 0, instruments: &insts };
        let applied = apply(&ChannelState::default(), Some(&cell), 0, &ctx);
        assert_eq!(applied.state.volume, 50);
    }

    #[test]
    fn volume_slide_runs_on_non_zero_ticks_and_persists() {
        let insts = instruments();
        let cell = Cell::note(48, 0).with_volume(64).with_command(0xA, 0x04);
        let (after_row0, _) = run_row(&ChannelState::default(), Some(&cell), 0, 6, &insts);
        assert_eq!(after_row0.volume, 44);

        let (after_row1, _) = run_row(&after_row0, None, 1, 6, &insts);
        assert_eq!(after_row1.volume, 24);
    }

    #[test]
    fn volume_slide_clamps_at_bounds() {
        let insts = instruments();
        let cell = Cell::note(48, 0).with_volume(62).with_command(0xA, 0xF0);
        let (state, _) = run_row(&ChannelState::default(), Some(&cell), 0, 6, &insts);
        assert_eq!(state.volume, 64);

        let cell = Cell::note(48, 0).with_volume(3).with_command(0xA, 0x0F);
        let (state, _) = run_row(&ChannelState::default(), Some(&cell), 0, 6, &insts);
        assert_eq!(state.volume, 0);
    }

    #[test]
    fn zero_parameter_reuses_memory() {
        let insts = instruments();
        let first = Cell::note(48, 0).with_effect(Effect::PortaUp(3));
        let (state, _) = run_row(&ChannelState::default(), Some(&first), 0, 6, &insts);
        assert_eq!(state.period, 428 - 15);

        let again = Cell::empty().with_effect(Effect::PortaUp(0));
        let (state, _) = run_row(&state, Some(&again), 1, 6, &insts);
        assert_eq!(state.period, 428 - 30);
    }

    #[test]
    fn porta_clamps_to_period_range() {
        let insts = instruments();
        let cell = Cell::note(70, 0).with_effect(Effect::PortaUp(0xFF));
        let (state, _) = run_row(&ChannelState::default(), Some(&cell), 0, 6, &insts);
        assert_eq!(state.period, crate::frequency::PERIOD_MIN);
    }

    #[test]
    fn tone_porta_sets_target_and_does_not_overshoot() {
        let insts = instruments();
        let start = Cell::note(48, 0);
        let (state, _) = run_row(&ChannelState::default(), Some(&start), 0, 1, &insts);

        // Slide from 428 toward 404 (C#-2) at 16 per tick
        let slide = Cell::note(49, 0).with_effect(Effect::TonePorta(16));
        let (state, signals) = run_row(&state, Some(&slide), 1, 6, &insts);
        assert!(signals.iter().all(|s| s.trigger.is_none()));
        assert_eq!(state.target_period, 404);
        assert_eq!(state.period, 404);
    }

    #[test]
    fn tone_porta_without_playing_note_triggers() {
        let insts = instruments();
        let cell = Cell::note(48, 0).with_effect(Effect::TonePorta(4));
        let ctx = TickContext { row: 0, instruments: &insts };
        let applied = apply(&ChannelState::default(), Some(&cell), 0, &ctx);
        assert!(applied.signals.trigger.is_some());
    }

    #[test]
    fn vibrato_phase_advances_on_following_rows() {
        let insts = instruments();
        let cell = Cell::note(48, 0).with_effect(Effect::Vibrato { speed: 4, depth: 8 });
        let (row_n, _) = run_row(&ChannelState::default(), Some(&cell), 0, 6, &insts);
        assert_eq!(row_n.vibrato_pos, 20);

        let (row_n1, _) = run_row(&row_n, None, 1, 6, &insts);
        assert_eq!(row_n1.vibrato_pos, 40);

        let (row_n2, _) = run_row(&row_n1, None, 2, 6, &insts);
        assert_eq!(row_n2.vibrato_pos, 60);
        assert_eq!(row_n2.vibrato, Some(Oscillation { speed: 4, depth: 8 }));
    }

    #[test]
    fn vibrato_offsets_period_but_not_base() {
        let insts = instruments();
        let cell = Cell::note(48, 0).with_effect(Effect::Vibrato { speed: 8, depth: 15 });
        let ctx = TickContext { row: 0, instruments: &insts };
        let t0 = apply(&ChannelState::default(), Some(&cell), 0, &ctx);
        assert_eq!(t0.state.period_offset, 0);
        let t1 = apply(&t0.state, Some(&cell), 1, &ctx);
        let t2 = apply(&t1.state, Some(&cell), 2, &ctx);
        assert_eq!(t2.state.period, 428);
        assert_ne!(t2.state.period_offset, 0);
    }

    #[test]
    fn new_slot_command_replaces_only_its_slot() {
        let insts = instruments();
        let cell = Cell::note(48, 0).with_effect(Effect::Vibrato { speed: 4, depth: 4 });
        let (state, _) = run_row(&ChannelState::default(), Some(&cell), 0, 6, &insts);
        let slide = Cell::empty().with_effect(Effect::VolumeSlide(-1));
        let (state, _) = run_row(&state, Some(&slide), 1, 6, &insts);
        assert!(state.vibrato.is_some());
        assert_eq!(state.volume_slide, Some(-1));
    }

    #[test]
    fn clear_continuous_stops_effects() {
        let insts = instruments();
        let cell = Cell::note(48, 0).with_volume(64).with_effect(Effect::VolumeSlide(-2));
        let (state, _) = run_row(&ChannelState::default(), Some(&cell), 0, 6, &insts);
        let clear = Cell::empty().with_effect(Effect::ClearContinuous);
        let (cleared, _) = run_row(&state, Some(&clear), 1, 6, &insts);
        assert_eq!(cleared.volume, state.volume);
        assert!(!cleared.has_continuous());
    }

    #[test]
    fn note_cut_countdown_fires_on_tick() {
        let insts = instruments();
        let cell = Cell::note(48, 0).with_effect(Effect::NoteCut(3));
        let (state, signals) = run_row(&ChannelState::default(), Some(&cell), 0, 6, &insts);
        let cut_ticks: alloc::vec::Vec<usize> =
            signals.iter().enumerate().filter(|(_, s)| s.cut).map(|(i, _)| i).collect();
        assert_eq!(cut_ticks, [3]);
        assert_eq!(state.volume, 0);
    }

    #[test]
    fn note_cut_clears_continuous_slots() {
        let insts = instruments();
        let cell = Cell::note(48, 0).with_effect(Effect::Tremolo { speed: 4, depth: 4 });
        let (state, _) = run_row(&ChannelState::default(), Some(&cell), 0, 6, &insts);
        let cut = Cell { note: Note::Cut, ..Cell::empty() };
        let (state, signals) = run_row(&state, Some(&cut), 1, 6, &insts);
        assert!(signals[0].cut);
        assert!(state.tremolo.is_none());
    }

    #[test]
    fn note_delay_triggers_late() {
        let insts = instruments();
        let cell = Cell::note(48, 0).with_effect(Effect::NoteDelay(2));
        let (_, signals) = run_row(&ChannelState::default(), Some(&cell), 0, 6, &insts);
        let triggers: alloc::vec::Vec<usize> = signals
            .iter()
            .enumerate()
            .filter(|(_, s)| s.trigger.is_some())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(triggers, [2]);
    }

    #[test]
    fn cut_and_delayed_note_on_same_tick_cut_first() {
        let insts = instruments();
        // Cut from a countdown and a delayed trigger both land on tick 2
        let cell = Cell::note(48, 0).with_effect(Effect::NoteDelay(2));
        let ctx = TickContext { row: 0, instruments: &insts };
        let mut s = apply(&ChannelState::default(), Some(&cell), 0, &ctx).state;
        s.cut_at = Some(2);
        s = apply(&s, Some(&cell), 1, &ctx).state;
        let t2 = apply(&s, Some(&cell), 2, &ctx);
        assert!(t2.signals.cut);
        assert_eq!(
            t2.signals.trigger,
            Some(NoteTrigger { pitch: 48, instrument: Some(0), velocity: 64 })
        );
        assert_eq!(t2.state.volume, 64);
    }

    #[test]
    fn immediate_cut_with_new_note_keeps_new_note_volume() {
        let insts = instruments();
        let (playing, _) = run_row(&ChannelState::default(), Some(&Cell::note(48, 0)), 0, 6, &insts);

        let cell = Cell::note(55, 1).with_effect(Effect::NoteCut(0));
        let ctx = TickContext { row: 1, instruments: &insts };
        let applied = apply(&playing, Some(&cell), 0, &ctx);
        assert!(applied.signals.cut);
        assert_eq!(
            applied.signals.trigger,
            Some(NoteTrigger { pitch: 55, instrument: Some(1), velocity: 20 })
        );
        assert_eq!(applied.state.volume, 20);
    }

    #[test]
    fn immediate_cut_without_note_silences() {
        let insts = instruments();
        let (playing, _) = run_row(&ChannelState::default(), Some(&Cell::note(48, 0)), 0, 6, &insts);
        let cell = Cell::empty().with_effect(Effect::NoteCut(0));
        let ctx = TickContext { row: 1, instruments: &insts };
        let applied = apply(&playing, Some(&cell), 0, &ctx);
        assert!(applied.signals.cut);
        assert!(applied.signals.trigger.is_none());
        assert_eq!(applied.state.volume, 0);
    }

    #[test]
    fn note_off_signals_release_only() {
        let insts = instruments();
        let cell = Cell { note: Note::Off, ..Cell::empty() };
        let ctx = TickContext { row: 0, instruments: &insts };
        let applied = apply(&ChannelState::default(), Some(&cell), 0, &ctx);
        assert!(applied.signals.note_off);
        assert!(!applied.signals.cut);
    }

    #[test]
    fn retrigger_every_n_ticks() {
        let insts = instruments();
        let cell = Cell::note(48, 0).with_effect(Effect::RetriggerNote(2));
        let (_, signals) = run_row(&ChannelState::default(), Some(&cell), 0, 6, &insts);
        let retrigs: alloc::vec::Vec<usize> =
            signals.iter().enumerate().filter(|(_, s)| s.retrigger).map(|(i, _)| i).collect();
        assert_eq!(retrigs, [2, 4]);
    }

    #[test]
    fn arpeggio_cycles_offsets() {
        let insts = instruments();
        let cell = Cell::note(48, 0).with_effect(Effect::Arpeggio { x: 12, y: 7 });
        let ctx = TickContext { row: 0, instruments: &insts };
        let t0 = apply(&ChannelState::default(), Some(&cell), 0, &ctx);
        let t1 = apply(&t0.state, Some(&cell), 1, &ctx);
        assert_eq!(t1.state.effective_period(), 214);
        let t2 = apply(&t1.state, Some(&cell), 2, &ctx);
        assert_eq!(t2.state.effective_period(), note_to_period(55));
        let t3 = apply(&t2.state, Some(&cell), 3, &ctx);
        assert_eq!(t3.state.effective_period(), 428);
    }

    #[test]
    fn sample_offset_only_with_trigger() {
        let insts = instruments();
        let cell = Cell::note(48, 0).with_effect(Effect::SampleOffset(2));
        let ctx = TickContext { row: 0, instruments: &insts };
        let applied = apply(&ChannelState::default(), Some(&cell), 0, &ctx);
        assert_eq!(applied.signals.sample_offset, Some(512));

        let bare = Cell::empty().with_effect(Effect::SampleOffset(2));
        let applied = apply(&applied.state, Some(&bare), 0, &ctx);
        assert_eq!(applied.signals.sample_offset, None);
    }

    #[test]
    fn pattern_loop_requests_n_jumps() {
        let insts = instruments();
        let start = Cell::empty().with_effect(Effect::PatternLoop(0));
        let end = Cell::empty().with_effect(Effect::PatternLoop(2));
        let ctx_start = TickContext { row: 4, instruments: &insts };
        let ctx_end = TickContext { row: 7, instruments: &insts };

        let mut state = apply(&ChannelState::default(), Some(&start), 0, &ctx_start).state;
        let mut jumps = 0;
        for _ in 0..3 {
            let applied = apply(&state, Some(&end), 0, &ctx_end);
            state = applied.state;
            if let Some(row) = applied.signals.loop_to_row {
                assert_eq!(row, 4);
                jumps += 1;
            }
        }
        assert_eq!(jumps, 2);
    }

    #[test]
    fn set_pan_maps_to_signed_range() {
        let insts = instruments();
        let ctx = TickContext { row: 0, instruments: &insts };
        let left = apply(&ChannelState::default(), Some(&Cell::empty().with_effect(Effect::SetPan(0))), 0, &ctx);
        assert_eq!(left.state.pan, -64);
        let right = apply(&ChannelState::default(), Some(&Cell::empty().with_effect(Effect::SetPan(255))), 0, &ctx);
        assert_eq!(right.state.pan, 64);
    }

    #[test]
    fn empty_tick_is_pure() {
        let insts = instruments();
        let ctx = TickContext { row: 3, instruments: &insts };
        let state = ChannelState::default();
        let applied = apply(&state, None, 0, &ctx);
        assert_eq!(applied.state, state);
        assert!(applied.signals.is_empty());
    }
}
