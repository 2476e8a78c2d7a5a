//! Song sequencer.
//!
//! Walks the order list tick by tick. Each call to [`Sequencer::advance`]
//! covers at most one tick boundary: if a tick starts, its events come
//! back with the call and `consumed` says how many samples of that tick
//! the caller may now render. Nothing here allocates once constructed.

use alloc::sync::Arc;
use sq_ir::{Cell, Effect, Song, MAX_CHANNELS};

use crate::error::EngineError;
use crate::timing::{TickClock, TEMPO_MAX, TEMPO_MIN};

/// One channel's cell for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequencerEvent {
    pub channel: u8,
    /// The cell at the current row; `None` when the cell is empty
    pub cell: Option<Cell>,
    /// Tick within the row; pattern-delay repeats count past `speed`
    pub tick: u16,
    pub row: u16,
    pub order: u16,
}

/// Result of [`Sequencer::advance`].
#[derive(Clone, Debug, Default)]
pub struct Advance {
    /// Samples the caller may render before the next call
    pub consumed: u32,
    /// Events of the tick that started with this call (one per channel)
    pub events: heapless::Vec<SequencerEvent, MAX_CHANNELS>,
}

/// Where playback is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackPosition {
    pub order: u16,
    pub row: u16,
    pub tick: u16,
}

/// Transport state. Only the sequencer mutates it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportState {
    pub order: u16,
    pub row: u16,
    pub tick: u16,
    pub samples_until_tick: u32,
    pub tempo: u16,
    pub speed: u8,
    /// Extra repeats of the current row
    pub pattern_delay: u8,
}

/// Flow changes requested during a row, applied when it ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct PendingJump {
    order: Option<u16>,
    row: Option<u16>,
    loop_row: Option<u16>,
}

impl PendingJump {
    fn is_set(&self) -> bool {
        self.order.is_some() || self.row.is_some()
    }
}

pub struct Sequencer {
    song: Arc<Song>,
    sample_rate: u32,
    transport: TransportState,
    pending: PendingJump,
    subsong: usize,
    looping: bool,
    started: bool,
    finished: bool,
}

impl Sequencer {
    pub fn new(song: Arc<Song>, sample_rate: u32) -> Self {
        let transport = initial_transport(&song, 0);
        let mut seq = Self {
            song,
            sample_rate,
            transport,
            pending: PendingJump::default(),
            subsong: 0,
            looping: true,
            started: false,
            finished: false,
        };
        seq.reset();
        seq
    }

    /// Whether the song wraps to its restart position at the end.
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Back to the first tick of the current subsong.
    pub fn reset(&mut self) {
        self.transport = initial_transport(&self.song, self.start_order());
        self.pending = PendingJump::default();
        self.started = false;
        self.finished = self.song.pattern_at(self.transport.order).is_none();
    }

    /// Switch subsong and reset to its first tick.
    pub fn select_subsong(&mut self, index: usize) -> Result<(), EngineError> {
        if self.song.subsong_start(index).is_none() {
            return Err(EngineError::NoSuchSubsong(index));
        }
        self.subsong = index;
        self.reset();
        Ok(())
    }

    pub fn subsong(&self) -> usize {
        self.subsong
    }

    /// Override the tempo from the next tick on.
    pub fn set_tempo(&mut self, bpm: u16) {
        self.transport.tempo = bpm.clamp(TEMPO_MIN, TEMPO_MAX);
    }

    /// Loop back to `row` of the current pattern when this row ends.
    pub fn request_loop(&mut self, row: u16) {
        self.pending.loop_row = Some(row);
    }

    pub fn transport(&self) -> &TransportState {
        &self.transport
    }

    pub fn position(&self) -> PlaybackPosition {
        PlaybackPosition {
            order: self.transport.order,
            row: self.transport.row,
            tick: self.transport.tick,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn samples_per_tick(&self) -> u32 {
        self.clock().samples_per_tick()
    }

    fn clock(&self) -> TickClock {
        TickClock {
            sample_rate: self.sample_rate,
            tempo: self.transport.tempo,
            speed: self.transport.speed,
            rows_per_beat: self.song.rows_per_beat,
            timing: self.song.timing,
        }
    }

    /// Consume up to `sample_count` samples, stopping at the next tick boundary.
    pub fn advance(&mut self, sample_count: u32) -> Advance {
        let mut step = Advance::default();
        if sample_count == 0 {
            return step;
        }

        if self.transport.samples_until_tick == 0 && !self.finished {
            if self.started {
                self.step_tick();
            }
            if !self.finished {
                self.started = true;
                self.emit_tick(&mut step);
                self.transport.samples_until_tick = self.clock().samples_per_tick();
            }
        }

        if self.finished {
            step.consumed = sample_count;
            return step;
        }

        step.consumed = sample_count.min(self.transport.samples_until_tick);
        self.transport.samples_until_tick -= step.consumed;
        step
    }

    fn emit_tick(&mut self, step: &mut Advance) {
        let song = Arc::clone(&self.song);
        let Some(pattern) = song.pattern_at(self.transport.order) else {
            self.finished = true;
            return;
        };
        let row = self.transport.row.min(pattern.rows.saturating_sub(1));
        let cells = pattern.row(row);

        if self.transport.tick == 0 {
            for cell in cells {
                self.apply_transport_effect(cell.effect);
            }
        }

        for (channel, cell) in cells.iter().enumerate().take(MAX_CHANNELS) {
            let event = SequencerEvent {
                channel: channel as u8,
                cell: (!cell.is_empty()).then_some(*cell),
                tick: self.transport.tick,
                row,
                order: self.transport.order,
            };
            // Capacity matches MAX_CHANNELS, which validation enforces
            let _ = step.events.push(event);
        }
    }

    fn apply_transport_effect(&mut self, effect: Effect) {
        let t = &mut self.transport;
        match effect {
            Effect::SetSpeed(speed) if speed > 0 => t.speed = speed,
            Effect::SetTempo(bpm) => t.tempo = (bpm as u16).clamp(TEMPO_MIN, TEMPO_MAX),
            Effect::PositionJump(order) => self.pending.order = Some(order as u16),
            Effect::PatternBreak(row) => self.pending.row = Some(row as u16),
            Effect::PatternDelay(rows) => {
                if t.pattern_delay == 0 {
                    t.pattern_delay = rows;
                }
            }
            _ => {}
        }
    }

    fn step_tick(&mut self) {
        let t = &mut self.transport;
        t.tick += 1;
        let row_ticks = t.speed as u16 * (1 + t.pattern_delay as u16);
        if t.tick >= row_ticks {
            t.tick = 0;
            t.pattern_delay = 0;
            self.next_row();
        }
    }

    fn next_row(&mut self) {
        if let Some(row) = self.pending.loop_row.take() {
            self.pending = PendingJump::default();
            self.transport.row = row;
            return;
        }

        if self.pending.is_set() {
            let order = self.pending.order.take().unwrap_or(self.transport.order + 1);
            let row = self.pending.row.take().unwrap_or(0);
            self.enter_order(order, row);
            return;
        }

        self.transport.row += 1;
        let rows = self
            .song
            .pattern_at(self.transport.order)
            .map_or(0, |p| p.rows);
        if self.transport.row >= rows {
            self.enter_order(self.transport.order + 1, 0);
        }
    }

    fn enter_order(&mut self, order: u16, row: u16) {
        let target = self.song.next_playable_order(order).or_else(|| {
            if self.looping {
                self.song.next_playable_order(self.loop_order())
            } else {
                None
            }
        });

        match target {
            Some(order) => {
                let rows = self.song.pattern_at(order).map_or(0, |p| p.rows);
                self.transport.order = order;
                self.transport.row = if row < rows { row } else { 0 };
            }
            None => self.finished = true,
        }
    }

    fn start_order(&self) -> u16 {
        let start = self.song.subsong_start(self.subsong).unwrap_or(0);
        self.song.next_playable_order(start).unwrap_or(start)
    }

    /// Where playback wraps to at the end of the song.
    fn loop_order(&self) -> u16 {
        if self.subsong == 0 {
            self.song.restart_position
        } else {
            self.start_order()
        }
    }
}

fn initial_transport(song: &Song, start: u16) -> TransportState {
    TransportState {
        order: song.next_playable_order(start).unwrap_or(start),
        row: 0,
        tick: 0,
        samples_until_tick: 0,
        tempo: song.initial_tempo.clamp(TEMPO_MIN, TEMPO_MAX),
        speed: song.initial_speed.max(1),
        pattern_delay: 0,
    }
}
