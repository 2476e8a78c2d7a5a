//! Tick length from tempo and speed.

use sq_ir::TickTiming;

/// Ticks per beat under classic timing (2.5 / tempo seconds per tick).
pub const CLASSIC_TICKS_PER_BEAT: u32 = 24;

/// Lowest and highest tempo the transport accepts.
pub const TEMPO_MIN: u16 = 1;
pub const TEMPO_MAX: u16 = 999;

/// Tick rate parameters, resolved once per tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickClock {
    pub sample_rate: u32,
    pub tempo: u16,
    pub speed: u8,
    pub rows_per_beat: u8,
    pub timing: TickTiming,
}

impl TickClock {
    fn ticks_per_beat(&self) -> u32 {
        match self.timing {
            TickTiming::Classic => CLASSIC_TICKS_PER_BEAT,
            TickTiming::Musical => self.speed.max(1) as u32 * self.rows_per_beat.max(1) as u32,
        }
    }

    /// `round(sample_rate * 60 / (tempo * ticks_per_beat))`, never zero.
    pub fn samples_per_tick(&self) -> u32 {
        let tempo = self.tempo.clamp(TEMPO_MIN, TEMPO_MAX) as u64;
        let denom = tempo * self.ticks_per_beat() as u64;
        let numer = self.sample_rate as u64 * 60;
        ((numer + denom / 2) / denom).max(1) as u32
    }

    /// Length of one row (without pattern delay).
    pub fn samples_per_row(&self) -> u64 {
        self.samples_per_tick() as u64 * self.speed.max(1) as u64
    }
}
