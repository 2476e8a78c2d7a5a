//! Pattern and cell types for tracker sequences.

use alloc::vec::Vec;
use crate::effects::Effect;

/// Highest value of the volume column and of channel volume.
pub const MAX_VOLUME: u8 = 64;

/// A note value in a pattern cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Note {
    /// Leave the channel alone
    #[default]
    None,
    /// Note on with pitch index (0-119, where 48 = C-2 / Amiga period 428)
    On(u8),
    /// Key release; the voice runs its release phase
    Off,
    /// Silence the voice immediately
    Cut,
}

impl Note {
    /// Create a note from octave (0-9) and semitone (0-11).
    pub const fn from_octave_semitone(octave: u8, semitone: u8) -> Self {
        Note::On(octave * 12 + semitone)
    }

    /// Get the octave (0-9) if this is a note on.
    pub const fn octave(self) -> Option<u8> {
        match self {
            Note::On(n) => Some(n / 12),
            _ => None,
        }
    }

    /// Get the semitone (0-11) if this is a note on.
    pub const fn semitone(self) -> Option<u8> {
        match self {
            Note::On(n) => Some(n % 12),
            _ => None,
        }
    }
}

/// A single cell in a pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    /// Note value
    pub note: Note,
    /// Instrument index into `Song::instruments`
    pub instrument: Option<u8>,
    /// Volume column (0-64)
    pub volume: Option<u8>,
    /// Effect column command
    pub effect: Effect,
}

impl Cell {
    /// Create an empty cell.
    pub const fn empty() -> Self {
        Self {
            note: Note::None,
            instrument: None,
            volume: None,
            effect: Effect::None,
        }
    }

    /// A note-on cell with an instrument.
    pub const fn note(pitch: u8, instrument: u8) -> Self {
        Self {
            note: Note::On(pitch),
            instrument: Some(instrument),
            volume: None,
            effect: Effect::None,
        }
    }

    /// Set the volume column, clamped to 0-64.
    pub fn with_volume(mut self, volume: u8) -> Self {
        self.volume = Some(volume.min(MAX_VOLUME));
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }

    /// Build the effect column from a raw ProTracker command/parameter pair.
    pub fn with_command(self, command: u8, param: u8) -> Self {
        self.with_effect(Effect::decode(command, param))
    }

    /// Returns true if the cell is completely empty.
    pub fn is_empty(&self) -> bool {
        self.note == Note::None
            && self.instrument.is_none()
            && self.volume.is_none()
            && self.effect == Effect::None
    }
}

/// A pattern containing rows of cells across channels.
#[derive(Clone, Debug)]
pub struct Pattern {
    /// Number of rows (typically 64, can be 1-256)
    pub rows: u16,
    /// Number of channels
    pub channels: u8,
    /// Pattern data, stored row-major: data[row * channels + channel]
    pub data: Vec<Cell>,
}

impl Pattern {
    /// Create a new pattern with empty cells.
    pub fn new(rows: u16, channels: u8) -> Self {
        Self {
            rows,
            channels,
            data: alloc::vec![Cell::empty(); rows as usize * channels as usize],
        }
    }

    /// Get a reference to a cell.
    pub fn cell(&self, row: u16, channel: u8) -> &Cell {
        debug_assert!(row < self.rows);
        debug_assert!(channel < self.channels);
        &self.data[row as usize * self.channels as usize + channel as usize]
    }

    /// Get a mutable reference to a cell.
    pub fn cell_mut(&mut self, row: u16, channel: u8) -> &mut Cell {
        debug_assert!(row < self.rows);
        debug_assert!(channel < self.channels);
        &mut self.data[row as usize * self.channels as usize + channel as usize]
    }

    /// Bounds-checked cell lookup.
    pub fn get(&self, row: u16, channel: u8) -> Option<&Cell> {
        if row >= self.rows || channel >= self.channels {
            return None;
        }
        self.data.get(row as usize * self.channels as usize + channel as usize)
    }

    /// Iterate over all cells in a row.
    pub fn row(&self, row: u16) -> &[Cell] {
        let start = row as usize * self.channels as usize;
        &self.data[start..start + self.channels as usize]
    }
}
