//! Song structure and validation.

use alloc::vec::Vec;
use arrayvec::ArrayString;
use thiserror::Error;

use crate::instrument::{DelegatedModule, Instrument};
use crate::pattern::Pattern;

/// Most channels a song may have.
pub const MAX_CHANNELS: usize = 32;

/// How tempo and speed translate into tick length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TickTiming {
    /// ProTracker/FT2: a tick is 2.5 / tempo seconds, whatever the speed.
    #[default]
    Classic,
    /// Tempo counts beats of `rows_per_beat` rows; speed only subdivides them.
    Musical,
}

/// A complete song.
#[derive(Clone, Debug)]
pub struct Song {
    /// Song title
    pub title: ArrayString<32>,
    /// Initial tempo in BPM (32-255 typical)
    pub initial_tempo: u16,
    /// Initial speed (ticks per row, 1-31)
    pub initial_speed: u8,
    /// Rows per beat (default 4: 4 rows = 1 beat)
    pub rows_per_beat: u8,
    /// Tick length rule
    pub timing: TickTiming,
    /// Order index playback returns to after the last order
    pub restart_position: u16,
    /// Patterns
    pub patterns: Vec<Pattern>,
    /// Order list
    pub order: Vec<OrderEntry>,
    /// Per-channel settings
    pub channels: Vec<ChannelSettings>,
    /// Instruments, referenced by cell instrument index
    pub instruments: Vec<Instrument>,
    /// First order index of each subsong after the main one
    pub subsongs: Vec<u16>,
    /// Set when an external module renders the whole song
    pub delegate: Option<DelegatedModule>,
}

impl Default for Song {
    fn default() -> Self {
        Self {
            title: ArrayString::new(),
            initial_tempo: 125,
            initial_speed: 6,
            rows_per_beat: 4,
            timing: TickTiming::Classic,
            restart_position: 0,
            patterns: Vec::new(),
            order: Vec::new(),
            channels: Vec::new(),
            instruments: Vec::new(),
            subsongs: Vec::new(),
            delegate: None,
        }
    }
}

impl Song {
    /// Create a new empty song.
    pub fn new(title: &str) -> Self {
        let mut song = Self::default();
        let _ = song.title.try_push_str(title);
        song
    }

    /// Create a song with a given number of channels, Amiga-panned.
    pub fn with_channels(title: &str, num_channels: u8) -> Self {
        let mut song = Self::new(title);
        for i in 0..num_channels {
            song.channels.push(ChannelSettings {
                // Classic Amiga panning: L R R L pattern
                initial_pan: if i % 4 == 0 || i % 4 == 3 { -64 } else { 64 },
                initial_vol: 64,
                muted: false,
            });
        }
        song
    }

    /// A song rendered entirely by an external replay module.
    pub fn delegated(title: &str, module: DelegatedModule) -> Self {
        let mut song = Self::new(title);
        song.delegate = Some(module);
        song
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of playable subsongs (the main song counts as one).
    pub fn subsong_count(&self) -> usize {
        1 + self.subsongs.len()
    }

    /// Order index a subsong starts at.
    pub fn subsong_start(&self, index: usize) -> Option<u16> {
        match index {
            0 => Some(0),
            n => self.subsongs.get(n - 1).copied(),
        }
    }

    /// Append a pattern and an order entry playing it.
    pub fn push_pattern(&mut self, pattern: Pattern) -> u8 {
        let index = self.patterns.len() as u8;
        self.patterns.push(pattern);
        self.order.push(OrderEntry::Pattern(index));
        index
    }

    /// Pattern played at an order index, if that entry is a pattern.
    pub fn pattern_at(&self, order: u16) -> Option<&Pattern> {
        match self.order.get(order as usize)? {
            OrderEntry::Pattern(idx) => self.patterns.get(*idx as usize),
            _ => None,
        }
    }

    /// The first order index at or after `from` that plays a pattern,
    /// skipping `Skip` markers. `None` at `End` or past the list.
    pub fn next_playable_order(&self, from: u16) -> Option<u16> {
        let mut order = from as usize;
        while let Some(entry) = self.order.get(order) {
            match entry {
                OrderEntry::Pattern(_) => return Some(order as u16),
                OrderEntry::Skip => order += 1,
                OrderEntry::End => return None,
            }
        }
        None
    }

    /// Check the song is safe to hand to the engine.
    ///
    /// Instrument references in cells are not checked here: a missing
    /// instrument mutes its note at playback time instead of failing the load.
    pub fn validate(&self) -> Result<(), SongError> {
        if self.initial_tempo == 0 {
            return Err(SongError::InvalidTempo(self.initial_tempo));
        }
        if self.initial_speed == 0 {
            return Err(SongError::InvalidSpeed(self.initial_speed));
        }
        if self.rows_per_beat == 0 {
            return Err(SongError::InvalidRowsPerBeat);
        }

        if self.delegate.is_some() {
            return match &self.delegate {
                Some(module) if module.binary.is_empty() => Err(SongError::EmptyModule),
                _ => Ok(()),
            };
        }

        if self.channels.is_empty() || self.channels.len() > MAX_CHANNELS {
            return Err(SongError::ChannelCount(self.channels.len()));
        }
        for (index, pattern) in self.patterns.iter().enumerate() {
            if pattern.channels as usize != self.channels.len() {
                return Err(SongError::PatternChannels {
                    pattern: index,
                    expected: self.channels.len(),
                    found: pattern.channels as usize,
                });
            }
            if pattern.rows == 0 || pattern.rows > 256 {
                return Err(SongError::PatternRows {
                    pattern: index,
                    rows: pattern.rows,
                });
            }
            if pattern.data.len() != pattern.rows as usize * pattern.channels as usize {
                return Err(SongError::PatternData { pattern: index });
            }
        }
        for (position, entry) in self.order.iter().enumerate() {
            if let OrderEntry::Pattern(idx) = entry {
                if *idx as usize >= self.patterns.len() {
                    return Err(SongError::MissingPattern {
                        order: position,
                        pattern: *idx,
                    });
                }
            }
        }
        if self.next_playable_order(0).is_none() {
            return Err(SongError::EmptyOrder);
        }
        if self.restart_position as usize >= self.order.len() {
            return Err(SongError::RestartOutOfRange(self.restart_position));
        }
        for &start in &self.subsongs {
            if self.next_playable_order(start).is_none() {
                return Err(SongError::SubsongOutOfRange(start));
            }
        }
        Ok(())
    }
}

/// Reasons a song is rejected at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SongError {
    #[error("tempo {0} is out of range")]
    InvalidTempo(u16),
    #[error("speed {0} is out of range")]
    InvalidSpeed(u8),
    #[error("rows per beat must be non-zero")]
    InvalidRowsPerBeat,
    #[error("song has {0} channels, expected 1-32")]
    ChannelCount(usize),
    #[error("pattern {pattern} has {found} channels, song has {expected}")]
    PatternChannels {
        pattern: usize,
        expected: usize,
        found: usize,
    },
    #[error("pattern {pattern} has {rows} rows, expected 1-256")]
    PatternRows { pattern: usize, rows: u16 },
    #[error("pattern {pattern} cell data does not match its dimensions")]
    PatternData { pattern: usize },
    #[error("order {order} refers to missing pattern {pattern}")]
    MissingPattern { order: usize, pattern: u8 },
    #[error("order list has no playable pattern")]
    EmptyOrder,
    #[error("restart position {0} is past the order list")]
    RestartOutOfRange(u16),
    #[error("subsong start {0} has no playable pattern")]
    SubsongOutOfRange(u16),
    #[error("delegated module has no data")]
    EmptyModule,
}

/// An entry in an order list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderEntry {
    /// Play pattern with this index
    Pattern(u8),
    /// Skip marker (+++), continue to next
    Skip,
    /// End of song marker (---)
    End,
}

/// Per-channel settings.
#[derive(Clone, Copy, Debug)]
pub struct ChannelSettings {
    /// Initial panning (-64 to +64, 0 = center)
    pub initial_pan: i8,
    /// Initial volume (0-64)
    pub initial_vol: u8,
    /// Is the channel muted?
    pub muted: bool,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            initial_pan: 0,
            initial_vol: 64,
            muted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Note;

    fn two_pattern_song() -> Song {
        let mut song = Song::with_channels("test", 4);
        let mut pat0 = Pattern::new(4, 4);
        pat0.cell_mut(0, 0).note = Note::On(48);
        song.push_pattern(pat0);
        song.push_pattern(Pattern::new(8, 4));
        song
    }

    #[test]
    fn with_channels_uses_amiga_panning() {
        let song = Song::with_channels("test", 4);
        let pans: Vec<i8> = song.channels.iter().map(|c| c.initial_pan).collect();
        assert_eq!(pans, [-64, 64, 64, -64]);
    }

    #[test]
    fn valid_song_passes() {
        assert_eq!(two_pattern_song().validate(), Ok(()));
    }

    #[test]
    fn rejects_missing_pattern() {
        let mut song = two_pattern_song();
        song.order.push(OrderEntry::Pattern(9));
        assert_eq!(
            song.validate(),
            Err(SongError::MissingPattern { order: 2, pattern: 9 })
        );
    }

    #[test]
    fn rejects_channel_mismatch() {
        let mut song = two_pattern_song();
        song.patterns.push(Pattern::new(4, 2));
        assert!(matches!(
            song.validate(),
            Err(SongError::PatternChannels { pattern: 2, .. })
        ));
    }

    #[test]
    fn rejects_zero_speed_and_tempo() {
        let mut song = two_pattern_song();
        song.initial_speed = 0;
        assert_eq!(song.validate(), Err(SongError::InvalidSpeed(0)));

        let mut song = two_pattern_song();
        song.initial_tempo = 0;
        assert_eq!(song.validate(), Err(SongError::InvalidTempo(0)));
    }

    #[test]
    fn rejects_order_without_patterns() {
        let mut song = Song::with_channels("test", 1);
        song.patterns.push(Pattern::new(4, 1));
        song.order = alloc::vec![OrderEntry::Skip, OrderEntry::End];
        assert_eq!(song.validate(), Err(SongError::EmptyOrder));
    }

    #[test]
    fn missing_instruments_do_not_fail_validation() {
        let mut song = two_pattern_song();
        song.patterns[0].cell_mut(1, 1).instrument = Some(99);
        assert_eq!(song.validate(), Ok(()));
    }

    #[test]
    fn next_playable_order_skips_markers() {
        let mut song = Song::with_channels("test", 1);
        song.patterns.push(Pattern::new(4, 1));
        song.order = alloc::vec![
            OrderEntry::Pattern(0),
            OrderEntry::Skip,
            OrderEntry::Pattern(0),
            OrderEntry::End,
            OrderEntry::Pattern(0),
        ];
        assert_eq!(song.next_playable_order(1), Some(2));
        assert_eq!(song.next_playable_order(3), None);
        assert_eq!(song.next_playable_order(9), None);
    }

    #[test]
    fn subsong_starts() {
        let mut song = two_pattern_song();
        song.subsongs.push(1);
        assert_eq!(song.subsong_count(), 2);
        assert_eq!(song.subsong_start(0), Some(0));
        assert_eq!(song.subsong_start(1), Some(1));
        assert_eq!(song.subsong_start(2), None);
        assert_eq!(song.validate(), Ok(()));
    }

    #[test]
    fn delegated_song_needs_data() {
        let song = Song::delegated("tune", DelegatedModule::new("hively", alloc::vec![]));
        assert_eq!(song.validate(), Err(SongError::EmptyModule));
    }
}
