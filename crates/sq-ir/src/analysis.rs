//! Song feature analysis: which notes, effects and instruments a song uses.

use alloc::collections::BTreeSet;
use core::fmt;

use crate::instrument::InstrumentKind;
use crate::pattern::{Cell, Note};
use crate::song::Song;

/// Summary of features used in a song.
#[derive(Debug, Default)]
pub struct SongFeatures {
    pub effects: BTreeSet<&'static str>,
    pub has_note_off: bool,
    pub has_note_cut: bool,
    pub has_volume_column: bool,
    pub note_range: Option<(u8, u8)>,
    pub instruments_used: BTreeSet<u8>,
    /// Cell references to instruments the song does not define
    pub missing_instruments: BTreeSet<u8>,
    pub sample_instruments: usize,
    pub synth_instruments: usize,
    pub total_notes: usize,
}

/// Analyze a song and return a summary of which features it uses.
pub fn analyze(song: &Song) -> SongFeatures {
    let mut features = SongFeatures::default();

    for inst in &song.instruments {
        match inst.kind {
            InstrumentKind::Sample(_) => features.sample_instruments += 1,
            InstrumentKind::Synth(_) => features.synth_instruments += 1,
            InstrumentKind::Delegated(_) => {}
        }
    }

    for pattern in &song.patterns {
        for cell in &pattern.data {
            analyze_cell(cell, song.instruments.len(), &mut features);
        }
    }

    features
}

fn analyze_cell(cell: &Cell, instrument_count: usize, features: &mut SongFeatures) {
    match cell.note {
        Note::On(n) => {
            features.total_notes += 1;
            features.note_range = Some(match features.note_range {
                Some((lo, hi)) => (lo.min(n), hi.max(n)),
                None => (n, n),
            });
        }
        Note::Off => features.has_note_off = true,
        Note::Cut => features.has_note_cut = true,
        Note::None => {}
    }

    if let Some(inst) = cell.instrument {
        if inst as usize >= instrument_count {
            features.missing_instruments.insert(inst);
        } else {
            features.instruments_used.insert(inst);
        }
    }

    if cell.volume.is_some() {
        features.has_volume_column = true;
    }

    let name = cell.effect.name();
    if name != "None" {
        features.effects.insert(name);
    }
}

impl fmt::Display for SongFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Notes:    {} total", self.total_notes)?;
        if let Some((lo, hi)) = self.note_range {
            writeln!(f, "Range:    {} - {}", lo, hi)?;
        }
        writeln!(
            f,
            "Note types: On{}{}",
            if self.has_note_off { ", Off" } else { "" },
            if self.has_note_cut { ", Cut" } else { "" },
        )?;
        writeln!(
            f,
            "Instruments: {} sample, {} synth, {} referenced",
            self.sample_instruments,
            self.synth_instruments,
            self.instruments_used.len()
        )?;
        if !self.missing_instruments.is_empty() {
            write!(f, "Missing:  ")?;
            for (i, inst) in self.missing_instruments.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", inst)?;
            }
            writeln!(f)?;
        }
        if !self.effects.is_empty() {
            write!(f, "Effects:  ")?;
            for (i, name) in self.effects.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", name)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
