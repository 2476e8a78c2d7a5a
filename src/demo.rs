//! A short built-in song exercising both voice kinds and common effects.

use sq_ir::{Cell, Effect, Envelope, Instrument, Note, Pattern, Sample, Song, SynthConfig, SynthWaveform};

const ROWS: u16 = 32;

/// Four channels, two patterns: kick and hats, a sliding bass and a
/// vibrato lead.
pub fn demo_song() -> Song {
    let mut song = Song::with_channels("sequent demo", 4);
    song.initial_tempo = 125;
    song.initial_speed = 6;

    song.instruments.push(Instrument::sample("kick", kick_sample()));
    song.instruments.push(
        Instrument::synth("hat", SynthConfig {
            waveform: SynthWaveform::Noise,
            attack_ms: 0.5,
            decay_ms: 40.0,
            sustain: 0.0,
            release_ms: 10.0,
            ..SynthConfig::default()
        })
        .with_default_volume(24),
    );
    song.instruments.push(
        Instrument::synth("bass", SynthConfig {
            waveform: SynthWaveform::Saw,
            sustain: 0.8,
            ..SynthConfig::default()
        })
        .with_default_volume(40),
    );
    song.instruments.push(
        Instrument::synth("lead", SynthConfig {
            pulse_width: 0.3,
            ..SynthConfig::with_waveform(SynthWaveform::Square)
        })
        .with_envelope(lead_envelope())
        .with_default_volume(36),
    );

    let bass_a = [36, 36, 43, 41];
    let bass_b = [39, 39, 46, 43];
    song.push_pattern(pattern(&bass_a, &[60, 63, 67, 65]));
    song.push_pattern(pattern(&bass_b, &[63, 67, 70, 67]));
    song
}

fn pattern(bass: &[u8; 4], lead: &[u8; 4]) -> Pattern {
    let mut p = Pattern::new(ROWS, 4);
    for row in 0..ROWS {
        if row % 4 == 0 {
            *p.cell_mut(row, 0) = Cell::note(48, 0);
        }
        if row % 2 == 1 {
            *p.cell_mut(row, 1) = Cell::note(60, 1);
        }
        if row % 8 == 0 {
            let note = bass[(row / 8) as usize];
            *p.cell_mut(row, 2) = Cell::note(note, 2);
        }
        if row % 8 == 0 {
            let note = lead[(row / 8) as usize];
            *p.cell_mut(row, 3) = Cell::note(note, 3).with_command(0x4, 0x46);
        } else if row % 8 == 6 {
            *p.cell_mut(row, 3) = Cell {
                note: Note::Off,
                ..Cell::empty()
            };
        } else if row % 8 == 3 {
            *p.cell_mut(row, 3) = Cell::empty().with_effect(Effect::Vibrato { speed: 4, depth: 6 });
        }
    }
    // Slide the bass up into the next bar and fade it out
    *p.cell_mut(6, 2) = Cell::empty().with_command(0x1, 0x04);
    *p.cell_mut(ROWS - 2, 2) = Cell::empty().with_command(0xA, 0x04);
    p
}

/// A pitch-dropping sine burst.
fn kick_sample() -> Sample {
    let len = 2400;
    let mut phase = 0.0f32;
    let data = (0..len)
        .map(|i| {
            let t = i as f32 / len as f32;
            let freq = 0.08 * (1.0 - t) + 0.01;
            phase += freq * core::f32::consts::TAU;
            let amp = (1.0 - t) * (1.0 - t);
            (phase.sin() * amp * 127.0) as i8
        })
        .collect();
    Sample::from_i8("kick", data)
}

fn lead_envelope() -> Envelope {
    let mut env = Envelope::new();
    env.add_point(0, 64);
    env.add_point(4, 48);
    env.add_point(20, 40);
    env.add_point(40, 0);
    env.sustain = Some(2);
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_song_is_valid() {
        let song = demo_song();
        assert_eq!(song.validate(), Ok(()));
        let features = sq_ir::analyze(&song);
        assert!(features.missing_instruments.is_empty());
        assert!(features.effects.contains("Vibrato"));
    }
}
