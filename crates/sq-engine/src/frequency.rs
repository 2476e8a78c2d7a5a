//! Pitch conversion.
//!
//! All pitch state lives in Amiga periods, so slides, vibrato and
//! portamento behave the same for sample and synth voices. A period
//! becomes a 16.16 sample increment for sample playback or a frequency in
//! Hz for oscillators.

/// Amiga period of the reference note (note 48, C-2 in Amiga notation).
const REFERENCE_PERIOD: u32 = 428;

/// Oscillator frequency of the reference note (middle C).
pub const SYNTH_REFERENCE_HZ: f32 = 261.625_58;

/// Lowest allowed period (highest pitch, B-3 in Amiga notation).
pub const PERIOD_MIN: u16 = 113;

/// Highest allowed period (lowest pitch, C-1 in Amiga notation).
pub const PERIOD_MAX: u16 = 856;

/// Base periods for the lowest octave (notes 36-47, C-1 to B-1 in Amiga notation).
const BASE_PERIODS: [u16; 12] = [
    856, 808, 762, 720, 678, 640, 604, 570, 538, 508, 480, 453,
];

/// Convert a note to an Amiga period value.
///
/// Note 36 = C-1 (period 856), note 48 = C-2 (period 428), note 60 = C-3 (period 214).
/// Returns 0 for note 0 (no note).
pub fn note_to_period(note: u8) -> u16 {
    if note == 0 {
        return 0;
    }
    let offset = note as i16 - 36;
    let semitone = offset.rem_euclid(12) as usize;
    let octave = offset.div_euclid(12);
    let base = BASE_PERIODS[semitone] as u32;
    if octave >= 0 {
        (base >> octave as u32).max(1) as u16
    } else {
        (base << (-octave) as u32).min(u16::MAX as u32) as u16
    }
}

/// Convert an Amiga period + c4_speed to a 16.16 fixed-point increment.
///
/// Formula: freq = c4_speed * 428 / period, then increment = freq * 65536 / sample_rate.
pub fn period_to_increment(period: u16, c4_speed: u32, sample_rate: u32) -> u32 {
    if period == 0 || sample_rate == 0 {
        return 0;
    }
    let freq = (c4_speed as u64 * REFERENCE_PERIOD as u64) / period as u64;
    ((freq * 65536) / sample_rate as u64) as u32
}

/// Oscillator frequency for a period.
pub fn period_to_hz(period: u16) -> f32 {
    if period == 0 {
        return 0.0;
    }
    SYNTH_REFERENCE_HZ * REFERENCE_PERIOD as f32 / period as f32
}

/// Clamp a period to the playable range.
pub fn clamp_period(period: i32) -> u16 {
    period.clamp(PERIOD_MIN as i32, PERIOD_MAX as i32) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    const C4_SPEED: u32 = 8363;
    const SAMPLE_RATE: u32 = 44100;

    #[test]
    fn note_to_period_octaves() {
        assert_eq!(note_to_period(36), 856); // C-1
        assert_eq!(note_to_period(48), 428); // C-2
        assert_eq!(note_to_period(60), 214); // C-3
        assert_eq!(note_to_period(71), 113); // B-3 = PERIOD_MIN
    }

    #[test]
    fn note_to_period_sharp_notes() {
        assert_eq!(note_to_period(37), 808); // C#-1
        assert_eq!(note_to_period(49), 404); // C#-2
    }

    #[test]
    fn note_to_period_below_table_doubles() {
        assert_eq!(note_to_period(24), 1712);
    }

    #[test]
    fn note_to_period_zero_returns_zero() {
        assert_eq!(note_to_period(0), 0);
    }

    #[test]
    fn period_to_increment_at_reference() {
        // period 428 at c4_speed 8363 plays the sample at its own rate
        let inc = period_to_increment(428, C4_SPEED, SAMPLE_RATE);
        let expected = (C4_SPEED as u64 * 65536 / SAMPLE_RATE as u64) as u32;
        assert_eq!(inc, expected);
    }

    #[test]
    fn period_to_increment_octave_up_doubles() {
        let base = period_to_increment(428, C4_SPEED, SAMPLE_RATE);
        let octave_up = period_to_increment(214, C4_SPEED, SAMPLE_RATE);
        assert_eq!(octave_up, base * 2);
    }

    #[test]
    fn different_sample_rate_scales_inversely() {
        let inc_44100 = period_to_increment(428, C4_SPEED, 44100);
        let inc_22050 = period_to_increment(428, C4_SPEED, 22050);
        assert_eq!(inc_22050, inc_44100 * 2);
    }

    #[test]
    fn period_to_increment_degenerate_inputs() {
        assert_eq!(period_to_increment(0, C4_SPEED, SAMPLE_RATE), 0);
        assert_eq!(period_to_increment(428, C4_SPEED, 0), 0);
    }

    #[test]
    fn period_to_hz_reference_and_octave() {
        assert!((period_to_hz(428) - SYNTH_REFERENCE_HZ).abs() < 1e-3);
        assert!((period_to_hz(214) - SYNTH_REFERENCE_HZ * 2.0).abs() < 1e-2);
        assert_eq!(period_to_hz(0), 0.0);
    }

    #[test]
    fn clamp_period_bounds() {
        assert_eq!(clamp_period(428), 428);
        assert_eq!(clamp_period(50), PERIOD_MIN);
        assert_eq!(clamp_period(1000), PERIOD_MAX);
        assert_eq!(clamp_period(-5), PERIOD_MIN);
    }
}
