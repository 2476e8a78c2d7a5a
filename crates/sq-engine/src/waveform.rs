//! Vibrato and tremolo waveforms.
//!
//! Positions run 0..64 per cycle. Values span -255..=255 and are scaled
//! by the effect depth by the caller.

/// Half-cycle sine used by vibrato and tremolo.
const SINE_TABLE: [u8; 32] = [
    0, 24, 49, 74, 97, 120, 141, 161, 180, 197, 212, 224, 235, 244, 250, 253,
    255, 253, 250, 244, 235, 224, 212, 197, 180, 161, 141, 120, 97, 74, 49, 24,
];

/// Waveform selector bit that keeps the phase running across new notes.
pub const NO_RETRIGGER: u8 = 4;

/// Sample a waveform at `position` (0-63).
///
/// Waveform 0 = sine, 1 = ramp down, 2 = square, 3 = random.
pub fn waveform_value(waveform: u8, position: u8) -> i16 {
    let pos = (position & 63) as usize;
    match waveform & 3 {
        0 => {
            let v = SINE_TABLE[pos & 31] as i16;
            if pos < 32 {
                v
            } else {
                -v
            }
        }
        1 => 255 - (pos as i16 * 510 / 63),
        2 => {
            if pos < 32 {
                255
            } else {
                -255
            }
        }
        _ => pseudo_random(pos as u8),
    }
}

/// Advance a phase position by `speed`, wrapping at 64.
pub fn advance(position: u8, speed: u8) -> u8 {
    position.wrapping_add(speed) & 63
}

fn pseudo_random(seed: u8) -> i16 {
    let mut x = seed as u32 ^ 0x9E37_79B9;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    (x % 511) as i16 - 255
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_is_antisymmetric() {
        for pos in 0..32u8 {
            assert_eq!(waveform_value(0, pos), -waveform_value(0, pos + 32));
        }
        assert_eq!(waveform_value(0, 16), 255);
    }

    #[test]
    fn ramp_runs_downward() {
        assert_eq!(waveform_value(1, 0), 255);
        assert!(waveform_value(1, 32) < 0);
        assert!(waveform_value(1, 63) >= -255);
    }

    #[test]
    fn square_halves() {
        assert_eq!(waveform_value(2, 5), 255);
        assert_eq!(waveform_value(2, 40), -255);
    }

    #[test]
    fn random_stays_in_range() {
        for pos in 0..64u8 {
            let v = waveform_value(3, pos);
            assert!((-255..=255).contains(&v));
        }
    }

    #[test]
    fn no_retrigger_flag_does_not_change_shape() {
        assert_eq!(waveform_value(NO_RETRIGGER, 8), waveform_value(0, 8));
    }

    #[test]
    fn advance_wraps() {
        assert_eq!(advance(60, 8), 4);
    }
}
