//! Audio frame type.

use core::ops::{Add, AddAssign};

/// A stereo audio frame, nominally in -1.0..1.0.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Frame {
    pub left: f32,
    pub right: f32,
}

impl Frame {
    /// Create a silent frame.
    pub const fn silence() -> Self {
        Self {
            left: 0.0,
            right: 0.0,
        }
    }

    /// Create a mono frame (same value for both channels).
    pub const fn mono(value: f32) -> Self {
        Self {
            left: value,
            right: value,
        }
    }

    pub const fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    /// Mix another frame into this one.
    pub fn mix(&mut self, other: Frame) {
        self.left += other.left;
        self.right += other.right;
    }

    /// Scale both sides by a gain.
    pub fn scaled(self, gain: f32) -> Self {
        Self {
            left: self.left * gain,
            right: self.right * gain,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.left == 0.0 && self.right == 0.0
    }

    /// Convert to 16-bit PCM, clipping out-of-range values.
    pub fn to_i16(self) -> (i16, i16) {
        let conv = |v: f32| (v.clamp(-1.0, 1.0) * 32767.0) as i16;
        (conv(self.left), conv(self.right))
    }
}

impl Add for Frame {
    type Output = Frame;

    fn add(self, rhs: Frame) -> Frame {
        Frame::new(self.left + rhs.left, self.right + rhs.right)
    }
}

impl AddAssign for Frame {
    fn add_assign(&mut self, rhs: Frame) {
        self.mix(rhs);
    }
}

/// Zero a buffer of frames.
pub fn clear(frames: &mut [Frame]) {
    frames.fill(Frame::silence());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix_adds_both_sides() {
        let mut a = Frame::new(0.25, -0.5);
        a.mix(Frame::new(0.25, 0.25));
        assert_eq!(a, Frame::new(0.5, -0.25));
    }

    #[test]
    fn to_i16_clips() {
        assert_eq!(Frame::new(2.0, -2.0).to_i16(), (32767, -32767));
        assert_eq!(Frame::silence().to_i16(), (0, 0));
    }
}
