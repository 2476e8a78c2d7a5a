//! Stereo separation applied to the summed mix.

use crate::frame::Frame;

/// How a separation percentage is interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StereoMode {
    /// ProTracker 2 style: 0-100%, can only narrow the hard-panned field
    Pt2,
    /// 0-200%: mono through identity to widened
    #[default]
    Imaging,
}

impl StereoMode {
    pub fn max_percent(self) -> u16 {
        match self {
            StereoMode::Pt2 => 100,
            StereoMode::Imaging => 200,
        }
    }

    /// Separation factor for a percentage, clamped to the mode's range.
    pub fn separation(self, percent: u16) -> f32 {
        percent.min(self.max_percent()) as f32 / 100.0
    }
}

/// A 2x2 gain matrix. `L' = L*ll + R*rl`, `R' = L*lr + R*rr`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StereoGainMatrix {
    pub ll: f32,
    pub lr: f32,
    pub rl: f32,
    pub rr: f32,
}

impl Default for StereoGainMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl StereoGainMatrix {
    pub const IDENTITY: Self = Self {
        ll: 1.0,
        lr: 0.0,
        rl: 0.0,
        rr: 1.0,
    };

    /// Gains for separation `p`: 0 = mono, 1 = unchanged, 2 = widest.
    /// Non-finite input yields the identity.
    pub fn from_separation(p: f32) -> Self {
        if !p.is_finite() {
            return Self::IDENTITY;
        }
        let f = p.clamp(0.0, 2.0);
        let direct = (1.0 + f) / 2.0;
        let cross = (1.0 - f) / 2.0;
        Self {
            ll: direct,
            lr: cross,
            rl: cross,
            rr: direct,
        }
    }

    pub fn from_mode(mode: StereoMode, percent: u16) -> Self {
        Self::from_separation(mode.separation(percent))
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Apply in place. The identity leaves the buffer untouched.
    pub fn apply(&self, frames: &mut [Frame]) {
        if self.is_identity() {
            return;
        }
        for frame in frames {
            let (l, r) = (frame.left, frame.right);
            frame.left = l * self.ll + r * self.rl;
            frame.right = l * self.lr + r * self.rr;
        }
    }
}
