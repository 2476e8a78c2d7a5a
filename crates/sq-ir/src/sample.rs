//! Sample data types.

use alloc::vec::Vec;
use arrayvec::ArrayString;

/// A sample definition.
#[derive(Clone, Debug)]
pub struct Sample {
    /// Sample name
    pub name: ArrayString<26>,
    /// Audio data
    pub data: SampleData,
    /// Loop start position (in frames)
    pub loop_start: u32,
    /// Loop end position (in frames, exclusive)
    pub loop_end: u32,
    /// Loop type
    pub loop_type: LoopType,
    /// Frequency of C-2 (period 428) in Hz, 8363 for Amiga samples
    pub c4_speed: u32,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            data: SampleData::Mono8(Vec::new()),
            loop_start: 0,
            loop_end: 0,
            loop_type: LoopType::None,
            c4_speed: 8363,
        }
    }
}

impl Sample {
    /// Create a new empty sample.
    pub fn new(name: &str) -> Self {
        let mut sample = Self::default();
        let _ = sample.name.try_push_str(name);
        sample
    }

    /// Create a sample from 8-bit data.
    pub fn from_i8(name: &str, data: Vec<i8>) -> Self {
        let mut sample = Self::new(name);
        sample.data = SampleData::Mono8(data);
        sample
    }

    /// Create a sample from 16-bit data.
    pub fn from_i16(name: &str, data: Vec<i16>) -> Self {
        let mut sample = Self::new(name);
        sample.data = SampleData::Mono16(data);
        sample
    }

    /// Add a forward loop over `start..end`.
    pub fn with_loop(mut self, start: u32, end: u32) -> Self {
        self.loop_start = start;
        self.loop_end = end.min(self.len() as u32);
        self.loop_type = LoopType::Forward;
        self
    }

    /// Get the length of the sample in frames.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the sample has no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if the sample has a loop.
    pub fn has_loop(&self) -> bool {
        self.loop_type != LoopType::None && self.loop_end > self.loop_start
    }
}

/// Mono sample audio data.
#[derive(Clone, Debug)]
pub enum SampleData {
    /// 8-bit samples
    Mono8(Vec<i8>),
    /// 16-bit samples
    Mono16(Vec<i16>),
}

impl SampleData {
    /// Get the number of sample frames.
    pub fn len(&self) -> usize {
        match self {
            SampleData::Mono8(v) => v.len(),
            SampleData::Mono16(v) => v.len(),
        }
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get a sample value at position (as i16). Out of range reads are silent.
    pub fn get(&self, pos: usize) -> i16 {
        match self {
            SampleData::Mono8(v) => v.get(pos).copied().unwrap_or(0) as i16 * 256,
            SampleData::Mono16(v) => v.get(pos).copied().unwrap_or(0),
        }
    }

    /// Get a linearly interpolated sample value, normalized to -1.0..1.0.
    ///
    /// `pos_fixed` is a 16.16 fixed-point position. Blends between the two
    /// nearest sample values using the fractional part.
    pub fn get_interpolated(&self, pos_fixed: u64) -> f32 {
        let idx = (pos_fixed >> 16) as usize;
        let frac = (pos_fixed & 0xFFFF) as f32 / 65536.0;

        let a = self.get(idx) as f32;
        let b = self.get(idx + 1) as f32;

        (a + (b - a) * frac) / 32768.0
    }
}

/// Sample loop type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopType {
    /// No loop
    #[default]
    None,
    /// Forward loop
    Forward,
    /// Ping-pong (bidirectional) loop
    PingPong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolated_at_integer_matches_nearest() {
        let data = SampleData::Mono8(alloc::vec![0, 100, -50, 30]);
        let expected = data.get(1) as f32 / 32768.0;
        assert_eq!(data.get_interpolated(1 << 16), expected);
    }

    #[test]
    fn interpolated_halfway() {
        let data = SampleData::Mono16(alloc::vec![0, 1000]);
        let mid = data.get_interpolated(1 << 15);
        assert!((mid - 500.0 / 32768.0).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_reads_silence() {
        let data = SampleData::Mono16(alloc::vec![1, 2]);
        assert_eq!(data.get(7), 0);
    }

    #[test]
    fn loop_end_clamped_to_length() {
        let sample = Sample::from_i8("s", alloc::vec![0; 10]).with_loop(2, 50);
        assert_eq!(sample.loop_end, 10);
        assert!(sample.has_loop());
    }
}
