//! Instrument, synth and envelope types.

use alloc::sync::Arc;
use arrayvec::{ArrayString, ArrayVec};

use crate::sample::Sample;

/// Most points a volume envelope can hold.
pub const MAX_ENVELOPE_POINTS: usize = 16;

/// An instrument definition.
#[derive(Clone, Debug)]
pub struct Instrument {
    /// Instrument name
    pub name: ArrayString<26>,
    /// What produces the sound
    pub kind: InstrumentKind,
    /// Volume a fresh note starts at (0-64)
    pub default_volume: u8,
    /// Volume envelope
    pub envelope: Option<Envelope>,
}

/// The backend behind an instrument.
#[derive(Clone, Debug)]
pub enum InstrumentKind {
    /// Built-in sample playback
    Sample(Arc<Sample>),
    /// Built-in oscillator voice
    Synth(SynthConfig),
    /// Audio comes from an external replay module that plays the whole song
    Delegated(DelegatedModule),
}

impl Instrument {
    fn with_kind(name: &str, kind: InstrumentKind) -> Self {
        let mut inst_name = ArrayString::new();
        let _ = inst_name.try_push_str(name);
        Self {
            name: inst_name,
            kind,
            default_volume: 64,
            envelope: None,
        }
    }

    pub fn sample(name: &str, sample: Sample) -> Self {
        Self::with_kind(name, InstrumentKind::Sample(Arc::new(sample)))
    }

    pub fn synth(name: &str, config: SynthConfig) -> Self {
        Self::with_kind(name, InstrumentKind::Synth(config))
    }

    pub fn delegated(name: &str, module: DelegatedModule) -> Self {
        Self::with_kind(name, InstrumentKind::Delegated(module))
    }

    pub fn with_envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = Some(envelope);
        self
    }

    pub fn with_default_volume(mut self, volume: u8) -> Self {
        self.default_volume = volume.min(64);
        self
    }

    /// False for delegated instruments, whose audio arrives through a bridge.
    pub fn produces_audio_on_note_on(&self) -> bool {
        !matches!(self.kind, InstrumentKind::Delegated(_))
    }

    /// The enabled volume envelope, if any.
    pub fn envelope(&self) -> Option<&Envelope> {
        self.envelope.as_ref().filter(|e| e.enabled)
    }

    /// Loop range of the underlying sample, in frames.
    pub fn loop_range(&self) -> Option<(u32, u32)> {
        match &self.kind {
            InstrumentKind::Sample(s) if s.has_loop() => Some((s.loop_start, s.loop_end)),
            _ => None,
        }
    }
}

/// Oscillator shape for synth instruments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SynthWaveform {
    #[default]
    Square,
    Saw,
    Triangle,
    Sine,
    Noise,
}

/// Parameters of a built-in synth voice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SynthConfig {
    pub waveform: SynthWaveform,
    /// Duty cycle for the square wave (0.0-1.0)
    pub pulse_width: f32,
    pub attack_ms: f32,
    pub decay_ms: f32,
    /// Sustain level (0.0-1.0)
    pub sustain: f32,
    pub release_ms: f32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            waveform: SynthWaveform::Square,
            pulse_width: 0.5,
            attack_ms: 2.0,
            decay_ms: 80.0,
            sustain: 0.7,
            release_ms: 120.0,
        }
    }
}

impl SynthConfig {
    pub fn with_waveform(waveform: SynthWaveform) -> Self {
        Self {
            waveform,
            ..Self::default()
        }
    }
}

/// A song whose audio is produced by an external replay module.
#[derive(Clone, Debug)]
pub struct DelegatedModule {
    /// Registry key of the module that can play `binary` (e.g. "hively")
    pub kind: ArrayString<16>,
    /// The module file as loaded from disk
    pub binary: Arc<[u8]>,
}

impl DelegatedModule {
    pub fn new(kind: &str, binary: impl Into<Arc<[u8]>>) -> Self {
        let mut k = ArrayString::new();
        let _ = k.try_push_str(kind);
        Self {
            kind: k,
            binary: binary.into(),
        }
    }
}

/// A volume envelope, in 50 Hz envelope ticks.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    /// Envelope points, ordered by tick
    pub points: ArrayVec<EnvelopePoint, MAX_ENVELOPE_POINTS>,
    /// Point index held while the key is down
    pub sustain: Option<u8>,
    /// Is the envelope enabled?
    pub enabled: bool,
}

impl Envelope {
    /// Create a new empty, enabled envelope.
    pub fn new() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Add a point to the envelope. Points past capacity are dropped.
    pub fn add_point(&mut self, tick: u16, value: u8) {
        let _ = self.points.try_push(EnvelopePoint {
            tick,
            value: value.min(64),
        });
    }

    /// Tick of the sustain point, if one is set.
    pub fn sustain_tick(&self) -> Option<u16> {
        self.sustain
            .and_then(|i| self.points.get(i as usize))
            .map(|p| p.tick)
    }

    /// Last tick with a defined value.
    pub fn end_tick(&self) -> u16 {
        self.points.last().map_or(0, |p| p.tick)
    }

    /// Get the interpolated value (0-64) at a given tick.
    pub fn value_at(&self, tick: u16) -> u8 {
        if self.points.is_empty() {
            return 64;
        }

        let mut prev = &self.points[0];
        for point in &self.points {
            if point.tick > tick {
                if point.tick == prev.tick || tick < prev.tick {
                    return prev.value;
                }
                let t = (tick - prev.tick) as i32;
                let d = (point.tick - prev.tick) as i32;
                let v = prev.value as i32 + (point.value as i32 - prev.value as i32) * t / d;
                return v as u8;
            }
            prev = point;
        }

        prev.value
    }
}

/// A point in an envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvelopePoint {
    /// Tick position
    pub tick: u16,
    /// Value (0-64)
    pub value: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_interpolation() {
        let mut env = Envelope::new();
        env.add_point(0, 64);
        env.add_point(100, 0);

        assert_eq!(env.value_at(0), 64);
        assert_eq!(env.value_at(50), 32);
        assert_eq!(env.value_at(100), 0);
        assert_eq!(env.value_at(200), 0); // Past end
    }

    #[test]
    fn empty_envelope_is_full_volume() {
        assert_eq!(Envelope::new().value_at(10), 64);
    }

    #[test]
    fn envelope_capacity_is_bounded() {
        let mut env = Envelope::new();
        for i in 0..40 {
            env.add_point(i, 10);
        }
        assert_eq!(env.points.len(), MAX_ENVELOPE_POINTS);
    }

    #[test]
    fn sustain_tick_resolves_point() {
        let mut env = Envelope::new();
        env.add_point(0, 0);
        env.add_point(8, 64);
        env.add_point(30, 20);
        env.sustain = Some(1);
        assert_eq!(env.sustain_tick(), Some(8));
        assert_eq!(env.end_tick(), 30);
    }

    #[test]
    fn delegated_instruments_are_silent_locally() {
        let module = DelegatedModule::new("hively", alloc::vec![1u8, 2, 3]);
        let inst = Instrument::delegated("tune", module);
        assert!(!inst.produces_audio_on_note_on());
        assert!(Instrument::synth("lead", SynthConfig::default()).produces_audio_on_note_on());
    }

    #[test]
    fn loop_range_only_for_looped_samples() {
        let looped = Sample::from_i8("s", alloc::vec![0; 32]).with_loop(4, 20);
        assert_eq!(Instrument::sample("a", looped).loop_range(), Some((4, 20)));
        let oneshot = Sample::from_i8("s", alloc::vec![0; 32]);
        assert_eq!(Instrument::sample("b", oneshot).loop_range(), None);
    }
}
