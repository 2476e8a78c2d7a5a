//! Voices: the audio-producing end of a channel.
//!
//! A voice receives note and parameter changes from the dispatcher and
//! renders additively into a frame buffer. The built-in voices never
//! allocate after construction, so they can be switched and triggered
//! from the render callback.

use alloc::sync::Arc;
use sq_ir::{Envelope, Instrument, InstrumentKind, LoopType, Sample, SynthConfig, SynthWaveform};

use crate::error::VoiceError;
use crate::frame::Frame;
use crate::frequency::{note_to_period, period_to_hz, period_to_increment};

/// Envelope tick rate in Hz.
const ENVELOPE_RATE: u32 = 50;

/// Parameters a channel pushes to its voice every tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceParam {
    /// Amiga period; 0 means no pitch
    Period,
    /// Channel volume, 0-64
    Volume,
    /// Panning, -64 (left) to +64 (right)
    Pan,
    /// Restart playback at this many frames into the sample
    SampleOffset,
}

/// An instrument backend for one channel.
pub trait Voice {
    /// Start a note. On error the voice stays silent.
    fn trigger_attack(&mut self, note: u8, velocity: u8, instrument: &Instrument) -> Result<(), VoiceError>;

    /// Key released. Envelopes move past their sustain point.
    fn trigger_release(&mut self, note: u8);

    fn set_param(&mut self, param: VoiceParam, value: f32);

    /// Add this voice's output to `out`.
    fn render(&mut self, out: &mut [Frame]) -> Result<(), VoiceError>;

    fn is_active(&self) -> bool;

    /// Stop immediately and drop per-note state. The voice may be triggered again.
    fn dispose(&mut self);
}

/// Left and right gains for a pan position.
fn pan_gains(pan: i8) -> (f32, f32) {
    let pan = pan.clamp(-64, 64) as f32;
    ((64.0 - pan) / 128.0, (64.0 + pan) / 128.0)
}

/// Volume envelope playback at 50 Hz.
#[derive(Clone, Debug, Default)]
struct EnvelopeRun {
    envelope: Option<Envelope>,
    tick: u16,
    countdown: u32,
    released: bool,
}

impl EnvelopeRun {
    fn start(&mut self, envelope: Option<&Envelope>, sample_rate: u32) {
        self.envelope = envelope.cloned();
        self.tick = 0;
        self.countdown = (sample_rate / ENVELOPE_RATE).max(1);
        self.released = false;
    }

    fn gain(&self) -> f32 {
        match &self.envelope {
            Some(env) => env.value_at(self.tick) as f32 / 64.0,
            None => 1.0,
        }
    }

    /// Step one output frame. Returns false once a released envelope ran out.
    fn step(&mut self, sample_rate: u32) -> bool {
        let Some(env) = &self.envelope else {
            return true;
        };
        self.countdown -= 1;
        if self.countdown == 0 {
            self.countdown = (sample_rate / ENVELOPE_RATE).max(1);
            let held = !self.released && env.sustain_tick() == Some(self.tick);
            if !held && self.tick < env.end_tick() {
                self.tick += 1;
            }
        }
        !(self.released && self.tick >= env.end_tick() && env.value_at(self.tick) == 0)
    }
}

/// Plays a sample instrument with linear interpolation.
#[derive(Clone, Debug)]
pub struct SampleVoice {
    sample_rate: u32,
    sample: Option<Arc<Sample>>,
    /// 16.16 fixed-point position in frames
    position: u64,
    increment: u32,
    forward: bool,
    volume: f32,
    pan: i8,
    envelope: EnvelopeRun,
    playing: bool,
}

impl SampleVoice {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            sample: None,
            position: 0,
            increment: 0,
            forward: true,
            volume: 1.0,
            pan: 0,
            envelope: EnvelopeRun::default(),
            playing: false,
        }
    }

    /// Current position in whole frames.
    pub fn position(&self) -> u32 {
        (self.position >> 16) as u32
    }

    fn set_period(&mut self, period: u16) {
        let c4_speed = self.sample.as_ref().map_or(8363, |s| s.c4_speed);
        self.increment = period_to_increment(period, c4_speed, self.sample_rate);
    }

    fn step_position(&mut self, sample: &Sample) {
        let loop_start = (sample.loop_start as u64) << 16;
        let loop_end = (sample.loop_end as u64) << 16;
        let looping = sample.has_loop() && loop_end > loop_start;

        match (looping, sample.loop_type) {
            (true, LoopType::PingPong) => {
                if self.forward {
                    self.position += self.increment as u64;
                    if self.position >= loop_end {
                        let over = (self.position - loop_end) % (loop_end - loop_start);
                        self.position = loop_end - 1 - over.min(loop_end - loop_start - 1);
                        self.forward = false;
                    }
                } else {
                    let back = self.increment as u64;
                    if self.position < loop_start + back {
                        let under = (loop_start + back - self.position) % (loop_end - loop_start);
                        self.position = loop_start + under;
                        self.forward = true;
                    } else {
                        self.position -= back;
                    }
                }
            }
            (true, _) => {
                self.position += self.increment as u64;
                if self.position >= loop_end {
                    let len = loop_end - loop_start;
                    self.position = loop_start + (self.position - loop_end) % len;
                }
            }
            (false, _) => {
                self.position += self.increment as u64;
                if (self.position >> 16) as usize >= sample.len() {
                    self.playing = false;
                }
            }
        }
    }
}

impl Voice for SampleVoice {
    fn trigger_attack(&mut self, note: u8, velocity: u8, instrument: &Instrument) -> Result<(), VoiceError> {
        let InstrumentKind::Sample(sample) = &instrument.kind else {
            return Err(VoiceError::UnsupportedInstrument);
        };
        if sample.is_empty() {
            self.playing = false;
            return Err(VoiceError::EmptySample);
        }
        self.sample = Some(Arc::clone(sample));
        self.position = 0;
        self.forward = true;
        self.volume = velocity.min(64) as f32 / 64.0;
        self.set_period(note_to_period(note));
        self.envelope.start(instrument.envelope(), self.sample_rate);
        self.playing = true;
        Ok(())
    }

    fn trigger_release(&mut self, _note: u8) {
        if self.envelope.envelope.is_some() {
            self.envelope.released = true;
        } else {
            self.playing = false;
        }
    }

    fn set_param(&mut self, param: VoiceParam, value: f32) {
        match param {
            VoiceParam::Period => self.set_period(value.max(0.0) as u16),
            VoiceParam::Volume => self.volume = value.clamp(0.0, 64.0) / 64.0,
            VoiceParam::Pan => self.pan = value.clamp(-64.0, 64.0) as i8,
            VoiceParam::SampleOffset => {
                let Some(sample) = &self.sample else {
                    return;
                };
                let offset = value.max(0.0) as usize;
                self.forward = true;
                self.envelope.tick = 0;
                self.envelope.released = false;
                self.position = (offset as u64) << 16;
                self.playing = offset < sample.len();
            }
        }
    }

    fn render(&mut self, out: &mut [Frame]) -> Result<(), VoiceError> {
        let Some(sample) = self.sample.clone() else {
            return Ok(());
        };
        let (left, right) = pan_gains(self.pan);

        for frame in out.iter_mut() {
            if !self.playing {
                break;
            }
            let value = sample.data.get_interpolated(self.position) * self.volume * self.envelope.gain();
            frame.left += value * left;
            frame.right += value * right;

            self.step_position(&sample);
            if !self.envelope.step(self.sample_rate) {
                self.playing = false;
            }
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.playing
    }

    fn dispose(&mut self) {
        self.playing = false;
        self.sample = None;
        self.envelope = EnvelopeRun::default();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AdsrStage {
    Attack,
    Decay,
    Sustain,
    Release,
    Idle,
}

/// Oscillator voice with an ADSR amplitude envelope.
#[derive(Clone, Debug)]
pub struct SynthVoice {
    sample_rate: f32,
    config: SynthConfig,
    phase: f32,
    frequency: f32,
    volume: f32,
    pan: i8,
    stage: AdsrStage,
    level: f32,
    noise: u32,
    noise_value: f32,
}

impl SynthVoice {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1) as f32,
            config: SynthConfig::default(),
            phase: 0.0,
            frequency: 0.0,
            volume: 1.0,
            pan: 0,
            stage: AdsrStage::Idle,
            level: 0.0,
            noise: 0x1234_5678,
            noise_value: 0.0,
        }
    }

    /// Per-frame level change for a segment lasting `ms`.
    fn rate(&self, ms: f32) -> f32 {
        let frames = ms * self.sample_rate / 1000.0;
        if frames < 1.0 {
            1.0
        } else {
            1.0 / frames
        }
    }

    fn step_envelope(&mut self) {
        match self.stage {
            AdsrStage::Attack => {
                self.level += self.rate(self.config.attack_ms);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = AdsrStage::Decay;
                }
            }
            AdsrStage::Decay => {
                let sustain = self.config.sustain.clamp(0.0, 1.0);
                self.level -= self.rate(self.config.decay_ms) * (1.0 - sustain);
                if self.level <= sustain {
                    self.level = sustain;
                    self.stage = AdsrStage::Sustain;
                }
            }
            AdsrStage::Sustain => {}
            AdsrStage::Release => {
                self.level -= self.rate(self.config.release_ms);
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = AdsrStage::Idle;
                }
            }
            AdsrStage::Idle => self.level = 0.0,
        }
    }

    fn oscillator(&mut self) -> f32 {
        let phase = self.phase;
        match self.config.waveform {
            SynthWaveform::Square => {
                if phase < self.config.pulse_width.clamp(0.01, 0.99) {
                    1.0
                } else {
                    -1.0
                }
            }
            SynthWaveform::Saw => 2.0 * phase - 1.0,
            SynthWaveform::Triangle => 1.0 - 4.0 * libm::fabsf(phase - 0.5),
            SynthWaveform::Sine => libm::sinf(2.0 * core::f32::consts::PI * phase),
            SynthWaveform::Noise => self.noise_value,
        }
    }

    fn step_phase(&mut self) {
        self.phase += self.frequency / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= libm::floorf(self.phase);
            // Noise holds one random value per cycle so pitch still matters
            self.noise ^= self.noise << 13;
            self.noise ^= self.noise >> 17;
            self.noise ^= self.noise << 5;
            self.noise_value = (self.noise >> 8) as f32 / (1u32 << 23) as f32 - 1.0;
        }
    }
}

impl Voice for SynthVoice {
    fn trigger_attack(&mut self, note: u8, velocity: u8, instrument: &Instrument) -> Result<(), VoiceError> {
        let InstrumentKind::Synth(config) = &instrument.kind else {
            return Err(VoiceError::UnsupportedInstrument);
        };
        self.config = *config;
        self.frequency = period_to_hz(note_to_period(note));
        self.volume = velocity.min(64) as f32 / 64.0;
        self.phase = 0.0;
        self.level = 0.0;
        self.stage = AdsrStage::Attack;
        Ok(())
    }

    fn trigger_release(&mut self, _note: u8) {
        if self.stage != AdsrStage::Idle {
            self.stage = AdsrStage::Release;
        }
    }

    fn set_param(&mut self, param: VoiceParam, value: f32) {
        match param {
            VoiceParam::Period => self.frequency = period_to_hz(value.max(0.0) as u16),
            VoiceParam::Volume => self.volume = value.clamp(0.0, 64.0) / 64.0,
            VoiceParam::Pan => self.pan = value.clamp(-64.0, 64.0) as i8,
            VoiceParam::SampleOffset => {
                self.phase = 0.0;
                self.level = 0.0;
                self.stage = AdsrStage::Attack;
            }
        }
    }

    fn render(&mut self, out: &mut [Frame]) -> Result<(), VoiceError> {
        let (left, right) = pan_gains(self.pan);
        for frame in out.iter_mut() {
            if self.stage == AdsrStage::Idle {
                break;
            }
            let value = self.oscillator() * self.level * self.volume * 0.5;
            frame.left += value * left;
            frame.right += value * right;
            self.step_phase();
            self.step_envelope();
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.stage != AdsrStage::Idle
    }

    fn dispose(&mut self) {
        self.stage = AdsrStage::Idle;
        self.level = 0.0;
    }
}

/// The built-in voice a channel currently holds.
#[derive(Clone, Debug)]
pub enum VoiceSlot {
    Silent,
    Sample(SampleVoice),
    Synth(SynthVoice),
}

impl VoiceSlot {
    /// Switch to the voice type that plays `instrument`. Returns false for
    /// instruments without a built-in voice.
    pub fn prepare(&mut self, instrument: &Instrument, sample_rate: u32) -> bool {
        match &instrument.kind {
            InstrumentKind::Sample(_) => {
                if !matches!(self, VoiceSlot::Sample(_)) {
                    *self = VoiceSlot::Sample(SampleVoice::new(sample_rate));
                }
                true
            }
            InstrumentKind::Synth(_) => {
                if !matches!(self, VoiceSlot::Synth(_)) {
                    *self = VoiceSlot::Synth(SynthVoice::new(sample_rate));
                }
                true
            }
            InstrumentKind::Delegated(_) => {
                *self = VoiceSlot::Silent;
                false
            }
        }
    }

    fn voice(&mut self) -> Option<&mut dyn Voice> {
        match self {
            VoiceSlot::Silent => None,
            VoiceSlot::Sample(v) => Some(v as &mut dyn Voice),
            VoiceSlot::Synth(v) => Some(v as &mut dyn Voice),
        }
    }
}

impl Voice for VoiceSlot {
    fn trigger_attack(&mut self, note: u8, velocity: u8, instrument: &Instrument) -> Result<(), VoiceError> {
        match self.voice() {
            Some(v) => v.trigger_attack(note, velocity, instrument),
            None => Err(VoiceError::UnsupportedInstrument),
        }
    }

    fn trigger_release(&mut self, note: u8) {
        if let Some(v) = self.voice() {
            v.trigger_release(note);
        }
    }

    fn set_param(&mut self, param: VoiceParam, value: f32) {
        if let Some(v) = self.voice() {
            v.set_param(param, value);
        }
    }

    fn render(&mut self, out: &mut [Frame]) -> Result<(), VoiceError> {
        match self.voice() {
            Some(v) => v.render(out),
            None => Ok(()),
        }
    }

    fn is_active(&self) -> bool {
        match self {
            VoiceSlot::Silent => false,
            VoiceSlot::Sample(v) => v.is_active(),
            VoiceSlot::Synth(v) => v.is_active(),
        }
    }

    fn dispose(&mut self) {
        if let Some(v) = self.voice() {
            v.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use sq_ir::DelegatedModule;

    fn square_instrument(len: usize) -> Instrument {
        let data: Vec<i8> = (0..len).map(|i| if i % 2 == 0 { 100 } else { -100 }).collect();
        Instrument::sample("square", Sample::from_i8("square", data))
    }

    fn render(voice: &mut dyn Voice, frames: usize) -> Vec<Frame> {
        let mut out = vec![Frame::silence(); frames];
        voice.render(&mut out).unwrap();
        out
    }

    #[test]
    fn sample_voice_plays_after_attack() {
        let mut voice = SampleVoice::new(44100);
        voice.trigger_attack(48, 64, &square_instrument(1000)).unwrap();
        let out = render(&mut voice, 16);
        assert!(out.iter().any(|f| !f.is_silent()));
        assert!(voice.is_active());
    }

    #[test]
    fn sample_voice_rejects_other_kinds() {
        let mut voice = SampleVoice::new(44100);
        let synth = Instrument::synth("s", SynthConfig::default());
        assert_eq!(
            voice.trigger_attack(48, 64, &synth),
            Err(VoiceError::UnsupportedInstrument)
        );
        let empty = Instrument::sample("e", Sample::new("e"));
        assert_eq!(voice.trigger_attack(48, 64, &empty), Err(VoiceError::EmptySample));
        assert!(!voice.is_active());
    }

    #[test]
    fn sample_voice_renders_additively() {
        let mut voice = SampleVoice::new(44100);
        voice.trigger_attack(48, 64, &square_instrument(1000)).unwrap();
        let mut out = vec![Frame::new(0.25, 0.25); 1];
        voice.render(&mut out).unwrap();
        // Sample value 100/128 at full volume, centre pan
        let expected = 0.25 + (100.0 * 256.0 / 32768.0) * 0.5;
        assert!((out[0].left - expected).abs() < 1e-6);
    }

    #[test]
    fn sample_voice_hard_pan() {
        let mut voice = SampleVoice::new(44100);
        voice.trigger_attack(48, 64, &square_instrument(1000)).unwrap();
        voice.set_param(VoiceParam::Pan, -64.0);
        let out = render(&mut voice, 4);
        assert!(out.iter().all(|f| f.right == 0.0));
        assert!(out.iter().any(|f| f.left != 0.0));
    }

    #[test]
    fn sample_voice_stops_at_end() {
        let mut voice = SampleVoice::new(8363);
        voice.trigger_attack(48, 64, &square_instrument(8)).unwrap();
        render(&mut voice, 32);
        assert!(!voice.is_active());
    }

    #[test]
    fn sample_voice_forward_loop_keeps_playing() {
        let sample = Sample::from_i8("loop", vec![10, 20, 30, 40]).with_loop(1, 3);
        let mut voice = SampleVoice::new(8363);
        voice.trigger_attack(48, 64, &Instrument::sample("loop", sample)).unwrap();
        render(&mut voice, 100);
        assert!(voice.is_active());
        assert!((1..3).contains(&voice.position()));
    }

    #[test]
    fn sample_voice_ping_pong_stays_in_loop() {
        let mut sample = Sample::from_i8("pp", vec![0; 16]).with_loop(4, 12);
        sample.loop_type = LoopType::PingPong;
        let mut voice = SampleVoice::new(8363);
        voice.trigger_attack(48, 64, &Instrument::sample("pp", sample)).unwrap();
        for _ in 0..50 {
            render(&mut voice, 1);
            assert!(voice.position() < 12);
        }
        assert!(voice.position() >= 4);
        assert!(voice.is_active());
    }

    #[test]
    fn sample_offset_restarts_from_frame() {
        let mut voice = SampleVoice::new(44100);
        voice.trigger_attack(48, 64, &square_instrument(1000)).unwrap();
        voice.set_param(VoiceParam::SampleOffset, 256.0);
        assert_eq!(voice.position(), 256);
        voice.set_param(VoiceParam::SampleOffset, 5000.0);
        assert!(!voice.is_active());
    }

    #[test]
    fn release_without_envelope_stops_sample() {
        let mut voice = SampleVoice::new(44100);
        voice.trigger_attack(48, 64, &square_instrument(1000)).unwrap();
        voice.trigger_release(48);
        assert!(!voice.is_active());
    }

    #[test]
    fn envelope_holds_at_sustain_until_release() {
        let mut env = Envelope::new();
        env.add_point(0, 64);
        env.add_point(2, 32);
        env.add_point(4, 0);
        env.sustain = Some(1);
        let inst = square_instrument(100_000).with_envelope(env);
        let mut voice = SampleVoice::new(1000);
        voice.trigger_attack(48, 64, &inst).unwrap();
        // 20 frames per envelope tick at 1 kHz
        render(&mut voice, 200);
        assert_eq!(voice.envelope.tick, 2);
        assert!(voice.is_active());
        voice.trigger_release(48);
        render(&mut voice, 200);
        assert!(!voice.is_active());
    }

    #[test]
    fn synth_voice_runs_adsr() {
        let mut voice = SynthVoice::new(44100);
        let config = SynthConfig {
            release_ms: 1.0,
            ..SynthConfig::with_waveform(SynthWaveform::Sine)
        };
        voice.trigger_attack(60, 64, &Instrument::synth("sine", config)).unwrap();
        let out = render(&mut voice, 4410);
        assert!(out.iter().any(|f| f.left.abs() > 0.1));
        voice.trigger_release(60);
        render(&mut voice, 441);
        assert!(!voice.is_active());
    }

    #[test]
    fn synth_waveforms_stay_bounded() {
        for waveform in [
            SynthWaveform::Square,
            SynthWaveform::Saw,
            SynthWaveform::Triangle,
            SynthWaveform::Sine,
            SynthWaveform::Noise,
        ] {
            let mut voice = SynthVoice::new(44100);
            let inst = Instrument::synth("s", SynthConfig::with_waveform(waveform));
            voice.trigger_attack(72, 64, &inst).unwrap();
            let out = render(&mut voice, 2000);
            assert!(out.iter().all(|f| f.left.abs() <= 0.5 && f.right.abs() <= 0.5));
        }
    }

    #[test]
    fn slot_switches_voice_kind() {
        let mut slot = VoiceSlot::Silent;
        assert!(slot.prepare(&square_instrument(10), 44100));
        assert!(matches!(slot, VoiceSlot::Sample(_)));
        assert!(slot.prepare(&Instrument::synth("s", SynthConfig::default()), 44100));
        assert!(matches!(slot, VoiceSlot::Synth(_)));
        let delegated = Instrument::delegated("d", DelegatedModule::new("hively", vec![1u8]));
        assert!(!slot.prepare(&delegated, 44100));
        assert!(matches!(slot, VoiceSlot::Silent));
    }

    #[test]
    fn silent_slot_renders_nothing() {
        let mut slot = VoiceSlot::Silent;
        let out = render(&mut slot, 8);
        assert!(out.iter().all(Frame::is_silent));
        assert!(!slot.is_active());
    }
}
