//! Effect column commands.
//!
//! The encoding follows ProTracker: a command nibble (0x0-0xF) and a
//! parameter byte. [`Effect::decode`] turns the raw pair into the typed
//! command the engine works with.

/// Effect column command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Effect {
    #[default]
    None,

    // === Pitch ===
    /// Arpeggio: cycle between note, note+x, note+y each tick
    Arpeggio { x: u8, y: u8 },
    /// Slide pitch up by amount per tick (0 = reuse last)
    PortaUp(u8),
    /// Slide pitch down by amount per tick (0 = reuse last)
    PortaDown(u8),
    /// Slide toward the cell's note (0 = reuse last speed)
    TonePorta(u8),
    /// Vibrato with speed and depth (0 = reuse last)
    Vibrato { speed: u8, depth: u8 },
    /// Tone portamento continues + volume slide
    TonePortaVolSlide(i8),
    /// Vibrato continues + volume slide
    VibratoVolSlide(i8),

    // === Volume & panning ===
    /// Tremolo (volume oscillation)
    Tremolo { speed: u8, depth: u8 },
    /// Set channel panning (0-255, 128 = center)
    SetPan(u8),
    /// Start the sample at an offset (in 256-frame units)
    SampleOffset(u8),
    /// Volume slide up/down per tick (0 = reuse last)
    VolumeSlide(i8),
    /// Set channel volume (0-64)
    SetVolume(u8),

    // === Flow control ===
    /// Jump to order position
    PositionJump(u8),
    /// Break to row in next pattern
    PatternBreak(u8),
    /// Pattern loop (0 = set start, n = loop n times)
    PatternLoop(u8),
    /// Repeat the current row n extra times
    PatternDelay(u8),

    // === Extended (Exx) ===
    /// Fine porta up (once per row)
    FinePortaUp(u8),
    /// Fine porta down (once per row)
    FinePortaDown(u8),
    /// Set vibrato waveform (0=sine, 1=ramp, 2=square, 3=random; +4 = no retrig)
    SetVibratoWaveform(u8),
    /// Set finetune (-8 to +7)
    SetFinetune(i8),
    /// Set tremolo waveform
    SetTremoloWaveform(u8),
    /// Set coarse panning position (0-15)
    SetPanPosition(u8),
    /// Retrigger note every n ticks
    RetriggerNote(u8),
    /// Fine volume slide up (once per row)
    FineVolumeSlideUp(u8),
    /// Fine volume slide down (once per row)
    FineVolumeSlideDown(u8),
    /// Cut note after n ticks
    NoteCut(u8),
    /// Delay note by n ticks
    NoteDelay(u8),

    // === Speed & tempo ===
    /// Set ticks per row (speed)
    SetSpeed(u8),
    /// Set BPM tempo
    SetTempo(u8),

    /// Drop every running continuous effect on the channel. Not part of
    /// the ProTracker encoding; editors and generated songs emit it.
    ClearContinuous,
}

impl Effect {
    /// Decode a ProTracker effect command.
    pub fn decode(command: u8, param: u8) -> Self {
        match command {
            0x0 if param != 0 => Effect::Arpeggio {
                x: (param >> 4) & 0x0F,
                y: param & 0x0F,
            },
            0x1 => Effect::PortaUp(param),
            0x2 => Effect::PortaDown(param),
            0x3 => Effect::TonePorta(param),
            0x4 => Effect::Vibrato {
                speed: (param >> 4) & 0x0F,
                depth: param & 0x0F,
            },
            0x5 => Effect::TonePortaVolSlide(param_to_slide(param)),
            0x6 => Effect::VibratoVolSlide(param_to_slide(param)),
            0x7 => Effect::Tremolo {
                speed: (param >> 4) & 0x0F,
                depth: param & 0x0F,
            },
            0x8 => Effect::SetPan(param),
            0x9 => Effect::SampleOffset(param),
            0xA => Effect::VolumeSlide(param_to_slide(param)),
            0xB => Effect::PositionJump(param),
            0xC => Effect::SetVolume(param.min(64)),
            // Break row is stored as BCD
            0xD => Effect::PatternBreak(((param >> 4) * 10 + (param & 0x0F)).min(63)),
            0xE => decode_extended(param),
            0xF => {
                if param < 32 {
                    Effect::SetSpeed(param)
                } else {
                    Effect::SetTempo(param)
                }
            }
            _ => Effect::None,
        }
    }

    /// Returns the variant name as a static string (ignoring parameters).
    pub fn name(&self) -> &'static str {
        match self {
            Effect::None => "None",
            Effect::Arpeggio { .. } => "Arpeggio",
            Effect::PortaUp(_) => "PortaUp",
            Effect::PortaDown(_) => "PortaDown",
            Effect::TonePorta(_) => "TonePorta",
            Effect::Vibrato { .. } => "Vibrato",
            Effect::TonePortaVolSlide(_) => "TonePortaVolSlide",
            Effect::VibratoVolSlide(_) => "VibratoVolSlide",
            Effect::Tremolo { .. } => "Tremolo",
            Effect::SetPan(_) => "SetPan",
            Effect::SampleOffset(_) => "SampleOffset",
            Effect::VolumeSlide(_) => "VolumeSlide",
            Effect::SetVolume(_) => "SetVolume",
            Effect::PositionJump(_) => "PositionJump",
            Effect::PatternBreak(_) => "PatternBreak",
            Effect::PatternLoop(_) => "PatternLoop",
            Effect::PatternDelay(_) => "PatternDelay",
            Effect::FinePortaUp(_) => "FinePortaUp",
            Effect::FinePortaDown(_) => "FinePortaDown",
            Effect::SetVibratoWaveform(_) => "SetVibratoWaveform",
            Effect::SetFinetune(_) => "SetFinetune",
            Effect::SetTremoloWaveform(_) => "SetTremoloWaveform",
            Effect::SetPanPosition(_) => "SetPanPosition",
            Effect::RetriggerNote(_) => "RetriggerNote",
            Effect::FineVolumeSlideUp(_) => "FineVolumeSlideUp",
            Effect::FineVolumeSlideDown(_) => "FineVolumeSlideDown",
            Effect::NoteCut(_) => "NoteCut",
            Effect::NoteDelay(_) => "NoteDelay",
            Effect::SetSpeed(_) => "SetSpeed",
            Effect::SetTempo(_) => "SetTempo",
            Effect::ClearContinuous => "ClearContinuous",
        }
    }

    /// Returns true for commands the sequencer handles instead of the channel.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Effect::SetSpeed(_)
                | Effect::SetTempo(_)
                | Effect::PositionJump(_)
                | Effect::PatternBreak(_)
                | Effect::PatternDelay(_)
        )
    }

    /// Returns true if the note in the same cell is a portamento target
    /// rather than a new attack.
    pub fn is_tone_porta(&self) -> bool {
        matches!(self, Effect::TonePorta(_) | Effect::TonePortaVolSlide(_))
    }
}

fn decode_extended(param: u8) -> Effect {
    let command = (param >> 4) & 0x0F;
    let value = param & 0x0F;

    match command {
        0x1 => Effect::FinePortaUp(value),
        0x2 => Effect::FinePortaDown(value),
        0x4 => Effect::SetVibratoWaveform(value),
        0x5 => Effect::SetFinetune(if value > 7 { value as i8 - 16 } else { value as i8 }),
        0x6 => Effect::PatternLoop(value),
        0x7 => Effect::SetTremoloWaveform(value),
        0x8 => Effect::SetPanPosition(value),
        0x9 => Effect::RetriggerNote(value),
        0xA => Effect::FineVolumeSlideUp(value),
        0xB => Effect::FineVolumeSlideDown(value),
        0xC => Effect::NoteCut(value),
        0xD => Effect::NoteDelay(value),
        0xE => Effect::PatternDelay(value),
        _ => Effect::None,
    }
}

/// Convert a volume slide parameter (up nibble, down nibble) to a signed step.
pub fn param_to_slide(param: u8) -> i8 {
    let up = (param >> 4) & 0x0F;
    let down = param & 0x0F;
    if up > 0 {
        up as i8
    } else {
        -(down as i8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_arpeggio_is_no_effect() {
        assert_eq!(Effect::decode(0x0, 0x00), Effect::None);
        assert_eq!(Effect::decode(0x0, 0x37), Effect::Arpeggio { x: 3, y: 7 });
    }

    #[test]
    fn speed_tempo_split_at_32() {
        assert_eq!(Effect::decode(0xF, 0x1F), Effect::SetSpeed(31));
        assert_eq!(Effect::decode(0xF, 0x20), Effect::SetTempo(32));
    }

    #[test]
    fn pattern_break_is_bcd() {
        assert_eq!(Effect::decode(0xD, 0x16), Effect::PatternBreak(16));
        assert_eq!(Effect::decode(0xD, 0x99), Effect::PatternBreak(63));
    }

    #[test]
    fn volume_slide_prefers_up_nibble() {
        assert_eq!(Effect::decode(0xA, 0x04), Effect::VolumeSlide(-4));
        assert_eq!(Effect::decode(0xA, 0x30), Effect::VolumeSlide(3));
        assert_eq!(Effect::decode(0xA, 0x34), Effect::VolumeSlide(3));
    }

    #[test]
    fn extended_commands() {
        assert_eq!(Effect::decode(0xE, 0xC3), Effect::NoteCut(3));
        assert_eq!(Effect::decode(0xE, 0xD2), Effect::NoteDelay(2));
        assert_eq!(Effect::decode(0xE, 0x5F), Effect::SetFinetune(-1));
        assert_eq!(Effect::decode(0xE, 0x60), Effect::PatternLoop(0));
        assert_eq!(Effect::decode(0xE, 0x00), Effect::None);
    }

    #[test]
    fn set_volume_is_clamped() {
        assert_eq!(Effect::decode(0xC, 0x7F), Effect::SetVolume(64));
    }

    #[test]
    fn transport_commands() {
        assert!(Effect::SetTempo(125).is_transport());
        assert!(Effect::PatternDelay(2).is_transport());
        assert!(!Effect::PatternLoop(2).is_transport());
        assert!(!Effect::VolumeSlide(-4).is_transport());
    }
}
