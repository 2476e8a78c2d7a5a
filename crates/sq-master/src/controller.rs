//! The transport control surface.

use std::collections::VecDeque;
use std::sync::Arc;

use sq_audio::{AudioOutput, ManualOutput};
use sq_bridge::{BridgeConfig, BridgeEvent, ModuleBridge};
use sq_engine::{Engine, EngineConfig, Frame, PlaybackPosition, StereoGainMatrix, StereoMode};
use sq_ir::{DelegatedModule, Song};
use tracing::{debug, warn};

use crate::command::{Command, Telemetry};
use crate::config::SessionConfig;
use crate::error::{ControllerError, Result};
use crate::registry::ModuleRegistry;
use crate::session::{RenderSession, SessionHandle};
use crate::wav;

/// Owns a song and drives its playback through an audio output.
///
/// Everything here runs in the control domain. The engine itself lives
/// in a [`RenderSession`] inside the output's render callback and is only
/// reached through commands.
pub struct Controller<O: AudioOutput = ManualOutput> {
    config: EngineConfig,
    session_config: SessionConfig,
    registry: ModuleRegistry,
    output: O,
    song: Option<Arc<Song>>,
    handle: Option<SessionHandle>,
    bridge: Option<ModuleBridge>,
    pending: VecDeque<Telemetry>,
    position: PlaybackPosition,
    playing: bool,
    finished: bool,
}

impl Controller<ManualOutput> {
    /// A headless controller. Audio is pulled through
    /// [`output_mut`](Controller::output_mut) or rendered offline.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_output(config, ManualOutput::new(config.sample_rate, config.block_size))
    }
}

impl<O: AudioOutput> Controller<O> {
    /// Play through `output`. The engine runs at the output's sample rate.
    pub fn with_output(mut config: EngineConfig, output: O) -> Self {
        config.sample_rate = output.sample_rate();
        Self {
            config,
            session_config: SessionConfig::default(),
            registry: ModuleRegistry::new(),
            output,
            song: None,
            handle: None,
            bridge: None,
            pending: VecDeque::new(),
            position: PlaybackPosition::default(),
            playing: false,
            finished: false,
        }
    }

    pub fn with_session_config(mut self, session_config: SessionConfig) -> Self {
        self.session_config = session_config;
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn song(&self) -> Option<&Song> {
        self.song.as_deref()
    }

    pub fn registry_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.registry
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    // --- Song management ---

    /// Validate and load a song, replacing the current one. Playback
    /// does not start until [`play`](Self::play).
    pub fn load_song(&mut self, song: Song) -> Result<()> {
        self.unload()?;
        song.validate()?;
        let song = Arc::new(song);
        let mut engine = Engine::with_config(Arc::clone(&song), &self.config);

        let bridge = match &song.delegate {
            Some(module) => {
                let replay = self.registry.create(module.kind.as_str())?;
                let config = BridgeConfig::with_sample_rate(self.config.sample_rate);
                let (mut bridge, output) = ModuleBridge::spawn(replay, config)?;
                bridge.load(Arc::clone(&module.binary))?;
                engine.attach_source(Box::new(output));
                Some(bridge)
            }
            None => None,
        };

        let (mut session, handle) = RenderSession::new(engine, self.session_config);
        self.output
            .start(Box::new(move |out: &mut [Frame]| session.process(out)))?;

        debug!(
            title = %song.title,
            channels = song.channel_count(),
            delegated = bridge.is_some(),
            "song loaded"
        );
        self.song = Some(song);
        self.handle = Some(handle);
        self.bridge = bridge;
        Ok(())
    }

    /// Load a module file played entirely by the replay module registered
    /// for `kind`.
    pub fn load_module(&mut self, kind: &str, binary: impl Into<Arc<[u8]>>) -> Result<()> {
        let song = Song::delegated(kind, DelegatedModule::new(kind, binary));
        self.load_song(song)
    }

    /// Stop playback and release the song, its session and any module.
    pub fn unload(&mut self) -> Result<()> {
        self.output.stop()?;
        self.handle = None;
        if let Some(mut bridge) = self.bridge.take() {
            bridge.dispose();
        }
        self.song = None;
        self.pending.clear();
        self.position = PlaybackPosition::default();
        self.playing = false;
        self.finished = false;
        Ok(())
    }

    // --- Transport ---

    pub fn play(&mut self) -> Result<()> {
        if self.handle.is_none() {
            return Err(ControllerError::NoSong);
        }
        if self.finished {
            self.stop()?;
        }
        if self.playing {
            return Ok(());
        }
        self.send(Command::Play)?;
        if let Some(bridge) = self.bridge.as_mut() {
            bridge.play()?;
        }
        self.playing = true;
        debug!("playback started");
        Ok(())
    }

    /// Stop and rewind. Valid at any time.
    pub fn stop(&mut self) -> Result<()> {
        if self.handle.is_some() {
            self.send(Command::Stop)?;
        }
        if let Some(bridge) = self.bridge.as_mut() {
            bridge.stop()?;
        }
        if self.playing {
            debug!("playback stopped");
        }
        self.playing = false;
        self.finished = false;
        self.position = PlaybackPosition::default();
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.playing && !self.finished
    }

    /// True once a one-shot song or a module has played to its end.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Tempo in BPM, replacing the song's own from now on.
    pub fn set_tempo(&mut self, bpm: u16) -> Result<()> {
        self.config.tempo = Some(bpm);
        self.send_if_loaded(Command::SetTempo(bpm))
    }

    pub fn set_looping(&mut self, looping: bool) -> Result<()> {
        self.config.looping = looping;
        self.send_if_loaded(Command::SetLooping(looping))
    }

    pub fn set_stereo_separation_mode(&mut self, mode: StereoMode) -> Result<()> {
        self.config.stereo_mode = mode;
        self.send_if_loaded(Command::SetStereoMode(mode))
    }

    /// Separation in percent: 0 is mono, 100 leaves the mix untouched.
    pub fn set_stereo_separation_amount(&mut self, percent: u16) -> Result<()> {
        self.config.stereo_percent = percent;
        self.send_if_loaded(Command::SetStereoAmount(percent))
    }

    /// Gains the post-mix stage applies with the current settings.
    pub fn stereo_gains(&self) -> StereoGainMatrix {
        StereoGainMatrix::from_mode(self.config.stereo_mode, self.config.stereo_percent)
    }

    pub fn select_subsong(&mut self, index: usize) -> Result<()> {
        let song = self.song.as_ref().ok_or(ControllerError::NoSong)?;
        match self.bridge.as_mut() {
            Some(bridge) => {
                let index = u32::try_from(index).map_err(|_| ControllerError::NoSuchSubsong(index))?;
                bridge.seek_subsong(index)?;
            }
            None => {
                if index >= song.subsong_count() {
                    return Err(ControllerError::NoSuchSubsong(index));
                }
                self.send(Command::SelectSubsong(index))?;
            }
        }
        self.finished = false;
        self.position = PlaybackPosition::default();
        Ok(())
    }

    // --- Telemetry ---

    /// Latest reported playback position.
    pub fn position(&mut self) -> PlaybackPosition {
        self.pump();
        self.position
    }

    /// Next telemetry item from the render domain or the replay module.
    pub fn poll(&mut self) -> Option<Telemetry> {
        self.pump();
        self.pending.pop_front()
    }

    fn pump(&mut self) {
        let mut incoming = Vec::new();
        if let Some(handle) = self.handle.as_mut() {
            incoming.extend(std::iter::from_fn(|| handle.poll()));
        }
        if let Some(bridge) = self.bridge.as_mut() {
            incoming.extend(std::iter::from_fn(|| bridge.poll()).map(Telemetry::Module));
        }
        for telemetry in incoming {
            self.observe(&telemetry);
            if self.pending.len() >= self.session_config.telemetry_capacity {
                self.pending.pop_front();
            }
            self.pending.push_back(telemetry);
        }
    }

    fn observe(&mut self, telemetry: &Telemetry) {
        match telemetry {
            Telemetry::Position(position) => self.position = *position,
            Telemetry::Finished | Telemetry::Module(BridgeEvent::Ended) => {
                debug!("song finished");
                self.finished = true;
            }
            Telemetry::Diagnostic(diagnostic) => warn!(?diagnostic, "channel problem"),
            Telemetry::BlockDropped => warn!("render callback panicked, block dropped"),
            Telemetry::Module(BridgeEvent::Position(p)) => {
                self.position = PlaybackPosition {
                    order: p.order,
                    row: p.row,
                    tick: 0,
                };
            }
            Telemetry::Module(BridgeEvent::Error { .. }) => self.playing = false,
            Telemetry::Module(BridgeEvent::Ready) => {}
        }
    }

    fn send(&mut self, command: Command) -> Result<()> {
        let handle = self.handle.as_mut().ok_or(ControllerError::NoSong)?;
        handle.send(command).inspect_err(|_| warn!(?command, "render command dropped"))
    }

    fn send_if_loaded(&mut self, command: Command) -> Result<()> {
        match self.handle {
            Some(_) => self.send(command),
            None => Ok(()),
        }
    }

    // --- Offline rendering ---

    /// Render the loaded song once from the top, up to `max_frames`.
    /// Independent of the live session.
    pub fn render_frames(&self, max_frames: usize) -> Result<Vec<Frame>> {
        let song = self.song.as_ref().ok_or(ControllerError::NoSong)?;
        let mut frames = match &song.delegate {
            Some(module) => self.render_module(module, max_frames)?,
            None => self.render_song(song, max_frames),
        };
        frames.truncate(max_frames);
        Ok(frames)
    }

    pub fn render_to_wav(&self, max_seconds: u32) -> Result<Vec<u8>> {
        let max_frames = self.config.sample_rate as usize * max_seconds as usize;
        let frames = self.render_frames(max_frames)?;
        Ok(wav::frames_to_wav(&frames, self.config.sample_rate)?)
    }

    fn render_song(&self, song: &Arc<Song>, max_frames: usize) -> Vec<Frame> {
        let config = EngineConfig {
            looping: false,
            ..self.config
        };
        let mut engine = Engine::with_config(Arc::clone(song), &config);
        engine.play();

        let mut frames = Vec::with_capacity(max_frames);
        let mut block = vec![Frame::silence(); config.block_size.max(1)];
        while !engine.is_finished() && frames.len() < max_frames {
            let n = block.len().min(max_frames - frames.len());
            engine.render(&mut block[..n]);
            frames.extend_from_slice(&block[..n]);
        }
        frames
    }

    /// Drive a fresh replay module synchronously on this thread.
    fn render_module(&self, module: &DelegatedModule, max_frames: usize) -> Result<Vec<Frame>> {
        let mut replay = self.registry.create(module.kind.as_str())?;
        replay.init(self.config.sample_rate)?;
        replay.load(&module.binary)?;

        let frame_len = replay.frame_len().max(1);
        let mut left = vec![0.0; frame_len];
        let mut right = vec![0.0; frame_len];
        let mut frames = Vec::with_capacity(max_frames);
        while !replay.is_song_end() && frames.len() < max_frames {
            let written = replay.decode_frame(&mut left, &mut right)?;
            if written == 0 {
                break;
            }
            frames.extend(
                left[..written]
                    .iter()
                    .zip(&right[..written])
                    .map(|(l, r)| Frame::new(*l, *r)),
            );
        }
        replay.unload();

        self.stereo_gains().apply(&mut frames);
        Ok(frames)
    }
}

impl<O: AudioOutput> Drop for Controller<O> {
    fn drop(&mut self) {
        if let Err(e) = self.unload() {
            warn!(error = %e, "failed to stop audio output");
        }
    }
}

#[cfg(test)]
mod tests {
    use sq_ir::{Cell, Instrument, Pattern, SynthConfig};

    use super::*;

    fn song() -> Song {
        let mut song = Song::with_channels("ctl", 2);
        song.instruments.push(Instrument::synth("lead", SynthConfig::default()));
        let mut pattern = Pattern::new(8, 2);
        *pattern.cell_mut(0, 0) = Cell::note(60, 0);
        *pattern.cell_mut(4, 1) = Cell::note(67, 0);
        song.push_pattern(pattern);
        song
    }

    #[test]
    fn transport_needs_a_song() {
        let mut ctl = Controller::new(EngineConfig::default());
        assert!(matches!(ctl.play(), Err(ControllerError::NoSong)));
        assert!(ctl.stop().is_ok());
        assert!(ctl.set_stereo_separation_amount(50).is_ok());
        assert!(matches!(ctl.select_subsong(0), Err(ControllerError::NoSong)));
    }

    #[test]
    fn invalid_song_is_rejected() {
        let mut ctl = Controller::new(EngineConfig::default());
        let mut bad = song();
        bad.initial_speed = 0;
        assert!(matches!(ctl.load_song(bad), Err(ControllerError::Song(_))));
        assert!(ctl.song().is_none());
    }

    #[test]
    fn play_pull_stop() {
        let mut ctl = Controller::new(EngineConfig::default());
        ctl.load_song(song()).unwrap();
        assert!(ctl.output_mut().pull(64).iter().all(Frame::is_silent));

        ctl.play().unwrap();
        assert!(ctl.is_playing());
        let frames = ctl.output_mut().pull(44100 / 2);
        assert!(frames.iter().any(|f| !f.is_silent()));
        assert_eq!(ctl.position().order, 0);
        assert!(ctl.position().row > 0);

        ctl.stop().unwrap();
        assert!(ctl.output_mut().pull(512).iter().all(Frame::is_silent));
        assert_eq!(ctl.position(), PlaybackPosition::default());
    }

    #[test]
    fn subsong_index_is_checked() {
        let mut ctl = Controller::new(EngineConfig::default());
        ctl.load_song(song()).unwrap();
        assert!(ctl.select_subsong(0).is_ok());
        assert!(matches!(ctl.select_subsong(1), Err(ControllerError::NoSuchSubsong(1))));
    }

    #[test]
    fn unknown_module_kind_fails_load() {
        let mut ctl = Controller::new(EngineConfig::default());
        let err = ctl.load_module("ahx", vec![1u8, 2, 3]).unwrap_err();
        assert!(matches!(err, ControllerError::UnknownModule(_)));
    }

    #[test]
    fn offline_render_stops_at_song_end() {
        let mut ctl = Controller::new(EngineConfig::with_sample_rate(44100));
        ctl.load_song(song()).unwrap();
        let frames = ctl.render_frames(44100 * 10).unwrap();
        // 8 rows of 6 ticks at 882 samples, rounded up to the block size
        let song_len = 8 * 6 * 882;
        assert!(frames.len() >= song_len && frames.len() < song_len + 512);

        let wav = ctl.render_to_wav(1).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
    }
}
