//! The render-domain side of a controller.
//!
//! A [`RenderSession`] owns the engine and lives inside the audio
//! callback. It talks to the control domain only through two SPSC rings,
//! so a callback never blocks on the controller.

use std::panic::{self, AssertUnwindSafe};

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use sq_engine::{clear, Engine, Frame};

use crate::command::{Command, Telemetry};
use crate::config::SessionConfig;
use crate::error::ControllerError;

pub struct RenderSession {
    engine: Engine,
    commands: HeapCons<Command>,
    telemetry: HeapProd<Telemetry>,
    last_row: Option<(u16, u16)>,
    finished_reported: bool,
}

/// Control-domain end of a [`RenderSession`].
pub struct SessionHandle {
    commands: HeapProd<Command>,
    telemetry: HeapCons<Telemetry>,
}

impl RenderSession {
    pub fn new(engine: Engine, config: SessionConfig) -> (Self, SessionHandle) {
        let (cmd_prod, cmd_cons) = HeapRb::new(config.command_capacity.max(1)).split();
        let (tel_prod, tel_cons) = HeapRb::new(config.telemetry_capacity.max(1)).split();
        let session = Self {
            engine,
            commands: cmd_cons,
            telemetry: tel_prod,
            last_row: None,
            finished_reported: false,
        };
        let handle = SessionHandle {
            commands: cmd_prod,
            telemetry: tel_cons,
        };
        (session, handle)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Render one callback's worth of audio.
    pub fn process(&mut self, out: &mut [Frame]) {
        while let Some(command) = self.commands.try_pop() {
            self.apply(command);
        }

        let engine = &mut self.engine;
        let rendered = panic::catch_unwind(AssertUnwindSafe(|| engine.render(out)));
        if rendered.is_err() {
            clear(out);
            self.report(Telemetry::BlockDropped);
            return;
        }

        self.collect_telemetry();
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Play => self.engine.play(),
            Command::Stop => {
                self.engine.stop();
                self.last_row = None;
                self.finished_reported = false;
            }
            Command::SetTempo(bpm) => self.engine.set_tempo(bpm),
            Command::SetStereoMode(mode) => self.engine.set_stereo_mode(mode),
            Command::SetStereoAmount(percent) => self.engine.set_stereo_percent(percent),
            Command::SelectSubsong(index) => {
                // The controller checks the index before sending
                if self.engine.select_subsong(index).is_ok() {
                    self.last_row = None;
                    self.finished_reported = false;
                }
            }
            Command::SetLooping(looping) => self.engine.set_looping(looping),
        }
    }

    fn collect_telemetry(&mut self) {
        while let Some(diagnostic) = self.engine.pop_diagnostic() {
            self.report(Telemetry::Diagnostic(diagnostic));
        }
        if !self.engine.is_playing() {
            return;
        }
        let position = self.engine.position();
        let row = (position.order, position.row);
        if self.last_row != Some(row) {
            self.last_row = Some(row);
            self.report(Telemetry::Position(position));
        }
        if self.engine.is_finished() && !self.finished_reported {
            self.finished_reported = true;
            self.report(Telemetry::Finished);
        }
    }

    fn report(&mut self, telemetry: Telemetry) {
        // A full ring means nobody is polling; drop rather than wait
        let _ = self.telemetry.try_push(telemetry);
    }
}

impl SessionHandle {
    pub fn send(&mut self, command: Command) -> Result<(), ControllerError> {
        self.commands
            .try_push(command)
            .map_err(|_| ControllerError::CommandQueueFull)
    }

    pub fn poll(&mut self) -> Option<Telemetry> {
        self.telemetry.try_pop()
    }
}
