//! The module thread.
//!
//! Owns the replay module and the producing end of the audio ring. It
//! waits for control messages, and while playing keeps the ring topped
//! up in whole native frames.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use ringbuf::traits::{Observer, Producer};
use ringbuf::HeapProd;
use sq_engine::Frame;
use tracing::{debug, trace, warn};

use crate::module::ReplayModule;
use crate::protocol::{ControlMessage, HostEvent, ModuleMessage, ModulePosition, TaggedFrame};

/// Poll interval while playing; short enough to refill the ring in time.
const PLAYING_POLL: Duration = Duration::from_millis(2);
const IDLE_POLL: Duration = Duration::from_millis(50);

pub(crate) struct ModuleHost {
    module: Box<dyn ReplayModule>,
    control: Receiver<ControlMessage>,
    events: Sender<HostEvent>,
    producer: HeapProd<TaggedFrame>,
    /// Set while the ring is being fed; read by the output's underrun count
    producing: Arc<AtomicBool>,
    active_epoch: u32,
    generation: u32,
    loaded: bool,
    playing: bool,
    subsong: u32,
    left: Vec<f32>,
    right: Vec<f32>,
    last_position: Option<ModulePosition>,
}

impl ModuleHost {
    pub(crate) fn new(
        module: Box<dyn ReplayModule>,
        control: Receiver<ControlMessage>,
        events: Sender<HostEvent>,
        producer: HeapProd<TaggedFrame>,
        producing: Arc<AtomicBool>,
    ) -> Self {
        Self {
            module,
            control,
            events,
            producer,
            producing,
            active_epoch: 0,
            generation: 0,
            loaded: false,
            playing: false,
            subsong: 0,
            left: Vec::new(),
            right: Vec::new(),
            last_position: None,
        }
    }

    pub(crate) fn spawn(mut self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("replay-module".into())
            .spawn(move || self.run())
    }

    fn run(&mut self) {
        debug!("replay module thread started");
        'outer: loop {
            let timeout = if self.playing { PLAYING_POLL } else { IDLE_POLL };
            match self.control.recv_timeout(timeout) {
                Ok(msg) => {
                    if !self.handle(msg) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("control channel closed");
                    break;
                }
            }
            while let Ok(msg) = self.control.try_recv() {
                if !self.handle(msg) {
                    break 'outer;
                }
            }
            if self.playing {
                self.top_up();
            }
        }
        self.set_playing(false);
        self.module.unload();
        debug!("replay module thread finished");
    }

    /// Returns false on shutdown.
    fn handle(&mut self, msg: ControlMessage) -> bool {
        trace!(kind = msg.name(), "module control");
        match msg {
            ControlMessage::Init { sample_rate } => {
                if let Err(e) = self.module.init(sample_rate) {
                    self.send_error(e.to_string());
                }
            }
            ControlMessage::Load { binary, generation } => {
                self.set_playing(false);
                self.generation = generation;
                self.loaded = false;
                match self.module.load(&binary) {
                    Ok(()) => {
                        self.loaded = true;
                        self.subsong = 0;
                        self.last_position = None;
                        let len = self.module.frame_len().max(1);
                        self.left.resize(len, 0.0);
                        self.right.resize(len, 0.0);
                        debug!(bytes = binary.len(), frame_len = len, "module loaded");
                        self.send(ModuleMessage::Ready);
                    }
                    Err(e) => self.send_error(e.to_string()),
                }
            }
            ControlMessage::Play { epoch } => {
                if self.loaded {
                    self.active_epoch = epoch;
                    self.set_playing(true);
                } else {
                    self.send_error("play before load".into());
                }
            }
            ControlMessage::Stop => {
                self.set_playing(false);
                if self.loaded {
                    // Rewind so the next play starts from the top
                    if let Err(e) = self.module.seek_subsong(self.subsong) {
                        self.send_error(e.to_string());
                    }
                }
            }
            ControlMessage::SeekSubsong { index, epoch } => match self.module.seek_subsong(index) {
                Ok(()) => {
                    self.subsong = index;
                    self.active_epoch = epoch;
                }
                Err(e) => self.send_error(e.to_string()),
            },
            ControlMessage::Shutdown => return false,
        }
        true
    }

    fn top_up(&mut self) {
        let frame_len = self.left.len();
        while frame_len > 0 && self.producer.vacant_len() >= frame_len {
            let written = match self.module.decode_frame(&mut self.left, &mut self.right) {
                Ok(n) => n.min(frame_len),
                Err(e) => {
                    self.set_playing(false);
                    self.send_error(e.to_string());
                    return;
                }
            };
            for (left, right) in self.left[..written].iter().zip(&self.right[..written]) {
                let _ = self.producer.try_push(TaggedFrame {
                    epoch: self.active_epoch,
                    frame: Frame::new(*left, *right),
                });
            }

            let position = self.module.position();
            if position.is_some() && position != self.last_position {
                self.last_position = position;
                if let Some(p) = position {
                    self.send(ModuleMessage::Position(p));
                }
            }

            if self.module.is_song_end() {
                debug!("module reached song end");
                self.set_playing(false);
                self.send(ModuleMessage::Ended);
                return;
            }
            if written == 0 {
                break;
            }
        }
    }

    fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
        self.producing.store(playing, Ordering::Release);
    }

    fn send(&self, message: ModuleMessage) {
        // The bridge may already be gone during shutdown
        let _ = self.events.send(HostEvent {
            generation: self.generation,
            message,
        });
    }

    fn send_error(&self, message: String) {
        warn!(error = %message, "replay module error");
        self.send(ModuleMessage::Error { message });
    }
}
