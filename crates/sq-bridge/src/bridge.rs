//! Control-side handle to a replay module.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use ringbuf::traits::Split;
use ringbuf::HeapRb;
use tracing::{debug, trace, warn};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::host::ModuleHost;
use crate::module::ReplayModule;
use crate::output::BridgeOutput;
use crate::protocol::{ControlMessage, HostEvent, ModuleMessage, ModulePosition, TaggedFrame};

/// Lifecycle of a bridged module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgeState {
    Unloaded,
    Loading,
    Ready,
    Playing,
    Stopped,
    Disposed,
}

/// Events surfaced to the caller by [`ModuleBridge::poll`].
pub type BridgeEvent = ModuleMessage;

/// Owns the module thread and drives it through the control protocol.
///
/// Audio comes out of the [`BridgeOutput`] returned by [`spawn`], which
/// belongs on the render side.
///
/// [`spawn`]: ModuleBridge::spawn
pub struct ModuleBridge {
    state: BridgeState,
    control: Option<Sender<ControlMessage>>,
    events: Receiver<HostEvent>,
    epoch: Arc<AtomicU32>,
    /// Numbers loads; module replies stamped with an older one are stale
    generation: u32,
    position: Option<ModulePosition>,
    config: BridgeConfig,
    thread: Option<JoinHandle<()>>,
}

impl ModuleBridge {
    /// Start the module thread and initialise the module.
    pub fn spawn(module: Box<dyn ReplayModule>, config: BridgeConfig) -> Result<(Self, BridgeOutput)> {
        let (producer, consumer) = HeapRb::<TaggedFrame>::new(config.ring_frames.max(1)).split();
        let (control_tx, control_rx) = unbounded();
        let (events_tx, events_rx) = unbounded();
        let epoch = Arc::new(AtomicU32::new(0));
        let producing = Arc::new(AtomicBool::new(false));

        let host = ModuleHost::new(module, control_rx, events_tx, producer, Arc::clone(&producing));
        let thread = host.spawn()?;

        let bridge = Self {
            state: BridgeState::Unloaded,
            control: Some(control_tx),
            events: events_rx,
            epoch: Arc::clone(&epoch),
            generation: 0,
            position: None,
            config,
            thread: Some(thread),
        };
        bridge.send(ControlMessage::Init {
            sample_rate: config.sample_rate,
        })?;
        debug!(sample_rate = config.sample_rate, ring = config.ring_frames, "module bridge spawned");
        Ok((bridge, BridgeOutput::new(consumer, epoch, producing)))
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Last position reported by the module.
    pub fn position(&self) -> Option<ModulePosition> {
        self.position
    }

    /// Send the binary without waiting; `Ready` or `Error` arrives via [`poll`](Self::poll).
    pub fn begin_load(&mut self, binary: impl Into<Arc<[u8]>>) -> Result<()> {
        self.require("load", &[BridgeState::Unloaded, BridgeState::Ready, BridgeState::Stopped])?;
        self.bump_epoch();
        self.generation = self.generation.wrapping_add(1);
        self.send(ControlMessage::Load {
            binary: binary.into(),
            generation: self.generation,
        })?;
        self.position = None;
        self.state = BridgeState::Loading;
        Ok(())
    }

    /// Load a module and wait for the ready handshake.
    pub fn load(&mut self, binary: impl Into<Arc<[u8]>>) -> Result<()> {
        self.begin_load(binary)?;
        let timeout = self.config.ready_timeout;
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = match self.events.recv_timeout(remaining) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => {
                    warn!(?timeout, "module not ready in time");
                    self.state = BridgeState::Unloaded;
                    return Err(BridgeError::Timeout(timeout));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.state = BridgeState::Unloaded;
                    return Err(BridgeError::Disconnected);
                }
            };
            if event.generation != self.generation {
                trace!(message = ?event.message, "stale module event dropped");
                continue;
            }
            match event.message {
                ModuleMessage::Ready => {
                    debug!("module ready");
                    self.state = BridgeState::Ready;
                    return Ok(());
                }
                ModuleMessage::Error { message } => {
                    warn!(error = %message, "module load failed");
                    self.state = BridgeState::Unloaded;
                    return Err(BridgeError::LoadFailed(message));
                }
                ModuleMessage::Position(p) => self.position = Some(p),
                ModuleMessage::Ended => {}
            }
        }
    }

    pub fn play(&mut self) -> Result<()> {
        self.require("play", &[BridgeState::Ready, BridgeState::Stopped])?;
        let epoch = self.bump_epoch();
        self.send(ControlMessage::Play { epoch })?;
        self.state = BridgeState::Playing;
        Ok(())
    }

    /// Stop and rewind. Valid in every state; a no-op once disposed.
    ///
    /// Output goes silent on the next render callback, whatever the
    /// module thread is doing.
    pub fn stop(&mut self) -> Result<()> {
        if self.state == BridgeState::Disposed {
            return Ok(());
        }
        self.bump_epoch();
        // A dead module thread plays nothing either
        let _ = self.send(ControlMessage::Stop);
        if self.state == BridgeState::Playing {
            self.state = BridgeState::Stopped;
        }
        Ok(())
    }

    pub fn seek_subsong(&mut self, index: u32) -> Result<()> {
        self.require(
            "seek subsong",
            &[BridgeState::Ready, BridgeState::Playing, BridgeState::Stopped],
        )?;
        let epoch = self.bump_epoch();
        self.send(ControlMessage::SeekSubsong { index, epoch })?;
        self.position = None;
        Ok(())
    }

    /// Next pending module event, applying its state transition.
    ///
    /// Events left over from before the latest load are dropped.
    pub fn poll(&mut self) -> Option<BridgeEvent> {
        let event = loop {
            let HostEvent { generation, message } = self.events.try_recv().ok()?;
            if generation == self.generation {
                break message;
            }
            trace!(?message, "stale module event dropped");
        };
        match &event {
            ModuleMessage::Ready => {
                if self.state == BridgeState::Loading {
                    self.state = BridgeState::Ready;
                }
            }
            ModuleMessage::Error { message } => {
                warn!(error = %message, state = ?self.state, "module error");
                self.state = match self.state {
                    BridgeState::Loading | BridgeState::Unloaded => BridgeState::Unloaded,
                    BridgeState::Disposed => BridgeState::Disposed,
                    _ => BridgeState::Stopped,
                };
            }
            ModuleMessage::Ended => {
                if self.state == BridgeState::Playing {
                    debug!("module playback ended");
                    self.state = BridgeState::Stopped;
                }
            }
            ModuleMessage::Position(p) => self.position = Some(*p),
        }
        Some(event)
    }

    /// Shut the module down and join its thread. Terminal and idempotent.
    pub fn dispose(&mut self) {
        if let Some(control) = self.control.take() {
            self.bump_epoch();
            let _ = control.send(ControlMessage::Shutdown);
            drop(control);
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("module thread panicked");
            }
        }
        if self.state != BridgeState::Disposed {
            debug!("module bridge disposed");
        }
        self.state = BridgeState::Disposed;
    }

    fn require(&self, operation: &'static str, allowed: &[BridgeState]) -> Result<()> {
        if self.state == BridgeState::Disposed {
            return Err(BridgeError::Disposed);
        }
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(BridgeError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Move to a new play epoch and return it.
    fn bump_epoch(&self) -> u32 {
        self.epoch.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }

    fn send(&self, msg: ControlMessage) -> Result<()> {
        let control = self.control.as_ref().ok_or(BridgeError::Disposed)?;
        control.send(msg).map_err(|_| BridgeError::Disconnected)
    }
}

impl Drop for ModuleBridge {
    fn drop(&mut self) {
        self.dispose();
    }
}
