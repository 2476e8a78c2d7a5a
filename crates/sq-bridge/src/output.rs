//! Render-side end of the module audio ring.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use ringbuf::traits::{Consumer, Observer};
use ringbuf::HeapCons;
use sq_engine::{Frame, FrameSource};

use crate::protocol::TaggedFrame;

/// Pulls module audio for the render callback. Never blocks: frames from
/// an older play epoch are discarded and missing frames are silence.
pub struct BridgeOutput {
    consumer: HeapCons<TaggedFrame>,
    epoch: Arc<AtomicU32>,
    producing: Arc<AtomicBool>,
    seen_epoch: u32,
    /// A current-epoch frame was mixed since the epoch last changed
    live: bool,
    underruns: u64,
}

impl BridgeOutput {
    pub(crate) fn new(
        consumer: HeapCons<TaggedFrame>,
        epoch: Arc<AtomicU32>,
        producing: Arc<AtomicBool>,
    ) -> Self {
        let seen_epoch = epoch.load(Ordering::Acquire);
        Self {
            consumer,
            epoch,
            producing,
            seen_epoch,
            live: false,
            underruns: 0,
        }
    }

    /// Blocks that ran out of module audio while the module was playing.
    /// Idle time before play, after stop and after the song end is not counted.
    pub fn underruns(&self) -> u64 {
        self.underruns
    }

    /// Frames waiting in the ring, stale ones included.
    pub fn buffered(&self) -> usize {
        self.consumer.occupied_len()
    }

    fn next_current(&mut self, epoch: u32) -> Option<Frame> {
        while let Some(tagged) = self.consumer.try_pop() {
            if tagged.epoch == epoch {
                return Some(tagged.frame);
            }
        }
        None
    }
}

impl FrameSource for BridgeOutput {
    fn mix_into(&mut self, out: &mut [Frame]) {
        let epoch = self.epoch.load(Ordering::Acquire);
        if epoch != self.seen_epoch {
            self.seen_epoch = epoch;
            self.live = false;
        }
        for frame in out.iter_mut() {
            match self.next_current(epoch) {
                Some(module_frame) => {
                    frame.mix(module_frame);
                    self.live = true;
                }
                None => {
                    if self.live && self.producing.load(Ordering::Acquire) {
                        self.underruns += 1;
                    }
                    break;
                }
            }
        }
    }
}
