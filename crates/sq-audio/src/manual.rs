//! An output that only renders when asked.

use sq_engine::Frame;

use crate::traits::{AudioError, AudioOutput, RenderCallback};

/// Drives the render callback from the caller's thread, one block per
/// [`pull`](ManualOutput::pull). Used for offline rendering and tests.
pub struct ManualOutput {
    sample_rate: u32,
    block_size: usize,
    render: Option<RenderCallback>,
}

impl ManualOutput {
    pub fn new(sample_rate: u32, block_size: usize) -> Self {
        Self {
            sample_rate,
            block_size: block_size.max(1),
            render: None,
        }
    }

    /// Render `frames` frames in device-sized blocks. Silence when stopped.
    pub fn pull(&mut self, frames: usize) -> Vec<Frame> {
        let mut out = vec![Frame::silence(); frames];
        if let Some(render) = self.render.as_mut() {
            for block in out.chunks_mut(self.block_size) {
                render(block);
            }
        }
        out
    }
}

impl AudioOutput for ManualOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start(&mut self, render: RenderCallback) -> Result<(), AudioError> {
        if self.render.is_some() {
            return Err(AudioError::AlreadyStarted);
        }
        self.render = Some(render);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.render = None;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.render.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulls_in_blocks() {
        let mut output = ManualOutput::new(44100, 3);
        let mut calls = Vec::new();
        let (tx, rx) = std::sync::mpsc::channel();
        output
            .start(Box::new(move |block: &mut [Frame]| {
                let _ = tx.send(block.len());
                block.fill(Frame::mono(0.5));
            }))
            .unwrap();
        let frames = output.pull(7);
        calls.extend(rx.try_iter());
        assert_eq!(calls, vec![3, 3, 1]);
        assert!(frames.iter().all(|f| *f == Frame::mono(0.5)));
    }

    #[test]
    fn stopped_output_is_silent() {
        let mut output = ManualOutput::new(48000, 64);
        assert!(!output.is_running());
        output.start(Box::new(|block: &mut [Frame]| block.fill(Frame::mono(1.0)))).unwrap();
        assert!(matches!(
            output.start(Box::new(|_: &mut [Frame]| {})),
            Err(AudioError::AlreadyStarted)
        ));
        output.stop().unwrap();
        assert!(output.pull(10).iter().all(Frame::is_silent));
        assert_eq!(output.sample_rate(), 48000);
    }
}
