//! WAV encoding for 16-bit stereo PCM.

use std::io::{Cursor, Seek, Write};

use hound::{SampleFormat, WavSpec, WavWriter};
use sq_engine::Frame;

pub fn write_wav<W: Write + Seek>(w: W, frames: &[Frame], sample_rate: u32) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::new(w, spec)?;
    for frame in frames {
        let (left, right) = frame.to_i16();
        writer.write_sample(left)?;
        writer.write_sample(right)?;
    }
    writer.finalize()
}

pub fn frames_to_wav(frames: &[Frame], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let mut buf = Cursor::new(Vec::new());
    write_wav(&mut buf, frames, sample_rate)?;
    Ok(buf.into_inner())
}
