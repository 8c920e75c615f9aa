//! WAV encoding for 16-bit stereo PCM.

use hound::{SampleFormat, WavSpec, WavWriter};
use mp_engine::Frame;
use std::io::{Cursor, Seek, Write};

fn spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Write frames as a 16-bit stereo WAV stream.
pub fn write_wav<W: Write + Seek>(
    w: W,
    frames: &[Frame],
    sample_rate: u32,
) -> Result<(), hound::Error> {
    let mut writer = WavWriter::new(w, spec(sample_rate))?;
    {
        let mut samples = writer.get_i16_writer(frames.len() as u32 * 2);
        for frame in frames {
            samples.write_sample(frame.left);
            samples.write_sample(frame.right);
        }
        samples.flush()?;
    }
    writer.finalize()
}

/// Encode frames into an in-memory WAV file.
pub fn frames_to_wav(frames: &[Frame], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let mut buf = Cursor::new(Vec::new());
    write_wav(&mut buf, frames, sample_rate)?;
    Ok(buf.into_inner())
}
