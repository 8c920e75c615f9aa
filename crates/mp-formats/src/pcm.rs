//! Raw PCM to normalized float conversion shared by the decoders.

use alloc::vec::Vec;
use arrayvec::ArrayVec;

use crate::FormatError;

/// Layout of a raw PCM blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PcmFormat {
    /// Bits per point: 8, 16 or 24
    pub bits: u8,
    /// 1 (mono) or 2 (stereo)
    pub channels: u8,
    /// Two's complement rather than offset binary
    pub signed: bool,
    /// Byte order of multi-byte points
    pub little_endian: bool,
    /// Points are byte-wise deltas from the previous point
    pub delta: bool,
    /// Channels interleaved per frame; otherwise one block per channel
    pub interleaved: bool,
}

/// 8-bit mono signed, the MOD sample layout.
impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            bits: 8,
            channels: 1,
            signed: true,
            little_endian: true,
            delta: false,
            interleaved: true,
        }
    }
}

impl PcmFormat {
    /// Bytes per point of one channel.
    pub fn bytes_per_point(&self) -> usize {
        usize::from(self.bits / 8)
    }

    /// Bytes covering `frames` frames of every channel.
    pub fn byte_len(&self, frames: usize) -> usize {
        frames * self.bytes_per_point() * usize::from(self.channels)
    }

    fn validate(&self) -> Result<(), FormatError> {
        if self.bits == 0 || self.bits % 8 != 0 || self.bits > 24 {
            return Err(FormatError::UnsupportedBitDepth(self.bits));
        }
        if self.channels == 0 || self.channels > 2 {
            return Err(FormatError::UnsupportedChannelCount(self.channels));
        }
        Ok(())
    }
}

/// Decode `frames` frames of `bytes` into one -1..1 vector per channel.
///
/// Signed data is mapped to offset binary by flipping the top bit before
/// centering. Delta data accumulates raw values modulo 256 per channel.
pub fn decode_pcm(
    bytes: &[u8],
    format: &PcmFormat,
    frames: usize,
) -> Result<ArrayVec<Vec<f32>, 2>, FormatError> {
    format.validate()?;
    let needed = format.byte_len(frames);
    if bytes.len() < needed {
        return Err(FormatError::UnexpectedEof {
            offset: bytes.len(),
            needed: needed - bytes.len(),
        });
    }

    let bps = format.bytes_per_point();
    let channels = usize::from(format.channels);
    let scale: u32 = 1 << (format.bits - 1);
    let mask: u32 = (1 << format.bits) - 1;

    let mut out: ArrayVec<Vec<f32>, 2> = ArrayVec::new();
    for _ in 0..channels {
        out.push(Vec::with_capacity(frames));
    }
    let mut running = [0u32; 2];

    for i in 0..frames {
        for (chan, samples) in out.iter_mut().enumerate() {
            let ofs = if format.interleaved {
                (i * channels + chan) * bps
            } else {
                chan * frames * bps + i * bps
            };
            let point = &bytes[ofs..ofs + bps];
            let mut data = if format.little_endian {
                point.iter().rev().fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
            } else {
                point.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
            };
            if format.signed {
                data = (data ^ scale) & mask;
            }
            let value = if format.delta {
                running[chan] = (running[chan] + ((data ^ scale) & mask)) & 0xff;
                ((running[chan] ^ scale) & mask) as f32 - scale as f32
            } else {
                data as f32 - scale as f32
            };
            samples.push(value / scale as f32);
        }
    }
    Ok(out)
}
