//! Format decoders for modplayer.
//!
//! Parses MOD and S3M files into the song model. Decoding is a one-shot,
//! allocating operation done before playback; a failed decode returns an
//! error and produces no song.

extern crate alloc;

mod mod_format;
mod pcm;
mod s3m_format;

pub use mod_format::load_mod;
pub use pcm::{decode_pcm, PcmFormat};
pub use s3m_format::load_s3m;

use mp_ir::Song;

/// Error type for format parsing.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// Invalid file header or magic bytes
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),
    /// Input ended before a required region
    #[error("unexpected end of file at offset {offset} (needed {needed} bytes)")]
    UnexpectedEof { offset: usize, needed: usize },
    /// S3M pattern consumed a different byte count than it declared
    #[error("pattern {pattern}: declared {expected} bytes, decoded {actual}")]
    PatternLength {
        pattern: usize,
        expected: usize,
        actual: usize,
    },
    /// Sample bit depth is not 8, 16 or 24
    #[error("unsupported sample bit depth {0}")]
    UnsupportedBitDepth(u8),
    /// Sample is neither mono nor stereo
    #[error("unsupported sample channel count {0}")]
    UnsupportedChannelCount(u8),
    /// Fixed-layout header record failed to parse
    #[error(transparent)]
    Header(#[from] binrw::Error),
}

/// Load a module, picking the decoder from its signature.
///
/// Anything without the S3M signature is treated as MOD, which itself
/// degrades to the 15-instrument layout when no tag is recognized.
pub fn load_module(data: &[u8]) -> Result<Song, FormatError> {
    if s3m_format::is_s3m(data) {
        load_s3m(data)
    } else {
        load_mod(data)
    }
}

/// Borrow `len` bytes at `offset`, or fail with the region that was missing.
pub(crate) fn slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8], FormatError> {
    data.get(offset..offset.saturating_add(len))
        .ok_or(FormatError::UnexpectedEof {
            offset,
            needed: len,
        })
}

/// Parse a NUL-padded name, dropping trailing spaces and control bytes.
pub(crate) fn parse_name(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    data[..end]
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { ' ' })
        .collect::<String>()
        .trim_end()
        .to_string()
}
