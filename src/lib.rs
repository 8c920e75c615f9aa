//! modplayer: MOD and S3M module decoding and playback.
//!
//! The workspace crates are re-exported here so a single dependency covers
//! decoding ([`formats`]), the song model ([`ir`]), the effect engine and
//! mixer ([`engine`]) and headless playback ([`Controller`]).

pub use mp_engine as engine;
pub use mp_formats as formats;
pub use mp_ir as ir;

pub use mp_engine::{Engine, Frame, MixOutput, MixerConfig, Position};
pub use mp_formats::{load_mod, load_module, load_s3m, FormatError};
pub use mp_ir::Song;
pub use mp_master::{frames_to_wav, write_wav, Controller, ControllerError};
