//! Song model for modplayer.
//!
//! Decoders produce a [`Song`]; the playback engine consumes it. Periods,
//! notes and the order list share one set of conventions across formats.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod instrument;
mod pattern;
mod period;
mod sample;
pub mod song;

pub use instrument::{AutoVibrato, Envelope, EnvelopePoint, Instrument};
pub use pattern::{Cell, Note, Pattern, VolumeEffect};
pub use period::{
    finetune_multiplier, note_name, note_to_period, period_to_note,
    MAX_NOTE, MAX_SLIDE_PERIOD, MIN_SLIDE_PERIOD, NOTE_COUNT,
};
pub use sample::{LoopType, Sample, SampleBank, SampleId};
pub use song::{ModuleKind, OrderEntry, Song, AMIGA_PAN, NTSC_CLOCK, PAL_CLOCK};
