//! Playback engine for modplayer.
//!
//! A sequencer walks the song's orders, rows and ticks and drives a
//! pull-based mixer. Each call to [`Engine::mix`] is one tick of audio.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod effects;
mod engine;
mod filter;
mod frame;
mod frequency;
mod mixer;
mod player;
mod state;

pub use effects::{
    Capabilities, EffectContext, EffectEntry, EffectKind, EffectMap, RowTrigger, UnmappedEffect,
};
pub use engine::Engine;
pub use filter::AmigaLowPass;
pub use frame::Frame;
pub use frequency::{glissando_period, mix_len, period_to_frequency, seconds_per_mix};
pub use mixer::{pan_matrix, MixOutput, MixSource, Mixer, MixerConfig};
pub use player::{Player, Position, RowObserver, ROW_TEXT_CAPACITY};
pub use state::{
    ChannelState, DelayedNote, EffectState, InvertLoop, Oscillator, PatternLoop, PlayerState,
    MIN_TEMPO,
};
