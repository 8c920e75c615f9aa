//! Playback engine: a mixer driven by a sequencer.

use alloc::boxed::Box;

use mp_ir::Song;
use tracing::debug;

use crate::frequency::{mix_len, seconds_per_mix};
use crate::mixer::{MixOutput, Mixer, MixerConfig};
use crate::player::{Player, Position};
use crate::state::{ChannelState, PlayerState, MIN_TEMPO};

/// The main playback engine.
///
/// Owns the mixer and the player; every [`Engine::mix`] runs one sequencer
/// tick and mixes the buffer that tick produces.
pub struct Engine {
    mixer: Mixer,
    player: Player,
}

impl Engine {
    /// Engine with an empty song loaded, stopped.
    pub fn new(config: MixerConfig) -> Self {
        Self {
            mixer: Mixer::new(config),
            player: Player::new(Song::default()),
        }
    }

    /// Replace the current song. Playback stops; the row observer is kept.
    pub fn load_song(&mut self, song: Song) {
        self.player.stop(&mut self.mixer);
        let observer = self.player.take_observer();
        self.mixer.set_channel_count(usize::from(song.channels));
        self.player = Player::new(song);
        self.player.set_observer(observer);
        self.player.init_mixer(&mut self.mixer);
        debug!(channels = self.mixer.channel_count(), "song loaded");
    }

    pub fn start(&mut self) {
        self.player.start();
        debug!(order = self.player.position().order, "playback started");
    }

    /// Stop and silence every channel.
    pub fn stop(&mut self) {
        self.player.stop(&mut self.mixer);
        debug!("playback stopped");
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    pub fn next_order(&mut self) {
        self.player.next_order();
    }

    pub fn previous_order(&mut self) {
        self.player.previous_order();
    }

    /// Register a callback run at the start of every row.
    pub fn on_row<F>(&mut self, observer: F)
    where
        F: FnMut(&PlayerState, &[ChannelState]) + Send + 'static,
    {
        self.player.set_observer(Some(Box::new(observer)));
    }

    /// Produce the next buffer: one tick of playback at `sample_rate`.
    pub fn mix(&mut self, sample_rate: u32) -> MixOutput<'_> {
        self.mixer.pull(sample_rate, &mut self.player)
    }

    /// Reserve mix buffers for the longest tick at `sample_rate`.
    ///
    /// After this, [`Engine::mix`] does not allocate.
    pub fn prepare(&mut self, sample_rate: u32) {
        self.mixer.reserve(mix_len(sample_rate, seconds_per_mix(MIN_TEMPO)));
    }

    pub fn position(&self) -> Position {
        self.player.position()
    }

    pub fn song(&self) -> &Song {
        self.player.song()
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut Mixer {
        &mut self.mixer
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(MixerConfig::default())
    }
}
