//! Sequencer.
//!
//! Walks orders, rows and ticks, triggers notes, runs effects and pushes
//! the resulting frequency, volume and pan to the mixer. It runs inside
//! [`Mixer::pull`] through its [`MixSource`] implementation: every pull is
//! exactly one tick.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt::Write;

use mp_ir::{
    note_name, note_to_period, period_to_note, Cell, Note, OrderEntry, Sample, SampleBank,
    SampleId, Song, AMIGA_PAN,
};
use tracing::{debug, trace};

use crate::effects::{EffectContext, EffectKind, EffectMap, RowTrigger};
use crate::frequency::{glissando_period, period_to_frequency, seconds_per_mix};
use crate::mixer::{MixSource, Mixer};
use crate::state::{ChannelState, PlayerState};

/// Callback run at the start of every row, before the row's notes are handled.
pub type RowObserver = Box<dyn FnMut(&PlayerState, &[ChannelState]) + Send>;

/// Room for a 32-channel row in [`Player::row_text`].
pub const ROW_TEXT_CAPACITY: usize = 576;

/// Current playback position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub order: usize,
    /// Pattern at the order position, if it names one
    pub pattern: Option<u8>,
    pub row: u16,
    pub tick: u8,
}

/// The sequencer: a song plus its playback state.
pub struct Player {
    song: Song,
    state: PlayerState,
    channels: Vec<ChannelState>,
    map: &'static EffectMap,
    observer: Option<RowObserver>,
    playing: bool,
    /// False when the song has no playable order
    active: bool,
}

impl Player {
    /// Player positioned on the first playable order, stopped.
    pub fn new(song: Song) -> Self {
        let mut state = PlayerState::new(&song);
        let first = song.first_playable();
        state.pos = first.unwrap_or(0);
        let channels = (0..usize::from(song.channels))
            .map(|ch| {
                let pan = song
                    .default_pan
                    .get(ch)
                    .copied()
                    .unwrap_or_else(|| default_pan(ch));
                ChannelState::new(pan)
            })
            .collect();
        debug!(
            title = song.title.as_str(),
            channels = song.channels,
            orders = song.song_length(),
            "player ready"
        );
        Self {
            map: EffectMap::for_kind(song.kind),
            song,
            state,
            channels,
            observer: None,
            playing: false,
            active: first.is_some(),
        }
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn channels(&self) -> &[ChannelState] {
        &self.channels
    }

    pub fn effect_map(&self) -> &'static EffectMap {
        self.map
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position(&self) -> Position {
        let pattern = match self.song.orders.get(self.state.pos) {
            Some(OrderEntry::Pattern(p)) => Some(*p),
            _ => None,
        };
        Position {
            order: self.state.pos,
            pattern,
            row: self.state.row,
            tick: self.state.tick,
        }
    }

    pub fn set_observer(&mut self, observer: Option<RowObserver>) {
        self.observer = observer;
    }

    pub fn take_observer(&mut self) -> Option<RowObserver> {
        self.observer.take()
    }

    /// Put the mixer in the song's initial state: default pans, every channel cut.
    pub fn init_mixer(&self, mixer: &mut Mixer) {
        for (ch, channel) in self.channels.iter().enumerate() {
            mixer.set_pan(ch, channel.pan);
            mixer.cut(ch);
        }
        mixer.set_global_volume(self.state.global_volume);
        mixer.set_seconds_per_mix(seconds_per_mix(self.state.tempo));
    }

    pub fn start(&mut self) {
        self.playing = true;
    }

    /// Stop and silence every channel. Stopping twice is the same as once.
    pub fn stop(&mut self, mixer: &mut Mixer) {
        self.playing = false;
        for ch in 0..self.channels.len() {
            mixer.cut(ch);
        }
    }

    /// Jump to the next playable order.
    pub fn next_order(&mut self) {
        self.advance_pos();
        self.state.row = 0;
        self.state.tick = 0;
    }

    /// Jump to the previous playable order.
    pub fn previous_order(&mut self) {
        self.decrement_pos();
        self.state.row = 0;
        self.state.tick = 0;
    }

    fn current_rows(&self) -> u16 {
        self.song.pattern_at(self.state.pos).map_or(0, |p| p.rows)
    }

    fn current_cell(&self, ch: usize) -> Cell {
        self.song
            .pattern_at(self.state.pos)
            .and_then(|p| p.row(self.state.row))
            .and_then(|row| row.get(ch))
            .copied()
            .unwrap_or_default()
    }

    fn resolve(&self, code: u8) -> EffectKind {
        match self.map.lookup(code) {
            Ok(entry) => entry.kind,
            Err(err) => {
                trace!(%err, map = self.map.name(), "playing as empty effect");
                EffectKind::Empty
            }
        }
    }

    fn handle_div(&mut self, mixer: &mut Mixer) {
        for ch in 0..self.channels.len() {
            let cell = self.current_cell(ch);
            self.handle_note(mixer, ch, cell);
        }
    }

    fn handle_note(&mut self, mixer: &mut Mixer, ch: usize, cell: Cell) {
        let period = match cell.note {
            Note::On(note) => note_to_period(note),
            _ => 0,
        };
        let effect = self.resolve(cell.effect);
        let caps = effect.capabilities(cell.param);
        let volume_effect = cell
            .volume_effect
            .map(|v| (self.resolve(v.code), v.param));

        let Some(channel) = self.channels.get_mut(ch) else {
            return;
        };
        channel.effect = effect;
        channel.param = cell.param;
        channel.volume_effect = volume_effect;

        if let Some(instrument) = self.song.instrument(cell.instrument) {
            let note = cell.note.number().or_else(|| period_to_note(channel.period));
            let index = note.and_then(|n| instrument.sample_index(n));
            let sample = index.and_then(|i| Some((i, instrument.samples.get(usize::from(i))?)));
            if let Some((index, sample)) = sample {
                let id = SampleId::new(u16::from(cell.instrument) - 1, index);
                mixer.set_sample(ch, id, sample);
                channel.sample = Some(id);
                channel.pitch_ofs = if sample.pitch_ofs > 0.0 {
                    sample.pitch_ofs
                } else {
                    1.0
                };
                if caps.volume_change {
                    channel.set_volume(i32::from(sample.volume));
                }
            }
        }

        if period > 0 && caps.period_change {
            channel.period = period;
            channel.last_period = period;
            if caps.sample_trigger {
                mixer.set_sample_position(ch, 0);
            }
        }
        if let Some(volume) = cell.volume {
            if caps.volume_change {
                channel.set_volume(i32::from(volume));
            }
        }
        if cell.note == Note::Cut {
            mixer.cut(ch);
            channel.sample = None;
        }

        let trig = RowTrigger { period, cell };
        let mut ctx = EffectContext {
            mixer: &mut *mixer,
            channel: ch,
            player: &mut self.state,
            state: channel,
            song: &mut self.song,
        };
        if let Some((kind, param)) = volume_effect {
            kind.on_row_start(&mut ctx, param, &trig);
        }
        effect.on_row_start(&mut ctx, cell.param, &trig);
        self.push(mixer, ch);
    }

    fn handle_tick(&mut self, mixer: &mut Mixer) {
        for ch in 0..self.channels.len() {
            let channel = &mut self.channels[ch];
            let (effect, param, volume_effect) =
                (channel.effect, channel.param, channel.volume_effect);
            let mut ctx = EffectContext {
                mixer: &mut *mixer,
                channel: ch,
                player: &mut self.state,
                state: channel,
                song: &mut self.song,
            };
            if let Some((kind, param)) = volume_effect {
                kind.on_tick(&mut ctx, param);
            }
            effect.on_tick(&mut ctx, param);
            self.push(mixer, ch);
        }
    }

    /// Send a channel's frequency, volume and pan to the mixer.
    fn push(&self, mixer: &mut Mixer, ch: usize) {
        let Some(channel) = self.channels.get(ch) else {
            return;
        };
        let period = if self.state.glissando {
            glissando_period(channel.period)
        } else {
            channel.period
        };
        mixer.set_volume(ch, channel.volume);
        mixer.set_frequency(
            ch,
            period_to_frequency(self.state.clock, period, channel.pitch_ofs),
        );
        mixer.set_pan(ch, channel.pan);
    }

    fn advance_tick(&mut self) {
        self.state.tick += 1;
        if self.state.tick >= self.state.speed {
            self.state.tick = 0;
            self.advance_row();
        }
    }

    fn advance_row(&mut self) {
        self.state.row += 1;
        if self.state.row >= self.current_rows() {
            for channel in self.channels.iter_mut() {
                channel.effect_state.pattern_loop.row = 0;
            }
            self.state.row = 0;
            self.advance_pos();
        }
    }

    /// Move to the next playable order, wrapping at the end of the song.
    fn advance_pos(&mut self) {
        let len = self.song.song_length();
        for _ in 0..len {
            self.state.pos += 1;
            if self.state.pos >= len {
                self.state.pos = 0;
            }
            if self.song.is_playable(self.state.pos) {
                break;
            }
        }
        trace!(order = self.state.pos, "next order");
    }

    fn decrement_pos(&mut self) {
        let len = self.song.song_length();
        for _ in 0..len {
            self.state.pos = match self.state.pos {
                0 => len - 1,
                pos => (pos - 1).min(len - 1),
            };
            if self.song.is_playable(self.state.pos) {
                break;
            }
        }
        trace!(order = self.state.pos, "previous order");
    }

    /// Apply queued jumps and breaks at a row boundary.
    fn resolve_navigation(&mut self) {
        let state = &mut self.state;
        if let Some(order) = state.loop_jump_to_order.take() {
            state.jump_to_order = Some(order);
            state.break_to_row = state.loop_break_to_row.take();
        }
        if let Some(order) = state.jump_to_order.take() {
            state.pos = if self.song.is_playable(order) {
                order
            } else {
                self.song.first_playable().unwrap_or(0)
            };
            state.row = state.break_to_row.take().unwrap_or(0);
            trace!(order = state.pos, row = state.row, "position jump");
        }
        if let Some(row) = self.state.break_to_row.take() {
            if self.state.row != 0 {
                self.advance_pos();
            }
            self.state.row = row;
        }
        if self.state.row >= self.current_rows() {
            self.state.row = 0;
        }
    }

    /// Tracker-style text of the current row, e.g. `000/00: | C-4 01 -- a 0f | `.
    ///
    /// Text past [`ROW_TEXT_CAPACITY`] is dropped.
    pub fn row_text(&self) -> heapless::String<ROW_TEXT_CAPACITY> {
        let mut text = heapless::String::new();
        let _ = write!(text, "{:03x}/{:02x}: | ", self.state.pos, self.state.row);
        let Some(cells) = self
            .song
            .pattern_at(self.state.pos)
            .and_then(|p| p.row(self.state.row))
        else {
            return text;
        };
        for cell in cells {
            let _ = match cell.note {
                Note::On(n) => write!(text, "{} ", note_name(n)),
                Note::Cut => write!(text, "^^^ "),
                Note::None => write!(text, "--- "),
            };
            let _ = match cell.instrument {
                0 => write!(text, "-- "),
                i => write!(text, "{i:02x} "),
            };
            let _ = match cell.volume {
                Some(v) => write!(text, "{v:02x} "),
                None => write!(text, "-- "),
            };
            let _ = write!(text, "{} {:02x} | ", self.map.code(cell.effect), cell.param);
        }
        text
    }
}

/// Amiga hard panning, left-right-right-left.
fn default_pan(ch: usize) -> f32 {
    if ch % 4 == 0 || ch % 4 == 3 {
        -AMIGA_PAN
    } else {
        AMIGA_PAN
    }
}

impl SampleBank for Player {
    fn sample(&self, id: SampleId) -> Option<&Sample> {
        self.song.sample(id)
    }
}

impl MixSource for Player {
    fn pre_mix(&mut self, mixer: &mut Mixer, _sample_rate: u32) {
        if !self.playing || !self.active {
            return;
        }
        if self.state.pattern_delay > 0 {
            self.state.pattern_delay -= 1;
            self.handle_tick(mixer);
        } else {
            if self.state.tick == 0 {
                if let Some(observer) = self.observer.as_mut() {
                    observer(&self.state, &self.channels);
                }
                self.handle_div(mixer);
            } else {
                self.handle_tick(mixer);
            }
            self.advance_tick();
        }
        if self.state.tick == 0 {
            self.resolve_navigation();
        }
        mixer.engage_filters(self.state.filter);
        mixer.set_global_volume(self.state.global_volume);
        mixer.set_seconds_per_mix(seconds_per_mix(self.state.tempo));
    }
}
