//! Mutable playback state: one `PlayerState` per song, one `ChannelState` per channel.

use mp_ir::{Cell, SampleId, Song, PAL_CLOCK};

use crate::effects::EffectKind;

/// Sequencer position and global parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerState {
    /// Clock in period units
    pub clock: f64,
    /// Current order position
    pub pos: usize,
    /// Current row
    pub row: u16,
    /// Current tick within the row
    pub tick: u8,
    /// Ticks per row
    pub speed: u8,
    /// Tempo (BPM)
    pub tempo: u8,
    /// Global volume (0-64)
    pub global_volume: u8,
    /// Remaining repeats of the current tick
    pub pattern_delay: u16,
    /// Quantize periods to semitones before frequency computation
    pub glissando: bool,
    /// Pending pattern break row
    pub break_to_row: Option<u16>,
    /// Pending position jump
    pub jump_to_order: Option<usize>,
    /// Break row queued by a pattern loop
    pub loop_break_to_row: Option<u16>,
    /// Jump queued by a pattern loop
    pub loop_jump_to_order: Option<usize>,
    /// S3M fast volume slides
    pub fast_volume_slides: bool,
    /// Amiga low-pass filter engaged
    pub filter: bool,
}

/// Slowest tempo the sequencer accepts.
pub const MIN_TEMPO: u8 = 32;

impl PlayerState {
    /// Initial state for a song, falling back to tracker defaults for unset values.
    pub fn new(song: &Song) -> Self {
        Self {
            clock: if song.clock > 0.0 { song.clock } else { PAL_CLOCK },
            pos: 0,
            row: 0,
            tick: 0,
            speed: if song.initial_speed == 0 { 6 } else { song.initial_speed },
            tempo: if song.initial_tempo == 0 {
                125
            } else {
                song.initial_tempo.max(MIN_TEMPO)
            },
            global_volume: if song.global_volume == 0 {
                64
            } else {
                song.global_volume.min(64)
            },
            pattern_delay: 0,
            glissando: false,
            break_to_row: None,
            jump_to_order: None,
            loop_break_to_row: None,
            loop_jump_to_order: None,
            fast_volume_slides: song.fast_volume_slides,
            filter: false,
        }
    }
}

/// Per-channel playback parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelState {
    /// Pan position (-1..1; outside that range is surround)
    pub pan: f32,
    /// Current volume (0-64)
    pub volume: u8,
    /// Last explicitly set volume; tremolo and tremor work relative to it
    pub last_volume: u8,
    /// Live period
    pub period: i32,
    /// Last explicitly set period; vibrato works relative to it
    pub last_period: i32,
    /// Pitch multiplier of the current sample
    pub pitch_ofs: f64,
    /// Effect of the current row
    pub effect: EffectKind,
    /// Parameter of the current row's effect
    pub param: u8,
    /// Volume-column effect of the current row
    pub volume_effect: Option<(EffectKind, u8)>,
    /// Sample assigned to the channel
    pub sample: Option<SampleId>,
    /// Effect memory
    pub effect_state: EffectState,
}

impl ChannelState {
    pub fn new(pan: f32) -> Self {
        Self {
            pan,
            volume: 64,
            last_volume: 64,
            period: 0,
            last_period: 0,
            pitch_ofs: 1.0,
            effect: EffectKind::Empty,
            param: 0,
            volume_effect: None,
            sample: None,
            effect_state: EffectState::default(),
        }
    }

    /// Set volume and last volume together, clamped to 0-64.
    pub fn set_volume(&mut self, volume: i32) {
        self.volume = volume.clamp(0, 64) as u8;
        self.last_volume = self.volume;
    }
}

/// Memory shared by all effects of a channel.
///
/// Persists across rows and effect changes; S3M slides recall their last
/// non-zero parameter from here.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EffectState {
    pub tremor_count: u8,
    pub tremor_param: u8,
    pub arp_pos: usize,
    pub arp_table: [i32; 3],
    pub porta_amount: i32,
    pub porta_target: i32,
    pub porta_speed: i32,
    pub vibrato: Oscillator,
    pub tremolo: Oscillator,
    pub pattern_loop: PatternLoop,
    pub note_delay: Option<DelayedNote>,
    pub invert_loop: InvertLoop,
    pub last_s3m_volume_slide: u8,
    pub last_s3m_porta_down: u8,
    pub last_s3m_porta_up: u8,
    pub s3m_retrig_volume: u8,
    pub s3m_retrig_ticks: u8,
    pub last_global_volume_slide: u8,
}

/// Vibrato/tremolo oscillator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Oscillator {
    /// 0 sine, 1 ramp, 2 square, 3 random; bit 2 = no retrigger
    pub waveform: u8,
    /// Table position (0-63)
    pub pos: u8,
    pub depth: u8,
    pub speed: u8,
}

/// Pattern loop start and remaining count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatternLoop {
    pub row: u16,
    /// `None` until the loop end is first reached
    pub count: Option<u8>,
}

/// Note captured at row start by a note delay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DelayedNote {
    pub cell: Cell,
    pub sample: Option<SampleId>,
}

/// Invert loop cursor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InvertLoop {
    pub pos: usize,
    pub delay: u16,
    pub sample: Option<SampleId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_state_fallbacks() {
        let mut song = Song::default();
        song.initial_speed = 0;
        song.initial_tempo = 0;
        song.global_volume = 0;
        let state = PlayerState::new(&song);
        assert_eq!((state.speed, state.tempo, state.global_volume), (6, 125, 64));

        song.initial_speed = 3;
        song.initial_tempo = 20;
        song.global_volume = 100;
        let state = PlayerState::new(&song);
        assert_eq!((state.speed, state.tempo, state.global_volume), (3, 32, 64));
    }

    #[test]
    fn set_volume_clamps() {
        let mut ch = ChannelState::new(0.0);
        ch.set_volume(80);
        assert_eq!((ch.volume, ch.last_volume), (64, 64));
        ch.set_volume(-3);
        assert_eq!((ch.volume, ch.last_volume), (0, 0));
    }
}
