//! Effect behaviors.
//!
//! Every effect is an [`EffectKind`] with two entry points: `on_row_start`,
//! run once when its row is reached, and `on_tick`, run on every following
//! tick of the row. Effects keep their memory in the channel's
//! [`EffectState`](crate::state::EffectState), so parameters survive effect
//! changes between rows.
//!
//! Format-specific effect codes resolve to kinds through an [`EffectMap`].

mod map;
mod tables;

pub use map::{EffectEntry, EffectMap, UnmappedEffect};
pub use tables::{s3m_retrig_volume, waveform_value, INVERT_LOOP_TABLE, VIBRATO_TABLE};

use mp_ir::{
    finetune_multiplier, note_to_period, period_to_note, Cell, SampleBank, SampleId, Song,
    MAX_NOTE, MAX_SLIDE_PERIOD, MIN_SLIDE_PERIOD,
};

use crate::mixer::Mixer;
use crate::state::{ChannelState, DelayedNote, Oscillator, PlayerState};

/// Everything an effect may touch while it runs on one channel.
pub struct EffectContext<'a> {
    pub mixer: &'a mut Mixer,
    pub channel: usize,
    pub player: &'a mut PlayerState,
    pub state: &'a mut ChannelState,
    pub song: &'a mut Song,
}

/// The note that started the current row.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RowTrigger {
    /// Period of the row's note, 0 when there is none
    pub period: i32,
    pub cell: Cell,
}

/// What a new note may do while an effect is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// Restart the sample from offset 0
    pub sample_trigger: bool,
    /// Overwrite the channel volume
    pub volume_change: bool,
    /// Overwrite the channel period
    pub period_change: bool,
}

impl Capabilities {
    pub const ALL: Self = Self {
        sample_trigger: true,
        volume_change: true,
        period_change: true,
    };
    pub const NONE: Self = Self {
        sample_trigger: false,
        volume_change: false,
        period_change: false,
    };
    /// Slides toward a note: the note becomes a target instead of a pitch jump.
    pub const KEEP_PERIOD: Self = Self {
        period_change: false,
        ..Self::ALL
    };
}

/// An effect behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EffectKind {
    #[default]
    Empty,
    Arpeggio,
    PortaUp,
    PortaDown,
    PortaToNote,
    Vibrato,
    PortaVolumeSlide,
    VibratoVolumeSlide,
    Tremolo,
    SetPan,
    SampleOffset,
    VolumeSlide,
    PositionJump,
    SetVolume,
    PatternBreak,
    /// Protracker `E` effects, dispatched on the high parameter nibble
    ProtrackerExtended,
    SetFilter,
    FinePortaUp,
    FinePortaDown,
    GlissandoControl,
    SetVibratoWaveform,
    SetFinetune,
    PatternLoop,
    SetTremoloWaveform,
    Pan16,
    RetrigNote,
    FineVolumeSlideUp,
    FineVolumeSlideDown,
    NoteCut,
    NoteDelay,
    PatternDelay,
    InvertLoop,
    /// Speed up to 0x20, tempo above
    SetSpeedTempo,
    S3mSetSpeed,
    S3mSetTempo,
    S3mVolumeSlide,
    S3mPortaDown,
    S3mPortaUp,
    S3mRetrigVolumeSlide,
    /// S3M `S` effects, dispatched on the high parameter nibble
    S3mExtended,
    S3mFineVibrato,
    S3mTremor,
    SetGlobalVolume,
    S3mStereoControl,
    GlobalVolumeSlide,
}

/// Protracker `Ex` sub-effects.
pub const PROTRACKER_EXTENDED: [EffectKind; 16] = [
    EffectKind::SetFilter,
    EffectKind::FinePortaUp,
    EffectKind::FinePortaDown,
    EffectKind::GlissandoControl,
    EffectKind::SetVibratoWaveform,
    EffectKind::SetFinetune,
    EffectKind::PatternLoop,
    EffectKind::SetTremoloWaveform,
    EffectKind::Pan16,
    EffectKind::RetrigNote,
    EffectKind::FineVolumeSlideUp,
    EffectKind::FineVolumeSlideDown,
    EffectKind::NoteCut,
    EffectKind::NoteDelay,
    EffectKind::PatternDelay,
    EffectKind::InvertLoop,
];

/// S3M `Sx` sub-effects.
pub const S3M_EXTENDED: [EffectKind; 16] = [
    EffectKind::SetFilter,
    EffectKind::GlissandoControl,
    EffectKind::SetFinetune,
    EffectKind::SetVibratoWaveform,
    EffectKind::SetTremoloWaveform,
    EffectKind::Empty,
    EffectKind::Empty,
    EffectKind::Empty,
    EffectKind::Pan16,
    EffectKind::Empty,
    EffectKind::S3mStereoControl,
    EffectKind::PatternLoop,
    EffectKind::NoteCut,
    EffectKind::NoteDelay,
    EffectKind::PatternDelay,
    EffectKind::InvertLoop,
];

impl EffectKind {
    /// What a note on the same row may change while this effect runs.
    pub fn capabilities(self, param: u8) -> Capabilities {
        match self {
            Self::PortaToNote | Self::PortaVolumeSlide => Capabilities::KEEP_PERIOD,
            Self::NoteDelay => Capabilities::NONE,
            Self::ProtrackerExtended => {
                PROTRACKER_EXTENDED[(param >> 4) as usize].capabilities(param & 0x0f)
            }
            Self::S3mExtended => S3M_EXTENDED[(param >> 4) as usize].capabilities(param & 0x0f),
            _ => Capabilities::ALL,
        }
    }

    /// Runs once at the start of the row carrying the effect.
    pub fn on_row_start(self, ctx: &mut EffectContext<'_>, param: u8, trig: &RowTrigger) {
        let hi = param >> 4;
        let lo = param & 0x0f;
        match self {
            Self::Empty | Self::VibratoVolumeSlide | Self::VolumeSlide | Self::RetrigNote => {}
            Self::Arpeggio => {
                if param != 0 {
                    let state = &mut *ctx.state;
                    match period_to_note(state.last_period) {
                        Some(note) if note <= 108 => {
                            state.effect_state.arp_table = [
                                note_to_period(note),
                                note_to_period((note + hi).min(MAX_NOTE)),
                                note_to_period((note + lo).min(MAX_NOTE)),
                            ];
                            state.effect_state.arp_pos = 0;
                        }
                        _ => state.effect_state.arp_table = [state.period; 3],
                    }
                }
            }
            Self::PortaUp | Self::PortaDown => {
                ctx.state.effect_state.porta_amount = i32::from(param) * 4;
            }
            Self::PortaToNote => {
                set_porta_target(ctx.state, trig.period);
                if trig.period != 0 {
                    ctx.state.last_period = trig.period;
                }
                if param != 0 {
                    ctx.state.effect_state.porta_speed = i32::from(param) * 4;
                }
            }
            Self::PortaVolumeSlide => set_porta_target(ctx.state, trig.period),
            Self::Vibrato | Self::S3mFineVibrato => {
                oscillator_row(&mut ctx.state.effect_state.vibrato, param, trig.period);
            }
            Self::Tremolo => {
                oscillator_row(&mut ctx.state.effect_state.tremolo, param, trig.period);
            }
            Self::SetPan => {
                if param <= 0x80 {
                    ctx.state.pan = f32::from(param) / 64.0 - 1.0;
                } else if param == 0xa4 {
                    ctx.state.pan = 2.0;
                }
            }
            Self::SampleOffset => {
                ctx.mixer
                    .set_sample_position(ctx.channel, usize::from(param) * 256);
            }
            Self::PositionJump => ctx.player.jump_to_order = Some(usize::from(param)),
            Self::SetVolume => ctx.state.set_volume(i32::from(param.min(64))),
            Self::PatternBreak => {
                ctx.player.break_to_row = Some(u16::from(hi) * 10 + u16::from(lo));
            }
            Self::ProtrackerExtended => {
                PROTRACKER_EXTENDED[(param >> 4) as usize].on_row_start(ctx, param & 0x0f, trig);
            }
            Self::SetFilter => ctx.player.filter = param != 0,
            Self::FinePortaUp => {
                let state = &mut *ctx.state;
                state.period = (state.period - i32::from(param) * 4).max(MIN_SLIDE_PERIOD);
                state.last_period = state.period;
            }
            Self::FinePortaDown => {
                let state = &mut *ctx.state;
                state.period = (state.period + i32::from(param) * 4).min(MAX_SLIDE_PERIOD);
                state.last_period = state.period;
            }
            Self::GlissandoControl => ctx.player.glissando = param != 0,
            Self::SetVibratoWaveform => ctx.state.effect_state.vibrato.waveform = param & 0x07,
            Self::SetTremoloWaveform => ctx.state.effect_state.tremolo.waveform = param & 0x07,
            Self::SetFinetune => {
                if trig.cell.instrument != 0 {
                    let finetune = if lo < 8 { lo as i8 } else { lo as i8 - 16 };
                    ctx.state.pitch_ofs = finetune_multiplier(finetune);
                }
            }
            Self::PatternLoop => pattern_loop(ctx, param),
            Self::Pan16 => ctx.state.pan = f32::from(lo) / 15.0 * 2.0 - 1.0,
            Self::FineVolumeSlideUp => {
                let volume = i32::from(ctx.state.volume) + i32::from(param);
                ctx.state.set_volume(volume);
            }
            Self::FineVolumeSlideDown => {
                let volume = i32::from(ctx.state.volume) - i32::from(param);
                ctx.state.set_volume(volume);
            }
            Self::NoteCut => {
                if param == 0 {
                    ctx.state.set_volume(0);
                }
            }
            Self::NoteDelay => {
                let delayed = DelayedNote {
                    cell: trig.cell,
                    sample: delayed_sample(ctx.song, trig),
                };
                if param == 0 {
                    fire_delayed_note(ctx, delayed);
                    ctx.state.effect_state.note_delay = None;
                } else {
                    ctx.state.effect_state.note_delay = Some(delayed);
                }
            }
            Self::PatternDelay => {
                ctx.player.pattern_delay = u16::from(param) * u16::from(ctx.player.speed);
            }
            Self::InvertLoop => {
                let invert = &mut ctx.state.effect_state.invert_loop;
                invert.delay = 0;
                invert.sample = ctx.state.sample;
            }
            Self::SetSpeedTempo => match param {
                0 => {}
                1..=0x20 => ctx.player.speed = param,
                _ => ctx.player.tempo = param,
            },
            Self::S3mSetSpeed => {
                if param != 0 {
                    ctx.player.speed = param;
                }
            }
            Self::S3mSetTempo => {
                if param >= 0x20 {
                    ctx.player.tempo = param;
                }
            }
            Self::S3mVolumeSlide => {
                let param = recall(&mut ctx.state.effect_state.last_s3m_volume_slide, param);
                let volume = s3m_slide_row(
                    i32::from(ctx.state.volume),
                    param,
                    ctx.player.fast_volume_slides,
                );
                ctx.state.set_volume(volume);
            }
            Self::S3mPortaDown => {
                let param = recall(&mut ctx.state.effect_state.last_s3m_porta_down, param);
                let state = &mut *ctx.state;
                state.period = (state.period + s3m_fine_porta(param)).min(MAX_SLIDE_PERIOD);
            }
            Self::S3mPortaUp => {
                let param = recall(&mut ctx.state.effect_state.last_s3m_porta_up, param);
                let state = &mut *ctx.state;
                state.period = (state.period - s3m_fine_porta(param)).max(MIN_SLIDE_PERIOD);
            }
            Self::S3mRetrigVolumeSlide => {
                let fx = &mut ctx.state.effect_state;
                if hi != 0 {
                    fx.s3m_retrig_volume = hi;
                }
                if lo != 0 {
                    fx.s3m_retrig_ticks = lo;
                }
            }
            Self::S3mExtended => {
                S3M_EXTENDED[(param >> 4) as usize].on_row_start(ctx, param & 0x0f, trig);
            }
            Self::S3mTremor => {
                if param != 0 {
                    ctx.state.effect_state.tremor_param = param;
                }
            }
            Self::SetGlobalVolume => ctx.player.global_volume = param.min(64),
            Self::S3mStereoControl => {
                let mut p = i32::from(lo);
                if p > 7 {
                    p -= 16;
                }
                p += 8;
                ctx.state.pan = p as f32 / 15.0 * 2.0 - 1.0;
            }
            Self::GlobalVolumeSlide => {
                let param = recall(&mut ctx.state.effect_state.last_global_volume_slide, param);
                let volume = s3m_slide_row(
                    i32::from(ctx.player.global_volume),
                    param,
                    ctx.player.fast_volume_slides,
                );
                ctx.player.global_volume = volume.clamp(0, 64) as u8;
            }
        }
    }

    /// Runs on every tick after the first of a row.
    pub fn on_tick(self, ctx: &mut EffectContext<'_>, param: u8) {
        match self {
            Self::Arpeggio => {
                if param != 0 {
                    let fx = &mut ctx.state.effect_state;
                    fx.arp_pos = (fx.arp_pos + 1) % 3;
                    ctx.state.period = fx.arp_table[fx.arp_pos];
                }
            }
            Self::PortaUp => {
                let state = &mut *ctx.state;
                state.period =
                    (state.period - state.effect_state.porta_amount).max(MIN_SLIDE_PERIOD);
            }
            Self::PortaDown => {
                let state = &mut *ctx.state;
                state.period =
                    (state.period + state.effect_state.porta_amount).min(MAX_SLIDE_PERIOD);
            }
            Self::PortaToNote => porta_to_note_tick(ctx.state),
            Self::Vibrato => vibrato_tick(ctx.state, 4),
            Self::S3mFineVibrato => vibrato_tick(ctx.state, 1),
            Self::PortaVolumeSlide => {
                porta_to_note_tick(ctx.state);
                volume_slide_tick(ctx.state, param);
            }
            Self::VibratoVolumeSlide => {
                volume_slide_tick(ctx.state, param);
                vibrato_tick(ctx.state, 4);
            }
            Self::Tremolo => {
                let state = &mut *ctx.state;
                let osc = advance(&mut state.effect_state.tremolo);
                let offset = waveform_value(osc.waveform, osc.pos) * i32::from(osc.depth) / 64;
                state.volume = (i32::from(state.last_volume) + offset).clamp(0, 64) as u8;
            }
            Self::VolumeSlide => volume_slide_tick(ctx.state, param),
            Self::ProtrackerExtended => {
                PROTRACKER_EXTENDED[(param >> 4) as usize].on_tick(ctx, param & 0x0f);
            }
            Self::RetrigNote => {
                if param != 0 && ctx.player.tick % param == 0 {
                    ctx.mixer.set_sample_position(ctx.channel, 0);
                }
            }
            Self::NoteCut => {
                let state = &mut *ctx.state;
                if ctx.player.tick >= param {
                    state.volume = 0;
                }
                state.last_volume = state.volume;
            }
            Self::NoteDelay => {
                if ctx.player.tick == param {
                    if let Some(delayed) = ctx.state.effect_state.note_delay.take() {
                        fire_delayed_note(ctx, delayed);
                    }
                }
            }
            Self::InvertLoop => invert_loop_tick(ctx, param),
            Self::S3mVolumeSlide => {
                let param = ctx.state.effect_state.last_s3m_volume_slide;
                let volume = s3m_slide_tick(i32::from(ctx.state.volume), param);
                ctx.state.set_volume(volume);
            }
            Self::S3mPortaDown => {
                let state = &mut *ctx.state;
                let param = state.effect_state.last_s3m_porta_down;
                if param >> 4 < 0x0e {
                    state.period = (state.period + i32::from(param) * 4).min(MAX_SLIDE_PERIOD);
                }
            }
            Self::S3mPortaUp => {
                let state = &mut *ctx.state;
                let param = state.effect_state.last_s3m_porta_up;
                if param >> 4 < 0x0e {
                    state.period = (state.period - i32::from(param) * 4).max(MIN_SLIDE_PERIOD);
                }
            }
            Self::S3mRetrigVolumeSlide => {
                let ticks = ctx.state.effect_state.s3m_retrig_ticks;
                let mut volume = i32::from(ctx.state.volume);
                if ticks != 0 && ctx.player.tick % ticks == 0 {
                    ctx.mixer.set_sample_position(ctx.channel, 0);
                    volume = s3m_retrig_volume(ctx.state.effect_state.s3m_retrig_volume, volume);
                }
                ctx.state.set_volume(volume);
            }
            Self::S3mExtended => {
                S3M_EXTENDED[(param >> 4) as usize].on_tick(ctx, param & 0x0f);
            }
            Self::S3mTremor => {
                let state = &mut *ctx.state;
                let fx = &mut state.effect_state;
                let on = fx.tremor_param >> 4;
                let period = on + (fx.tremor_param & 0x0f);
                if period == 0 {
                    return;
                }
                fx.tremor_count = (fx.tremor_count + 1) % period;
                state.volume = if fx.tremor_count < on { state.last_volume } else { 0 };
            }
            Self::GlobalVolumeSlide => {
                let param = ctx.state.effect_state.last_global_volume_slide;
                let volume = s3m_slide_tick(i32::from(ctx.player.global_volume), param);
                ctx.player.global_volume = volume.clamp(0, 64) as u8;
            }
            _ => {}
        }
    }
}

/// Replace a zero parameter with the remembered one, then remember it.
fn recall(memory: &mut u8, param: u8) -> u8 {
    if param != 0 {
        *memory = param;
    }
    *memory
}

fn set_porta_target(state: &mut ChannelState, period: i32) {
    if period != 0 {
        state.effect_state.porta_target = period;
    }
}

/// Step toward the portamento target, stopping on it.
fn porta_to_note_tick(state: &mut ChannelState) {
    let target = state.effect_state.porta_target;
    let speed = state.effect_state.porta_speed;
    if target == 0 || speed == 0 {
        return;
    }
    if target > state.period {
        state.period = (state.period + speed).min(target);
    } else if target < state.period {
        state.period = (state.period - speed).max(target);
    }
    if state.period == target {
        state.last_period = target;
    }
}

/// Classic volume slide: up wins when both nibbles are set.
fn volume_slide_tick(state: &mut ChannelState, param: u8) {
    let up = i32::from(param >> 4);
    let down = if up != 0 { 0 } else { i32::from(param & 0x0f) };
    state.set_volume(i32::from(state.volume) + up - down);
}

fn oscillator_row(osc: &mut Oscillator, param: u8, period: i32) {
    if osc.waveform <= 3 && period > 0 {
        osc.pos = 0;
    }
    if param & 0x0f != 0 {
        osc.depth = param & 0x0f;
    }
    if param >> 4 != 0 {
        osc.speed = param >> 4;
    }
}

fn advance(osc: &mut Oscillator) -> Oscillator {
    osc.pos = (osc.pos + osc.speed) % 64;
    *osc
}

/// Vibrato around the last set period. `scale` is 4 for normal depth, 1 for fine.
fn vibrato_tick(state: &mut ChannelState, scale: i32) {
    let osc = advance(&mut state.effect_state.vibrato);
    let offset = waveform_value(osc.waveform, osc.pos) * i32::from(osc.depth) * scale / 128;
    state.period = state.last_period + offset;
}

/// S3M slide at row start: fine slides (`xF`/`Fx`), plus the coarse step when fast slides are on.
fn s3m_slide_row(value: i32, param: u8, fast: bool) -> i32 {
    let a = i32::from(param >> 4);
    let b = i32::from(param & 0x0f);
    let mut value = value;
    if fast {
        if b == 0 && a != 0 {
            value += a;
        } else if a == 0 && b != 0 {
            value -= b;
        }
    }
    if b == 0x0f {
        value += a;
    } else if a == 0x0f {
        value -= b;
    }
    value
}

fn s3m_slide_tick(value: i32, param: u8) -> i32 {
    let a = i32::from(param >> 4);
    let b = i32::from(param & 0x0f);
    if b == 0 && a != 0 {
        value + a
    } else if a == 0 && b != 0 {
        value - b
    } else {
        value
    }
}

/// Row-start part of an S3M portamento: `Fx` is fine, `Ex` extra fine.
fn s3m_fine_porta(param: u8) -> i32 {
    let amount = i32::from(param & 0x0f);
    match param >> 4 {
        0x0f => amount * 4,
        0x0e => amount,
        _ => 0,
    }
}

fn pattern_loop(ctx: &mut EffectContext<'_>, param: u8) {
    let pattern_loop = &mut ctx.state.effect_state.pattern_loop;
    if param == 0 {
        pattern_loop.row = ctx.player.row;
        return;
    }
    let count = match pattern_loop.count {
        None => param,
        Some(0) => {
            pattern_loop.count = None;
            return;
        }
        Some(count) => count,
    };
    pattern_loop.count = Some(count - 1);
    ctx.player.loop_break_to_row = Some(pattern_loop.row);
    ctx.player.loop_jump_to_order = Some(ctx.player.pos);
}

/// Sample a note-delayed cell will play, resolved at row start.
fn delayed_sample(song: &Song, trig: &RowTrigger) -> Option<SampleId> {
    let note = trig.cell.note.number().or_else(|| period_to_note(trig.period))?;
    let instrument = song.instrument(trig.cell.instrument)?;
    let index = instrument.sample_index(note)?;
    Some(SampleId::new(u16::from(trig.cell.instrument) - 1, index))
}

fn fire_delayed_note(ctx: &mut EffectContext<'_>, delayed: DelayedNote) {
    if let Some(id) = delayed.sample {
        if let Some(sample) = ctx.song.sample(id) {
            ctx.mixer.set_sample(ctx.channel, id, sample);
            ctx.state.set_volume(i32::from(sample.volume));
            ctx.state.pitch_ofs = if sample.pitch_ofs > 0.0 { sample.pitch_ofs } else { 1.0 };
            ctx.state.sample = Some(id);
        }
    }
    let period = delayed.cell.note.number().map_or(0, note_to_period);
    if period > 0 {
        ctx.state.period = period;
        ctx.state.last_period = period;
        ctx.mixer.set_sample_position(ctx.channel, 0);
    }
    if let Some(volume) = delayed.cell.volume {
        ctx.state.set_volume(i32::from(volume));
    }
}

/// Negate the next point of the loop once enough delay has built up.
fn invert_loop_tick(ctx: &mut EffectContext<'_>, param: u8) {
    let invert = &mut ctx.state.effect_state.invert_loop;
    invert.delay = invert
        .delay
        .saturating_add(INVERT_LOOP_TABLE[usize::from(param & 0x0f)]);
    let Some(sample) = invert.sample.and_then(|id| ctx.song.sample_mut(id)) else {
        return;
    };
    let repeat_len = sample.repeat_len();
    if repeat_len <= 2 || invert.delay < 128 {
        return;
    }
    invert.delay = 0;
    invert.pos += 1;
    if invert.pos > repeat_len {
        invert.pos = 0;
    }
    sample.invert_point(sample.repeat_start + invert.pos);
}
