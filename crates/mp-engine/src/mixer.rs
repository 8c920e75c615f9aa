//! Sample mixer.
//!
//! Holds one playback cursor per channel and, on each pull, resamples every
//! enabled channel into a pair of stereo buffers. The mixer knows nothing
//! about effects: the sequencer drives it through the setters below and
//! through [`MixSource::pre_mix`], called at the start of every pull.
//!
//! Channel indexes are sized at song load; setters ignore indexes past the
//! channel count.

use alloc::vec::Vec;
use mp_ir::{Sample, SampleBank, SampleId};

use crate::filter::AmigaLowPass;
use crate::frequency::mix_len;

/// Mixer construction parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MixerConfig {
    /// Number of channels (default 8)
    pub channels: usize,
    /// Global volume, 0-64 (default 64)
    pub global_volume: u8,
    /// Seconds produced per pull (default 0.1)
    pub seconds_per_mix: f64,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            channels: 8,
            global_volume: 64,
            seconds_per_mix: 0.1,
        }
    }
}

/// Something that updates the mixer before each pull and owns the sample data.
pub trait MixSource: SampleBank {
    fn pre_mix(&mut self, mixer: &mut Mixer, sample_rate: u32);
}

/// One pull of stereo output.
#[derive(Clone, Copy, Debug)]
pub struct MixOutput<'a> {
    /// Frames produced
    pub len: usize,
    pub left: &'a [f32],
    pub right: &'a [f32],
}

/// Per-channel playback cursor.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ChannelCursor {
    pan: f32,
    frequency: f64,
    sample: Option<SampleId>,
    length: usize,
    /// Loop start and end, for looping samples
    repeat: Option<(usize, usize)>,
    position: Option<f64>,
    volume: u8,
    enabled: bool,
}

impl Default for ChannelCursor {
    fn default() -> Self {
        Self {
            pan: 0.0,
            frequency: 0.0,
            sample: None,
            length: 0,
            repeat: None,
            position: None,
            volume: 64,
            enabled: true,
        }
    }
}

/// The mixer.
pub struct Mixer {
    channels: Vec<ChannelCursor>,
    global_volume: u8,
    seconds_per_mix: f64,
    filters: [AmigaLowPass; 2],
    filters_engaged: bool,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl Mixer {
    pub fn new(config: MixerConfig) -> Self {
        Self {
            channels: alloc::vec![ChannelCursor::default(); config.channels],
            global_volume: config.global_volume.min(64),
            seconds_per_mix: config.seconds_per_mix,
            filters: [AmigaLowPass::new(); 2],
            filters_engaged: false,
            left: Vec::new(),
            right: Vec::new(),
        }
    }

    /// Number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Resize to `channels` channels, resetting every cursor.
    pub fn set_channel_count(&mut self, channels: usize) {
        self.channels.clear();
        self.channels.resize(channels, ChannelCursor::default());
    }

    /// Reserve output buffers for pulls of up to `frames` frames.
    pub fn reserve(&mut self, frames: usize) {
        self.left.reserve(frames.saturating_sub(self.left.len()));
        self.right.reserve(frames.saturating_sub(self.right.len()));
    }

    /// Assign a sample to a channel without restarting it.
    pub fn set_sample(&mut self, channel: usize, id: SampleId, sample: &Sample) {
        if let Some(c) = self.channels.get_mut(channel) {
            c.sample = Some(id);
            c.length = sample.len();
            c.repeat = sample
                .has_loop()
                .then_some((sample.repeat_start, sample.repeat_end));
        }
    }

    /// Assign a sample and start it from the beginning at its own volume.
    pub fn trigger_sample(
        &mut self,
        channel: usize,
        id: SampleId,
        sample: &Sample,
        frequency: f64,
    ) {
        self.set_sample(channel, id, sample);
        if let Some(c) = self.channels.get_mut(channel) {
            c.frequency = frequency;
            c.position = Some(0.0);
            c.volume = sample.volume;
        }
    }

    /// Move the cursor of the assigned sample.
    ///
    /// Offsets past the end of a looping sample are wrapped back by whole
    /// loop lengths; an offset still past the end stops the channel.
    pub fn set_sample_position(&mut self, channel: usize, offset: usize) {
        let Some(c) = self.channels.get_mut(channel) else {
            return;
        };
        if c.sample.is_none() {
            return;
        }
        let mut offset = offset;
        if let Some((start, end)) = c.repeat {
            let len = end - start;
            while offset > c.length {
                offset -= len;
            }
        }
        c.position = (offset < c.length).then_some(offset as f64);
    }

    pub fn set_frequency(&mut self, channel: usize, frequency: f64) {
        if let Some(c) = self.channels.get_mut(channel) {
            c.frequency = frequency;
        }
    }

    pub fn set_volume(&mut self, channel: usize, volume: u8) {
        if let Some(c) = self.channels.get_mut(channel) {
            c.volume = volume.min(64);
        }
    }

    pub fn set_pan(&mut self, channel: usize, pan: f32) {
        if let Some(c) = self.channels.get_mut(channel) {
            c.pan = pan;
        }
    }

    /// Stop a channel and drop its sample.
    pub fn cut(&mut self, channel: usize) {
        if let Some(c) = self.channels.get_mut(channel) {
            c.position = None;
            c.sample = None;
        }
    }

    pub fn enable_channels(&mut self, channels: &[usize]) {
        for &ch in channels {
            if let Some(c) = self.channels.get_mut(ch) {
                c.enabled = true;
            }
        }
    }

    pub fn disable_channels(&mut self, channels: &[usize]) {
        for &ch in channels {
            if let Some(c) = self.channels.get_mut(ch) {
                c.enabled = false;
            }
        }
    }

    pub fn set_global_volume(&mut self, volume: u8) {
        self.global_volume = volume.min(64);
    }

    pub fn global_volume(&self) -> u8 {
        self.global_volume
    }

    pub fn set_seconds_per_mix(&mut self, seconds: f64) {
        self.seconds_per_mix = seconds;
    }

    pub fn seconds_per_mix(&self) -> f64 {
        self.seconds_per_mix
    }

    /// Route output through the low-pass pair. Filter history is kept while disengaged.
    pub fn engage_filters(&mut self, engaged: bool) {
        self.filters_engaged = engaged;
    }

    pub fn filters_engaged(&self) -> bool {
        self.filters_engaged
    }

    /// Cursor position of a channel, if it is playing.
    pub fn position(&self, channel: usize) -> Option<f64> {
        self.channels.get(channel).and_then(|c| c.position)
    }

    /// Sample assigned to a channel.
    pub fn sample(&self, channel: usize) -> Option<SampleId> {
        self.channels.get(channel).and_then(|c| c.sample)
    }

    pub fn frequency(&self, channel: usize) -> f64 {
        self.channels.get(channel).map_or(0.0, |c| c.frequency)
    }

    pub fn volume(&self, channel: usize) -> u8 {
        self.channels.get(channel).map_or(0, |c| c.volume)
    }

    pub fn pan(&self, channel: usize) -> f32 {
        self.channels.get(channel).map_or(0.0, |c| c.pan)
    }

    /// Let `source` update channel parameters, then mix.
    pub fn pull<S>(&mut self, sample_rate: u32, source: &mut S) -> MixOutput<'_>
    where
        S: MixSource + ?Sized,
    {
        source.pre_mix(self, sample_rate);
        self.mix(sample_rate, &*source)
    }

    /// Mix one buffer of `floor(sample_rate * seconds_per_mix)` frames.
    ///
    /// Channels are summed in index order and the first disabled channel
    /// ends the loop. Samples missing from `bank` are silent.
    pub fn mix<B: SampleBank + ?Sized>(&mut self, sample_rate: u32, bank: &B) -> MixOutput<'_> {
        let len = mix_len(sample_rate, self.seconds_per_mix);
        self.left.clear();
        self.left.resize(len, 0.0);
        self.right.clear();
        self.right.resize(len, 0.0);

        let channel_scale = 1.0 / (self.channels.len() as f32 / 2.0);
        let global = f32::from(self.global_volume) / 64.0;

        for c in self.channels.iter_mut() {
            if !c.enabled {
                break;
            }
            let (ll, rr) = pan_matrix(c.pan);
            let step = if sample_rate > 0 {
                c.frequency / f64::from(sample_rate)
            } else {
                0.0
            };
            let scale = channel_scale * global * (f32::from(c.volume) / 64.0);
            let left_scale = scale * ll;
            let right_scale = scale * rr;

            let Some(mut pos) = c.position else { continue };
            let Some(sample) = c.sample.and_then(|id| bank.sample(id)) else {
                continue;
            };
            let Some(left_data) = sample.data.first() else { continue };
            let right_data = sample.data.get(1).unwrap_or(left_data);
            if step <= 0.0 {
                continue;
            }

            let length = c.length as f64;
            for (l, r) in self.left.iter_mut().zip(self.right.iter_mut()) {
                if pos >= length {
                    break;
                }
                let idx = pos as usize;
                *l += left_data.get(idx).copied().unwrap_or(0.0) * left_scale;
                *r += right_data.get(idx).copied().unwrap_or(0.0) * right_scale;
                pos += step;
                if let Some((start, end)) = c.repeat {
                    let loop_len = (end - start) as f64;
                    while pos >= end as f64 {
                        pos -= loop_len;
                    }
                }
            }
            c.position = Some(pos);
        }

        if self.filters_engaged {
            let [fl, fr] = &mut self.filters;
            for (l, r) in self.left.iter_mut().zip(self.right.iter_mut()) {
                *l = fl.next(*l);
                *r = fr.next(*r);
            }
        }

        MixOutput {
            len,
            left: &self.left,
            right: &self.right,
        }
    }
}

/// Left and right gains for a pan position.
///
/// Linear crossfade inside -1..1; anything outside is the surround
/// setting, full left and inverted right.
pub fn pan_matrix(pan: f32) -> (f32, f32) {
    if (-1.0..=1.0).contains(&pan) {
        let p = (pan + 1.0) / 2.0;
        (1.0 - p, p)
    } else {
        (1.0, -1.0)
    }
}
