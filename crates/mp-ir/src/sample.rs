//! Sample data types.

use alloc::vec::Vec;
use arrayvec::{ArrayString, ArrayVec};

/// Locates a sample inside a song: instrument index, then sample index within it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SampleId {
    pub instrument: u16,
    pub sample: u16,
}

impl SampleId {
    pub const fn new(instrument: u16, sample: u16) -> Self {
        Self { instrument, sample }
    }
}

/// Read access to samples by id. The mixer only ever reads through this.
pub trait SampleBank {
    fn sample(&self, id: SampleId) -> Option<&Sample>;
}

/// A decoded sample.
///
/// Waveform data is one `Vec<f32>` per channel, normalized to -1..1.
/// Data is owned by the instrument and is mutable: the invert-loop effect
/// negates points inside the loop while playing, which is the only change
/// made to a song after decoding.
#[derive(Clone, Debug)]
pub struct Sample {
    /// Sample name
    pub name: ArrayString<28>,
    /// Normalized audio data, one vector per channel
    pub data: ArrayVec<Vec<f32>, 2>,
    /// Bit depth of the source data
    pub bits: u8,
    /// Playable length in frames
    pub length: usize,
    /// Loop type
    pub loop_type: LoopType,
    /// Loop start (frames)
    pub repeat_start: usize,
    /// Loop end (frames, exclusive)
    pub repeat_end: usize,
    /// Pitch multiplier from finetune / C2 speed
    pub pitch_ofs: f64,
    /// Default volume (0-64)
    pub volume: u8,
}

/// Defaults: empty 8-bit mono sample, no loop, pitch 1.0, full volume.
impl Default for Sample {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            data: ArrayVec::new(),
            bits: 8,
            length: 0,
            loop_type: LoopType::NonRepeating,
            repeat_start: 0,
            repeat_end: 0,
            pitch_ofs: 1.0,
            volume: 64,
        }
    }
}

impl Sample {
    /// Create a new empty sample.
    pub fn new(name: &str) -> Self {
        let mut sample = Self::default();
        for c in name.chars() {
            if sample.name.try_push(c).is_err() {
                break;
            }
        }
        sample
    }

    /// Length in frames.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns true if the sample has no frames.
    pub fn is_empty(&self) -> bool {
        self.length == 0 || self.data.is_empty()
    }

    /// Number of channels of waveform data.
    pub fn channels(&self) -> usize {
        self.data.len()
    }

    /// Returns true if playback wraps inside a loop.
    pub fn has_loop(&self) -> bool {
        self.loop_type == LoopType::Normal && self.repeat_end > self.repeat_start
    }

    /// Loop length in frames (0 when not looping).
    pub fn repeat_len(&self) -> usize {
        if self.has_loop() {
            self.repeat_end - self.repeat_start
        } else {
            0
        }
    }

    /// Bring the loop into the playable range.
    ///
    /// The end is clamped to the sample length; a loop that ends up empty
    /// is dropped.
    pub fn normalize_loop(&mut self) {
        if self.loop_type != LoopType::Normal {
            return;
        }
        self.repeat_end = self.repeat_end.min(self.length);
        if self.repeat_end <= self.repeat_start {
            self.loop_type = LoopType::NonRepeating;
        }
    }

    /// Duplicate the frame at `repeat_end` into `repeat_end + 1`.
    ///
    /// Gives a read one past the loop end for interpolation across the seam.
    pub fn pad_loop_seam(&mut self) {
        if !self.has_loop() {
            return;
        }
        let end = self.repeat_end;
        for channel in self.data.iter_mut() {
            let seam = channel
                .get(end)
                .or(channel.last())
                .copied()
                .unwrap_or(0.0);
            if channel.len() < end + 2 {
                channel.resize(end + 2, seam);
            }
            channel[end + 1] = seam;
        }
    }

    /// Negate one point of every channel. Out-of-range indexes are ignored.
    pub fn invert_point(&mut self, index: usize) {
        for channel in self.data.iter_mut() {
            if let Some(v) = channel.get_mut(index) {
                *v = -*v;
            }
        }
    }
}

/// Sample loop type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopType {
    /// Play once
    #[default]
    NonRepeating,
    /// Forward loop between repeat_start and repeat_end
    Normal,
}
