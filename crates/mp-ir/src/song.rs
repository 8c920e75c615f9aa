//! Song structure and order list.

use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::instrument::Instrument;
use crate::pattern::Pattern;
use crate::sample::{Sample, SampleBank, SampleId};

/// Amiga PAL clock in period units (MOD).
pub const PAL_CLOCK: f64 = 7_093_789.2 * 4.0;

/// NTSC clock in period units (S3M).
pub const NTSC_CLOCK: f64 = 7_159_090.5 * 4.0;

/// Default channel panning, hard-ish left/right in the Amiga L R R L layout.
pub const AMIGA_PAN: f32 = 0.8;

/// Which format a song came from; selects its effect map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModuleKind {
    #[default]
    Mod,
    S3m,
    Xm,
}

/// A complete song.
///
/// Immutable after decoding except for sample data (see [`Sample`]).
#[derive(Clone, Debug)]
pub struct Song {
    /// Song title
    pub title: ArrayString<32>,
    /// Source format
    pub kind: ModuleKind,
    /// Format tag as found in the file (`M.K.`, `SCRM`, ...)
    pub tag: ArrayString<4>,
    /// Number of channels
    pub channels: u8,
    /// Order list
    pub orders: Vec<OrderEntry>,
    /// Patterns
    pub patterns: Vec<Pattern>,
    /// Instruments, each owning its samples
    pub instruments: Vec<Instrument>,
    /// Playback clock in period units
    pub clock: f64,
    /// Initial speed (ticks per row)
    pub initial_speed: u8,
    /// Initial tempo (BPM)
    pub initial_tempo: u8,
    /// Initial global volume (0-64)
    pub global_volume: u8,
    /// Master volume as stored by the tracker
    pub master_volume: u8,
    /// Default pan per channel (-1..1, outside = surround)
    pub default_pan: Vec<f32>,
    /// S3M fast volume slides (slides also act on tick 0)
    pub fast_volume_slides: bool,
}

impl Default for Song {
    fn default() -> Self {
        Self {
            title: ArrayString::new(),
            kind: ModuleKind::Mod,
            tag: ArrayString::new(),
            channels: 0,
            orders: Vec::new(),
            patterns: Vec::new(),
            instruments: Vec::new(),
            clock: PAL_CLOCK,
            initial_speed: 6,
            initial_tempo: 125,
            global_volume: 64,
            master_volume: 64,
            default_pan: Vec::new(),
            fast_volume_slides: false,
        }
    }
}

impl Song {
    /// Create a new empty song.
    pub fn new(title: &str) -> Self {
        let mut song = Self::default();
        for c in title.chars() {
            if song.title.try_push(c).is_err() {
                break;
            }
        }
        song
    }

    /// Create a song with `num_channels` channels panned L R R L.
    pub fn with_channels(title: &str, num_channels: u8) -> Self {
        let mut song = Self::new(title);
        song.channels = num_channels;
        song.default_pan = (0..num_channels)
            .map(|i| if i % 4 == 0 || i % 4 == 3 { -AMIGA_PAN } else { AMIGA_PAN })
            .collect();
        song
    }

    /// Pattern played at an order position, if that slot names a loaded pattern.
    pub fn pattern_at(&self, order: usize) -> Option<&Pattern> {
        match self.orders.get(order)? {
            OrderEntry::Pattern(p) => self.patterns.get(*p as usize),
            OrderEntry::Skip | OrderEntry::End => None,
        }
    }

    /// Returns true if the order position names a loaded pattern.
    pub fn is_playable(&self, order: usize) -> bool {
        self.pattern_at(order).is_some()
    }

    /// Number of order slots before the first end marker.
    pub fn song_length(&self) -> usize {
        self.orders
            .iter()
            .position(|o| *o == OrderEntry::End)
            .unwrap_or(self.orders.len())
    }

    /// First playable order position.
    pub fn first_playable(&self) -> Option<usize> {
        (0..self.song_length()).find(|&pos| self.is_playable(pos))
    }

    /// Instrument for a 1-based instrument number (0 = none).
    pub fn instrument(&self, number: u8) -> Option<&Instrument> {
        self.instruments.get(usize::from(number).checked_sub(1)?)
    }

    /// Mutable sample access, used by effects that rewrite waveform data.
    pub fn sample_mut(&mut self, id: SampleId) -> Option<&mut Sample> {
        self.instruments
            .get_mut(id.instrument as usize)?
            .samples
            .get_mut(id.sample as usize)
    }
}

impl SampleBank for Song {
    fn sample(&self, id: SampleId) -> Option<&Sample> {
        self.instruments
            .get(id.instrument as usize)?
            .samples
            .get(id.sample as usize)
    }
}

/// An entry in the order list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderEntry {
    /// Play pattern with this index
    Pattern(u8),
    /// Skip marker (+++), continue to next
    Skip,
    /// End of song marker (---)
    End,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn two_pattern_song() -> Song {
        let mut song = Song::with_channels("t", 4);
        song.patterns = vec![Pattern::new(64, 4), Pattern::new(32, 4)];
        song
    }

    #[test]
    fn default_pan_is_lrrl() {
        let song = Song::with_channels("t", 5);
        assert_eq!(song.default_pan, vec![-0.8, 0.8, 0.8, -0.8, -0.8]);
    }

    #[test]
    fn song_length_stops_at_end_marker() {
        let mut song = two_pattern_song();
        song.orders = vec![
            OrderEntry::Pattern(0),
            OrderEntry::Skip,
            OrderEntry::End,
            OrderEntry::Pattern(1),
        ];
        assert_eq!(song.song_length(), 2);
        assert!(song.is_playable(0));
        assert!(!song.is_playable(1));
        assert!(!song.is_playable(2));
    }

    #[test]
    fn first_playable_skips_markers_and_missing_patterns() {
        let mut song = two_pattern_song();
        song.orders = vec![OrderEntry::Skip, OrderEntry::Pattern(9), OrderEntry::Pattern(1)];
        assert_eq!(song.first_playable(), Some(2));
        assert_eq!(song.pattern_at(2).map(|p| p.rows), Some(32));
    }

    #[test]
    fn no_playable_orders() {
        let song = two_pattern_song();
        assert_eq!(song.first_playable(), None);
    }

    #[test]
    fn instrument_numbers_are_one_based() {
        let mut song = two_pattern_song();
        song.instruments.push(Instrument::with_sample("a", Sample::new("s")));
        assert!(song.instrument(0).is_none());
        assert!(song.instrument(1).is_some());
        assert!(song.sample(SampleId::new(0, 0)).is_some());
        assert!(song.sample(SampleId::new(0, 1)).is_none());
        assert!(song.sample_mut(SampleId::new(1, 0)).is_none());
    }
}
