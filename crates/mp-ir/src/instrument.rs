//! Instrument and envelope types.

use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::period::NOTE_COUNT;
use crate::sample::Sample;

/// An instrument: a note-to-sample map plus the samples it owns.
#[derive(Clone, Debug)]
pub struct Instrument {
    /// Instrument name
    pub name: ArrayString<32>,
    /// Note (0-119) -> index into `samples`
    pub note_to_sample: [u8; NOTE_COUNT as usize],
    /// Volume envelope
    pub volume_envelope: Envelope,
    /// Panning envelope
    pub panning_envelope: Envelope,
    /// Auto-vibrato settings
    pub vibrato: AutoVibrato,
    /// Volume fadeout speed (0 = none)
    pub fadeout: u16,
    /// Samples owned by this instrument
    pub samples: Vec<Sample>,
}

/// Defaults: every note maps to sample 0, envelopes disabled, no vibrato or fadeout.
impl Default for Instrument {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            note_to_sample: [0; NOTE_COUNT as usize],
            volume_envelope: Envelope::default(),
            panning_envelope: Envelope::default(),
            vibrato: AutoVibrato::default(),
            fadeout: 0,
            samples: Vec::new(),
        }
    }
}

impl Instrument {
    /// Create a new instrument with default settings.
    pub fn new(name: &str) -> Self {
        let mut inst = Self::default();
        for c in name.chars() {
            if inst.name.try_push(c).is_err() {
                break;
            }
        }
        inst
    }

    /// Instrument playing one sample across the whole keyboard.
    pub fn with_sample(name: &str, sample: Sample) -> Self {
        let mut inst = Self::new(name);
        inst.samples.push(sample);
        inst
    }

    /// Index of the sample played for `note`, if the map points at one.
    pub fn sample_index(&self, note: u8) -> Option<u16> {
        let index = *self.note_to_sample.get(note as usize)?;
        (usize::from(index) < self.samples.len()).then_some(u16::from(index))
    }
}

/// Auto-vibrato settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AutoVibrato {
    /// Waveform type (0=sine, 1=ramp down, 2=square, 3=random)
    pub waveform: u8,
    /// Sweep (ramp-up time)
    pub sweep: u8,
    /// Depth
    pub depth: u8,
    /// Rate
    pub rate: u8,
}

/// A volume or panning envelope.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    /// Envelope points
    pub points: Vec<EnvelopePoint>,
    /// Sustain point index
    pub sustain: Option<u8>,
    /// Loop start point index
    pub loop_start: Option<u8>,
    /// Loop end point index
    pub loop_end: Option<u8>,
    /// Is the envelope enabled?
    pub enabled: bool,
}

/// A point in an envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvelopePoint {
    /// Tick position
    pub tick: u16,
    /// Value (0-64 for volume, -32..32 for panning)
    pub value: i8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_sample_instrument_maps_every_note() {
        let inst = Instrument::with_sample("lead", Sample::new("s"));
        assert_eq!(inst.sample_index(0), Some(0));
        assert_eq!(inst.sample_index(119), Some(0));
        assert_eq!(inst.sample_index(120), None);
    }

    #[test]
    fn map_to_missing_sample_is_none() {
        let mut inst = Instrument::with_sample("lead", Sample::new("s"));
        inst.note_to_sample[60] = 3;
        assert_eq!(inst.sample_index(60), None);
        assert_eq!(Instrument::new("empty").sample_index(48), None);
    }
}
