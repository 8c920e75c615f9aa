//! Period-to-frequency conversion and production interval.

use mp_ir::{note_to_period, period_to_note};

/// Playback frequency in Hz for a period.
///
/// `clock / (period * 2) * pitch_ofs`; non-positive periods are silent.
pub fn period_to_frequency(clock: f64, period: i32, pitch_ofs: f64) -> f64 {
    if period <= 0 {
        return 0.0;
    }
    clock / (period as f64 * 2.0) * pitch_ofs
}

/// Quantize a period to the nearest exact semitone period.
pub fn glissando_period(period: i32) -> i32 {
    period_to_note(period).map_or(period, note_to_period)
}

/// Seconds of audio produced per pull at a tempo: one tick, `1 / (bpm * 2 / 5)`.
pub fn seconds_per_mix(tempo: u8) -> f64 {
    1.0 / (f64::from(tempo) * 2.0 / 5.0)
}

/// Frames produced by one pull.
pub fn mix_len(sample_rate: u32, seconds_per_mix: f64) -> usize {
    let len = f64::from(sample_rate) * seconds_per_mix;
    if len > 0.0 {
        len as usize
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mp_ir::PAL_CLOCK;

    #[test]
    fn c4_on_pal_clock() {
        // 7093789.2 / (428 * 2) ~ 8287 Hz
        let f = period_to_frequency(PAL_CLOCK, 1712, 1.0);
        assert!((f - 8287.14).abs() < 0.01, "got {f}");
    }

    #[test]
    fn octave_up_doubles() {
        let c4 = period_to_frequency(PAL_CLOCK, 1712, 1.0);
        let c5 = period_to_frequency(PAL_CLOCK, 856, 1.0);
        assert!((c5 - 2.0 * c4).abs() < 1e-9);
    }

    #[test]
    fn pitch_offset_scales() {
        let base = period_to_frequency(PAL_CLOCK, 1712, 1.0);
        let up = period_to_frequency(PAL_CLOCK, 1712, 1.5);
        assert!((up - 1.5 * base).abs() < 1e-9);
    }

    #[test]
    fn zero_period_is_silent() {
        assert_eq!(period_to_frequency(PAL_CLOCK, 0, 1.0), 0.0);
        assert_eq!(period_to_frequency(PAL_CLOCK, -4, 1.0), 0.0);
    }

    #[test]
    fn glissando_snaps_to_semitone() {
        assert_eq!(glissando_period(1712), 1712);
        assert_eq!(glissando_period(1700), 1712);
        assert_eq!(glissando_period(1630), 1616);
        assert_eq!(glissando_period(0), 0);
    }

    #[test]
    fn production_interval() {
        assert!((seconds_per_mix(125) - 0.02).abs() < 1e-12);
        assert_eq!(mix_len(44100, seconds_per_mix(125)), 882);
        assert_eq!(mix_len(48000, 0.1), 4800);
        assert_eq!(mix_len(44100, 0.0), 0);
    }
}
