//! Note/period lookup.
//!
//! Periods are Amiga periods scaled by 4 (a MOD period of 428 is 1712 here),
//! which is the unit the whole engine works in. Note 48 is C-4.

use arrayvec::ArrayString;

/// Number of addressable notes (C-0 to B-9).
pub const NOTE_COUNT: u8 = 120;

/// Highest addressable note.
pub const MAX_NOTE: u8 = NOTE_COUNT - 1;

/// Slide floor for pitch effects (highest pitch).
pub const MIN_SLIDE_PERIOD: i32 = 54;

/// Slide ceiling for pitch effects (lowest pitch).
pub const MAX_SLIDE_PERIOD: i32 = 1712 * 4;

/// Octave 4 periods, C-4 to B-4.
const OCTAVE_FOUR: [i32; 12] = [
    1712, 1616, 1524, 1440, 1356, 1280, 1208, 1140, 1076, 1016, 960, 907,
];

const NOTE_NAMES: [&str; 12] = [
    "C-", "C#", "D-", "D#", "E-", "F-", "F#", "G-", "G#", "A-", "A#", "B-",
];

/// Period for a note index. Notes past [`MAX_NOTE`] return 0.
///
/// Each octave halves the period: note 36 = 3424, note 48 = 1712, note 60 = 856.
pub fn note_to_period(note: u8) -> i32 {
    if note >= NOTE_COUNT {
        return 0;
    }
    let octave = (note / 12) as u32;
    (OCTAVE_FOUR[(note % 12) as usize] * 16) >> octave
}

/// Nearest note for a period, or `None` if the period is not positive.
pub fn period_to_note(period: i32) -> Option<u8> {
    if period <= 0 {
        return None;
    }
    let mut best = 0u8;
    let mut best_diff = i32::MAX;
    for note in 0..NOTE_COUNT {
        let diff = (note_to_period(note) - period).abs();
        if diff < best_diff {
            best_diff = diff;
            best = note;
        }
        if diff == 0 {
            break;
        }
    }
    Some(best)
}

/// Pitch multiplier for a finetune in eighths of a semitone (-8..=7).
pub fn finetune_multiplier(finetune: i8) -> f64 {
    libm::pow(2.0, finetune as f64 / 96.0)
}

/// Tracker-style note name, e.g. `C-4` or `F#2`.
pub fn note_name(note: u8) -> ArrayString<3> {
    let mut name = ArrayString::new();
    if note < NOTE_COUNT {
        name.push_str(NOTE_NAMES[(note % 12) as usize]);
        name.push((b'0' + note / 12) as char);
    } else {
        name.push_str("???");
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c4_is_protracker_c2() {
        assert_eq!(note_to_period(48), 428 * 4);
    }

    #[test]
    fn octaves_halve_the_period() {
        assert_eq!(note_to_period(36), 3424);
        assert_eq!(note_to_period(60), 856);
        assert_eq!(note_to_period(72), 428);
    }

    #[test]
    fn sharps_follow_the_table() {
        assert_eq!(note_to_period(49), 1616);
        assert_eq!(note_to_period(37), 3232);
    }

    #[test]
    fn out_of_range_note_has_no_period() {
        assert_eq!(note_to_period(NOTE_COUNT), 0);
        assert_eq!(note_to_period(255), 0);
    }

    #[test]
    fn every_note_round_trips() {
        for note in 0..NOTE_COUNT {
            let period = note_to_period(note);
            assert_eq!(period_to_note(period), Some(note), "note {}", note);
        }
    }

    #[test]
    fn period_to_note_picks_nearest() {
        // Between C-4 (1712) and C#4 (1616), closer to C#4
        assert_eq!(period_to_note(1650), Some(49));
        assert_eq!(period_to_note(1700), Some(48));
    }

    #[test]
    fn non_positive_period_has_no_note() {
        assert_eq!(period_to_note(0), None);
        assert_eq!(period_to_note(-12), None);
    }

    #[test]
    fn finetune_eighth_semitones() {
        assert_eq!(finetune_multiplier(0), 1.0);
        let up = finetune_multiplier(7);
        let down = finetune_multiplier(-8);
        assert!((up - 1.051_841).abs() < 1e-5);
        assert!((down - 0.943_874).abs() < 1e-5);
    }

    #[test]
    fn note_names() {
        assert_eq!(note_name(48).as_str(), "C-4");
        assert_eq!(note_name(61).as_str(), "C#5");
        assert_eq!(note_name(200).as_str(), "???");
    }
}
