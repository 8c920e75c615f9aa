//! Pattern and cell types.

use alloc::vec::Vec;

/// A note value in a pattern cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Note {
    /// No note
    #[default]
    None,
    /// Note on (0-119, where 48 = C-4)
    On(u8),
    /// Note cut: stop the channel
    Cut,
}

impl Note {
    /// Create a note from octave (0-9) and semitone (0-11).
    pub const fn from_octave_semitone(octave: u8, semitone: u8) -> Self {
        Note::On(octave * 12 + semitone)
    }

    /// Note number if this is a note on.
    pub const fn number(self) -> Option<u8> {
        match self {
            Note::On(n) => Some(n),
            _ => None,
        }
    }
}

/// Volume-column effect: a raw effect code resolved through the song's effect map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VolumeEffect {
    pub code: u8,
    pub param: u8,
}

/// A single cell in a pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    /// Note value
    pub note: Note,
    /// Instrument number (0 = none, 1-255 = instrument index + 1)
    pub instrument: u8,
    /// Explicit volume (0-64)
    pub volume: Option<u8>,
    /// Raw effect code for the song's effect map
    pub effect: u8,
    /// Effect parameter
    pub param: u8,
    /// Volume column effect
    pub volume_effect: Option<VolumeEffect>,
}

impl Cell {
    /// Create an empty cell.
    pub const fn empty() -> Self {
        Self {
            note: Note::None,
            instrument: 0,
            volume: None,
            effect: 0,
            param: 0,
            volume_effect: None,
        }
    }

    /// Returns true if the cell is completely empty.
    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }
}

/// A pattern containing rows of cells across channels.
#[derive(Clone, Debug)]
pub struct Pattern {
    /// Number of rows
    pub rows: u16,
    /// Number of channels
    pub channels: u8,
    /// Pattern data, stored row-major: data[row * channels + channel]
    pub data: Vec<Cell>,
}

impl Pattern {
    /// Create a new pattern with empty cells.
    pub fn new(rows: u16, channels: u8) -> Self {
        Self {
            rows,
            channels,
            data: alloc::vec![Cell::empty(); rows as usize * channels as usize],
        }
    }

    /// Get a reference to a cell.
    pub fn cell(&self, row: u16, channel: u8) -> &Cell {
        debug_assert!(row < self.rows);
        debug_assert!(channel < self.channels);
        &self.data[row as usize * self.channels as usize + channel as usize]
    }

    /// Get a mutable reference to a cell.
    pub fn cell_mut(&mut self, row: u16, channel: u8) -> &mut Cell {
        debug_assert!(row < self.rows);
        debug_assert!(channel < self.channels);
        &mut self.data[row as usize * self.channels as usize + channel as usize]
    }

    /// All cells of a row, or `None` past the last row.
    pub fn row(&self, row: u16) -> Option<&[Cell]> {
        if row >= self.rows {
            return None;
        }
        let start = row as usize * self.channels as usize;
        self.data.get(start..start + self.channels as usize)
    }
}
