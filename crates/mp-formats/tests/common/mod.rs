//! Synthetic module builders.
//!
//! Tests build MOD and S3M files byte by byte instead of shipping binary
//! fixtures. Only the fields the decoders read are filled in.

#![allow(dead_code)]

/// One MOD sample: signed 8-bit data, loop in words.
#[derive(Clone, Debug, Default)]
pub struct ModSample {
    pub name: &'static str,
    pub data: Vec<i8>,
    pub volume: u8,
    pub finetune: u8,
    pub repeat_start: u16,
    pub repeat_length: u16,
}

/// A ProTracker module under construction.
#[derive(Clone, Debug)]
pub struct ModFile {
    pub title: &'static str,
    pub tag: [u8; 4],
    pub channels: usize,
    pub song_length: u8,
    pub orders: Vec<u8>,
    pub samples: Vec<ModSample>,
    /// (pattern, row, channel, cell bytes)
    pub cells: Vec<(usize, usize, usize, [u8; 4])>,
}

impl ModFile {
    /// Four-channel `M.K.` module playing pattern 0 once.
    pub fn new() -> Self {
        Self {
            title: "synthetic",
            tag: *b"M.K.",
            channels: 4,
            song_length: 1,
            orders: vec![0],
            samples: Vec::new(),
            cells: Vec::new(),
        }
    }

    pub fn cell(mut self, pattern: usize, row: usize, channel: usize, cell: [u8; 4]) -> Self {
        self.cells.push((pattern, row, channel, cell));
        self
    }

    pub fn sample(mut self, sample: ModSample) -> Self {
        self.samples.push(sample);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(padded(self.title, 20));
        for i in 0..31 {
            let sample = self.samples.get(i).cloned().unwrap_or_default();
            out.extend(padded(sample.name, 22));
            out.extend(((sample.data.len() / 2) as u16).to_be_bytes());
            out.push(sample.finetune);
            out.push(sample.volume);
            out.extend(sample.repeat_start.to_be_bytes());
            out.extend(sample.repeat_length.max(1).to_be_bytes());
        }
        out.push(self.song_length);
        out.push(127);
        let mut orders = [0u8; 128];
        orders[..self.orders.len()].copy_from_slice(&self.orders);
        out.extend(orders);
        out.extend(self.tag);

        let patterns = usize::from(orders.iter().copied().max().unwrap_or(0)) + 1;
        let pattern_len = 64 * 4 * self.channels;
        let base = out.len();
        out.resize(base + pattern_len * patterns, 0);
        for &(pattern, row, channel, cell) in &self.cells {
            let at = base + pattern * pattern_len + (row * self.channels + channel) * 4;
            out[at..at + 4].copy_from_slice(&cell);
        }

        for sample in &self.samples {
            out.extend(sample.data.iter().map(|&b| b as u8));
        }
        out
    }
}

impl Default for ModFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Pack a MOD cell: Amiga period, instrument, effect, parameter.
pub fn mod_cell(period: u16, instrument: u8, effect: u8, param: u8) -> [u8; 4] {
    [
        (instrument & 0xf0) | ((period >> 8) as u8 & 0x0f),
        period as u8,
        ((instrument & 0x0f) << 4) | (effect & 0x0f),
        param,
    ]
}

/// Square wave that loops over its whole length.
pub fn square_sample(volume: u8) -> ModSample {
    let data: Vec<i8> = (0..64).map(|i| if i < 32 { 100 } else { -100 }).collect();
    ModSample {
        name: "square",
        repeat_start: 0,
        repeat_length: (data.len() / 2) as u16,
        data,
        volume,
        finetune: 0,
    }
}

/// One S3M sample: unsigned 8-bit mono data.
#[derive(Clone, Debug, Default)]
pub struct S3mSample {
    pub name: &'static str,
    pub data: Vec<u8>,
    pub volume: u8,
    pub c2spd: u32,
    pub looped: Option<(u32, u32)>,
}

/// A Scream Tracker 3 module under construction.
#[derive(Clone, Debug)]
pub struct S3mFile {
    pub title: &'static str,
    pub channels: usize,
    pub orders: Vec<u8>,
    pub samples: Vec<S3mSample>,
    /// Packed pattern bodies, without the length word
    pub patterns: Vec<Vec<u8>>,
    /// Added to each pattern's declared length
    pub length_skew: i16,
    pub tracker_version: u16,
    /// Bit 0x80 selects stereo default panning
    pub master_volume: u8,
    pub pan_table: Option<[u8; 32]>,
}

impl S3mFile {
    /// Four-channel stereo module with one empty pattern.
    pub fn new() -> Self {
        Self {
            title: "synthetic s3m",
            channels: 4,
            orders: vec![0, 255],
            samples: Vec::new(),
            patterns: vec![packed_pattern(&[])],
            length_skew: 0,
            tracker_version: 0x1320,
            master_volume: 0xb0,
            pan_table: None,
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![0u8; 0x60];
        out[..self.title.len()].copy_from_slice(self.title.as_bytes());
        out[0x1c] = 0x1a;
        out[0x1d] = 0x10;
        out[0x20..0x22].copy_from_slice(&(self.orders.len() as u16).to_le_bytes());
        out[0x22..0x24].copy_from_slice(&(self.samples.len() as u16).to_le_bytes());
        out[0x24..0x26].copy_from_slice(&(self.patterns.len() as u16).to_le_bytes());
        out[0x28..0x2a].copy_from_slice(&self.tracker_version.to_le_bytes());
        out[0x2a] = 2;
        out[0x2c..0x30].copy_from_slice(b"SCRM");
        out[0x30] = 64;
        out[0x31] = 6;
        out[0x32] = 125;
        out[0x33] = self.master_volume;
        if self.pan_table.is_some() {
            out[0x35] = 0xfc;
        }
        for (i, setting) in out[0x40..0x60].iter_mut().enumerate() {
            *setting = if i < self.channels { i as u8 } else { 255 };
        }

        out.extend(&self.orders);
        let instrument_pp = out.len();
        out.resize(instrument_pp + self.samples.len() * 2, 0);
        let pattern_pp = out.len();
        out.resize(pattern_pp + self.patterns.len() * 2, 0);
        if let Some(table) = self.pan_table {
            out.extend(table);
        }

        let mut records = Vec::new();
        for (i, sample) in self.samples.iter().enumerate() {
            let at = align(&mut out);
            set_word(&mut out, instrument_pp + i * 2, (at / 16) as u16);
            let mut record = [0u8; 0x50];
            record[0] = 1;
            record[0x10..0x14].copy_from_slice(&(sample.data.len() as u32).to_le_bytes());
            if let Some((start, end)) = sample.looped {
                record[0x14..0x18].copy_from_slice(&start.to_le_bytes());
                record[0x18..0x1c].copy_from_slice(&end.to_le_bytes());
                record[0x1f] = 1;
            }
            record[0x1c] = sample.volume;
            record[0x20..0x24].copy_from_slice(&sample.c2spd.to_le_bytes());
            record[0x30..0x30 + sample.name.len()].copy_from_slice(sample.name.as_bytes());
            record[0x4c..0x50].copy_from_slice(b"SCRS");
            out.extend(record);
            records.push(at);
        }

        for (i, body) in self.patterns.iter().enumerate() {
            let at = align(&mut out);
            set_word(&mut out, pattern_pp + i * 2, (at / 16) as u16);
            let declared = (body.len() as i16 + 2 + self.length_skew) as u16;
            out.extend(declared.to_le_bytes());
            out.extend(body);
        }

        for (sample, record) in self.samples.iter().zip(records) {
            let at = align(&mut out) / 16;
            out[record + 0x0d] = (at >> 16) as u8;
            set_word(&mut out, record + 0x0e, at as u16);
            out.extend(&sample.data);
        }
        out
    }
}

impl Default for S3mFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Pack 64 rows of `(row, group bytes)` events into an S3M pattern body.
pub fn packed_pattern(events: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    for row in 0..64 {
        for (_, group) in events.iter().filter(|(r, _)| *r == row) {
            body.extend_from_slice(group);
        }
        body.push(0);
    }
    body
}

/// Unsigned 8-bit square wave.
pub fn s3m_square(volume: u8) -> S3mSample {
    S3mSample {
        name: "square",
        data: (0..64).map(|i| if i < 32 { 0xe0 } else { 0x20 }).collect(),
        volume,
        c2spd: 8363,
        looped: Some((0, 64)),
    }
}

fn padded(text: &str, len: usize) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.resize(len, 0);
    bytes
}

fn align(out: &mut Vec<u8>) -> usize {
    let at = out.len().div_ceil(16) * 16;
    out.resize(at, 0);
    at
}

fn set_word(out: &mut [u8], at: usize, value: u16) {
    out[at..at + 2].copy_from_slice(&value.to_le_bytes());
}
