//! ProTracker MOD format parser.

use alloc::vec::Vec;
use binrw::io::Cursor;
use binrw::BinRead;
use mp_ir::{
    finetune_multiplier, period_to_note, Cell, Instrument, LoopType, ModuleKind, Note,
    OrderEntry, Pattern, Sample, Song, PAL_CLOCK,
};
use tracing::{debug, warn};

use crate::pcm::{decode_pcm, PcmFormat};
use crate::{parse_name, slice, FormatError};

const TAG_OFFSET: usize = 1080;
const ROWS: u16 = 64;
const SAMPLE_HEADER_LEN: usize = 30;

/// Finetune nibble to eighths of a semitone.
const FINETUNE: [i8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, -8, -7, -6, -5, -4, -3, -2, -1];

/// Layout variant picked from the tag at offset 1080.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ModType {
    tag: &'static str,
    channels: u8,
    instruments: usize,
}

const MOD_TYPES: [ModType; 8] = [
    ModType { tag: "M.K.", channels: 4, instruments: 31 },
    ModType { tag: "M!K!", channels: 4, instruments: 31 },
    ModType { tag: "FLT4", channels: 4, instruments: 31 },
    ModType { tag: "4CHN", channels: 4, instruments: 31 },
    ModType { tag: "6CHN", channels: 6, instruments: 31 },
    ModType { tag: "FLT8", channels: 8, instruments: 31 },
    ModType { tag: "8CHN", channels: 8, instruments: 31 },
    ModType { tag: "16CH", channels: 16, instruments: 31 },
];

/// Untagged Soundtracker layout.
const NOISETRACKER: ModType = ModType {
    tag: "NOIS",
    channels: 4,
    instruments: 15,
};

fn detect(data: &[u8]) -> ModType {
    data.get(TAG_OFFSET..TAG_OFFSET + 4)
        .and_then(|tag| MOD_TYPES.iter().find(|t| t.tag.as_bytes() == tag))
        .copied()
        .unwrap_or(NOISETRACKER)
}

/// 30-byte sample header; lengths are in words.
#[derive(BinRead, Debug)]
#[br(big)]
struct SampleHeader {
    name: [u8; 22],
    length: u16,
    finetune: u8,
    volume: u8,
    repeat_start: u16,
    repeat_length: u16,
}

impl SampleHeader {
    fn length_bytes(&self) -> usize {
        usize::from(self.length) * 2
    }

    fn to_sample(&self) -> Sample {
        let mut sample = Sample::new(&parse_name(&self.name));
        sample.volume = self.volume.min(64);
        sample.pitch_ofs = finetune_multiplier(FINETUNE[usize::from(self.finetune & 0x0f)]);
        let repeat_length = usize::from(self.repeat_length) * 2;
        if repeat_length > 2 {
            sample.loop_type = LoopType::Normal;
            sample.repeat_start = usize::from(self.repeat_start) * 2;
            sample.repeat_end = sample.repeat_start + repeat_length;
        }
        sample
    }
}

/// Load a MOD file from bytes.
pub fn load_mod(data: &[u8]) -> Result<Song, FormatError> {
    let mod_type = detect(data);
    let song_length_pos = 20 + SAMPLE_HEADER_LEN * mod_type.instruments;
    let mut pattern_ofs = song_length_pos + 130;
    if mod_type.instruments > 15 {
        pattern_ofs += 4;
    }
    let header = slice(data, 0, pattern_ofs)?;

    let title = parse_name(&header[0..20]);
    let mut song = Song::with_channels(&title, mod_type.channels);
    song.kind = ModuleKind::Mod;
    song.tag.push_str(mod_type.tag);
    song.clock = PAL_CLOCK;

    let song_length = usize::from(header[song_length_pos]).min(128);
    let order_table = &header[song_length_pos + 2..song_length_pos + 130];
    song.orders = order_table[..song_length]
        .iter()
        .map(|&p| OrderEntry::Pattern(p))
        .collect();
    // Patterns stored past the song length still occupy space in the file
    let max_pattern = order_table.iter().copied().max().unwrap_or(0) as usize;

    let pattern_len = usize::from(ROWS) * 4 * usize::from(mod_type.channels);
    for index in 0..=max_pattern {
        let bytes = slice(data, pattern_ofs + pattern_len * index, pattern_len)?;
        song.patterns.push(parse_pattern(bytes, mod_type.channels));
    }

    let mut sample_ofs = pattern_ofs + pattern_len * (max_pattern + 1);
    for i in 0..mod_type.instruments {
        let record = &header[20 + SAMPLE_HEADER_LEN * i..20 + SAMPLE_HEADER_LEN * (i + 1)];
        let sample_header = SampleHeader::read(&mut Cursor::new(record))?;
        let mut sample = sample_header.to_sample();

        let length = sample_header.length_bytes();
        let available = data.len().saturating_sub(sample_ofs).min(length);
        if available < length {
            warn!(
                sample = i + 1,
                expected = length,
                actual = available,
                "sample data truncated"
            );
        }
        if available > 0 {
            sample.data = decode_pcm(&data[sample_ofs..], &PcmFormat::default(), available)?;
        }
        sample.length = available;
        sample.normalize_loop();
        sample.pad_loop_seam();
        sample_ofs += length;

        let name = sample.name;
        song.instruments.push(Instrument::with_sample(&name, sample));
    }

    debug!(
        tag = mod_type.tag,
        channels = song.channels,
        orders = song.orders.len(),
        patterns = song.patterns.len(),
        instruments = song.instruments.len(),
        "loaded MOD"
    );
    Ok(song)
}

/// Parse one 64-row pattern.
fn parse_pattern(data: &[u8], channels: u8) -> Pattern {
    let mut pattern = Pattern::new(ROWS, channels);
    for (cell, bytes) in pattern.data.iter_mut().zip(data.chunks_exact(4)) {
        *cell = parse_cell([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }
    pattern
}

/// Parse a single pattern cell (4 bytes).
///
/// ```text
/// byte 0: sample hi nibble | period bits 8-11
/// byte 1: period bits 0-7
/// byte 2: sample lo nibble | effect
/// byte 3: effect parameter
/// ```
fn parse_cell(b: [u8; 4]) -> Cell {
    let period = ((i32::from(b[0] & 0x0f) << 8) | i32::from(b[1])) * 4;
    let note = match period_to_note(period) {
        Some(n) => Note::On(n),
        None => Note::None,
    };
    Cell {
        note,
        instrument: (b[0] & 0xf0) | (b[2] >> 4),
        volume: None,
        effect: b[2] & 0x0f,
        param: b[3],
        volume_effect: None,
    }
}
