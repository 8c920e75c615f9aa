//! Scream Tracker 3 (S3M) format parser.

use alloc::vec::Vec;
use binrw::io::Cursor;
use binrw::BinRead;
use mp_ir::{
    Cell, Instrument, LoopType, ModuleKind, Note, OrderEntry, Pattern, Sample, Song, AMIGA_PAN,
    NTSC_CLOCK,
};
use tracing::{debug, warn};

use crate::pcm::{decode_pcm, PcmFormat};
use crate::{parse_name, slice, FormatError};

const SIGNATURE_OFFSET: usize = 0x2c;
const VERSION_OFFSET: usize = 0x1c;
const VERSION_MARKER: u16 = 0x101a;
const HEADER_LEN: usize = 0x60;
const INSTRUMENT_LEN: usize = 0x50;
const ROWS: u16 = 64;
const MAX_CHANNELS: usize = 32;
/// Default pan table follows the pointer tables.
const PAN_TABLE_PRESENT: u8 = 0xfc;
/// Reference C2 speed for pitch offset 1.0.
const C2SPD_BASE: f64 = 8363.0;

const ORDER_END: u8 = 255;
const ORDER_SKIP: u8 = 254;
const NOTE_EMPTY: u8 = 255;
const NOTE_CUT: u8 = 254;

const SAMPLE_LOOP: u8 = 0x01;
const SAMPLE_STEREO: u8 = 0x02;
const SAMPLE_16BIT: u8 = 0x04;

/// Song header, offsets 0x00-0x5f.
#[derive(BinRead, Debug)]
#[br(little)]
struct S3mHeader {
    title: [u8; 28],
    #[br(pad_before = 4)]
    order_count: u16,
    instrument_count: u16,
    pattern_count: u16,
    flags: u16,
    tracker_version: u16,
    #[br(pad_after = 4)]
    sample_format: u16,
    global_volume: u8,
    initial_speed: u8,
    initial_tempo: u8,
    master_volume: u8,
    #[br(pad_before = 1, pad_after = 10)]
    default_pan: u8,
    channel_settings: [u8; MAX_CHANNELS],
}

impl S3mHeader {
    fn fast_volume_slides(&self) -> bool {
        self.tracker_version == 0x1300 || self.flags & 0x40 != 0
    }

    fn stereo(&self) -> bool {
        self.master_volume & 0x80 != 0
    }

    /// Samples are two's complement when the format info word is 1.
    fn signed_samples(&self) -> bool {
        self.sample_format == 1
    }

    /// Compacted index for each of the 32 channel slots.
    fn channel_map(&self) -> [Option<u8>; MAX_CHANNELS] {
        let mut map = [None; MAX_CHANNELS];
        let mut next = 0u8;
        for (slot, &setting) in map.iter_mut().zip(self.channel_settings.iter()) {
            if setting != 255 && setting < 128 {
                *slot = Some(next);
                next += 1;
            }
        }
        map
    }
}

/// Instrument record at a parapointer.
#[derive(BinRead, Debug)]
#[br(little)]
struct S3mSampleHeader {
    kind: u8,
    #[br(pad_before = 12)]
    memseg_hi: u8,
    memseg_lo: u16,
    length: u32,
    loop_start: u32,
    loop_end: u32,
    volume: u8,
    #[br(pad_before = 2)]
    flags: u8,
    c2spd: u32,
    #[br(pad_before = 12)]
    name: [u8; 28],
    tag: [u8; 4],
}

impl S3mSampleHeader {
    fn is_sample(&self) -> bool {
        &self.tag == b"SCRS" && self.kind == 1
    }

    fn data_offset(&self) -> usize {
        ((usize::from(self.memseg_hi) << 16) | usize::from(self.memseg_lo)) * 16
    }

    fn pcm_format(&self, signed: bool) -> PcmFormat {
        PcmFormat {
            bits: if self.flags & SAMPLE_16BIT != 0 { 16 } else { 8 },
            channels: if self.flags & SAMPLE_STEREO != 0 { 2 } else { 1 },
            signed,
            little_endian: true,
            delta: false,
            interleaved: false,
        }
    }
}

/// Returns true if `data` carries the S3M signature.
pub(crate) fn is_s3m(data: &[u8]) -> bool {
    data.get(SIGNATURE_OFFSET..SIGNATURE_OFFSET + 4) == Some(b"SCRM")
}

/// Load an S3M file from bytes.
pub fn load_s3m(data: &[u8]) -> Result<Song, FormatError> {
    if !is_s3m(data) {
        return Err(FormatError::InvalidHeader("missing SCRM signature"));
    }
    if read_word(data, VERSION_OFFSET)? != VERSION_MARKER {
        return Err(FormatError::InvalidHeader("bad S3M version marker"));
    }
    let header = S3mHeader::read(&mut Cursor::new(slice(data, 0, HEADER_LEN)?))?;
    let channel_map = header.channel_map();
    let channels = channel_map.iter().flatten().count() as u8;

    let mut song = Song::new(&parse_name(&header.title));
    song.kind = ModuleKind::S3m;
    song.tag.push_str("SCRM");
    song.channels = channels;
    song.clock = NTSC_CLOCK;
    song.global_volume = header.global_volume;
    song.initial_speed = header.initial_speed;
    song.initial_tempo = header.initial_tempo;
    song.master_volume = header.master_volume & 0x7f;
    song.fast_volume_slides = header.fast_volume_slides();

    let order_count = usize::from(header.order_count);
    let instrument_count = usize::from(header.instrument_count);
    let pattern_count = usize::from(header.pattern_count);

    song.orders = slice(data, HEADER_LEN, order_count)?
        .iter()
        .map(|&o| match o {
            ORDER_END => OrderEntry::End,
            ORDER_SKIP => OrderEntry::Skip,
            p if usize::from(p) < pattern_count => OrderEntry::Pattern(p),
            p => {
                warn!(pattern = p, "order points past pattern list");
                OrderEntry::Skip
            }
        })
        .collect();

    let instrument_pp_ofs = HEADER_LEN + order_count;
    let pattern_pp_ofs = instrument_pp_ofs + instrument_count * 2;
    let pan_ofs = pattern_pp_ofs + pattern_count * 2;

    song.default_pan = default_pan(data, &header, &channel_map, pan_ofs)?;

    for i in 0..pattern_count {
        let pointer = usize::from(read_word(data, pattern_pp_ofs + i * 2)?) * 16;
        if pointer == 0 {
            warn!(pattern = i, "pattern has no data");
            song.patterns.push(Pattern::new(ROWS, channels));
            continue;
        }
        song.patterns
            .push(parse_pattern(data, pointer, i, &channel_map, channels)?);
    }

    let signed = header.signed_samples();
    for i in 0..instrument_count {
        let pointer = usize::from(read_word(data, instrument_pp_ofs + i * 2)?) * 16;
        song.instruments.push(parse_instrument(data, pointer, signed)?);
    }

    debug!(
        channels = song.channels,
        orders = song.orders.len(),
        patterns = song.patterns.len(),
        instruments = song.instruments.len(),
        fast_volume_slides = song.fast_volume_slides,
        "loaded S3M"
    );
    Ok(song)
}

fn read_word(data: &[u8], offset: usize) -> Result<u16, FormatError> {
    let b = slice(data, offset, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

/// Per-channel default pan, after channel compaction.
fn default_pan(
    data: &[u8],
    header: &S3mHeader,
    channel_map: &[Option<u8>; MAX_CHANNELS],
    pan_ofs: usize,
) -> Result<Vec<f32>, FormatError> {
    let stereo = header.stereo();
    let base = |slot: usize| -> f32 {
        if !stereo {
            0.0
        } else if slot % 16 <= 7 {
            -AMIGA_PAN
        } else {
            AMIGA_PAN
        }
    };
    let table = if header.default_pan == PAN_TABLE_PRESENT {
        Some(slice(data, pan_ofs, MAX_CHANNELS)?)
    } else {
        None
    };

    let mut pan = alloc::vec![0.0; channel_map.iter().flatten().count()];
    for (slot, mapped) in channel_map.iter().enumerate() {
        let Some(mapped) = mapped else { continue };
        pan[usize::from(*mapped)] = match table.map(|t| t[slot]) {
            Some(pp) if pp & 0x20 != 0 => (f32::from(pp & 0x0f) - 7.5) / 7.5,
            _ => base(slot),
        };
    }
    Ok(pan)
}

/// Cursor over the file that reports the offset it ran out at.
struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl ByteReader<'_> {
    fn byte(&mut self) -> Result<u8, FormatError> {
        let b = *self.data.get(self.pos).ok_or(FormatError::UnexpectedEof {
            offset: self.pos,
            needed: 1,
        })?;
        self.pos += 1;
        Ok(b)
    }

    fn word(&mut self) -> Result<u16, FormatError> {
        let lo = self.byte()?;
        let hi = self.byte()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }
}

/// Decode one RLE-packed pattern starting at `offset`.
///
/// Each row is a run of `key [note instrument] [volume] [effect param]`
/// groups terminated by a zero key. The declared length covers the
/// length word itself.
fn parse_pattern(
    data: &[u8],
    offset: usize,
    index: usize,
    channel_map: &[Option<u8>; MAX_CHANNELS],
    channels: u8,
) -> Result<Pattern, FormatError> {
    let mut pattern = Pattern::new(ROWS, channels);
    let mut reader = ByteReader { data, pos: offset };
    let declared = usize::from(reader.word()?);

    for row in 0..ROWS {
        loop {
            let key = reader.byte()?;
            if key == 0 {
                break;
            }
            let mut cell = Cell::empty();
            if key & 0x20 != 0 {
                cell.note = match reader.byte()? {
                    NOTE_EMPTY => Note::None,
                    NOTE_CUT => Note::Cut,
                    b => Note::from_octave_semitone(b >> 4, b & 0x0f),
                };
                cell.instrument = reader.byte()?;
            }
            if key & 0x40 != 0 {
                cell.volume = Some(reader.byte()?.min(64));
            }
            if key & 0x80 != 0 {
                cell.effect = reader.byte()?;
                cell.param = reader.byte()?;
            }
            if let Some(channel) = channel_map[usize::from(key & 0x1f)] {
                *pattern.cell_mut(row, channel) = cell;
            }
        }
    }

    let consumed = reader.pos - offset;
    if consumed != declared {
        return Err(FormatError::PatternLength {
            pattern: index,
            expected: declared,
            actual: consumed,
        });
    }
    Ok(pattern)
}

/// Decode the instrument record at `offset`; unusable slots become empty instruments.
fn parse_instrument(data: &[u8], offset: usize, signed: bool) -> Result<Instrument, FormatError> {
    let record = match data.get(offset..offset + INSTRUMENT_LEN) {
        Some(r) if offset != 0 => r,
        _ => return Ok(empty_instrument()),
    };
    let header = S3mSampleHeader::read(&mut Cursor::new(record))?;
    if !header.is_sample() {
        return Ok(empty_instrument());
    }

    let name = parse_name(&header.name);
    let mut sample = Sample::new(&name);
    let format = header.pcm_format(signed);
    sample.bits = format.bits;
    sample.volume = header.volume.min(64);
    sample.pitch_ofs = f64::from(header.c2spd) / C2SPD_BASE;
    if header.flags & SAMPLE_LOOP != 0 {
        sample.loop_type = LoopType::Normal;
        sample.repeat_start = header.loop_start as usize;
        sample.repeat_end = header.loop_end as usize;
    }

    let length = header.length as usize;
    let bytes = data.get(header.data_offset()..).unwrap_or(&[]);
    let (format, frames) = if bytes.len() >= format.byte_len(length) {
        (format, length)
    } else {
        // Planar stereo needs the whole left block first; keep only that.
        let mono = PcmFormat { channels: 1, ..format };
        let frames = (bytes.len() / mono.bytes_per_point()).min(length);
        warn!(
            sample = %name,
            expected = length,
            actual = frames,
            "sample data truncated"
        );
        (mono, frames)
    };
    if frames > 0 {
        sample.data = decode_pcm(bytes, &format, frames)?;
    }
    sample.length = frames;
    sample.normalize_loop();
    sample.pad_loop_seam();

    Ok(Instrument::with_sample(&name, sample))
}

fn empty_instrument() -> Instrument {
    let mut sample = Sample::new("--");
    sample.volume = 0;
    Instrument::with_sample("", sample)
}
