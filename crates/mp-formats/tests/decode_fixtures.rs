//! Decode synthetic MOD and S3M files and play them through the engine.

mod common;

use common::{mod_cell, packed_pattern, s3m_square, square_sample, ModFile, S3mFile};
use mp_engine::{EffectKind, Engine};
use mp_formats::{load_mod, load_module, load_s3m, FormatError};
use mp_ir::{LoopType, ModuleKind, Note, OrderEntry, NTSC_CLOCK};

fn is_silent(engine: &mut Engine, pulls: usize) -> bool {
    (0..pulls).all(|_| {
        let out = engine.mix(44100);
        out.left.iter().chain(out.right).all(|s| *s == 0.0)
    })
}

// --- MOD ---

#[test]
fn empty_mod_decodes_and_mixes_silence() {
    let song = load_mod(&ModFile::new().build()).unwrap();
    assert_eq!(song.channels, 4);
    assert_eq!(song.patterns.len(), 1);
    assert_eq!(song.instruments.len(), 31);
    assert_eq!(song.tag.as_str(), "M.K.");
    assert_eq!(song.orders, vec![OrderEntry::Pattern(0)]);

    let mut engine = Engine::default();
    engine.load_song(song);
    engine.start();
    assert!(is_silent(&mut engine, 200));
}

#[test]
fn mod_cells_and_samples() {
    let data = ModFile::new()
        .sample(square_sample(48))
        .cell(0, 0, 0, mod_cell(428, 1, 0x0c, 0x20))
        .cell(0, 1, 3, mod_cell(0, 0, 0x0f, 0x03))
        .build();
    let song = load_mod(&data).unwrap();

    let cell = song.patterns[0].cell(0, 0);
    assert_eq!(cell.note, Note::On(48));
    assert_eq!(cell.instrument, 1);
    assert_eq!((cell.effect, cell.param), (0x0c, 0x20));
    let cell = song.patterns[0].cell(1, 3);
    assert_eq!(cell.note, Note::None);
    assert_eq!((cell.effect, cell.param), (0x0f, 0x03));

    let sample = &song.instruments[0].samples[0];
    assert_eq!(sample.name.as_str(), "square");
    assert_eq!(sample.len(), 64);
    assert_eq!(sample.volume, 48);
    assert_eq!(sample.loop_type, LoopType::Normal);
    assert_eq!((sample.repeat_start, sample.repeat_end), (0, 64));
    assert!((sample.data[0][0] - 100.0 / 128.0).abs() < 1e-6);
    assert!(song.instruments[1].samples[0].is_empty());
}

#[test]
fn mod_note_plays() {
    let data = ModFile::new()
        .sample(square_sample(64))
        .cell(0, 0, 0, mod_cell(428, 1, 0, 0))
        .build();
    let mut engine = Engine::default();
    engine.load_song(load_mod(&data).unwrap());
    engine.start();
    let out = engine.mix(44100);
    assert!(out.left.iter().any(|s| *s != 0.0));
    assert!(out.left.iter().chain(out.right).all(|s| s.abs() <= 1.0));
    assert_eq!(engine.player().channels()[0].period, 1712);
}

#[test]
fn mod_tag_selects_channel_count() {
    let mut file = ModFile::new();
    file.tag = *b"8CHN";
    file.channels = 8;
    let song = load_mod(&file.build()).unwrap();
    assert_eq!(song.channels, 8);
    assert_eq!(song.default_pan.len(), 8);
}

#[test]
fn mod_counts_patterns_past_song_length() {
    let mut file = ModFile::new();
    file.orders = vec![0, 2];
    let song = load_mod(&file.build()).unwrap();
    assert_eq!(song.orders.len(), 1);
    assert_eq!(song.patterns.len(), 3);
}

#[test]
fn untagged_mod_is_fifteen_instruments() {
    let mut data = vec![0u8; 20 + 15 * 30];
    data.push(1);
    data.push(127);
    data.extend([0u8; 128]);
    data.extend(vec![0u8; 64 * 4 * 4]);
    let song = load_mod(&data).unwrap();
    assert_eq!(song.tag.as_str(), "NOIS");
    assert_eq!(song.instruments.len(), 15);
    assert_eq!(song.patterns.len(), 1);
}

#[test]
fn truncated_mod_sample_is_shortened() {
    let mut data = ModFile::new().sample(square_sample(64)).build();
    data.truncate(data.len() - 24);
    let song = load_mod(&data).unwrap();
    assert_eq!(song.instruments[0].samples[0].len(), 40);
}

#[test]
fn truncated_mod_pattern_is_an_error() {
    let mut data = ModFile::new().build();
    data.truncate(1084 + 100);
    assert!(matches!(
        load_mod(&data),
        Err(FormatError::UnexpectedEof { .. })
    ));
}

// --- S3M ---

#[test]
fn s3m_without_signature_is_rejected() {
    let mut data = S3mFile::new().build();
    data[0x2c..0x30].copy_from_slice(b"SCRX");
    assert!(matches!(
        load_s3m(&data),
        Err(FormatError::InvalidHeader(_))
    ));
}

#[test]
fn s3m_bad_version_marker() {
    let mut data = S3mFile::new().build();
    data[0x1d] = 0x11;
    assert!(matches!(
        load_s3m(&data),
        Err(FormatError::InvalidHeader(_))
    ));
}

#[test]
fn s3m_header_and_orders() {
    let mut file = S3mFile::new();
    file.orders = vec![0, 254, 0, 7, 255];
    let song = load_s3m(&file.build()).unwrap();
    assert_eq!(song.kind, ModuleKind::S3m);
    assert_eq!(song.title.as_str(), "synthetic s3m");
    assert_eq!(song.channels, 4);
    assert_eq!(song.clock, NTSC_CLOCK);
    assert_eq!((song.initial_speed, song.initial_tempo), (6, 125));
    assert_eq!(
        song.orders,
        vec![
            OrderEntry::Pattern(0),
            OrderEntry::Skip,
            OrderEntry::Pattern(0),
            OrderEntry::Skip,
            OrderEntry::End,
        ]
    );
    assert_eq!(song.song_length(), 4);
    assert!(!song.fast_volume_slides);
}

#[test]
fn s3m_patterns_and_samples() {
    let mut file = S3mFile::new();
    file.samples.push(s3m_square(50));
    file.patterns = vec![packed_pattern(&[
        (0, vec![0x20 | 0x80 | 2, 0x40, 1, 0x01, 0x03]),
        (1, vec![0x40, 32]),
        (2, vec![0x20 | 1, 254, 0]),
    ])];
    let song = load_s3m(&file.build()).unwrap();

    let cell = song.patterns[0].cell(0, 2);
    assert_eq!(cell.note, Note::On(48));
    assert_eq!(cell.instrument, 1);
    assert_eq!((cell.effect, cell.param), (0x01, 0x03));
    assert_eq!(song.patterns[0].cell(1, 0).volume, Some(32));
    assert_eq!(song.patterns[0].cell(2, 1).note, Note::Cut);

    let sample = &song.instruments[0].samples[0];
    assert_eq!(sample.volume, 50);
    assert_eq!(sample.len(), 64);
    assert!((sample.pitch_ofs - 1.0).abs() < 1e-12);
    assert!(sample.data[0][0] > 0.0);
    assert!(sample.data[0][40] < 0.0);
}

#[test]
fn s3m_pattern_length_mismatch() {
    let mut file = S3mFile::new();
    file.length_skew = 3;
    assert!(matches!(
        load_s3m(&file.build()),
        Err(FormatError::PatternLength { pattern: 0, .. })
    ));
}

#[test]
fn s3m_pan_table() {
    let mut file = S3mFile::new();
    let mut table = [0u8; 32];
    table[0] = 0x20;
    table[1] = 0x2f;
    file.pan_table = Some(table);
    let song = load_s3m(&file.build()).unwrap();
    assert_eq!(song.default_pan[0], -1.0);
    assert_eq!(song.default_pan[1], 1.0);
    assert_eq!(song.default_pan[2], -0.8);
}

#[test]
fn s3m_mono_module_centers_channels() {
    let mut file = S3mFile::new();
    file.master_volume = 0x30;
    let song = load_s3m(&file.build()).unwrap();
    assert_eq!(song.default_pan, vec![0.0; 4]);

    let mut table = [0u8; 32];
    table[1] = 0x2f;
    file.pan_table = Some(table);
    let song = load_s3m(&file.build()).unwrap();
    assert_eq!(song.default_pan, vec![0.0, 1.0, 0.0, 0.0]);
}

#[test]
fn s3m_fast_slides_from_tracker_version() {
    let mut file = S3mFile::new();
    file.tracker_version = 0x1300;
    assert!(load_s3m(&file.build()).unwrap().fast_volume_slides);
}

#[test]
fn s3m_plays_through_engine() {
    let mut file = S3mFile::new();
    file.samples.push(s3m_square(64));
    file.patterns = vec![packed_pattern(&[(0, vec![0x20 | 0x80, 0x40, 1, 0x01, 0x03])])];
    let mut engine = Engine::default();
    engine.load_song(load_s3m(&file.build()).unwrap());
    engine.start();
    let out = engine.mix(44100);
    assert!(out.left.iter().any(|s| *s != 0.0));
    assert_eq!(engine.player().state().speed, 3);
    assert_eq!(engine.player().channels()[0].effect, EffectKind::S3mSetSpeed);
}

#[test]
fn module_sniffing() {
    let s3m = load_module(&S3mFile::new().build()).unwrap();
    assert_eq!(s3m.kind, ModuleKind::S3m);
    let m = load_module(&ModFile::new().build()).unwrap();
    assert_eq!(m.kind, ModuleKind::Mod);
}
