//! Headless controller for modplayer.
//!
//! Loads modules, plays them on the default audio device from a background
//! thread and renders them offline to frames or WAV.

mod wav;

use mp_audio::{AudioOutput, CpalOutput};
use mp_engine::{Engine, MixerConfig};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

// Re-export common types so callers don't need mp-ir/mp-engine directly.
pub use mp_audio::AudioError;
pub use mp_engine::{Frame, Position};
pub use mp_formats::FormatError;
pub use mp_ir::Song;

pub use wav::{frames_to_wav, write_wav};

/// Error type for controller operations.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error("wav encoding failed: {0}")]
    Wav(#[from] hound::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{seconds}s at {sample_rate} Hz does not fit in a WAV file")]
    RenderTooLong { sample_rate: u32, seconds: u32 },
}

/// Position value meaning "nothing playing".
const NO_POSITION: u64 = u64::MAX;

/// Most 16-bit stereo frames a WAV data chunk can hold.
const MAX_WAV_FRAMES: u64 = u32::MAX as u64 / 4;

/// Headless player: owns a song and manages playback.
pub struct Controller {
    song: Song,
    playback: Option<PlaybackHandle>,
}

struct PlaybackHandle {
    stop_signal: Arc<AtomicBool>,
    position: Arc<AtomicU64>,
    finished: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Controller {
    pub fn new() -> Self {
        Self {
            song: Song::with_channels("Untitled", 4),
            playback: None,
        }
    }

    // --- Song management ---

    pub fn song(&self) -> &Song {
        &self.song
    }

    /// Load a MOD or S3M module, picking the decoder from its signature.
    pub fn load(&mut self, data: &[u8]) -> Result<(), ControllerError> {
        let song = mp_formats::load_module(data)?;
        self.set_song(song);
        Ok(())
    }

    /// Load a module from a file.
    pub fn load_file(&mut self, path: impl AsRef<std::path::Path>) -> Result<(), ControllerError> {
        let data = std::fs::read(path)?;
        self.load(&data)
    }

    /// Replace the song, stopping playback.
    pub fn set_song(&mut self, song: Song) {
        self.stop();
        debug!(title = song.title.as_str(), kind = ?song.kind, "song loaded");
        self.song = song;
    }

    // --- Real-time playback ---

    /// Play the song on the default output device until [`Controller::stop`].
    pub fn play(&mut self) {
        self.stop();

        let song = self.song.clone();
        let stop_signal = Arc::new(AtomicBool::new(false));
        let position = Arc::new(AtomicU64::new(NO_POSITION));
        let finished = Arc::new(AtomicBool::new(false));

        let stop = stop_signal.clone();
        let pos = position.clone();
        let done = finished.clone();

        let thread = std::thread::spawn(move || {
            if let Err(err) = audio_thread(song, &stop, &pos) {
                warn!(%err, "playback failed");
            }
            pos.store(NO_POSITION, Ordering::Relaxed);
            done.store(true, Ordering::Relaxed);
        });

        self.playback = Some(PlaybackHandle {
            stop_signal,
            position,
            finished,
            thread: Some(thread),
        });
    }

    /// Stop playback and wait for the audio thread. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            pb.stop_signal.store(true, Ordering::Relaxed);
            if let Some(handle) = pb.thread.take() {
                let _ = handle.join();
            }
            debug!("playback stopped");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| !p.finished.load(Ordering::Relaxed))
    }

    /// True once the audio thread has exited on its own (no device, stream error).
    pub fn is_finished(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| p.finished.load(Ordering::Relaxed))
    }

    /// Position of the real-time player, sampled once per mixed buffer.
    pub fn position(&self) -> Option<Position> {
        let pb = self.playback.as_ref()?;
        unpack_position(&self.song, pb.position.load(Ordering::Relaxed))
    }

    // --- Offline rendering ---

    /// Render up to `max_frames` frames from the start of the song.
    pub fn render_frames(&self, sample_rate: u32, max_frames: usize) -> Vec<Frame> {
        let mut engine = Engine::new(MixerConfig::default());
        engine.load_song(self.song.clone());
        engine.start();

        let mut frames = Vec::with_capacity(max_frames);
        while frames.len() < max_frames {
            let out = engine.mix(sample_rate);
            if out.len == 0 {
                break;
            }
            let room = max_frames - frames.len();
            frames.extend(
                out.left
                    .iter()
                    .zip(out.right)
                    .take(room)
                    .map(|(&l, &r)| Frame::from_normalized(l, r)),
            );
        }
        frames
    }

    /// Render up to `max_seconds` of the song into an in-memory WAV file.
    pub fn render_to_wav(
        &self,
        sample_rate: u32,
        max_seconds: u32,
    ) -> Result<Vec<u8>, ControllerError> {
        let too_long = ControllerError::RenderTooLong {
            sample_rate,
            seconds: max_seconds,
        };
        let max_frames = u64::from(sample_rate) * u64::from(max_seconds);
        if max_frames > MAX_WAV_FRAMES {
            return Err(too_long);
        }
        let max_frames = usize::try_from(max_frames).map_err(|_| too_long)?;
        let frames = self.render_frames(sample_rate, max_frames);
        Ok(wav::frames_to_wav(&frames, sample_rate)?)
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn pack_position(pos: Position) -> u64 {
    ((pos.order as u64) << 32) | (u64::from(pos.row) << 8) | u64::from(pos.tick)
}

fn unpack_position(song: &Song, packed: u64) -> Option<Position> {
    if packed == NO_POSITION {
        return None;
    }
    let order = (packed >> 32) as usize;
    let pattern = match song.orders.get(order) {
        Some(mp_ir::OrderEntry::Pattern(p)) => Some(*p),
        _ => None,
    };
    Some(Position {
        order,
        pattern,
        row: (packed >> 8) as u16,
        tick: packed as u8,
    })
}

fn audio_thread(
    song: Song,
    stop_signal: &AtomicBool,
    position: &AtomicU64,
) -> Result<(), AudioError> {
    let (mut output, consumer) = CpalOutput::new()?;
    let sample_rate = output.sample_rate();

    let mut engine = Engine::new(MixerConfig::default());
    engine.load_song(song);
    engine.prepare(sample_rate);
    engine.start();

    output.build_stream(consumer)?;
    output.start()?;

    while !stop_signal.load(Ordering::Relaxed) {
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| pump(&mut engine, &mut output, sample_rate));
        #[cfg(not(feature = "alloc_check"))]
        pump(&mut engine, &mut output, sample_rate);
        position.store(pack_position(engine.position()), Ordering::Relaxed);
    }

    engine.stop();
    for _ in 0..sample_rate / 10 {
        output.write_spin(Frame::silence());
    }
    output.stop()
}

/// Mix one tick and queue it for the device.
fn pump(engine: &mut Engine, output: &mut CpalOutput, sample_rate: u32) {
    let out = engine.mix(sample_rate);
    output.write_mix(out.left, out.right);
}

#[cfg(test)]
mod tests {
    use super::*;
    use mp_ir::{Cell, Instrument, LoopType, Note, OrderEntry, Pattern, Sample};

    fn tone_song() -> Song {
        let mut sample = Sample::new("tone");
        sample.data.push((0..128).map(|i| if i < 64 { 0.5 } else { -0.5 }).collect());
        sample.length = 128;
        sample.loop_type = LoopType::Normal;
        sample.repeat_end = 128;
        sample.pad_loop_seam();

        let mut song = Song::with_channels("tone", 4);
        song.instruments.push(Instrument::with_sample("tone", sample));
        let mut pattern = Pattern::new(64, 4);
        *pattern.cell_mut(0, 0) = Cell {
            note: Note::On(48),
            instrument: 1,
            ..Cell::empty()
        };
        song.patterns.push(pattern);
        song.orders.push(OrderEntry::Pattern(0));
        song
    }

    #[test]
    fn default_song_is_empty() {
        let controller = Controller::default();
        assert_eq!(controller.song().channels, 4);
        assert!(!controller.is_playing());
        assert!(!controller.is_finished());
        assert_eq!(controller.position(), None);
    }

    #[test]
    fn load_rejects_garbage() {
        let mut controller = Controller::new();
        let err = controller.load(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, ControllerError::Format(_)));
        assert_eq!(controller.song().title.as_str(), "Untitled");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let mut controller = Controller::new();
        let err = controller.load_file("/nonexistent/song.mod").unwrap_err();
        assert!(matches!(err, ControllerError::Io(_)));
    }

    #[test]
    fn render_frames_exact_length() {
        let mut controller = Controller::new();
        controller.set_song(tone_song());
        let frames = controller.render_frames(44100, 10_000);
        assert_eq!(frames.len(), 10_000);
        assert!(frames.iter().any(|f| *f != Frame::silence()));
    }

    #[test]
    fn render_to_wav_is_readable() {
        let mut controller = Controller::new();
        controller.set_song(tone_song());
        let bytes = controller.render_to_wav(8000, 1).unwrap();
        let reader = hound::WavReader::new(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.duration(), 8000);
    }

    #[test]
    fn render_to_wav_rejects_oversized_render() {
        let controller = Controller::new();
        let err = controller.render_to_wav(48_000, 100_000).unwrap_err();
        assert!(matches!(
            err,
            ControllerError::RenderTooLong {
                sample_rate: 48_000,
                seconds: 100_000
            }
        ));
        let err = controller.render_to_wav(u32::MAX, u32::MAX).unwrap_err();
        assert!(matches!(err, ControllerError::RenderTooLong { .. }));
    }

    #[test]
    fn position_packing() {
        let song = tone_song();
        let pos = Position {
            order: 0,
            pattern: Some(0),
            row: 63,
            tick: 5,
        };
        assert_eq!(unpack_position(&song, pack_position(pos)), Some(pos));
        assert_eq!(unpack_position(&song, NO_POSITION), None);
    }

    #[test]
    fn stop_without_play_is_noop() {
        let mut controller = Controller::new();
        controller.stop();
        controller.stop();
        assert!(!controller.is_playing());
    }
}
