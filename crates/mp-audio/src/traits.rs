//! Audio output trait and error types.

use mp_engine::Frame;

/// Error type for audio operations.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// Failed to initialize audio device
    #[error("device init error: {0}")]
    DeviceInit(String),
    /// Failed to create audio stream
    #[error("stream create error: {0}")]
    StreamCreate(String),
    /// Playback error
    #[error("playback error: {0}")]
    Playback(String),
    /// No audio device available
    #[error("no audio device available")]
    NoDevice,
}

/// Trait for audio output backends.
pub trait AudioOutput {
    /// Output sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Queue frames for output. Frames that do not fit are dropped.
    fn write(&mut self, frames: &[Frame]) -> Result<(), AudioError>;

    /// Start playback.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop playback.
    fn stop(&mut self) -> Result<(), AudioError>;
}
