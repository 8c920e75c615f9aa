//! CPAL-based audio output backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use mp_engine::Frame;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

use crate::traits::{AudioError, AudioOutput};

/// CPAL-based audio output.
///
/// The engine thread pushes frames into a ring buffer; the device callback
/// pops them. An empty buffer plays silence.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    producer: HeapProd<Frame>,
    running: Arc<AtomicBool>,
}

impl CpalOutput {
    /// Open the default output device, stereo, with about 100ms of buffering.
    pub fn new() -> Result<(Self, HeapCons<Frame>), AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut config: StreamConfig = config.into();
        // The callback writes interleaved stereo pairs
        config.channels = 2;

        let buffer_size = (config.sample_rate.0 as usize / 10) * 2;
        let (producer, consumer) = HeapRb::<Frame>::new(buffer_size).split();
        debug!(
            sample_rate = config.sample_rate.0,
            buffer_size, "audio output opened"
        );

        let output = Self {
            device,
            config,
            stream: None,
            producer,
            running: Arc::new(AtomicBool::new(false)),
        };
        Ok((output, consumer))
    }

    /// Build and start the audio stream.
    pub fn build_stream(&mut self, mut consumer: HeapCons<Frame>) -> Result<(), AudioError> {
        let running = self.running.clone();
        let channels = usize::from(self.config.channels);

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if running.load(Ordering::Relaxed) {
                        fill_device_buffer(data, channels, &mut consumer);
                    } else {
                        data.fill(0.0);
                    }
                },
                |err| error!(%err, "audio stream error"),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    /// Write a single frame, spinning until the ring buffer has room.
    pub fn write_spin(&mut self, frame: Frame) {
        while self.producer.try_push(frame).is_err() {
            std::hint::spin_loop();
        }
    }

    /// Write one mixed buffer, spinning until all of it is queued.
    pub fn write_mix(&mut self, left: &[f32], right: &[f32]) {
        for (&l, &r) in left.iter().zip(right) {
            self.write_spin(Frame::from_normalized(l, r));
        }
    }
}

/// Copy queued frames into an interleaved device buffer.
///
/// Extra device channels get silence, as does everything past the last
/// queued frame.
fn fill_device_buffer<C>(data: &mut [f32], channels: usize, consumer: &mut C)
where
    C: Consumer<Item = Frame>,
{
    for chunk in data.chunks_mut(channels.max(1)) {
        let (left, right) = match consumer.try_pop() {
            Some(frame) => (
                f32::from(frame.left) / 32768.0,
                f32::from(frame.right) / 32768.0,
            ),
            None => (0.0, 0.0),
        };
        for (i, sample) in chunk.iter_mut().enumerate() {
            *sample = match i {
                0 => left,
                1 => right,
                _ => 0.0,
            };
        }
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn write(&mut self, frames: &[Frame]) -> Result<(), AudioError> {
        for frame in frames {
            let _ = self.producer.try_push(*frame);
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }
}
