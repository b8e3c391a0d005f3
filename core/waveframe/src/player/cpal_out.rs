use std::{fmt, thread, time::Duration};

use cpal::{
    OutputCallbackInfo, Sample as _,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use log::{debug, warn};
use rtrb::{Consumer, Producer, PushError, RingBuffer};

use crate::player::PlaybackError;

/// Ring capacity between the feeder thread and the audio callback, in
/// samples.
const RING_CAPACITY: usize = 16384;

/// Output stream over the default device, fed from a ring buffer.
///
/// The stream lives as long as the player; dropping it stops playback.
/// Frames play at the device's native rate, without resampling.
pub struct CpalPlayer {
    stream: Option<cpal::Stream>,
}

impl CpalPlayer {
    pub fn new() -> Self {
        Self { stream: None }
    }

    /// Starts an output stream playing `frames`: frame-major, one
    /// normalized f32 per channel.
    pub fn start(&mut self, frames: Vec<Vec<f32>>, fps: u32) -> Result<(), PlaybackError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(PlaybackError::DeviceNotFound)?;
        let config = device
            .default_output_config()
            .map_err(|e| PlaybackError::StreamBuildFailed(e.to_string()))?;
        let out_channels = usize::from(config.channels());
        debug!(
            "playing {} frames recorded at {fps} fps on {out_channels} output channels",
            frames.len()
        );

        let (producer, consumer) = RingBuffer::new(RING_CAPACITY);
        spawn_feeder(frames, out_channels, producer);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, config, consumer)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, config, consumer)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, config, consumer)?,
            format => {
                return Err(PlaybackError::StreamBuildFailed(format!(
                    "Unsupported sample format '{format}'"
                )));
            }
        };

        stream
            .play()
            .map_err(|e| PlaybackError::StreamStartFailed(e.to_string()))?;

        self.stream = Some(stream);
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.stream.is_some()
    }

    pub fn stop(&mut self) {
        self.stream = None;
    }
}

impl Default for CpalPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CpalPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpalPlayer")
            .field("playing", &self.is_playing())
            .finish()
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: cpal::SupportedStreamConfig,
    mut samples: Consumer<f32>,
) -> Result<cpal::Stream, PlaybackError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let error_cb = move |err| {
        warn!("stream error: {err}");
    };

    let data_cb = move |data: &mut [T], _: &OutputCallbackInfo| {
        for out in data.iter_mut() {
            // a drained ring plays silence
            let sample = samples.pop().unwrap_or(0.0);
            *out = sample.to_sample::<T>();
        }
    };

    device
        .build_output_stream(&config.into(), data_cb, error_cb, None)
        .map_err(|e| PlaybackError::StreamBuildFailed(e.to_string()))
}

/// Walks the frames on a helper thread, mapping the sound's channels onto
/// the device's and pushing interleaved samples as the ring frees up.
/// Mono sounds spread to every output channel; extra outputs reuse the
/// last channel.
fn spawn_feeder(frames: Vec<Vec<f32>>, out_channels: usize, mut producer: Producer<f32>) {
    thread::spawn(move || {
        for frame in frames {
            for ch in 0..out_channels {
                let mut sample = frame
                    .get(ch)
                    .or_else(|| frame.last())
                    .copied()
                    .unwrap_or(0.0);
                loop {
                    match producer.push(sample) {
                        Ok(()) => break,
                        Err(PushError::Full(rejected)) => {
                            if producer.is_abandoned() {
                                return;
                            }
                            sample = rejected;
                            thread::sleep(Duration::from_millis(1));
                        }
                    }
                }
            }
        }
    });
}
