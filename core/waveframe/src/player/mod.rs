use std::{thread, time::Duration};

use thiserror::Error;

use crate::{
    error::SoundError,
    sample::{Sample, SampleBlock},
    sound::{Sound, channel::Channel},
};

pub mod cpal_out;

pub use cpal_out::CpalPlayer;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no default output device")]
    DeviceNotFound,
    #[error("failed to build output stream: {0}")]
    StreamBuildFailed(String),
    #[error("failed to start output stream: {0}")]
    StreamStartFailed(String),
    #[error(transparent)]
    Sound(#[from] SoundError),
}

/// Anything that can materialize itself into playable frames.
pub trait Playable {
    /// Starts playback on the default output device.
    ///
    /// Returns the live player; playback stops when it is dropped, so
    /// callers keep it around for fire-and-forget use. Passing `wait`
    /// blocks for that many seconds before returning.
    fn play(&mut self, wait: Option<f64>) -> Result<CpalPlayer, PlaybackError>;
}

impl Playable for Sound {
    fn play(&mut self, wait: Option<f64>) -> Result<CpalPlayer, PlaybackError> {
        let fps = self.fps();
        let frames = normalized_frames(&self.dataframes()?);
        start_playback(frames, fps, wait)
    }
}

impl Playable for Channel {
    fn play(&mut self, wait: Option<f64>) -> Result<CpalPlayer, PlaybackError> {
        let fps = self.fps();
        let frames = self
            .data()?
            .iter()
            .map(|sample| vec![sample.to_f32_norm()])
            .collect();
        start_playback(frames, fps, wait)
    }
}

fn start_playback(
    frames: Vec<Vec<f32>>,
    fps: u32,
    wait: Option<f64>,
) -> Result<CpalPlayer, PlaybackError> {
    let mut player = CpalPlayer::new();
    player.start(frames, fps)?;
    if let Some(secs) = wait {
        thread::sleep(Duration::from_secs_f64(secs.max(0.0)));
    }
    Ok(player)
}

/// Frame-major f32 frames normalized to [-1, 1], ready for the device.
fn normalized_frames(block: &SampleBlock) -> Vec<Vec<f32>> {
    match block {
        SampleBlock::Mono(samples) => samples
            .iter()
            .map(|sample| vec![sample.to_f32_norm()])
            .collect(),
        SampleBlock::Multi(rows) => rows
            .iter()
            .map(|row| row.iter().map(|sample| sample.to_f32_norm()).collect())
            .collect(),
    }
}
