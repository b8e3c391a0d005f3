use std::sync::{Arc, Mutex};

use crate::{codec::wav::WavHandle, error::SoundError, sample::Sample, sound::Sound};

/// Restartable sequence of sample instants. Owns its parameters, so the
/// producing sound stays free while the sequence is walked.
#[derive(Debug, Clone)]
pub struct TimeSequence {
    fps: u32,
    n_frames: Option<u64>,
    next: u64,
}

impl TimeSequence {
    pub(crate) fn new(fps: u32, n_frames: Option<u64>) -> Self {
        Self {
            fps,
            n_frames,
            next: 0,
        }
    }
}

impl Iterator for TimeSequence {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if let Some(end) = self.n_frames {
            if self.next >= end {
                return None;
            }
        }
        let t = self.next as f64 / f64::from(self.fps);
        self.next += 1;
        Some(t)
    }
}

/// Lazy windows of decoded frames, each window frame-major with one sample
/// per channel.
///
/// Buffered sounds read each window as a span through the codec; a short
/// or empty read is the natural end of the stream. Generated sounds walk
/// the time sequence per element, and an exhaustion signal terminates the
/// sequence after fixing the discovered frame count on every channel.
/// Restart by asking the sound for a new iterator with `start = 0`.
#[derive(Debug)]
pub struct FrameWindows<'a> {
    sound: &'a mut Sound,
    window_frames: u64,
    next_frame: u64,
    done: bool,
}

impl<'a> FrameWindows<'a> {
    pub(crate) fn new(sound: &'a mut Sound, window_frames: u64, start: u64) -> Self {
        Self {
            sound,
            window_frames,
            next_frame: start,
            done: false,
        }
    }
}

impl Iterator for FrameWindows<'_> {
    type Item = Result<Vec<Vec<Sample>>, SoundError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.window_frames == 0 {
            return None;
        }

        let start = self.next_frame;
        let mut limit = self.window_frames;
        if let Some(total) = self.sound.n_frames() {
            if start >= total {
                self.done = true;
                return None;
            }
            limit = limit.min(total - start);
        }

        match self.sound.next_window(start, limit) {
            Ok(frames) if frames.is_empty() => {
                self.done = true;
                None
            }
            Ok(frames) => {
                if (frames.len() as u64) < limit {
                    self.done = true;
                }
                self.next_frame = start + frames.len() as u64;
                Some(Ok(frames))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Lazy windows of raw sample bytes: frame-major, channel-interleaved,
/// each sample big-endian. Only buffered sounds have a byte form.
#[derive(Debug)]
pub struct ByteWindows {
    handle: Arc<Mutex<WavHandle>>,
    total_frames: u64,
    window_frames: u64,
    next_frame: u64,
    done: bool,
}

impl ByteWindows {
    pub(crate) fn new(
        handle: Arc<Mutex<WavHandle>>,
        total_frames: u64,
        window_frames: u64,
        start: u64,
    ) -> Self {
        Self {
            handle,
            total_frames,
            window_frames,
            next_frame: start,
            done: false,
        }
    }
}

impl Iterator for ByteWindows {
    type Item = Result<Vec<u8>, SoundError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.window_frames == 0 || self.next_frame >= self.total_frames {
            self.done = true;
            return None;
        }

        let limit = self.window_frames.min(self.total_frames - self.next_frame);
        let frames = self.handle.lock().unwrap().read_frames(self.next_frame, limit);
        match frames {
            Ok(frames) if frames.is_empty() => {
                self.done = true;
                None
            }
            Ok(frames) => {
                if (frames.len() as u64) < limit {
                    self.done = true;
                }
                self.next_frame += frames.len() as u64;
                let bytes = frames
                    .iter()
                    .flat_map(|frame| frame.iter().flat_map(|sample| sample.to_be_bytes()))
                    .collect();
                Some(Ok(bytes))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
