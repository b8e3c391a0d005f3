use std::sync::{Arc, Mutex};

use log::debug;

use crate::{
    codec::wav::WavHandle,
    error::SoundError,
    sample::{Sample, SampleDtype},
    sound::{
        iter::TimeSequence,
        seconds_to_frames,
        source::{FrameSource, TimeFn},
    },
};

/// One monophonic stream: sample geometry plus the source its frames are
/// read from. Channels are only built by the `Sound` constructors, which
/// infer the geometry from the container or from a probe call.
#[derive(Debug)]
pub struct Channel {
    fps: u32,
    n_bytes: u16,
    dtype: SampleDtype,
    n_frames: Option<u64>,
    channel_index: usize,
    source: FrameSource,
}

impl Channel {
    pub(crate) fn buffered(
        handle: Arc<Mutex<WavHandle>>,
        channel_index: usize,
        fps: u32,
        n_bytes: u16,
        dtype: SampleDtype,
        n_frames: u64,
    ) -> Self {
        Self {
            fps,
            n_bytes,
            dtype,
            n_frames: Some(n_frames),
            channel_index,
            source: FrameSource::Buffered { handle },
        }
    }

    pub(crate) fn functional(
        time_to_frame: TimeFn,
        channel_index: usize,
        fps: u32,
        n_bytes: u16,
        dtype: SampleDtype,
        n_frames: Option<u64>,
    ) -> Self {
        Self {
            fps,
            n_bytes,
            dtype,
            n_frames,
            channel_index,
            source: FrameSource::Functional { time_to_frame },
        }
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn n_bytes(&self) -> u16 {
        self.n_bytes
    }

    /// Bit width of one sample.
    pub fn n_bits(&self) -> u16 {
        self.n_bytes * 8
    }

    pub fn dtype(&self) -> SampleDtype {
        self.dtype
    }

    /// Total frames, when known. `None` means the channel runs until its
    /// function signals exhaustion.
    pub fn n_frames(&self) -> Option<u64> {
        self.n_frames
    }

    pub fn is_buffered(&self) -> bool {
        self.source.is_buffered()
    }

    /// Duration in seconds; infinite while the frame count is unknown.
    pub fn duration(&self) -> f64 {
        match self.n_frames {
            Some(n) => n as f64 / f64::from(self.fps),
            None => f64::INFINITY,
        }
    }

    /// Ascending sample instants `0, 1/fps, 2/fps, ...`, exclusive of the
    /// duration. Recomputed from zero on every call, never a consumed
    /// iterator.
    pub fn time_sequence(&self) -> TimeSequence {
        TimeSequence::new(self.fps, self.n_frames)
    }

    /// The sample at time `t` seconds. Generated sources call their
    /// function directly; buffered sources map `t` to the nearest frame
    /// index (ties round to even, never truncated) and read that span.
    pub fn sample_at_time(&self, t: f64) -> Result<Sample, SoundError> {
        match &self.source {
            FrameSource::Functional { time_to_frame } => {
                let frame = time_to_frame(t)?;
                frame.channel(self.channel_index).ok_or(SoundError::Exhausted)
            }
            FrameSource::Buffered { handle } => {
                self.read_one(handle, seconds_to_frames(t, self.fps))
            }
        }
    }

    /// The sample at frame `index`. Buffered sources read the span
    /// directly; generated sources answer through their time mapping.
    pub fn sample_at_index(&self, index: u64) -> Result<Sample, SoundError> {
        match &self.source {
            FrameSource::Buffered { handle } => self.read_one(handle, index),
            FrameSource::Functional { .. } => {
                self.sample_at_time(index as f64 / f64::from(self.fps))
            }
        }
    }

    fn read_one(&self, handle: &Arc<Mutex<WavHandle>>, index: u64) -> Result<Sample, SoundError> {
        let len = self.n_frames.unwrap_or(0);
        if index >= len {
            return Err(SoundError::OutOfRange { index, len });
        }
        let frames = handle.lock().unwrap().read_frames(index, 1)?;
        frames
            .first()
            .and_then(|frame| frame.get(self.channel_index))
            .copied()
            .ok_or(SoundError::OutOfRange { index, len })
    }

    /// Materializes every sample of this channel.
    ///
    /// Generated sources stop at the first exhaustion signal and the
    /// discovered frame count sticks: later calls see the corrected
    /// length and produce the same data again.
    pub fn data(&mut self) -> Result<Vec<Sample>, SoundError> {
        let time_to_frame = match &self.source {
            FrameSource::Buffered { handle } => {
                let handle = Arc::clone(handle);
                let n_frames = self.n_frames.unwrap_or(0);
                let frames = handle.lock().unwrap().read_frames(0, n_frames)?;
                return Ok(frames
                    .iter()
                    .filter_map(|frame| frame.get(self.channel_index))
                    .copied()
                    .collect());
            }
            FrameSource::Functional { time_to_frame } => Arc::clone(time_to_frame),
        };

        let channel_index = self.channel_index;
        let mut samples = Vec::new();
        for (i, t) in self.time_sequence().enumerate() {
            let sample = time_to_frame(t)
                .and_then(|frame| frame.channel(channel_index).ok_or(SoundError::Exhausted));
            match sample {
                Ok(sample) => samples.push(sample),
                Err(err) if err.ends_stream() => {
                    self.truncate_frames(i as u64);
                    break;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(samples)
    }

    /// Frame-major view of this channel. Mono, so identical to
    /// [`Channel::data`]; kept so one-channel sounds and bare channels
    /// share the same accessor names.
    pub fn dataframes(&mut self) -> Result<Vec<Sample>, SoundError> {
        self.data()
    }

    /// Fixes the frame count discovered during iteration. The count only
    /// ever moves down: promoting unbounded to bounded, or lowering an
    /// existing bound. Attempts to raise it are ignored.
    pub(crate) fn truncate_frames(&mut self, n_frames: u64) {
        if self.n_frames.is_none_or(|current| n_frames < current) {
            debug!(
                "channel {} frame count fixed at {n_frames}",
                self.channel_index
            );
            self.n_frames = Some(n_frames);
        }
    }

    /// Rebinds the frame count to `round(secs * fps)`, bounding an
    /// unbounded channel or re-cutting a bounded one.
    pub(crate) fn set_duration(&mut self, secs: f64) {
        self.n_frames = Some(seconds_to_frames(secs, self.fps));
    }

    pub(crate) fn handle(&self) -> Option<Arc<Mutex<WavHandle>>> {
        match &self.source {
            FrameSource::Buffered { handle } => Some(Arc::clone(handle)),
            FrameSource::Functional { .. } => None,
        }
    }
}
