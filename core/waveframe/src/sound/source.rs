use std::{
    fmt,
    sync::{Arc, Mutex},
};

use crate::{codec::wav::WavHandle, error::SoundError, sample::Frame};

/// Shared time-keyed frame function. Multi-channel sounds clone the same
/// function into every channel; each channel extracts its own element from
/// the result, calling the function once per channel per instant.
pub type TimeFn = Arc<dyn Fn(f64) -> Result<Frame, SoundError> + Send + Sync>;

/// Where a channel's samples come from.
///
/// Exactly one representation is active per channel; buffered and
/// functional reads never mix. Index-keyed and byte-keyed constructors are
/// normalized to time-keyed functions before a source is built, so every
/// channel answers the same `time -> frame` contract.
pub enum FrameSource {
    /// Seekable decoded container, shared between the channels of one
    /// file. Reads hold the lock across the whole seek-read-reset region,
    /// so interleaved accessors cannot corrupt each other's position.
    Buffered { handle: Arc<Mutex<WavHandle>> },

    /// Pure `time -> frame` mapping. Unbounded until the function signals
    /// exhaustion and iteration fixes the discovered frame count.
    Functional { time_to_frame: TimeFn },
}

impl FrameSource {
    pub fn is_buffered(&self) -> bool {
        matches!(self, Self::Buffered { .. })
    }
}

impl fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffered { handle } => f.debug_struct("Buffered").field("handle", handle).finish(),
            Self::Functional { .. } => f.debug_struct("Functional").finish_non_exhaustive(),
        }
    }
}
