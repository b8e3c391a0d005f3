use thiserror::Error;

pub type Result<T> = std::result::Result<T, SoundError>;

/// Failures and control signals raised while building or reading sounds.
#[derive(Debug, Error)]
pub enum SoundError {
    /// Probing a path or a user-supplied function at construction failed.
    /// Nothing partially built is ever returned.
    #[error("invalid sound source: {0}")]
    InvalidSource(String),

    /// A buffered read addressed a frame past the declared extent.
    #[error("frame {index} is out of range ({len} frames)")]
    OutOfRange { index: u64, len: u64 },

    /// A generated source has no data at the requested instant.
    #[error("no frame data at the requested instant")]
    Exhausted,

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("codec error: {0}")]
    Codec(#[from] hound::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SoundError {
    /// Signals that iteration absorbs as end-of-stream rather than
    /// surfacing to the caller.
    pub(crate) fn ends_stream(&self) -> bool {
        matches!(self, Self::Exhausted | Self::OutOfRange { .. })
    }
}
