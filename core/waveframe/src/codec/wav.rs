use std::{fmt, fs::File, io::BufReader, path::Path};

use hound::{SampleFormat, WavReader, WavSpec};
use log::warn;

use crate::{
    error::SoundError,
    sample::{Sample, SampleDtype},
};

/// Seekable handle over a decoded WAV source.
///
/// The reader stays open for as long as the sounds built on it. Every read
/// presents frames as if starting at the origin: the requested span is
/// seeked, decoded, and the position is reset to frame 0 afterwards, so
/// independent accessors never observe each other's position.
pub struct WavHandle {
    reader: WavReader<BufReader<File>>,
    name: String,
    n_channels: u16,
    fps: u32,
    n_frames: u64,
    dtype: SampleDtype,
}

impl WavHandle {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SoundError> {
        let path = path.as_ref();
        let reader = WavReader::open(path)
            .map_err(|e| SoundError::InvalidSource(format!("{}: {e}", path.display())))?;
        let spec = reader.spec();
        let n_frames = u64::from(reader.duration());
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("unnamed.wav")
            .to_owned();

        Ok(Self {
            reader,
            name,
            n_channels: spec.channels,
            fps: spec.sample_rate,
            n_frames,
            dtype: dtype_for_spec(&spec),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn n_channels(&self) -> u16 {
        self.n_channels
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn n_frames(&self) -> u64 {
        self.n_frames
    }

    pub fn dtype(&self) -> SampleDtype {
        self.dtype
    }

    /// Reads up to `max_frames` whole frames starting at `start`, then
    /// resets the position to the origin. Spans past the end are clamped;
    /// a short final read is the natural end of the data, not an error.
    pub fn read_frames(
        &mut self,
        start: u64,
        max_frames: u64,
    ) -> Result<Vec<Vec<Sample>>, SoundError> {
        let want = max_frames.min(self.n_frames.saturating_sub(start.min(self.n_frames)));
        if want == 0 {
            return Ok(Vec::new());
        }

        self.seek_to(start)?;
        let n_samples = (want as usize) * usize::from(self.n_channels);
        let flat = self.read_flat(n_samples);
        self.seek_to(0)?;

        let flat = flat?;
        Ok(flat
            .chunks_exact(usize::from(self.n_channels))
            .map(<[Sample]>::to_vec)
            .collect())
    }

    fn seek_to(&mut self, frame: u64) -> Result<(), SoundError> {
        self.reader.seek(frame as u32).map_err(SoundError::from)
    }

    fn read_flat(&mut self, n_samples: usize) -> Result<Vec<Sample>, SoundError> {
        match self.dtype {
            SampleDtype::I8 => collect(self.reader.samples::<i8>().take(n_samples), Sample::I8),
            SampleDtype::I16 => collect(self.reader.samples::<i16>().take(n_samples), Sample::I16),
            SampleDtype::I32 => collect(self.reader.samples::<i32>().take(n_samples), Sample::I32),
            SampleDtype::F32 => collect(self.reader.samples::<f32>().take(n_samples), Sample::F32),
            SampleDtype::I64 | SampleDtype::F64 => Err(SoundError::Unsupported(format!(
                "{:?} samples cannot be decoded from a WAV container",
                self.dtype
            ))),
        }
    }
}

fn collect<T>(
    samples: impl Iterator<Item = hound::Result<T>>,
    wrap: fn(T) -> Sample,
) -> Result<Vec<Sample>, SoundError> {
    samples
        .map(|sample| sample.map(wrap).map_err(SoundError::from))
        .collect()
}

impl fmt::Debug for WavHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WavHandle")
            .field("name", &self.name)
            .field("n_channels", &self.n_channels)
            .field("fps", &self.fps)
            .field("n_frames", &self.n_frames)
            .field("dtype", &self.dtype)
            .finish_non_exhaustive()
    }
}

/// Maps the container encoding to a numeric sample type. The 24-bit
/// integer marker widens to 32 bits; encodings outside the known
/// integer/float widths fall back to 64-bit float.
fn dtype_for_spec(spec: &WavSpec) -> SampleDtype {
    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 0..=8) => SampleDtype::I8,
        (SampleFormat::Int, 9..=16) => SampleDtype::I16,
        (SampleFormat::Int, 17..=32) => SampleDtype::I32,
        (SampleFormat::Float, 32) => SampleDtype::F32,
        (format, bits) => {
            warn!("unknown encoding {format:?}/{bits}, falling back to 64-bit float");
            SampleDtype::F64
        }
    }
}
