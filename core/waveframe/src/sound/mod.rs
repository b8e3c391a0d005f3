use std::{
    collections::BTreeMap,
    io::{Seek, Write},
    path::Path,
    sync::{Arc, Mutex},
};

use hound::{SampleFormat, WavSpec, WavWriter};
use log::debug;

use crate::{
    codec::wav::WavHandle,
    error::SoundError,
    sample::{Frame, Sample, SampleBlock, SampleDtype},
};

pub mod channel;
pub mod iter;
pub mod source;

use channel::Channel;
use iter::{ByteWindows, FrameWindows, TimeSequence};
use source::TimeFn;

/// Frames written per chunk while streaming to disk.
const SAVE_WINDOW_FRAMES: u64 = 32768;

/// Maps seconds to the nearest frame at `fps`. Ties round to even, never
/// truncate.
pub(crate) fn seconds_to_frames(secs: f64, fps: u32) -> u64 {
    (secs * f64::from(fps)).round_ties_even() as u64
}

/// A sound of one or more channels, read lazily from a decoded container
/// or from a frame function.
///
/// Channel order is output order. Aggregate properties are permissive:
/// rate, frame count and duration take the maximum over the channels, and
/// the sample geometry is channel 0's, never revalidated against the rest.
#[derive(Debug)]
pub struct Sound {
    channels: Vec<Channel>,
    name: Option<String>,
    metadata: BTreeMap<String, String>,
}

impl Sound {
    fn from_channels(channels: Vec<Channel>) -> Self {
        Self {
            channels,
            name: None,
            metadata: BTreeMap::new(),
        }
    }

    // ------------------ constructors -------------------

    /// Opens a sound from a WAV file, one buffered channel per container
    /// channel, all sharing the same handle.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SoundError> {
        Ok(Self::from_handle(WavHandle::open(path)?))
    }

    /// Builds a sound over an already opened container handle.
    pub fn from_handle(handle: WavHandle) -> Self {
        let n_channels = usize::from(handle.n_channels());
        let (fps, n_frames, dtype) = (handle.fps(), handle.n_frames(), handle.dtype());
        let name = handle.name().to_owned();

        let handle = Arc::new(Mutex::new(handle));
        let channels = (0..n_channels)
            .map(|i| {
                Channel::buffered(
                    Arc::clone(&handle),
                    i,
                    fps,
                    dtype.width_bytes(),
                    dtype,
                    n_frames,
                )
            })
            .collect();

        Self {
            name: Some(name),
            ..Self::from_channels(channels)
        }
    }

    /// Builds a sound from a `time -> frame` function.
    ///
    /// The function is probed at time 0 to learn the channel count (a
    /// scalar frame means mono) and the sample geometry from its first
    /// element. Multi-channel sounds call the same function once per
    /// channel per instant. The frame count is left unbounded until the
    /// function signals exhaustion or a duration is fixed.
    pub fn from_datatimes<F>(time_to_frame: F, fps: u32) -> Result<Self, SoundError>
    where
        F: Fn(f64) -> Result<Frame, SoundError> + Send + Sync + 'static,
    {
        let probe = time_to_frame(0.0)
            .map_err(|e| SoundError::InvalidSource(format!("probing the source at time 0 failed: {e}")))?;
        Self::from_probe(&probe, Arc::new(time_to_frame), fps)
    }

    /// Builds a sound from a `frame index -> frame` function, normalized
    /// into a time-keyed function over the nearest-index mapping.
    pub fn from_dataframes<G>(index_to_frame: G, fps: u32) -> Result<Self, SoundError>
    where
        G: Fn(u64) -> Result<Frame, SoundError> + Send + Sync + 'static,
    {
        Self::from_datatimes(move |t| index_to_frame(seconds_to_frames(t, fps)), fps)
    }

    /// Builds a sound from a `frame index -> per-channel byte strings`
    /// function. The probe at frame 0 fixes the channel count and the
    /// sample width from the byte string lengths; samples decode as
    /// big-endian signed integers.
    pub fn from_byteframes<H>(
        index_to_bytes: H,
        n_frames: u64,
        fps: u32,
    ) -> Result<Self, SoundError>
    where
        H: Fn(u64) -> Result<Vec<Vec<u8>>, SoundError> + Send + Sync + 'static,
    {
        let probe = index_to_bytes(0)
            .map_err(|e| SoundError::InvalidSource(format!("probing the source at frame 0 failed: {e}")))?;
        let first = probe
            .first()
            .ok_or_else(|| SoundError::InvalidSource("probe returned no channels".into()))?;
        let dtype = SampleDtype::int_with_width(first.len()).ok_or_else(|| {
            SoundError::InvalidSource(format!(
                "no integer sample type is {} bytes wide",
                first.len()
            ))
        })?;
        let n_channels = probe.len();

        let index_to_bytes = Arc::new(index_to_bytes);
        let time_to_frame: TimeFn = Arc::new(move |t| {
            let frame_bytes = index_to_bytes(seconds_to_frames(t, fps))?;
            let samples = frame_bytes
                .iter()
                .map(|bytes| Sample::from_be_bytes(dtype, bytes))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Frame::Multi(samples))
        });

        let channels = (0..n_channels)
            .map(|i| {
                Channel::functional(
                    Arc::clone(&time_to_frame),
                    i,
                    fps,
                    dtype.width_bytes(),
                    dtype,
                    Some(n_frames),
                )
            })
            .collect();
        Ok(Self::from_channels(channels))
    }

    fn from_probe(probe: &Frame, time_to_frame: TimeFn, fps: u32) -> Result<Self, SoundError> {
        let channels = match probe {
            Frame::Mono(sample) => vec![Channel::functional(
                time_to_frame,
                0,
                fps,
                sample.width_bytes(),
                sample.dtype(),
                None,
            )],
            Frame::Multi(samples) => {
                let first = samples.first().ok_or_else(|| {
                    SoundError::InvalidSource("probe returned an empty frame".into())
                })?;
                (0..samples.len())
                    .map(|i| {
                        Channel::functional(
                            Arc::clone(&time_to_frame),
                            i,
                            fps,
                            first.width_bytes(),
                            first.dtype(),
                            None,
                        )
                    })
                    .collect()
            }
        };
        Ok(Self::from_channels(channels))
    }

    /// Fixes the total duration, bounding every channel at
    /// `round(secs * fps)` frames. The result is an independent bounded
    /// view of the same source.
    #[must_use]
    pub fn with_duration(mut self, secs: f64) -> Self {
        for channel in &mut self.channels {
            channel.set_duration(secs);
        }
        self
    }

    /// Attaches string metadata carried alongside the sound.
    #[must_use]
    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    // ------------------ aggregate properties -------------------

    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    pub(crate) fn channels_mut(&mut self) -> &mut [Channel] {
        &mut self.channels
    }

    /// The highest rate among the channels.
    pub fn fps(&self) -> u32 {
        self.channels.iter().map(Channel::fps).max().unwrap_or(0)
    }

    /// The highest frame count among the channels; `None` as soon as any
    /// channel is unbounded.
    pub fn n_frames(&self) -> Option<u64> {
        let mut max = 0;
        for channel in &self.channels {
            max = max.max(channel.n_frames()?);
        }
        Some(max)
    }

    /// The longest channel duration, in seconds.
    pub fn duration(&self) -> f64 {
        self.channels.iter().map(Channel::duration).fold(0.0, f64::max)
    }

    /// Sample width, taken from channel 0.
    pub fn n_bytes(&self) -> u16 {
        self.channels[0].n_bytes()
    }

    /// Bit width, taken from channel 0.
    pub fn n_bits(&self) -> u16 {
        self.channels[0].n_bits()
    }

    /// Sample type, taken from channel 0.
    pub fn dtype(&self) -> SampleDtype {
        self.channels[0].dtype()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn is_buffered(&self) -> bool {
        self.channels[0].is_buffered()
    }

    /// Channel 0's sample instants.
    pub fn time_sequence(&self) -> TimeSequence {
        self.channels[0].time_sequence()
    }

    /// One sample per channel at time `t` seconds.
    pub fn sample_at_time(&self, t: f64) -> Result<Vec<Sample>, SoundError> {
        self.channels
            .iter()
            .map(|channel| channel.sample_at_time(t))
            .collect()
    }

    /// One sample per channel at frame `index`.
    pub fn sample_at_index(&self, index: u64) -> Result<Vec<Sample>, SoundError> {
        self.channels
            .iter()
            .map(|channel| channel.sample_at_index(index))
            .collect()
    }

    // ------------------ materializers -------------------

    /// All samples, channel-major. Mono sounds return the flat channel.
    ///
    /// Generated channels that signal exhaustion stop there and keep the
    /// discovered frame count, so materializing twice yields the same
    /// data.
    pub fn data(&mut self) -> Result<SampleBlock, SoundError> {
        if self.channels.len() == 1 {
            return Ok(SampleBlock::Mono(self.channels[0].data()?));
        }
        let mut columns = Vec::with_capacity(self.channels.len());
        for channel in &mut self.channels {
            columns.push(channel.data()?);
        }
        Ok(SampleBlock::Multi(columns))
    }

    /// All samples, frame-major: the exact transpose of [`Sound::data`]
    /// for equal inputs. Mono sounds return the flat channel.
    pub fn dataframes(&mut self) -> Result<SampleBlock, SoundError> {
        if self.channels.len() == 1 {
            return Ok(SampleBlock::Mono(self.channels[0].data()?));
        }
        let mut rows = Vec::new();
        for window in FrameWindows::new(self, SAVE_WINDOW_FRAMES, 0) {
            rows.extend(window?);
        }
        Ok(SampleBlock::Multi(rows))
    }

    // ------------------ iterators -------------------

    /// Lazy windows of `n_frames` decoded frames starting at frame
    /// `start`.
    pub fn iter_dataframes(&mut self, n_frames: u64, start: u64) -> FrameWindows<'_> {
        FrameWindows::new(self, n_frames, start)
    }

    /// Seconds-addressed layer over [`Sound::iter_dataframes`].
    pub fn iter_datatimes(&mut self, duration: f64, start: f64) -> FrameWindows<'_> {
        let fps = self.fps();
        self.iter_dataframes(seconds_to_frames(duration, fps), seconds_to_frames(start, fps))
    }

    /// Lazy windows of `n_frames` raw frames starting at `start`:
    /// frame-major, channel-interleaved, big-endian samples.
    ///
    /// Generated sounds have no byte form; asking for one fails without
    /// affecting the sound otherwise.
    pub fn iter_byteframes(&mut self, n_frames: u64, start: u64) -> Result<ByteWindows, SoundError> {
        let Some(handle) = self.buffered_handle() else {
            return Err(SoundError::Unsupported(
                "this sound is generated on demand and has no raw byte frames; \
                 iterate decoded frames instead"
                    .into(),
            ));
        };
        Ok(ByteWindows::new(
            handle,
            self.n_frames().unwrap_or(0),
            n_frames,
            start,
        ))
    }

    /// Seconds-addressed layer over [`Sound::iter_byteframes`].
    pub fn iter_bytetimes(&mut self, duration: f64, start: f64) -> Result<ByteWindows, SoundError> {
        let fps = self.fps();
        self.iter_byteframes(seconds_to_frames(duration, fps), seconds_to_frames(start, fps))
    }

    /// Reads or generates one window of frames for the frame iterator.
    pub(crate) fn next_window(
        &mut self,
        start: u64,
        limit: u64,
    ) -> Result<Vec<Vec<Sample>>, SoundError> {
        if let Some(handle) = self.buffered_handle() {
            return handle.lock().unwrap().read_frames(start, limit);
        }

        let fps = self.fps();
        let mut frames = Vec::with_capacity(limit as usize);
        for index in start..start.saturating_add(limit) {
            let t = index as f64 / f64::from(fps);
            match self.sample_at_time(t) {
                Ok(frame) => frames.push(frame),
                Err(err) if err.ends_stream() => {
                    for channel in &mut self.channels {
                        channel.truncate_frames(index);
                    }
                    break;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(frames)
    }

    fn buffered_handle(&self) -> Option<Arc<Mutex<WavHandle>>> {
        self.channels.first().and_then(Channel::handle)
    }

    // ------------------ persistence -------------------

    /// Writes the sound as an uncompressed PCM WAV file, frame-major and
    /// channel-interleaved, streamed in windows. Reading the file back
    /// yields the same samples element for element.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), SoundError> {
        let dtype = self.dtype();
        let (sample_format, bits_per_sample) = match dtype {
            SampleDtype::I8 => (SampleFormat::Int, 8),
            SampleDtype::I16 => (SampleFormat::Int, 16),
            SampleDtype::I32 => (SampleFormat::Int, 32),
            SampleDtype::F32 => (SampleFormat::Float, 32),
            SampleDtype::I64 | SampleDtype::F64 => {
                return Err(SoundError::Unsupported(format!(
                    "{dtype:?} samples have no WAV encoding"
                )));
            }
        };
        let spec = WavSpec {
            channels: self.n_channels() as u16,
            sample_rate: self.fps(),
            bits_per_sample,
            sample_format,
        };

        let mut writer = WavWriter::create(path.as_ref(), spec)?;
        let mut written = 0u64;
        for window in self.iter_dataframes(SAVE_WINDOW_FRAMES, 0) {
            for frame in window? {
                for sample in frame {
                    write_sample(&mut writer, sample)?;
                }
                written += 1;
            }
        }
        writer.finalize()?;
        debug!("wrote {written} frames to {}", path.as_ref().display());
        Ok(())
    }
}

fn write_sample<W: Write + Seek>(
    writer: &mut WavWriter<W>,
    sample: Sample,
) -> Result<(), SoundError> {
    match sample {
        Sample::I8(v) => writer.write_sample(v),
        Sample::I16(v) => writer.write_sample(v),
        Sample::I32(v) => writer.write_sample(v),
        Sample::F32(v) => writer.write_sample(v),
        Sample::I64(_) | Sample::F64(_) => {
            return Err(SoundError::Unsupported(
                "8-byte samples have no WAV encoding".into(),
            ));
        }
    }
    .map_err(SoundError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use std::path::PathBuf;

    fn fixture_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("waveframe-sound-{}-{name}", std::process::id()))
    }

    fn int16_spec(channels: u16, sample_rate: u32) -> WavSpec {
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    fn write_wav(path: &Path, spec: WavSpec, samples: &[i16]) {
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    /// `time -> frame` sine generator matching the container scale of a
    /// 16-bit file.
    fn sine_frame(t: f64, frequency: f64, amplitude: f64) -> i16 {
        (amplitude * (frequency * 2.0 * PI * t).sin()).round() as i16
    }

    fn bounded_channel(fps: u32, n_frames: Option<u64>) -> Channel {
        let time_to_frame: TimeFn = Arc::new(|_| Ok(Frame::Mono(Sample::I16(1))));
        Channel::functional(time_to_frame, 0, fps, 2, SampleDtype::I16, n_frames)
    }

    #[test]
    fn test_from_file_mono_properties() {
        let path = fixture_path("mono-props.wav");
        write_wav(&path, int16_spec(1, 44100), &[1, 2, 3, 4]);

        let sound = Sound::from_file(&path).unwrap();
        assert_eq!(sound.n_channels(), 1);
        assert_eq!(sound.n_frames(), Some(4));
        assert_eq!(sound.fps(), 44100);
        assert_eq!(sound.n_bytes(), 2);
        assert_eq!(sound.n_bits(), 16);
        assert_eq!(sound.dtype(), SampleDtype::I16);
        assert!(sound.is_buffered());
        assert!(sound.name().unwrap().ends_with("mono-props.wav"));
    }

    #[test]
    fn test_from_file_stereo_properties() {
        let path = fixture_path("stereo-props.wav");
        write_wav(&path, int16_spec(2, 22050), &[1, -1, 2, -2, 3, -3]);

        let sound = Sound::from_file(&path).unwrap();
        assert_eq!(sound.n_channels(), 2);
        assert_eq!(sound.n_frames(), Some(3));
        assert_eq!(sound.fps(), 22050);
        assert_eq!(sound.duration(), 3.0 / 22050.0);
    }

    #[test]
    fn test_data_mono_is_flat() {
        let path = fixture_path("data-mono.wav");
        write_wav(&path, int16_spec(1, 44100), &[5, 6, 7]);

        let mut sound = Sound::from_file(&path).unwrap();
        let data = sound.data().unwrap();
        let samples = data.as_mono().unwrap();
        assert_eq!(
            samples,
            &[Sample::I16(5), Sample::I16(6), Sample::I16(7)]
        );
    }

    #[test]
    fn test_data_stereo_is_channel_major() {
        let path = fixture_path("data-stereo.wav");
        write_wav(&path, int16_spec(2, 44100), &[1, -1, 2, -2]);

        let mut sound = Sound::from_file(&path).unwrap();
        let data = sound.data().unwrap();
        let columns = data.as_multi().unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0], vec![Sample::I16(1), Sample::I16(2)]);
        assert_eq!(columns[1], vec![Sample::I16(-1), Sample::I16(-2)]);
    }

    #[test]
    fn test_dataframes_is_transpose_of_data() {
        let path = fixture_path("transpose.wav");
        write_wav(&path, int16_spec(2, 44100), &[1, -1, 2, -2, 3, -3]);

        let mut sound = Sound::from_file(&path).unwrap();
        let columns = sound.data().unwrap();
        let rows = sound.dataframes().unwrap();

        let columns = columns.as_multi().unwrap();
        let rows = rows.as_multi().unwrap();
        assert_eq!(rows.len(), 3);
        for (i, row) in rows.iter().enumerate() {
            for (ch, sample) in row.iter().enumerate() {
                assert_eq!(*sample, columns[ch][i]);
            }
        }
    }

    #[test]
    fn test_dataframes_transpose_holds_for_generated_stereo() {
        let mut sound = Sound::from_datatimes(
            |t| {
                Ok(Frame::Multi(vec![
                    Sample::I16(sine_frame(t, 110.0, 1000.0)),
                    Sample::I16(sine_frame(t, 440.0, 1000.0)),
                ]))
            },
            8000,
        )
        .unwrap()
        .with_duration(0.01);

        let columns = sound.data().unwrap();
        let rows = sound.dataframes().unwrap();
        let columns = columns.as_multi().unwrap();
        let rows = rows.as_multi().unwrap();

        assert_eq!(columns.len(), 2);
        assert_eq!(rows.len(), 80);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row[0], columns[0][i]);
            assert_eq!(row[1], columns[1][i]);
        }
    }

    #[test]
    fn test_save_round_trip_mono_from_file() {
        let source_path = fixture_path("rt-mono-src.wav");
        write_wav(&source_path, int16_spec(1, 44100), &[9, -9, 42, -42]);

        let mut sound = Sound::from_file(&source_path).unwrap();
        let saved_path = fixture_path("rt-mono-dst.wav");
        sound.save(&saved_path).unwrap();

        let mut reloaded = Sound::from_file(&saved_path).unwrap();
        assert_eq!(reloaded.data().unwrap(), sound.data().unwrap());
    }

    #[test]
    fn test_save_round_trip_stereo_from_file() {
        let source_path = fixture_path("rt-stereo-src.wav");
        write_wav(&source_path, int16_spec(2, 44100), &[1, -1, 2, -2, 3, -3]);

        let mut sound = Sound::from_file(&source_path).unwrap();
        let saved_path = fixture_path("rt-stereo-dst.wav");
        sound.save(&saved_path).unwrap();

        let mut reloaded = Sound::from_file(&saved_path).unwrap();
        assert_eq!(reloaded.n_channels(), 2);
        assert_eq!(reloaded.data().unwrap(), sound.data().unwrap());
    }

    #[test]
    fn test_save_round_trip_mono_from_function() {
        let mut sound = Sound::from_datatimes(
            |t| Ok(Frame::Mono(Sample::I16(sine_frame(t, 110.0, 16383.0)))),
            8000,
        )
        .unwrap()
        .with_duration(0.5);

        let path = fixture_path("rt-gen-mono.wav");
        sound.save(&path).unwrap();

        let mut reloaded = Sound::from_file(&path).unwrap();
        assert_eq!(reloaded.n_frames(), Some(4000));
        assert_eq!(reloaded.data().unwrap(), sound.data().unwrap());
    }

    #[test]
    fn test_save_round_trip_stereo_from_function() {
        let mut sound = Sound::from_datatimes(
            |t| {
                Ok(Frame::Multi(vec![
                    Sample::I16(sine_frame(t, 110.0, 16383.0)),
                    Sample::I16(sine_frame(t, 440.0, 16383.0)),
                ]))
            },
            8000,
        )
        .unwrap()
        .with_duration(0.5);

        let path = fixture_path("rt-gen-stereo.wav");
        sound.save(&path).unwrap();

        let mut reloaded = Sound::from_file(&path).unwrap();
        assert_eq!(reloaded.n_channels(), 2);
        assert_eq!(reloaded.data().unwrap(), sound.data().unwrap());
    }

    #[test]
    fn test_index_and_time_addressing_agree() {
        let fps = 100;
        let generator = |i: u64| Ok(Frame::Mono(Sample::I16((i * 3) as i16)));
        let sound = Sound::from_dataframes(generator, fps).unwrap();

        for i in 0..50u64 {
            let expected = Sample::I16((i * 3) as i16);
            let at_time = sound.sample_at_time(i as f64 / f64::from(fps)).unwrap();
            let at_index = sound.sample_at_index(i).unwrap();
            assert_eq!(at_time, vec![expected]);
            assert_eq!(at_index, vec![expected]);
        }
    }

    #[test]
    fn test_exhaustion_fixes_frame_count() {
        let fps = 44100;
        let mut sound = Sound::from_datatimes(
            move |t| {
                if seconds_to_frames(t, fps) >= 22050 {
                    return Err(SoundError::Exhausted);
                }
                Ok(Frame::Mono(Sample::I16(7)))
            },
            fps,
        )
        .unwrap();
        assert_eq!(sound.n_frames(), None);

        let first = sound.data().unwrap();
        assert_eq!(sound.n_frames(), Some(22050));
        assert_eq!(first.as_mono().unwrap().len(), 22050);

        let second = sound.data().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_aggregates_take_the_maximum() {
        let sound = Sound::from_channels(vec![
            bounded_channel(44100, Some(100)),
            bounded_channel(22050, Some(300)),
        ]);

        assert_eq!(sound.fps(), 44100);
        assert_eq!(sound.n_frames(), Some(300));
        assert_eq!(sound.duration(), 300.0 / 22050.0);
    }

    #[test]
    fn test_unbounded_member_wins_aggregation() {
        let sound = Sound::from_channels(vec![
            bounded_channel(44100, Some(100)),
            bounded_channel(44100, None),
        ]);

        assert_eq!(sound.n_frames(), None);
        assert!(sound.duration().is_infinite());
    }

    #[test]
    fn test_mono_sine_scenario() {
        let (fps, frequency, amplitude) = (44100u32, 110.0, 12000.0);
        let sound = Sound::from_datatimes(
            move |t| Ok(Frame::Mono(Sample::I16(sine_frame(t, frequency, amplitude)))),
            fps,
        )
        .unwrap()
        .with_duration(1.0);

        assert_eq!(sound.n_channels(), 1);
        assert_eq!(sound.n_frames(), Some(44100));
        assert_eq!(sound.duration(), 1.0);

        let expected = sine_frame(0.5, frequency, amplitude);
        assert_eq!(sound.sample_at_time(0.5).unwrap(), vec![Sample::I16(expected)]);
    }

    #[test]
    fn test_stereo_generators_stay_independent() {
        let (fps, amplitude) = (44100u32, 9000.0);
        let sound = Sound::from_datatimes(
            move |t| {
                Ok(Frame::Multi(vec![
                    Sample::I16(sine_frame(t, 110.0, amplitude)),
                    Sample::I16(sine_frame(t, 440.0, amplitude)),
                ]))
            },
            fps,
        )
        .unwrap();

        assert_eq!(sound.n_channels(), 2);
        for t in [0.0, 0.125, 0.25, 0.3] {
            let frame = sound.sample_at_time(t).unwrap();
            assert_eq!(frame[0], Sample::I16(sine_frame(t, 110.0, amplitude)));
            assert_eq!(frame[1], Sample::I16(sine_frame(t, 440.0, amplitude)));
        }
    }

    #[test]
    fn test_byteframes_matches_buffered_frame() {
        let path = fixture_path("byteframes.wav");
        write_wav(&path, int16_spec(1, 44100), &[256, -2, 3]);

        let mut buffered = Sound::from_file(&path).unwrap();
        let windows: Vec<Vec<u8>> = buffered
            .iter_byteframes(1, 0)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(windows[0], vec![0x01, 0x00]);

        let byte_sound = Sound::from_byteframes(
            move |i| {
                windows
                    .get(i as usize)
                    .cloned()
                    .map(|frame| vec![frame])
                    .ok_or(SoundError::Exhausted)
            },
            3,
            44100,
        )
        .unwrap();

        assert_eq!(byte_sound.n_bytes(), 2);
        assert_eq!(byte_sound.dtype(), SampleDtype::I16);
        assert_eq!(
            byte_sound.sample_at_index(0).unwrap(),
            buffered.sample_at_index(0).unwrap()
        );
        assert_eq!(
            byte_sound.sample_at_index(1).unwrap(),
            vec![Sample::I16(-2)]
        );
    }

    #[test]
    fn test_byte_iteration_unsupported_for_generated_sounds() {
        let mut sound = Sound::from_datatimes(|_| Ok(Frame::Mono(Sample::I16(1))), 8000)
            .unwrap()
            .with_duration(0.001);

        assert!(matches!(
            sound.iter_byteframes(4, 0),
            Err(SoundError::Unsupported(_))
        ));
        // the sound stays usable for decoded access
        assert_eq!(sound.data().unwrap().as_mono().unwrap().len(), 8);
    }

    #[test]
    fn test_window_iteration_matches_bulk_read() {
        let path = fixture_path("windows.wav");
        let samples: Vec<i16> = (0..10).collect();
        write_wav(&path, int16_spec(1, 44100), &samples);

        let mut sound = Sound::from_file(&path).unwrap();
        let windows: Vec<Vec<Vec<Sample>>> = sound
            .iter_dataframes(4, 0)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].len(), 4);
        assert_eq!(windows[1].len(), 4);
        assert_eq!(windows[2].len(), 2);

        let flat: Vec<Sample> = windows
            .iter()
            .flatten()
            .map(|frame| frame[0])
            .collect();
        let expected: Vec<Sample> = samples.iter().map(|&s| Sample::I16(s)).collect();
        assert_eq!(flat, expected);
    }

    #[test]
    fn test_window_iteration_with_start_offset() {
        let path = fixture_path("windows-start.wav");
        write_wav(&path, int16_spec(1, 44100), &[0, 1, 2, 3, 4]);

        let mut sound = Sound::from_file(&path).unwrap();
        let windows: Vec<Vec<Vec<Sample>>> = sound
            .iter_dataframes(2, 3)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0], vec![vec![Sample::I16(3)], vec![Sample::I16(4)]]);
    }

    #[test]
    fn test_window_iteration_absorbs_exhaustion() {
        let fps = 100;
        let mut sound = Sound::from_dataframes(
            |i| {
                if i >= 6 {
                    return Err(SoundError::Exhausted);
                }
                Ok(Frame::Mono(Sample::I16(i as i16)))
            },
            fps,
        )
        .unwrap();

        let windows: Vec<Vec<Vec<Sample>>> = sound
            .iter_dataframes(4, 0)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].len(), 4);
        assert_eq!(windows[1].len(), 2);
        assert_eq!(sound.n_frames(), Some(6));
    }

    #[test]
    fn test_iter_datatimes_converts_seconds() {
        let path = fixture_path("datatimes.wav");
        write_wav(&path, int16_spec(1, 10), &[0, 1, 2, 3, 4, 5, 6, 7]);

        let mut sound = Sound::from_file(&path).unwrap();
        let windows: Vec<Vec<Vec<Sample>>> = sound
            .iter_datatimes(0.4, 0.2)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].len(), 4);
        assert_eq!(windows[0][0], vec![Sample::I16(2)]);
        assert_eq!(windows[1].len(), 2);
    }

    #[test]
    fn test_bytetimes_round_trip_through_decoder() {
        let path = fixture_path("bytetimes.wav");
        write_wav(&path, int16_spec(1, 10), &[256, 512]);

        let mut sound = Sound::from_file(&path).unwrap();
        let windows: Vec<Vec<u8>> = sound
            .iter_bytetimes(0.2, 0.0)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(windows, vec![vec![0x01, 0x00, 0x02, 0x00]]);
    }

    #[test]
    fn test_with_duration_bounds_generated_sound() {
        let sound = Sound::from_datatimes(|_| Ok(Frame::Mono(Sample::I16(0))), 44100)
            .unwrap()
            .with_duration(1.0);
        assert_eq!(sound.n_frames(), Some(44100));
        assert_eq!(sound.duration(), 1.0);
    }

    #[test]
    fn test_probe_failure_is_fatal() {
        let result = Sound::from_datatimes(|_| Err(SoundError::Exhausted), 44100);
        assert!(matches!(result, Err(SoundError::InvalidSource(_))));
    }

    #[test]
    fn test_byteframes_probe_rejects_odd_widths() {
        let result = Sound::from_byteframes(|_| Ok(vec![vec![0u8, 1, 2]]), 10, 44100);
        assert!(matches!(result, Err(SoundError::InvalidSource(_))));
    }

    #[test]
    fn test_save_rejects_wide_samples() {
        let mut sound = Sound::from_datatimes(|_| Ok(Frame::Mono(Sample::F64(0.5))), 8000)
            .unwrap()
            .with_duration(0.001);

        let result = sound.save(fixture_path("wide.wav"));
        assert!(matches!(result, Err(SoundError::Unsupported(_))));
    }

    #[test]
    fn test_metadata_is_carried() {
        let metadata: BTreeMap<String, String> =
            [("artist".to_owned(), "test".to_owned())].into();
        let sound = Sound::from_datatimes(|_| Ok(Frame::Mono(Sample::I16(0))), 8000)
            .unwrap()
            .with_metadata(metadata.clone());
        assert_eq!(sound.metadata(), &metadata);
    }

    #[test]
    fn test_direct_buffered_read_past_end_is_out_of_range() {
        let path = fixture_path("oob.wav");
        write_wav(&path, int16_spec(1, 44100), &[1, 2]);

        let sound = Sound::from_file(&path).unwrap();
        assert!(matches!(
            sound.sample_at_index(2),
            Err(SoundError::OutOfRange { index: 2, len: 2 })
        ));
        assert!(matches!(
            sound.sample_at_time(1.0),
            Err(SoundError::OutOfRange { .. })
        ));
    }
}
