use crate::error::SoundError;

/// Numeric type of one sample value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleDtype {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl SampleDtype {
    pub fn width_bytes(self) -> u16 {
        match self {
            Self::I8 => 1,
            Self::I16 => 2,
            Self::I32 | Self::F32 => 4,
            Self::I64 | Self::F64 => 8,
        }
    }

    pub fn bit_width(self) -> u16 {
        self.width_bytes() * 8
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// The signed integer type that is exactly `n_bytes` wide.
    pub fn int_with_width(n_bytes: usize) -> Option<Self> {
        match n_bytes {
            1 => Some(Self::I8),
            2 => Some(Self::I16),
            4 => Some(Self::I32),
            8 => Some(Self::I64),
            _ => None,
        }
    }
}

/// One scalar sample value, tagged with its numeric type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Sample {
    pub fn dtype(self) -> SampleDtype {
        match self {
            Self::I8(_) => SampleDtype::I8,
            Self::I16(_) => SampleDtype::I16,
            Self::I32(_) => SampleDtype::I32,
            Self::I64(_) => SampleDtype::I64,
            Self::F32(_) => SampleDtype::F32,
            Self::F64(_) => SampleDtype::F64,
        }
    }

    pub fn width_bytes(self) -> u16 {
        self.dtype().width_bytes()
    }

    /// The raw numeric value, widened to f64.
    pub fn to_f64(self) -> f64 {
        match self {
            Self::I8(v) => f64::from(v),
            Self::I16(v) => f64::from(v),
            Self::I32(v) => f64::from(v),
            Self::I64(v) => v as f64,
            Self::F32(v) => f64::from(v),
            Self::F64(v) => v,
        }
    }

    /// Normalizes to [-1, 1]: integer values divide by their positive
    /// maximum, float values pass through.
    pub fn to_f32_norm(self) -> f32 {
        match self {
            Self::I8(v) => f32::from(v) / f32::from(i8::MAX),
            Self::I16(v) => f32::from(v) / f32::from(i16::MAX),
            Self::I32(v) => (v as f64 / f64::from(i32::MAX)) as f32,
            Self::I64(v) => (v as f64 / i64::MAX as f64) as f32,
            Self::F32(v) => v,
            Self::F64(v) => v as f32,
        }
    }

    /// Big-endian byte form, the convention shared by the byte-keyed
    /// constructor and byte iteration.
    pub fn to_be_bytes(self) -> Vec<u8> {
        match self {
            Self::I8(v) => v.to_be_bytes().to_vec(),
            Self::I16(v) => v.to_be_bytes().to_vec(),
            Self::I32(v) => v.to_be_bytes().to_vec(),
            Self::I64(v) => v.to_be_bytes().to_vec(),
            Self::F32(v) => v.to_be_bytes().to_vec(),
            Self::F64(v) => v.to_be_bytes().to_vec(),
        }
    }

    /// Decodes a big-endian byte string into a sample of `dtype`. The byte
    /// string must be exactly as wide as the type.
    pub fn from_be_bytes(dtype: SampleDtype, bytes: &[u8]) -> Result<Self, SoundError> {
        let mismatch = || {
            SoundError::InvalidSource(format!(
                "expected {} bytes for a {dtype:?} sample, got {}",
                dtype.width_bytes(),
                bytes.len()
            ))
        };
        let sample = match dtype {
            SampleDtype::I8 => Self::I8(i8::from_be_bytes(bytes.try_into().map_err(|_| mismatch())?)),
            SampleDtype::I16 => Self::I16(i16::from_be_bytes(bytes.try_into().map_err(|_| mismatch())?)),
            SampleDtype::I32 => Self::I32(i32::from_be_bytes(bytes.try_into().map_err(|_| mismatch())?)),
            SampleDtype::I64 => Self::I64(i64::from_be_bytes(bytes.try_into().map_err(|_| mismatch())?)),
            SampleDtype::F32 => Self::F32(f32::from_be_bytes(bytes.try_into().map_err(|_| mismatch())?)),
            SampleDtype::F64 => Self::F64(f64::from_be_bytes(bytes.try_into().map_err(|_| mismatch())?)),
        };
        Ok(sample)
    }
}

/// What a frame function yields for one instant: a scalar for mono, one
/// value per channel otherwise. Constructors probe this shape to learn the
/// channel count.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Mono(Sample),
    Multi(Vec<Sample>),
}

impl Frame {
    pub fn n_channels(&self) -> usize {
        match self {
            Self::Mono(_) => 1,
            Self::Multi(samples) => samples.len(),
        }
    }

    /// The sample for output channel `index`, if the frame reaches it.
    pub fn channel(&self, index: usize) -> Option<Sample> {
        match self {
            Self::Mono(sample) => (index == 0).then_some(*sample),
            Self::Multi(samples) => samples.get(index).copied(),
        }
    }
}

/// Materialized sample data. Mono sounds stay flat; multi-channel sounds
/// nest one sequence per channel (channel-major) or per frame (frame-major)
/// depending on the accessor that produced the block.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleBlock {
    Mono(Vec<Sample>),
    Multi(Vec<Vec<Sample>>),
}

impl SampleBlock {
    pub fn as_mono(&self) -> Option<&[Sample]> {
        match self {
            Self::Mono(samples) => Some(samples),
            Self::Multi(_) => None,
        }
    }

    pub fn as_multi(&self) -> Option<&[Vec<Sample>]> {
        match self {
            Self::Mono(_) => None,
            Self::Multi(rows) => Some(rows),
        }
    }
}
