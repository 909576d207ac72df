//! Typed multi-band pixel buffers and bit-depth conversion.
//!
//! A [`PixelBuffer`] is a rectangular grid of samples in one of three
//! encodings: 8-bit imagery, 16-bit scaled-integer data, or IEEE 754
//! single-precision floats bit-packed into 32-bit integer storage (the
//! layout legacy coverage stores use for elevation data). Storage is
//! band-major planes, row-major within a plane.

use crate::error::{MosaicError, Result};
use serde::{Deserialize, Serialize};

/// Sample encoding of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleDepth {
    /// 8-bit unsigned samples (RGB(A) imagery).
    U8,
    /// 16-bit unsigned samples, optionally scaled integer data.
    U16,
    /// 32-bit floats bit-packed into i32 storage.
    F32Bits,
}

impl SampleDepth {
    /// Get the depth name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::F32Bits => "f32bits",
        }
    }

    /// Bytes per sample in this encoding.
    pub fn sample_bytes(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::F32Bits => 4,
        }
    }
}

impl std::fmt::Display for SampleDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-coverage scale/offset metadata applied when 16-bit stored values
/// represent scaled float data.
///
/// Threaded explicitly through every conversion call; there is no
/// process-wide default beyond the identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleScaling {
    pub scale: f32,
    pub offset: f32,
}

impl Default for SampleScaling {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: 0.0,
        }
    }
}

/// Pack a float (given as its stored bit pattern) into a 16-bit sample:
/// `round(value * scale + offset)`.
pub fn pack_f32_to_u16(bits: i32, scaling: SampleScaling) -> u16 {
    (f32::from_bits(bits as u32) * scaling.scale + scaling.offset).round() as u16
}

/// Unpack a 16-bit sample into float bit storage:
/// `to_bits(value / scale - offset)`.
///
/// Deliberately not the algebraic inverse of [`pack_f32_to_u16`]
/// (`* scale + offset` one way, `/ scale - offset` the other). Legacy
/// coverage consumers depend on this exact pair of formulas, so both
/// directions are kept as independently defined conversions.
pub fn unpack_u16_to_f32(value: u16, scaling: SampleScaling) -> i32 {
    (value as f32 / scaling.scale - scaling.offset).to_bits() as i32
}

/// Flat sample storage for one buffer, tagged by encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32Bits(Vec<i32>),
}

impl Samples {
    /// Number of samples.
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::F32Bits(v) => v.len(),
        }
    }

    /// Check if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The encoding tag of this storage.
    pub fn depth(&self) -> SampleDepth {
        match self {
            Self::U8(_) => SampleDepth::U8,
            Self::U16(_) => SampleDepth::U16,
            Self::F32Bits(_) => SampleDepth::F32Bits,
        }
    }

    fn zeroed(depth: SampleDepth, len: usize) -> Self {
        match depth {
            SampleDepth::U8 => Self::U8(vec![0; len]),
            SampleDepth::U16 => Self::U16(vec![0; len]),
            SampleDepth::F32Bits => Self::F32Bits(vec![0; len]),
        }
    }
}

/// A typed, multi-band, rectangular grid of samples.
///
/// Exclusively owned by whichever component currently holds it; the
/// loader hands it to the resampler, the resampler to the compositor,
/// and the compositor mutates only its own destination.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    bands: usize,
    samples: Samples,
}

impl PixelBuffer {
    /// Allocate a zero-filled buffer.
    ///
    /// Fails if any dimension or the band count is zero.
    pub fn new(width: usize, height: usize, bands: usize, depth: SampleDepth) -> Result<Self> {
        Self::validate_shape(width, height, bands)?;
        Ok(Self {
            width,
            height,
            bands,
            samples: Samples::zeroed(depth, width * height * bands),
        })
    }

    /// Wrap existing sample storage.
    ///
    /// The storage length must be exactly `width * height * bands`.
    pub fn from_samples(
        width: usize,
        height: usize,
        bands: usize,
        samples: Samples,
    ) -> Result<Self> {
        Self::validate_shape(width, height, bands)?;
        if samples.len() != width * height * bands {
            return Err(MosaicError::invalid_dimensions(format!(
                "expected {} samples for {}x{}x{}, got {}",
                width * height * bands,
                width,
                height,
                bands,
                samples.len()
            )));
        }
        Ok(Self {
            width,
            height,
            bands,
            samples,
        })
    }

    fn validate_shape(width: usize, height: usize, bands: usize) -> Result<()> {
        if width == 0 || height == 0 || bands == 0 {
            return Err(MosaicError::invalid_dimensions(format!(
                "buffer shape must be positive, got {}x{}x{} (width x height x bands)",
                width, height, bands
            )));
        }
        Ok(())
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of bands.
    pub fn bands(&self) -> usize {
        self.bands
    }

    /// The sample encoding.
    pub fn depth(&self) -> SampleDepth {
        self.samples.depth()
    }

    /// Borrow the raw sample storage.
    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Mutably borrow the raw sample storage.
    pub fn samples_mut(&mut self) -> &mut Samples {
        &mut self.samples
    }

    /// Total storage size in bytes, for cache accounting.
    pub fn byte_len(&self) -> usize {
        self.samples.len() * self.depth().sample_bytes()
    }

    /// Flat index of `(band, row, col)` in the sample storage.
    pub fn index(&self, band: usize, row: usize, col: usize) -> usize {
        band * self.width * self.height + row * self.width + col
    }

    /// Numeric value of a sample: raw stored value for U8/U16, the
    /// unpacked float for F32Bits.
    pub fn value_at(&self, band: usize, row: usize, col: usize) -> f64 {
        let idx = self.index(band, row, col);
        match &self.samples {
            Samples::U8(v) => v[idx] as f64,
            Samples::U16(v) => v[idx] as f64,
            Samples::F32Bits(v) => f32::from_bits(v[idx] as u32) as f64,
        }
    }

    /// Store a numeric value into a sample, rounding into integer
    /// storage (saturating at the type bounds) or re-packing float bits.
    pub fn set_value(&mut self, band: usize, row: usize, col: usize, value: f64) {
        let idx = self.index(band, row, col);
        match &mut self.samples {
            Samples::U8(v) => v[idx] = value.round() as u8,
            Samples::U16(v) => v[idx] = value.round() as u16,
            Samples::F32Bits(v) => v[idx] = (value as f32).to_bits() as i32,
        }
    }

    /// Fill every pixel with the given per-band values.
    ///
    /// `values` must carry one entry per band.
    pub fn fill(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.bands {
            return Err(MosaicError::invalid_dimensions(format!(
                "fill needs {} band values, got {}",
                self.bands,
                values.len()
            )));
        }
        let plane = self.width * self.height;
        for (band, &value) in values.iter().enumerate() {
            let start = band * plane;
            match &mut self.samples {
                Samples::U8(v) => v[start..start + plane].fill(value.round() as u8),
                Samples::U16(v) => v[start..start + plane].fill(value.round() as u16),
                Samples::F32Bits(v) => {
                    v[start..start + plane].fill((value as f32).to_bits() as i32)
                }
            }
        }
        Ok(())
    }

    /// Copy a sub-rectangle into a new buffer of the same depth.
    ///
    /// The rectangle must lie entirely inside this buffer.
    pub fn crop(&self, x0: usize, y0: usize, width: usize, height: usize) -> Result<PixelBuffer> {
        if x0 + width > self.width || y0 + height > self.height {
            return Err(MosaicError::invalid_dimensions(format!(
                "crop [{}..{}, {}..{}] exceeds buffer {}x{}",
                x0,
                x0 + width,
                y0,
                y0 + height,
                self.width,
                self.height
            )));
        }

        fn copy_rows<T: Copy>(
            src: &[T],
            dst: &mut [T],
            src_shape: (usize, usize, usize),
            rect: (usize, usize, usize, usize),
            bands: usize,
        ) {
            let (src_w, src_h, _) = src_shape;
            let (x0, y0, w, h) = rect;
            for band in 0..bands {
                for row in 0..h {
                    let s = band * src_w * src_h + (y0 + row) * src_w + x0;
                    let d = band * w * h + row * w;
                    dst[d..d + w].copy_from_slice(&src[s..s + w]);
                }
            }
        }

        let mut out = PixelBuffer::new(width, height, self.bands, self.depth())?;
        let shape = (self.width, self.height, self.bands);
        let rect = (x0, y0, width, height);
        match (&self.samples, &mut out.samples) {
            (Samples::U8(s), Samples::U8(d)) => copy_rows(s, d, shape, rect, self.bands),
            (Samples::U16(s), Samples::U16(d)) => copy_rows(s, d, shape, rect, self.bands),
            (Samples::F32Bits(s), Samples::F32Bits(d)) => copy_rows(s, d, shape, rect, self.bands),
            // out was allocated with self's depth above
            _ => unreachable!("crop output depth matches input"),
        }
        Ok(out)
    }
}

/// Check that samples of depth `from` can be painted onto depth `to`.
///
/// Supported pairings: U8→U8 and U16→U16 (raw copy), F32Bits→U16 and
/// U16→F32Bits (scale/offset conversion). Everything else is a
/// [`MosaicError::DepthMismatch`], never a silent truncation.
pub fn ensure_convertible(from: SampleDepth, to: SampleDepth) -> Result<()> {
    match (from, to) {
        (SampleDepth::U8, SampleDepth::U8)
        | (SampleDepth::U16, SampleDepth::U16)
        | (SampleDepth::F32Bits, SampleDepth::U16)
        | (SampleDepth::U16, SampleDepth::F32Bits) => Ok(()),
        (from, to) => Err(MosaicError::DepthMismatch { from, to }),
    }
}
