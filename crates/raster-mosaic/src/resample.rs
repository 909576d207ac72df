//! Resampling a pixel buffer to a different grid size.
//!
//! Nearest neighbor is the default: it is the only method that is
//! lossless for categorical and raw DEM data, where smooth kernels
//! manufacture sample values that never existed in the source. Bilinear
//! and cubic are for photographic imagery only.

use crate::buffer::{PixelBuffer, Samples};
use crate::error::{MosaicError, Result};
use serde::{Deserialize, Serialize};

/// Interpolation method for resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleMethod {
    /// Nearest neighbor (preserves exact values; safe for elevation
    /// models and categorical rasters).
    #[default]
    Nearest,
    /// Bilinear interpolation over the 2x2 neighborhood.
    Bilinear,
    /// Cubic interpolation over the 4x4 neighborhood (Catmull-Rom).
    Cubic,
}

impl ResampleMethod {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "bilinear" => Self::Bilinear,
            "cubic" | "bicubic" => Self::Cubic,
            _ => Self::Nearest,
        }
    }
}

impl std::fmt::Display for ResampleMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nearest => write!(f, "nearest"),
            Self::Bilinear => write!(f, "bilinear"),
            Self::Cubic => write!(f, "cubic"),
        }
    }
}

/// Resample a buffer to `dest_width` x `dest_height`.
///
/// A zero destination dimension is derived from the other one via the
/// source aspect ratio; both zero is an error, as is an empty source.
pub fn resample(
    src: &PixelBuffer,
    dest_width: usize,
    dest_height: usize,
    method: ResampleMethod,
) -> Result<PixelBuffer> {
    if src.width() == 0 || src.height() == 0 || src.bands() == 0 {
        return Err(MosaicError::invalid_dimensions(format!(
            "cannot resample empty source ({}x{}x{})",
            src.width(),
            src.height(),
            src.bands()
        )));
    }

    let (dest_width, dest_height) = derive_dimensions(src, dest_width, dest_height)?;

    let mut dest = PixelBuffer::new(dest_width, dest_height, src.bands(), src.depth())?;
    match method {
        ResampleMethod::Nearest => resample_nearest(src, &mut dest),
        ResampleMethod::Bilinear | ResampleMethod::Cubic => {
            resample_smooth(src, &mut dest, method)
        }
    }
    Ok(dest)
}

/// Fill in a missing (zero) destination dimension from the source
/// aspect ratio.
fn derive_dimensions(
    src: &PixelBuffer,
    dest_width: usize,
    dest_height: usize,
) -> Result<(usize, usize)> {
    match (dest_width, dest_height) {
        (0, 0) => Err(MosaicError::invalid_dimensions(
            "destination size must have at least one positive dimension".to_string(),
        )),
        (0, h) => {
            let w = ((h as f64 * src.width() as f64 / src.height() as f64).round() as usize).max(1);
            Ok((w, h))
        }
        (w, 0) => {
            let h = ((w as f64 * src.height() as f64 / src.width() as f64).round() as usize).max(1);
            Ok((w, h))
        }
        (w, h) => Ok((w, h)),
    }
}

/// Nearest neighbor on raw stored samples.
///
/// Each destination pixel takes the source pixel at
/// `floor(dest_col * src_w / dest_w)` (and the analogous row), so no
/// sample value is ever synthesized.
fn resample_nearest(src: &PixelBuffer, dest: &mut PixelBuffer) {
    fn nearest_planes<T: Copy>(
        s: &[T],
        d: &mut [T],
        (sw, sh): (usize, usize),
        (dw, dh): (usize, usize),
        bands: usize,
    ) {
        for band in 0..bands {
            let s_plane = band * sw * sh;
            let d_plane = band * dw * dh;
            for dy in 0..dh {
                let sy = dy * sh / dh;
                for dx in 0..dw {
                    let sx = dx * sw / dw;
                    d[d_plane + dy * dw + dx] = s[s_plane + sy * sw + sx];
                }
            }
        }
    }

    let src_dims = (src.width(), src.height());
    let dest_dims = (dest.width(), dest.height());
    let bands = src.bands();
    match (src.samples(), dest.samples_mut()) {
        (Samples::U8(s), Samples::U8(d)) => nearest_planes(s, d, src_dims, dest_dims, bands),
        (Samples::U16(s), Samples::U16(d)) => nearest_planes(s, d, src_dims, dest_dims, bands),
        (Samples::F32Bits(s), Samples::F32Bits(d)) => {
            nearest_planes(s, d, src_dims, dest_dims, bands)
        }
        // dest was allocated with src's depth
        _ => unreachable!("resample output depth matches input"),
    }
}

/// Bilinear/cubic interpolation on the numeric sample values.
fn resample_smooth(src: &PixelBuffer, dest: &mut PixelBuffer, method: ResampleMethod) {
    let (sw, sh) = (src.width(), src.height());
    let (dw, dh) = (dest.width(), dest.height());

    // Corner-aligned mapping: destination corners sample source corners.
    let scale_x = (sw - 1) as f64 / (dw - 1).max(1) as f64;
    let scale_y = (sh - 1) as f64 / (dh - 1).max(1) as f64;

    for band in 0..src.bands() {
        for dy in 0..dh {
            let sy = dy as f64 * scale_y;
            for dx in 0..dw {
                let sx = dx as f64 * scale_x;
                let value = match method {
                    ResampleMethod::Bilinear => bilinear_sample(src, band, sx, sy),
                    ResampleMethod::Cubic => cubic_sample(src, band, sx, sy),
                    ResampleMethod::Nearest => unreachable!("handled by resample_nearest"),
                };
                dest.set_value(band, dy, dx, value);
            }
        }
    }
}

/// Interpolate between the four nearest samples.
fn bilinear_sample(src: &PixelBuffer, band: usize, x: f64, y: f64) -> f64 {
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(src.width() - 1);
    let y1 = (y0 + 1).min(src.height() - 1);

    let xf = x - x0 as f64;
    let yf = y - y0 as f64;

    let v00 = src.value_at(band, y0, x0);
    let v10 = src.value_at(band, y0, x1);
    let v01 = src.value_at(band, y1, x0);
    let v11 = src.value_at(band, y1, x1);

    let top = v00 * (1.0 - xf) + v10 * xf;
    let bottom = v01 * (1.0 - xf) + v11 * xf;
    top * (1.0 - yf) + bottom * yf
}

/// Interpolate over the surrounding 4x4 samples with a Catmull-Rom
/// spline, clamping the neighborhood at the raster edges.
fn cubic_sample(src: &PixelBuffer, band: usize, x: f64, y: f64) -> f64 {
    let xi = x.floor() as i64;
    let yi = y.floor() as i64;
    let xf = x - xi as f64;
    let yf = y - yi as f64;

    let mut rows = [0.0f64; 4];
    for (j, row_value) in rows.iter_mut().enumerate() {
        let py = (yi + j as i64 - 1).clamp(0, src.height() as i64 - 1) as usize;
        let mut p = [0.0f64; 4];
        for (i, v) in p.iter_mut().enumerate() {
            let px = (xi + i as i64 - 1).clamp(0, src.width() as i64 - 1) as usize;
            *v = src.value_at(band, py, px);
        }
        *row_value = cubic_1d(p[0], p[1], p[2], p[3], xf);
    }

    cubic_1d(rows[0], rows[1], rows[2], rows[3], yf)
}

/// 1D cubic interpolation using a Catmull-Rom spline.
fn cubic_1d(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;

    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    let d = p1;

    a * t3 + b * t2 + c * t + d
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SampleDepth;

    fn gradient_u8(width: usize, height: usize) -> PixelBuffer {
        let samples: Vec<u8> = (0..width * height).map(|i| i as u8).collect();
        PixelBuffer::from_samples(width, height, 1, Samples::U8(samples)).unwrap()
    }

    #[test]
    fn test_nearest_identity() {
        let src = gradient_u8(4, 4);
        let out = resample(&src, 4, 4, ResampleMethod::Nearest).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn test_nearest_downsample_by_two() {
        let src = gradient_u8(4, 4);
        let out = resample(&src, 2, 2, ResampleMethod::Nearest).unwrap();

        // dest (0,0) -> src (0,0), dest (1,0) -> src (2,0), etc.
        assert_eq!(out.value_at(0, 0, 0), 0.0);
        assert_eq!(out.value_at(0, 0, 1), 2.0);
        assert_eq!(out.value_at(0, 1, 0), 8.0);
        assert_eq!(out.value_at(0, 1, 1), 10.0);
    }

    #[test]
    fn test_nearest_upsample_repeats_values() {
        let src = gradient_u8(2, 2);
        let out = resample(&src, 4, 4, ResampleMethod::Nearest).unwrap();

        // Each source pixel expands to a 2x2 block; no new values appear.
        assert_eq!(out.value_at(0, 0, 0), 0.0);
        assert_eq!(out.value_at(0, 0, 1), 0.0);
        assert_eq!(out.value_at(0, 0, 2), 1.0);
        assert_eq!(out.value_at(0, 3, 3), 3.0);
    }

    #[test]
    fn test_nearest_preserves_u16_raw_values() {
        let samples: Vec<u16> = vec![1000, 2000, 3000, 4000];
        let src = PixelBuffer::from_samples(2, 2, 1, Samples::U16(samples)).unwrap();
        let out = resample(&src, 3, 3, ResampleMethod::Nearest).unwrap();

        match out.samples() {
            Samples::U16(v) => {
                for &s in v {
                    assert!([1000, 2000, 3000, 4000].contains(&s));
                }
            }
            _ => panic!("depth changed"),
        }
    }

    #[test]
    fn test_bilinear_corners_preserved() {
        let samples: Vec<u8> = vec![10, 20, 30, 40];
        let src = PixelBuffer::from_samples(2, 2, 1, Samples::U8(samples)).unwrap();
        let out = resample(&src, 5, 5, ResampleMethod::Bilinear).unwrap();

        assert_eq!(out.value_at(0, 0, 0), 10.0);
        assert_eq!(out.value_at(0, 0, 4), 20.0);
        assert_eq!(out.value_at(0, 4, 0), 30.0);
        assert_eq!(out.value_at(0, 4, 4), 40.0);
        // center is the mean of all four corners
        assert_eq!(out.value_at(0, 2, 2), 25.0);
    }

    #[test]
    fn test_cubic_flat_field_stays_flat() {
        let samples: Vec<u16> = vec![500; 16];
        let src = PixelBuffer::from_samples(4, 4, 1, Samples::U16(samples)).unwrap();
        let out = resample(&src, 9, 9, ResampleMethod::Cubic).unwrap();

        for row in 0..9 {
            for col in 0..9 {
                assert_eq!(out.value_at(0, row, col), 500.0);
            }
        }
    }

    #[test]
    fn test_derive_width_from_aspect_ratio() {
        let src = gradient_u8(8, 4);
        let out = resample(&src, 0, 2, ResampleMethod::Nearest).unwrap();
        assert_eq!(out.width(), 4);
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn test_derive_height_from_aspect_ratio() {
        let src = gradient_u8(8, 4);
        let out = resample(&src, 4, 0, ResampleMethod::Nearest).unwrap();
        assert_eq!(out.width(), 4);
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn test_both_dimensions_zero_is_error() {
        let src = gradient_u8(4, 4);
        assert!(resample(&src, 0, 0, ResampleMethod::Nearest).is_err());
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!(ResampleMethod::from_str("nearest"), ResampleMethod::Nearest);
        assert_eq!(ResampleMethod::from_str("BILINEAR"), ResampleMethod::Bilinear);
        assert_eq!(ResampleMethod::from_str("cubic"), ResampleMethod::Cubic);
        assert_eq!(ResampleMethod::from_str("bicubic"), ResampleMethod::Cubic);
        assert_eq!(ResampleMethod::from_str("unknown"), ResampleMethod::Nearest);
    }

    #[test]
    fn test_multi_band() {
        let mut samples = Vec::new();
        samples.extend((0..4).map(|i| i as u8)); // band 0
        samples.extend((10..14).map(|i| i as u8)); // band 1
        let src = PixelBuffer::from_samples(2, 2, 2, Samples::U8(samples)).unwrap();

        let out = resample(&src, 4, 4, ResampleMethod::Nearest).unwrap();
        assert_eq!(out.bands(), 2);
        assert_eq!(out.value_at(0, 0, 0), 0.0);
        assert_eq!(out.value_at(1, 0, 0), 10.0);
        assert_eq!(out.value_at(1, 3, 3), 13.0);
    }
}
