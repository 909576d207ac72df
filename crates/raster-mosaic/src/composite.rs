//! Painting one georeferenced raster onto another.
//!
//! The compositor computes the exact overlapping pixel rectangle in
//! both coordinate spaces, normalizes resolution when the grids
//! disagree, and copies samples with bit-depth conversion. Geometry
//! that yields nothing to paint is a silent no-op; only malformed
//! depth pairings and band-count mismatches are errors.

use crate::buffer::{
    ensure_convertible, pack_f32_to_u16, unpack_u16_to_f32, PixelBuffer, SampleScaling, Samples,
};
use crate::error::{MosaicError, Result};
use crate::resample::{resample, ResampleMethod};
use coverage_common::GeoReference;

/// Relative tolerance under which two resolutions are considered equal
/// (0.01%).
const RESOLUTION_TOLERANCE: f64 = 1e-4;

/// Options threaded through a paint call: the per-coverage sample
/// scaling and the interpolation used when resolutions differ.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaintOptions {
    pub scaling: SampleScaling,
    pub resample: ResampleMethod,
}

/// Paint `src` onto `dest` where their envelopes overlap.
///
/// Mutates `dest` in place and never touches `src`. Disjoint envelopes
/// and overlaps that round to zero destination pixels return without
/// modifying anything. Destination writes are clipped to the buffer
/// because rounding the overlap corners can overshoot by one pixel.
pub fn paint(
    dest: &mut PixelBuffer,
    dest_geo: &GeoReference,
    src: &PixelBuffer,
    src_geo: &GeoReference,
    opts: &PaintOptions,
) -> Result<()> {
    if src.bands() != dest.bands() {
        return Err(MosaicError::BandCountMismatch {
            src: src.bands(),
            dest: dest.bands(),
        });
    }
    ensure_convertible(src.depth(), dest.depth())?;

    let overlap = match dest_geo.envelope().intersection(&src_geo.envelope()) {
        Some(overlap) => overlap,
        None => return Ok(()),
    };

    // Overlap corners in both pixel spaces; top-left comes from
    // (min_x, max_y) since rows grow downward.
    let (sc1, sr1) = src_geo.to_pixel(overlap.min_x, overlap.max_y);
    let (sc2, sr2) = src_geo.to_pixel(overlap.max_x, overlap.min_y);
    let (dc1, dr1) = dest_geo.to_pixel(overlap.min_x, overlap.max_y);
    let (dc2, dr2) = dest_geo.to_pixel(overlap.max_x, overlap.min_y);

    let dest_w = dc2 - dc1;
    let dest_h = dr2 - dr1;
    if dest_w <= 0 || dest_h <= 0 {
        return Ok(());
    }

    // Clip the source rectangle to the source raster before extracting.
    let sx0 = sc1.clamp(0, src.width() as i64);
    let sy0 = sr1.clamp(0, src.height() as i64);
    let sx1 = sc2.clamp(0, src.width() as i64);
    let sy1 = sr2.clamp(0, src.height() as i64);
    if sx1 <= sx0 || sy1 <= sy0 {
        return Ok(());
    }

    let patch = src.crop(
        sx0 as usize,
        sy0 as usize,
        (sx1 - sx0) as usize,
        (sy1 - sy0) as usize,
    )?;

    let patch = if resolutions_differ(src_geo, dest_geo) {
        resample(&patch, dest_w as usize, dest_h as usize, opts.resample)?
    } else {
        patch
    };

    blit(&patch, dest, dc1, dr1, dest_w, dest_h, opts.scaling)
}

/// Whether the two grids differ by more than the relative tolerance in
/// either axis.
fn resolutions_differ(a: &GeoReference, b: &GeoReference) -> bool {
    relative_difference(a.res_x(), b.res_x()) > RESOLUTION_TOLERANCE
        || relative_difference(a.res_y(), b.res_y()) > RESOLUTION_TOLERANCE
}

fn relative_difference(a: f64, b: f64) -> f64 {
    (a - b).abs() / b.abs()
}

/// Copy the patch into the destination rectangle, converting sample
/// depth per pixel.
///
/// Destination coordinates outside the buffer are skipped; patch reads
/// are clamped to its last row/column since a same-resolution patch can
/// be one pixel smaller than the rounded destination rectangle.
fn blit(
    patch: &PixelBuffer,
    dest: &mut PixelBuffer,
    dc0: i64,
    dr0: i64,
    rect_w: i64,
    rect_h: i64,
    scaling: SampleScaling,
) -> Result<()> {
    fn blit_planes<S: Copy, D: Copy>(
        s: &[S],
        d: &mut [D],
        (pw, ph): (usize, usize),
        (dw, dh): (usize, usize),
        (dc0, dr0, rect_w, rect_h): (i64, i64, i64, i64),
        bands: usize,
        convert: impl Fn(S) -> D,
    ) {
        for band in 0..bands {
            let s_plane = band * pw * ph;
            let d_plane = band * dw * dh;
            for r in 0..rect_h {
                let dr = dr0 + r;
                if dr < 0 || dr >= dh as i64 {
                    continue;
                }
                let pr = (r as usize).min(ph - 1);
                for c in 0..rect_w {
                    let dc = dc0 + c;
                    if dc < 0 || dc >= dw as i64 {
                        continue;
                    }
                    let pc = (c as usize).min(pw - 1);
                    d[d_plane + dr as usize * dw + dc as usize] =
                        convert(s[s_plane + pr * pw + pc]);
                }
            }
        }
    }

    let patch_dims = (patch.width(), patch.height());
    let dest_dims = (dest.width(), dest.height());
    let rect = (dc0, dr0, rect_w, rect_h);
    let bands = patch.bands();
    let (from, to) = (patch.depth(), dest.depth());

    match (patch.samples(), dest.samples_mut()) {
        (Samples::U8(s), Samples::U8(d)) => {
            blit_planes(s, d, patch_dims, dest_dims, rect, bands, |v| v);
        }
        (Samples::U16(s), Samples::U16(d)) => {
            blit_planes(s, d, patch_dims, dest_dims, rect, bands, |v| v);
        }
        (Samples::F32Bits(s), Samples::U16(d)) => {
            blit_planes(s, d, patch_dims, dest_dims, rect, bands, |v| {
                pack_f32_to_u16(v, scaling)
            });
        }
        (Samples::U16(s), Samples::F32Bits(d)) => {
            blit_planes(s, d, patch_dims, dest_dims, rect, bands, |v| {
                unpack_u16_to_f32(v, scaling)
            });
        }
        _ => return Err(MosaicError::DepthMismatch { from, to }),
    }
    Ok(())
}
