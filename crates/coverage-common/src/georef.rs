//! Affine mapping between geographic coordinates and raster pixel space.

use crate::envelope::Envelope;
use crate::error::{CoverageError, CoverageResult};
use serde::{Deserialize, Serialize};

/// Pixel-origin convention for a georeferenced raster.
///
/// Determines whether the declared envelope touches the *centers* of the
/// corner pixels (legacy desktop-GIS convention) or their *outer edges*
/// (spatial-database convention). The two differ by half a pixel on every
/// edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelOrigin {
    /// Envelope corners coincide with pixel centers.
    Center,
    /// Envelope corners coincide with pixel outer edges.
    Outer,
}

/// Bidirectional affine mapping between a geographic envelope and the
/// row/column space of one raster.
///
/// Row 0 sits at `max_y` and rows increase downward; resolutions are
/// stored as positive magnitudes with the row mapping encoding the
/// direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoReference {
    envelope: Envelope,
    width: u32,
    height: u32,
    origin: PixelOrigin,
}

impl GeoReference {
    /// Create a new georeference.
    ///
    /// Fails if either pixel dimension is zero or if the derived
    /// resolution is not strictly positive and finite. The Center
    /// convention needs at least two pixels per axis since its envelope
    /// spans `n - 1` pixel intervals.
    pub fn new(
        envelope: Envelope,
        width: u32,
        height: u32,
        origin: PixelOrigin,
    ) -> CoverageResult<Self> {
        if width == 0 || height == 0 {
            return Err(CoverageError::invalid_geo_reference(format!(
                "pixel dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        if origin == PixelOrigin::Center && (width < 2 || height < 2) {
            return Err(CoverageError::invalid_geo_reference(format!(
                "center-origin rasters need at least 2 pixels per axis, got {}x{}",
                width, height
            )));
        }

        let georef = Self {
            envelope,
            width,
            height,
            origin,
        };
        let (res_x, res_y) = (georef.res_x(), georef.res_y());
        if !(res_x > 0.0 && res_x.is_finite() && res_y > 0.0 && res_y.is_finite()) {
            return Err(CoverageError::invalid_geo_reference(format!(
                "resolution must be strictly positive, got ({}, {})",
                res_x, res_y
            )));
        }

        Ok(georef)
    }

    /// The geographic envelope, interpreted under this georeference's
    /// pixel-origin convention.
    pub fn envelope(&self) -> Envelope {
        self.envelope
    }

    /// Raster width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Raster height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The pixel-origin convention of the stored envelope.
    pub fn origin(&self) -> PixelOrigin {
        self.origin
    }

    /// Horizontal resolution in coordinate units per pixel.
    pub fn res_x(&self) -> f64 {
        self.envelope.width() / (self.width - self.origin_adjustment()) as f64
    }

    /// Vertical resolution in coordinate units per pixel (positive
    /// magnitude).
    pub fn res_y(&self) -> f64 {
        self.envelope.height() / (self.height - self.origin_adjustment()) as f64
    }

    fn origin_adjustment(&self) -> u32 {
        match self.origin {
            PixelOrigin::Center => 1,
            PixelOrigin::Outer => 0,
        }
    }

    /// Map geographic coordinates to the nearest integer pixel.
    ///
    /// Rounds half away from zero, matching the behavior of rounding
    /// transformed coordinates to the nearest pixel in legacy coverage
    /// stores. Results may fall outside `[0, width) x [0, height)` for
    /// coordinates outside the envelope; callers clip.
    pub fn to_pixel(&self, x: f64, y: f64) -> (i64, i64) {
        let col = ((x - self.envelope.min_x) / self.res_x()).round() as i64;
        let row = ((self.envelope.max_y - y) / self.res_y()).round() as i64;
        (col, row)
    }

    /// Map an integer pixel back to geographic coordinates.
    ///
    /// Exact inverse of [`GeoReference::to_pixel`] for in-bounds pixels.
    pub fn to_geo(&self, col: i64, row: i64) -> (f64, f64) {
        let x = self.envelope.min_x + col as f64 * self.res_x();
        let y = self.envelope.max_y - row as f64 * self.res_y();
        (x, y)
    }

    /// Convert this georeference to the given pixel-origin convention.
    ///
    /// Shifts every envelope edge by half the current resolution:
    /// outward for Center→Outer, inward for Outer→Center. Pixel counts
    /// and derived resolutions are unchanged. No-op if already in the
    /// target convention.
    pub fn convert_origin(&self, to: PixelOrigin) -> GeoReference {
        if self.origin == to {
            return *self;
        }

        let half_x = self.res_x() / 2.0;
        let half_y = self.res_y() / 2.0;
        let envelope = match to {
            PixelOrigin::Outer => Envelope::new(
                self.envelope.min_x - half_x,
                self.envelope.min_y - half_y,
                self.envelope.max_x + half_x,
                self.envelope.max_y + half_y,
            ),
            PixelOrigin::Center => Envelope::new(
                self.envelope.min_x + half_x,
                self.envelope.min_y + half_y,
                self.envelope.max_x - half_x,
                self.envelope.max_y - half_y,
            ),
        };

        GeoReference {
            envelope,
            width: self.width,
            height: self.height,
            origin: to,
        }
    }
}
