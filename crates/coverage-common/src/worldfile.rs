//! World-file sidecar support.
//!
//! A world file is the minimal six-number georeferencing sidecar used by
//! plain image rasters (`.tfw`, `.pgw`, ...): X resolution, two rotation
//! terms, negative Y resolution, then the X/Y coordinates of the
//! upper-left pixel. The origin is interpreted under either pixel-origin
//! convention; conversion between the two is the half-pixel shift of
//! [`GeoReference::convert_origin`].

use crate::envelope::Envelope;
use crate::error::{CoverageError, CoverageResult};
use crate::georef::{GeoReference, PixelOrigin};
use std::fmt;
use std::path::Path;

/// The six coefficients of a world file, in file order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldFile {
    /// Pixel width in coordinate units.
    pub res_x: f64,
    /// Row rotation term (zero for north-up rasters).
    pub rot_x: f64,
    /// Column rotation term (zero for north-up rasters).
    pub rot_y: f64,
    /// Pixel height in coordinate units, negative for north-up rasters.
    pub res_y: f64,
    /// X coordinate of the upper-left pixel.
    pub origin_x: f64,
    /// Y coordinate of the upper-left pixel.
    pub origin_y: f64,
}

impl WorldFile {
    /// Parse the six whitespace-separated numbers of a world file.
    pub fn parse(text: &str) -> CoverageResult<Self> {
        let values: Vec<f64> = text
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>().map_err(|_| {
                    CoverageError::invalid_world_file(format!("not a number: {}", tok))
                })
            })
            .collect::<CoverageResult<_>>()?;

        if values.len() != 6 {
            return Err(CoverageError::invalid_world_file(format!(
                "expected 6 values, found {}",
                values.len()
            )));
        }

        Ok(Self {
            res_x: values[0],
            rot_x: values[1],
            rot_y: values[2],
            res_y: values[3],
            origin_x: values[4],
            origin_y: values[5],
        })
    }

    /// Read and parse a world file from disk.
    pub fn read(path: impl AsRef<Path>) -> CoverageResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Write the canonical six-line form to disk.
    pub fn write(&self, path: impl AsRef<Path>) -> CoverageResult<()> {
        std::fs::write(path, self.to_string())?;
        Ok(())
    }

    /// Extract the world file of a georeference, with the origin
    /// interpreted under `convention`.
    pub fn from_georef(geo: &GeoReference, convention: PixelOrigin) -> Self {
        let g = geo.convert_origin(convention);
        let env = g.envelope();
        Self {
            res_x: g.res_x(),
            rot_x: 0.0,
            rot_y: 0.0,
            res_y: -g.res_y(),
            origin_x: env.min_x,
            origin_y: env.max_y,
        }
    }

    /// Build the georeference of a `width` x `height` raster whose world
    /// file this is, interpreting the origin under `convention`.
    ///
    /// Rotated rasters are not supported; both rotation terms must be
    /// zero, and the Y resolution must be negative (north-up).
    pub fn to_georef(
        &self,
        width: u32,
        height: u32,
        convention: PixelOrigin,
    ) -> CoverageResult<GeoReference> {
        if self.rot_x != 0.0 || self.rot_y != 0.0 {
            return Err(CoverageError::invalid_world_file(format!(
                "rotation is not supported, got ({}, {})",
                self.rot_x, self.rot_y
            )));
        }
        if self.res_y >= 0.0 {
            return Err(CoverageError::invalid_world_file(format!(
                "expected negative Y resolution, got {}",
                self.res_y
            )));
        }

        let res_y = -self.res_y;
        let spans = match convention {
            PixelOrigin::Center => (width.saturating_sub(1), height.saturating_sub(1)),
            PixelOrigin::Outer => (width, height),
        };
        let envelope = Envelope::new(
            self.origin_x,
            self.origin_y - spans.1 as f64 * res_y,
            self.origin_x + spans.0 as f64 * self.res_x,
            self.origin_y,
        );

        GeoReference::new(envelope, width, height, convention)
    }
}

impl fmt::Display for WorldFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:.10}", self.res_x)?;
        writeln!(f, "{:.10}", self.rot_x)?;
        writeln!(f, "{:.10}", self.rot_y)?;
        writeln!(f, "{:.10}", self.res_y)?;
        writeln!(f, "{:.10}", self.origin_x)?;
        writeln!(f, "{:.10}", self.origin_y)
    }
}
