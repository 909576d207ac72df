//! Error types for the mosaicking engine.

use crate::buffer::SampleDepth;
use thiserror::Error;

/// Result type for mosaic operations.
pub type Result<T> = std::result::Result<T, MosaicError>;

/// Errors that can occur while assembling a mosaic.
///
/// Geometry that yields nothing to paint is never an error; disjoint or
/// zero-area overlaps are normal control flow. Per-tile load failures
/// are collected into the failure report of the mosaic instead of being
/// raised (see [`LoadError`]).
#[derive(Debug, Error)]
pub enum MosaicError {
    /// A buffer or request had zero-sized dimensions or band count.
    #[error("invalid raster dimensions: {0}")]
    InvalidDimensions(String),

    /// Source and destination band counts differ.
    #[error("band count mismatch: source has {src}, destination has {dest}")]
    BandCountMismatch { src: usize, dest: usize },

    /// No conversion exists between the two sample depths.
    #[error("unsupported bit-depth pairing: {from} -> {to}")]
    DepthMismatch { from: SampleDepth, to: SampleDepth },

    /// Invalid engine or pyramid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A georeference could not be constructed.
    #[error("georeference error: {0}")]
    Geo(String),

    /// An output sink rejected a finished tile.
    #[error("output sink error: {0}")]
    Sink(String),
}

impl MosaicError {
    /// Create an InvalidDimensions error.
    pub fn invalid_dimensions(msg: impl Into<String>) -> Self {
        Self::InvalidDimensions(msg.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a Sink error.
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }
}

impl From<coverage_common::CoverageError> for MosaicError {
    fn from(err: coverage_common::CoverageError) -> Self {
        Self::Geo(err.to_string())
    }
}

/// Failure to produce the pixel data of one source tile.
///
/// These never abort a mosaic; the engine records them per tile and
/// continues with the remaining candidates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The source tile does not exist.
    #[error("source not found: {0}")]
    NotFound(String),

    /// Reading the source tile failed.
    #[error("failed to read source: {0}")]
    Io(String),

    /// The source tile exists but could not be decoded.
    #[error("failed to decode source: {0}")]
    Decode(String),

    /// No loader is registered for the source's format tag.
    #[error("no loader registered for format: {0}")]
    UnsupportedFormat(String),
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
