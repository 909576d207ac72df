//! Error types for the shared coverage types.

use thiserror::Error;

/// Result type alias using CoverageError.
pub type CoverageResult<T> = Result<T, CoverageError>;

/// Errors raised by the shared georeferencing types.
#[derive(Debug, Error)]
pub enum CoverageError {
    /// A georeference could not be constructed from the given envelope
    /// and pixel dimensions.
    #[error("invalid georeference: {0}")]
    InvalidGeoReference(String),

    /// A world file could not be parsed.
    #[error("invalid world file: {0}")]
    InvalidWorldFile(String),

    /// Reading or writing a world file failed.
    #[error("world file I/O error: {0}")]
    WorldFileIo(String),
}

impl CoverageError {
    /// Create an InvalidGeoReference error.
    pub fn invalid_geo_reference(msg: impl Into<String>) -> Self {
        Self::InvalidGeoReference(msg.into())
    }

    /// Create an InvalidWorldFile error.
    pub fn invalid_world_file(msg: impl Into<String>) -> Self {
        Self::InvalidWorldFile(msg.into())
    }
}

impl From<std::io::Error> for CoverageError {
    fn from(err: std::io::Error) -> Self {
        Self::WorldFileIo(err.to_string())
    }
}
