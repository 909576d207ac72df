//! Common geospatial value types shared across the coverage services.

pub mod envelope;
pub mod error;
pub mod georef;
pub mod worldfile;

pub use envelope::Envelope;
pub use error::{CoverageError, CoverageResult};
pub use georef::{GeoReference, PixelOrigin};
pub use worldfile::WorldFile;
