//! Tile mosaicking and resampling engine.
//!
//! This crate assembles coherent output coverages from heterogeneous
//! georeferenced source tiles: it locates the tiles intersecting a
//! requested extent, normalizes their resolution and bit depth, and
//! composites them onto one destination buffer.
//!
//! # Architecture
//!
//! ```text
//! MosaicRequest (extent + grid + pixel format)
//!      │
//!      ▼
//! MosaicEngine::build_mosaic
//!      │
//!      ├─► TileIndex::query (R-tree box intersection)
//!      │
//!      ├─► TileLoader::load per candidate
//!      │         │
//!      │         ├─► Ok: resample if resolutions differ,
//!      │         │       paint onto the destination buffer
//!      │         │
//!      │         └─► Err: record TileFailure, continue
//!      │
//!      └─► MosaicOutput { buffer, geo, failures }
//!               │
//!               ▼
//!          external encoder / OutputSink
//! ```
//!
//! A mosaic with missing tiles is still a usable result; per-tile load
//! failures are reported alongside the buffer instead of aborting the
//! request.
//!
//! # Example
//!
//! ```ignore
//! use raster_mosaic::{MosaicConfig, MosaicEngine, MosaicRequest, SampleDepth, TileIndex};
//!
//! let engine = MosaicEngine::new(MosaicConfig::default())?;
//! let index = TileIndex::build(catalog_scan()?);
//!
//! let request = MosaicRequest::new(envelope, 1024, 1024, SampleDepth::U16);
//! let output = engine.build_mosaic(&request, &index, &loader)?;
//! for failure in &output.failures {
//!     // report unreadable sources
//! }
//! ```

pub mod buffer;
pub mod cache;
pub mod composite;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod pyramid;
pub mod resample;

// Re-export commonly used types at crate root
pub use buffer::{PixelBuffer, SampleDepth, SampleScaling, Samples};
pub use cache::{CacheStats, CachedLoader, TileCache};
pub use composite::{paint, PaintOptions};
pub use config::{MosaicConfig, PyramidConfig};
pub use engine::{
    LoaderRegistry, MosaicEngine, MosaicOutput, MosaicRequest, TileFailure, TileLoader,
};
pub use error::{LoadError, MosaicError, Result};
pub use index::{TileDescriptor, TileIndex};
pub use pyramid::{build_pyramid, OutputSink, PyramidReport, PyramidTile};
