//! Mosaic assembly: candidate lookup, tile loading and compositing.

use crate::buffer::{PixelBuffer, SampleDepth};
use crate::composite::{paint, PaintOptions};
use crate::config::MosaicConfig;
use crate::error::{LoadError, Result};
use crate::index::{TileDescriptor, TileIndex};
use coverage_common::{Envelope, GeoReference, PixelOrigin};
use std::collections::HashMap;

/// One mosaic request: the target extent, grid and pixel format.
///
/// Constructed by the caller, consumed once by the engine, never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct MosaicRequest {
    /// Geographic extent of the output raster (outer-edge convention).
    pub envelope: Envelope,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output sample encoding.
    pub depth: SampleDepth,
    /// Output band count.
    pub bands: usize,
    /// Per-band background fill; zero/transparent when absent.
    pub background: Option<Vec<f64>>,
}

impl MosaicRequest {
    /// Create a single-band request with no background fill.
    pub fn new(envelope: Envelope, width: u32, height: u32, depth: SampleDepth) -> Self {
        Self {
            envelope,
            width,
            height,
            depth,
            bands: 1,
            background: None,
        }
    }

    /// Set the output band count.
    pub fn with_bands(mut self, bands: usize) -> Self {
        self.bands = bands;
        self
    }

    /// Set the per-band background fill.
    pub fn with_background(mut self, background: Vec<f64>) -> Self {
        self.background = Some(background);
        self
    }
}

/// Produces the decoded pixel data and georeference of one source tile.
///
/// Implemented externally per format (GeoTIFF, plain imagery, raw
/// database blobs); the engine only sees the decoded result.
pub trait TileLoader {
    fn load(
        &self,
        tile: &TileDescriptor,
    ) -> std::result::Result<(PixelBuffer, GeoReference), LoadError>;
}

impl<F> TileLoader for F
where
    F: Fn(&TileDescriptor) -> std::result::Result<(PixelBuffer, GeoReference), LoadError>,
{
    fn load(
        &self,
        tile: &TileDescriptor,
    ) -> std::result::Result<(PixelBuffer, GeoReference), LoadError> {
        self(tile)
    }
}

/// Dispatch table from format tag to loader.
///
/// The closed set of supported formats is whatever has been registered;
/// a tile whose tag has no entry fails with
/// [`LoadError::UnsupportedFormat`] instead of being guessed at.
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: HashMap<String, Box<dyn TileLoader + Send + Sync>>,
}

impl LoaderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loader for a lowercase format tag (file extension).
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        loader: Box<dyn TileLoader + Send + Sync>,
    ) {
        self.loaders.insert(tag.into().to_ascii_lowercase(), loader);
    }

    /// Look up the loader for a tag.
    pub fn get(&self, tag: &str) -> Option<&(dyn TileLoader + Send + Sync)> {
        self.loaders.get(tag).map(|boxed| boxed.as_ref())
    }

    /// Registered tags, for capability reporting.
    pub fn tags(&self) -> Vec<&str> {
        self.loaders.keys().map(String::as_str).collect()
    }
}

impl TileLoader for LoaderRegistry {
    fn load(
        &self,
        tile: &TileDescriptor,
    ) -> std::result::Result<(PixelBuffer, GeoReference), LoadError> {
        let tag = tile
            .format_tag()
            .ok_or_else(|| LoadError::UnsupportedFormat(tile.source.clone()))?;
        let loader = self
            .get(&tag)
            .ok_or(LoadError::UnsupportedFormat(tag))?;
        loader.load(tile)
    }
}

/// Failure to incorporate one source tile, recorded against its handle.
#[derive(Debug, Clone)]
pub struct TileFailure {
    pub source: String,
    pub error: LoadError,
}

/// The assembled mosaic plus the per-tile failure report.
///
/// A mosaic with failures is still usable; the failure list tells the
/// caller which sources contributed nothing.
#[derive(Debug)]
pub struct MosaicOutput {
    pub buffer: PixelBuffer,
    pub geo: GeoReference,
    pub failures: Vec<TileFailure>,
}

/// Assembles mosaics from indexed source tiles.
pub struct MosaicEngine {
    config: MosaicConfig,
}

impl MosaicEngine {
    /// Create an engine with the given configuration.
    pub fn new(config: MosaicConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The engine configuration.
    pub fn config(&self) -> &MosaicConfig {
        &self.config
    }

    /// Assemble the mosaic for one request.
    ///
    /// Candidates are painted in ascending source order so overlapping
    /// edges resolve the same way on every run. A tile that fails to
    /// load is recorded and skipped; compositing errors (depth or band
    /// mismatches) abort the request.
    pub fn build_mosaic(
        &self,
        request: &MosaicRequest,
        index: &TileIndex,
        loader: &dyn TileLoader,
    ) -> Result<MosaicOutput> {
        let geo = GeoReference::new(
            request.envelope,
            request.width,
            request.height,
            PixelOrigin::Outer,
        )?;

        let mut buffer = PixelBuffer::new(
            request.width as usize,
            request.height as usize,
            request.bands,
            request.depth,
        )?;
        if let Some(background) = &request.background {
            buffer.fill(background)?;
        }

        let mut candidates = index.query(&request.envelope);
        candidates.sort_by(|a, b| a.source.cmp(&b.source));
        tracing::debug!(
            candidates = candidates.len(),
            width = request.width,
            height = request.height,
            "assembling mosaic"
        );

        let opts = PaintOptions {
            scaling: self.config.scaling,
            resample: self.config.resample,
        };

        let mut failures = Vec::new();
        for tile in candidates {
            match loader.load(&tile) {
                Ok((source, source_geo)) => {
                    paint(&mut buffer, &geo, &source, &source_geo, &opts)?;
                    tracing::debug!(source = %tile.source, "painted tile");
                }
                Err(error) => {
                    tracing::warn!(source = %tile.source, %error, "skipping unreadable tile");
                    failures.push(TileFailure {
                        source: tile.source.clone(),
                        error,
                    });
                }
            }
        }

        Ok(MosaicOutput {
            buffer,
            geo,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Samples;

    fn checker_loader(
        tile: &TileDescriptor,
    ) -> std::result::Result<(PixelBuffer, GeoReference), LoadError> {
        let env = tile.envelope;
        let buffer =
            PixelBuffer::from_samples(10, 10, 1, Samples::U8(vec![1; 100])).map_err(|e| {
                LoadError::Decode(e.to_string())
            })?;
        let geo = GeoReference::new(env, 10, 10, PixelOrigin::Outer)
            .map_err(|e| LoadError::Decode(e.to_string()))?;
        Ok((buffer, geo))
    }

    #[test]
    fn test_request_builder() {
        let request = MosaicRequest::new(
            Envelope::new(0.0, 0.0, 10.0, 10.0),
            256,
            256,
            SampleDepth::U8,
        )
        .with_bands(3)
        .with_background(vec![0.0, 0.0, 255.0]);

        assert_eq!(request.bands, 3);
        assert_eq!(request.background, Some(vec![0.0, 0.0, 255.0]));
    }

    #[test]
    fn test_loader_registry_dispatch() {
        let mut registry = LoaderRegistry::new();
        registry.register("tif", Box::new(checker_loader));

        let tif = TileDescriptor::new("a.tif", Envelope::new(0.0, 0.0, 10.0, 10.0));
        assert!(registry.load(&tif).is_ok());

        let png = TileDescriptor::new("a.png", Envelope::new(0.0, 0.0, 10.0, 10.0));
        assert!(matches!(
            registry.load(&png),
            Err(LoadError::UnsupportedFormat(_))
        ));

        let bare = TileDescriptor::new("db-key-7", Envelope::new(0.0, 0.0, 10.0, 10.0));
        assert!(matches!(
            registry.load(&bare),
            Err(LoadError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_registry_is_case_insensitive() {
        let mut registry = LoaderRegistry::new();
        registry.register("TIF", Box::new(checker_loader));

        let tile = TileDescriptor::new("A.TIF", Envelope::new(0.0, 0.0, 10.0, 10.0));
        assert!(registry.load(&tile).is_ok());
    }
}
