//! Batch pyramid builds: one mosaic per output tile, one tile per task.
//!
//! Every output tile owns its destination buffer, so tiles are mosaicked
//! in parallel; within one tile the engine stays sequential.

use crate::buffer::PixelBuffer;
use crate::config::PyramidConfig;
use crate::engine::{MosaicEngine, MosaicRequest, TileFailure, TileLoader};
use crate::error::Result;
use crate::index::TileIndex;
use coverage_common::{Envelope, GeoReference};
use rayon::prelude::*;

/// Address of one output tile within a pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyramidTile {
    /// Level index (0 = native resolution).
    pub level: u32,
    /// Tile column within the level.
    pub col: u32,
    /// Tile row within the level.
    pub row: u32,
}

/// Receives finished output tiles (GeoTIFF writer, plain image writer,
/// XYZ text writer, ...). Implementations must tolerate concurrent
/// calls for distinct tiles.
pub trait OutputSink: Sync {
    fn write(&self, tile: &PyramidTile, buffer: &PixelBuffer, geo: &GeoReference) -> Result<()>;
}

/// Summary of a whole pyramid build.
#[derive(Debug)]
pub struct PyramidReport {
    /// Number of levels built, including level 0.
    pub levels: u32,
    /// Total output tiles written.
    pub tiles_written: usize,
    /// Per-source load failures accumulated across all tiles.
    pub failures: Vec<TileFailure>,
}

/// Pixel geometry of one pyramid level.
#[derive(Debug, Clone, Copy)]
struct LevelLayout {
    width: u32,
    height: u32,
    cols: u32,
    rows: u32,
    res_x: f64,
    res_y: f64,
}

fn level_layout(base: &MosaicRequest, config: &PyramidConfig, level: u32) -> LevelLayout {
    let scale = config.scale_step.pow(level) as u64;
    let width = ((base.width as u64 + scale - 1) / scale).max(1) as u32;
    let height = ((base.height as u64 + scale - 1) / scale).max(1) as u32;
    let cols = (width + config.tile_size - 1) / config.tile_size;
    let rows = (height + config.tile_size - 1) / config.tile_size;

    // Level resolution is the base resolution scaled up, independent of
    // how the level's pixel count rounded.
    let res_x = base.envelope.width() / base.width as f64 * scale as f64;
    let res_y = base.envelope.height() / base.height as f64 * scale as f64;

    LevelLayout {
        width,
        height,
        cols,
        rows,
        res_x,
        res_y,
    }
}

/// Build every output tile of every level and hand each to the sink.
///
/// Tiles within a level are computed in parallel. Load failures are
/// collected across the whole build; engine and sink errors abort it.
pub fn build_pyramid<L>(
    engine: &MosaicEngine,
    base: &MosaicRequest,
    config: &PyramidConfig,
    index: &TileIndex,
    loader: &L,
    sink: &dyn OutputSink,
) -> Result<PyramidReport>
where
    L: TileLoader + Sync,
{
    config.validate()?;
    let levels = config.num_levels(base.width, base.height);

    let mut tiles_written = 0;
    let mut failures = Vec::new();

    for level in 0..levels {
        let layout = level_layout(base, config, level);
        tracing::debug!(
            level,
            width = layout.width,
            height = layout.height,
            tiles = layout.cols * layout.rows,
            "building pyramid level"
        );

        let addresses: Vec<PyramidTile> = (0..layout.rows)
            .flat_map(|row| (0..layout.cols).map(move |col| PyramidTile { level, col, row }))
            .collect();

        let level_failures: Vec<Vec<TileFailure>> = addresses
            .into_par_iter()
            .map(|tile| build_tile(engine, base, config, &layout, tile, index, loader, sink))
            .collect::<Result<_>>()?;

        tiles_written += (layout.cols * layout.rows) as usize;
        failures.extend(level_failures.into_iter().flatten());
    }

    Ok(PyramidReport {
        levels,
        tiles_written,
        failures,
    })
}

#[allow(clippy::too_many_arguments)]
fn build_tile<L>(
    engine: &MosaicEngine,
    base: &MosaicRequest,
    config: &PyramidConfig,
    layout: &LevelLayout,
    tile: PyramidTile,
    index: &TileIndex,
    loader: &L,
    sink: &dyn OutputSink,
) -> Result<Vec<TileFailure>>
where
    L: TileLoader + Sync,
{
    let x0 = tile.col * config.tile_size;
    let y0 = tile.row * config.tile_size;
    let width = config.tile_size.min(layout.width - x0);
    let height = config.tile_size.min(layout.height - y0);

    let max_y = base.envelope.max_y - y0 as f64 * layout.res_y;
    let min_x = base.envelope.min_x + x0 as f64 * layout.res_x;
    let envelope = Envelope::new(
        min_x,
        max_y - height as f64 * layout.res_y,
        min_x + width as f64 * layout.res_x,
        max_y,
    );

    let request = MosaicRequest {
        envelope,
        width,
        height,
        depth: base.depth,
        bands: base.bands,
        background: base.background.clone(),
    };

    let output = engine.build_mosaic(&request, index, loader)?;
    sink.write(&tile, &output.buffer, &output.geo)?;
    Ok(output.failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{SampleDepth, Samples};
    use crate::config::MosaicConfig;
    use crate::error::LoadError;
    use crate::index::TileDescriptor;
    use coverage_common::PixelOrigin;
    use std::sync::Mutex;

    struct MemorySink {
        written: Mutex<Vec<(PyramidTile, usize, usize)>>,
    }

    impl OutputSink for MemorySink {
        fn write(
            &self,
            tile: &PyramidTile,
            buffer: &PixelBuffer,
            _geo: &GeoReference,
        ) -> Result<()> {
            self.written
                .lock()
                .expect("sink poisoned")
                .push((*tile, buffer.width(), buffer.height()));
            Ok(())
        }
    }

    fn flat_loader(
        tile: &TileDescriptor,
    ) -> std::result::Result<(PixelBuffer, GeoReference), LoadError> {
        let buffer = PixelBuffer::from_samples(16, 16, 1, Samples::U8(vec![5; 256]))
            .map_err(|e| LoadError::Decode(e.to_string()))?;
        let geo = GeoReference::new(tile.envelope, 16, 16, PixelOrigin::Outer)
            .map_err(|e| LoadError::Decode(e.to_string()))?;
        Ok((buffer, geo))
    }

    #[test]
    fn test_level_layout() {
        let base = MosaicRequest::new(
            Envelope::new(0.0, 0.0, 64.0, 64.0),
            64,
            64,
            SampleDepth::U8,
        );
        let config = PyramidConfig {
            levels: 3,
            min_dimension: 1,
            scale_step: 2,
            tile_size: 16,
        };

        let l0 = level_layout(&base, &config, 0);
        assert_eq!((l0.width, l0.height, l0.cols, l0.rows), (64, 64, 4, 4));
        assert!((l0.res_x - 1.0).abs() < 1e-12);

        let l2 = level_layout(&base, &config, 2);
        assert_eq!((l2.width, l2.height, l2.cols, l2.rows), (16, 16, 1, 1));
        assert!((l2.res_x - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_build_pyramid_writes_all_tiles() {
        let base = MosaicRequest::new(
            Envelope::new(0.0, 0.0, 64.0, 64.0),
            64,
            64,
            SampleDepth::U8,
        );
        let config = PyramidConfig {
            levels: 3,
            min_dimension: 1,
            scale_step: 2,
            tile_size: 16,
        };

        let sources = vec![
            TileDescriptor::new("a.tif", Envelope::new(0.0, 0.0, 16.0, 16.0)),
            TileDescriptor::new("b.tif", Envelope::new(16.0, 0.0, 32.0, 16.0)),
        ];
        let index = TileIndex::build(sources);
        let engine = MosaicEngine::new(MosaicConfig::default()).unwrap();
        let sink = MemorySink {
            written: Mutex::new(Vec::new()),
        };

        let report =
            build_pyramid(&engine, &base, &config, &index, &flat_loader, &sink).unwrap();

        // Level 0: 4x4 tiles, level 1: 2x2, level 2: 1x1
        assert_eq!(report.levels, 3);
        assert_eq!(report.tiles_written, 16 + 4 + 1);
        assert!(report.failures.is_empty());

        let written = sink.written.lock().unwrap();
        assert_eq!(written.len(), 21);
        assert!(written.iter().all(|(_, w, h)| *w == 16 && *h == 16));
    }

    #[test]
    fn test_build_pyramid_collects_failures() {
        let base = MosaicRequest::new(
            Envelope::new(0.0, 0.0, 32.0, 32.0),
            32,
            32,
            SampleDepth::U8,
        );
        let config = PyramidConfig {
            levels: 1,
            min_dimension: 1,
            scale_step: 2,
            tile_size: 32,
        };

        let index = TileIndex::build(vec![TileDescriptor::new(
            "broken.tif",
            Envelope::new(0.0, 0.0, 32.0, 32.0),
        )]);
        let engine = MosaicEngine::new(MosaicConfig::default()).unwrap();
        let sink = MemorySink {
            written: Mutex::new(Vec::new()),
        };
        let failing = |tile: &TileDescriptor| {
            Err::<(PixelBuffer, GeoReference), _>(LoadError::NotFound(tile.source.clone()))
        };

        let report = build_pyramid(&engine, &base, &config, &index, &failing, &sink).unwrap();

        assert_eq!(report.tiles_written, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].source, "broken.tif");
    }
}
