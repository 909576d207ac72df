//! Spatial index over source-tile descriptors.
//!
//! Candidate lookup is conservative bounding-box intersection over an
//! R-tree: false positives are acceptable (the compositor no-ops on
//! them), false negatives are not.

use coverage_common::Envelope;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One source tile known to a catalog: an opaque handle (path, URL or
/// database key) plus its geographic envelope.
///
/// Descriptors are immutable once created; a catalog scan produces them
/// and they live for the duration of one mosaic request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDescriptor {
    /// Opaque source handle.
    pub source: String,
    /// Geographic envelope of the tile.
    pub envelope: Envelope,
}

impl TileDescriptor {
    /// Create a new descriptor.
    pub fn new(source: impl Into<String>, envelope: Envelope) -> Self {
        Self {
            source: source.into(),
            envelope,
        }
    }

    /// The lowercase file extension of the source handle, used to pick
    /// a loader from the registry. `None` when the handle has no
    /// extension.
    pub fn format_tag(&self) -> Option<String> {
        let name = self.source.rsplit(['/', '\\']).next()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// R-tree entry wrapping a shared descriptor.
#[derive(Debug, Clone)]
struct IndexEntry(Arc<TileDescriptor>);

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let env = self.0.envelope;
        AABB::from_corners([env.min_x, env.min_y], [env.max_x, env.max_y])
    }
}

/// Spatial index over a set of tile descriptors.
///
/// Bulk-loaded once per request (or reused while the catalog is
/// stable) and queried once per requested output tile.
pub struct TileIndex {
    tree: RTree<IndexEntry>,
}

impl TileIndex {
    /// Bulk-load an index from a catalog scan.
    pub fn build(tiles: Vec<TileDescriptor>) -> Self {
        let entries = tiles
            .into_iter()
            .map(|tile| IndexEntry(Arc::new(tile)))
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// All descriptors whose bounding box intersects the query
    /// envelope. No ordering guarantee.
    pub fn query(&self, envelope: &Envelope) -> Vec<Arc<TileDescriptor>> {
        let query = AABB::from_corners(
            [envelope.min_x, envelope.min_y],
            [envelope.max_x, envelope.max_y],
        );
        self.tree
            .locate_in_envelope_intersecting(&query)
            .map(|entry| Arc::clone(&entry.0))
            .collect()
    }

    /// Number of indexed tiles.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_tiles() -> Vec<TileDescriptor> {
        // 3x3 grid of 10x10 tiles covering [0,30]^2
        let mut tiles = Vec::new();
        for row in 0..3 {
            for col in 0..3 {
                let min_x = col as f64 * 10.0;
                let min_y = row as f64 * 10.0;
                tiles.push(TileDescriptor::new(
                    format!("tiles/r{}_c{}.tif", row, col),
                    Envelope::new(min_x, min_y, min_x + 10.0, min_y + 10.0),
                ));
            }
        }
        tiles
    }

    #[test]
    fn test_query_single_tile() {
        let index = TileIndex::build(grid_tiles());
        assert_eq!(index.len(), 9);

        let hits = index.query(&Envelope::new(12.0, 12.0, 14.0, 14.0));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source, "tiles/r1_c1.tif");
    }

    #[test]
    fn test_query_spanning_four_tiles() {
        let index = TileIndex::build(grid_tiles());

        let hits = index.query(&Envelope::new(8.0, 8.0, 12.0, 12.0));
        let mut sources: Vec<&str> = hits.iter().map(|t| t.source.as_str()).collect();
        sources.sort_unstable();
        assert_eq!(
            sources,
            vec![
                "tiles/r0_c0.tif",
                "tiles/r0_c1.tif",
                "tiles/r1_c0.tif",
                "tiles/r1_c1.tif"
            ]
        );
    }

    #[test]
    fn test_query_outside_everything() {
        let index = TileIndex::build(grid_tiles());
        let hits = index.query(&Envelope::new(100.0, 100.0, 110.0, 110.0));
        assert!(hits.is_empty());
    }

    #[test]
    fn test_empty_index() {
        let index = TileIndex::build(Vec::new());
        assert!(index.is_empty());
        assert!(index.query(&Envelope::new(0.0, 0.0, 1.0, 1.0)).is_empty());
    }

    #[test]
    fn test_format_tag() {
        let tile = TileDescriptor::new("data/dem/n42_w073.tif", Envelope::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(tile.format_tag().as_deref(), Some("tif"));

        let upper = TileDescriptor::new("IMG_0001.PNG", Envelope::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(upper.format_tag().as_deref(), Some("png"));

        let bare = TileDescriptor::new("catalog-key-123", Envelope::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(bare.format_tag(), None);
    }
}
